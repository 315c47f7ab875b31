use std::future::Future;

use pd_dto::{
    CURRENT_FIELD, ORIGINAL_FIELD,
    res::{CompareOutcome, CompareResponse, ComparisonResult, HealthStatus},
};
use reqwest::{
    Method, StatusCode,
    multipart::{Form, Part},
};
use validator::Validate;

use crate::{
    AppError, AppResult, ErrType,
    config::ServiceConfig,
    interceptor,
    media::{INVALID_IMAGE_MESSAGE, ImageBlob},
};

pub const UNREACHABLE_MESSAGE: &str = "cannot reach the comparison service";

/// Which rendition of the diff artifact to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Inline display
    Preview,
    /// Save-as download
    Download,
}
impl ArtifactKind {
    fn segment(self) -> &'static str {
        match self {
            ArtifactKind::Preview => "preview",
            ArtifactKind::Download => "download",
        }
    }
}

/// Contract with the remote comparison service
pub trait ComparisonService: Send + Sync + 'static {
    fn compare(
        &self,
        baseline: ImageBlob,
        current: ImageBlob,
    ) -> impl Future<Output = AppResult<ComparisonResult>> + Send;

    fn fetch_artifact(&self, artifact_id: &str, kind: ArtifactKind) -> impl Future<Output = AppResult<Vec<u8>>> + Send;
}

pub struct HttpComparisonClient {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl HttpComparisonClient {
    pub fn new(config: ServiceConfig) -> AppResult<Self> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|err| ErrType::ConfigError.err(err, format!("Invalid service url: {}", config.base_url)))?;

        let client = reqwest::ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ErrType::ConfigError.err(err, "Failed to create comparison client"))?;

        Ok(Self {
            config,
            client,
        })
    }

    pub async fn health(&self) -> AppResult<HealthStatus> {
        let uri = self.config.api_uri("/health");
        let call = interceptor::intercept(Method::GET, &uri);

        let res = match self.client.get(&uri).send().await {
            Ok(res) => res,
            Err(err) => {
                call.failed(&err);
                return Err(unreachable(err));
            }
        };
        let status = res.status();
        call.complete(status);

        match status {
            StatusCode::OK => res
                .json::<HealthStatus>()
                .await
                .map_err(|err| ErrType::ServiceRejected.err(err, "Failed to parse health response")),
            _ => Err(ErrType::ServiceRejected.msg(format!("Comparison service is unhealthy ({status})"))),
        }
    }
}

impl ComparisonService for HttpComparisonClient {
    async fn compare(&self, baseline: ImageBlob, current: ImageBlob) -> AppResult<ComparisonResult> {
        let uri = self.config.api_uri("/compare");
        let form = Form::new().part(ORIGINAL_FIELD, blob_part(&baseline)?).part(CURRENT_FIELD, blob_part(&current)?);

        let call = interceptor::intercept(Method::POST, &uri);
        let res = match self.client.post(&uri).multipart(form).send().await {
            Ok(res) => res,
            Err(err) => {
                call.failed(&err);
                return Err(unreachable(err));
            }
        };
        let status = res.status();
        call.complete(status);

        // failures carry a json body regardless of status code
        let body = res.bytes().await.map_err(unreachable)?;
        let parsed: CompareResponse = serde_json::from_slice(&body).map_err(|err| {
            ErrType::ServiceRejected.err(err, format!("Unexpected response from comparison service ({status})"))
        })?;

        match parsed.into_outcome() {
            CompareOutcome::Success(result) => {
                result.validate().map_err(|err| {
                    ErrType::ServiceRejected.err(err, "Comparison service returned an inconsistent result")
                })?;
                Ok(result)
            }
            CompareOutcome::Failure(message) => Err(ErrType::ServiceRejected.msg(message)),
            CompareOutcome::Malformed(reason) => {
                Err(ErrType::ServiceRejected.err(reason, "Comparison service returned a malformed result"))
            }
        }
    }

    async fn fetch_artifact(&self, artifact_id: &str, kind: ArtifactKind) -> AppResult<Vec<u8>> {
        if artifact_id.trim().is_empty() {
            return Err(ErrType::ArtifactNotFound.msg("Diff artifact id is empty"));
        }

        let uri = self.config.api_uri(format!("/{}/{}", kind.segment(), urlencoding::encode(artifact_id)));
        let call = interceptor::intercept(Method::GET, &uri);

        // artifact failures stay standalone, even when the service is gone
        let res = match self.client.get(&uri).send().await {
            Ok(res) => res,
            Err(err) => {
                call.failed(&err);
                return Err(ErrType::ArtifactNotFound.err(err, format!("Failed to fetch diff artifact {artifact_id}")));
            }
        };
        let status = res.status();
        call.complete(status);

        match status {
            StatusCode::OK => res
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|err| ErrType::ArtifactNotFound.err(err, "Failed to read diff artifact")),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                Err(ErrType::ArtifactNotFound.msg(format!("Diff artifact not found: {artifact_id}")))
            }
            _ => Err(ErrType::ArtifactNotFound.msg(format!("Failed to fetch diff artifact {artifact_id} ({status})"))),
        }
    }
}

fn blob_part(blob: &ImageBlob) -> AppResult<Part> {
    Part::bytes(blob.data().to_vec())
        .file_name(blob.file_name().to_owned())
        .mime_str(blob.content_type())
        .map_err(|err| ErrType::InvalidInput.err(err, INVALID_IMAGE_MESSAGE))
}

fn unreachable(err: reqwest::Error) -> AppError {
    ErrType::ServiceUnreachable.err(err, UNREACHABLE_MESSAGE)
}

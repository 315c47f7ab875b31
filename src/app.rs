use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use lib_core::{
    AppResult, ErrType,
    client::{ArtifactKind, HttpComparisonClient},
    config::{self, ProgressConfig, ServiceConfig},
    media::ImageBlob,
};
use lib_domain::{ComparisonSession, SessionState, SlotKind, presenter};

use crate::{cli::OutputFormat, report};

type Session = ComparisonSession<HttpComparisonClient>;

pub struct CompareArgs {
    pub baseline: PathBuf,
    pub current: PathBuf,
    pub download: bool,
    pub out: Option<PathBuf>,
    pub preview: Option<PathBuf>,
}

pub struct App {
    client: Arc<HttpComparisonClient>,
    progress: ProgressConfig,
    format: OutputFormat,
}

impl App {
    pub fn new(service_url: Option<String>, format: OutputFormat) -> AppResult<Self> {
        let mut service = ServiceConfig::new();
        if let Some(url) = service_url {
            service = service.with_base_url(url);
        }
        tracing::debug!(service_url = service.base_url, message = "Using comparison service");

        Ok(Self {
            client: Arc::new(HttpComparisonClient::new(service)?),
            progress: ProgressConfig::new(),
            format,
        })
    }

    pub async fn compare(&self, args: CompareArgs) -> AppResult<ExitCode> {
        let mut session = ComparisonSession::new(Arc::clone(&self.client), self.progress);

        for (kind, path) in [(SlotKind::Baseline, &args.baseline), (SlotKind::Current, &args.current)] {
            let blob = ImageBlob::from_path(path).await?;
            session.assign(kind, blob)?;
        }

        session.settle_previews().await;
        for kind in [SlotKind::Baseline, SlotKind::Current] {
            match session.slot(kind).preview() {
                Some(preview) if preview.is_passthrough() => {
                    tracing::warn!(slot = %kind, message = "Image not decodable locally, service will decide")
                }
                Some(preview) => tracing::info!(
                    slot = %kind,
                    width = preview.source_width,
                    height = preview.source_height,
                    message = "Image loaded"
                ),
                None => {}
            }
        }

        session.submit()?;
        match self.await_outcome(&mut session).await {
            SessionState::Succeeded => {}
            _ => {
                let message = session.error_message().unwrap_or("comparison failed");
                report::failure(message, self.format);
                return Ok(ExitCode::FAILURE);
            }
        }

        if let Some(result) = session.result() {
            report::result(&presenter::summarize(result), self.format);
        }

        if let Some(path) = &args.preview {
            let bytes = session.fetch_diff(ArtifactKind::Preview).await?;
            save_preview(path, &bytes).await?;
            report::saved("diff preview", path, self.format);
        }

        if args.download {
            let dir = args.out.unwrap_or_else(config::get_download_dir);
            let path = session.download_diff(&dir).await?;
            report::saved("diff", &path, self.format);
        }

        Ok(ExitCode::SUCCESS)
    }

    /// Settle the session while rendering its progress estimate
    async fn await_outcome(&self, session: &mut Session) -> SessionState {
        let Some(mut feed) = session.progress_feed() else {
            return session.state();
        };

        let mut settle = std::pin::pin!(session.settle());
        let state = loop {
            tokio::select! {
                state = &mut settle => break state,
                changed = feed.changed() => match changed {
                    Ok(()) => report::progress(*feed.borrow_and_update(), self.format),
                    // estimator released, the outcome is already queued
                    Err(_) => break settle.await,
                },
            }
        };

        report::progress_end(*feed.borrow(), self.format);
        state
    }

    pub async fn health(&self) -> AppResult<ExitCode> {
        let status = self.client.health().await?;
        report::health(&status, self.format);
        Ok(ExitCode::SUCCESS)
    }
}

async fn save_preview(path: &Path, bytes: &[u8]) -> AppResult<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|err| ErrType::FsError.err(err, format!("Failed to save preview to {}", path.display())))
}

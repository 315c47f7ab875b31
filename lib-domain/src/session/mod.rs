use std::{path::Path, path::PathBuf, sync::Arc};

use lib_core::{
    AppResult, ErrType,
    client::{ArtifactKind, ComparisonService},
    config::ProgressConfig,
    extensions::RequestToken,
    media::ImageBlob,
};
use pd_dto::res::ComparisonResult;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::{
    artifact,
    presenter::{self, Classification},
};

pub mod progress;
pub mod slot;

use progress::ProgressEstimator;
use slot::{DecodedPreview, ImageInputSlot, SlotKind};

pub const PRECONDITION_MESSAGE: &str = "select two images first";
pub const BUSY_MESSAGE: &str = "a comparison is in progress, wait for it to finish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Ready,
    Submitting,
    Succeeded,
    Failed,
}
impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Started(RequestToken),
    /// A request is already outstanding, nothing was sent
    AlreadySubmitting(RequestToken),
}

/// Completions delivered to the session
#[derive(Debug)]
enum SessionEvent {
    PreviewDecoded(DecodedPreview),
    CompareFinished {
        token: RequestToken,
        outcome: AppResult<ComparisonResult>,
    },
}

/// Effect of one applied event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    PreviewReady(SlotKind),
    /// Bytes could not be decoded, the raw blob stands in as preview
    PreviewPassthrough(SlotKind),
    PreviewSuperseded(SlotKind),
    Succeeded(RequestToken),
    Failed(RequestToken),
    /// Response of a request abandoned by reset or re-run
    StaleResponse(RequestToken),
}

/// One user's comparison workflow.
///
/// All transitions happen on `&mut self`. Decodes and the service call run as
/// spawned tasks whose completions are queued on a channel and only take
/// effect through [`ComparisonSession::next_update`], so every method that
/// spawns work must be called from within a tokio runtime.
pub struct ComparisonSession<S> {
    service: Arc<S>,
    progress_config: ProgressConfig,

    baseline: ImageInputSlot,
    current: ImageInputSlot,

    state: SessionState,
    result: Option<ComparisonResult>,
    error_message: Option<String>,

    token: RequestToken,
    progress: Option<ProgressEstimator>,

    tx: mpsc::UnboundedSender<SessionEvent>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl<S: ComparisonService> ComparisonSession<S> {
    pub fn new(service: Arc<S>, progress_config: ProgressConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            service,
            progress_config,
            baseline: ImageInputSlot::new(SlotKind::Baseline),
            current: ImageInputSlot::new(SlotKind::Current),
            state: SessionState::Idle,
            result: None,
            error_message: None,
            token: RequestToken::default(),
            progress: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn slot(&self, kind: SlotKind) -> &ImageInputSlot {
        match kind {
            SlotKind::Baseline => &self.baseline,
            SlotKind::Current => &self.current,
        }
    }

    fn slot_mut(&mut self, kind: SlotKind) -> &mut ImageInputSlot {
        match kind {
            SlotKind::Baseline => &mut self.baseline,
            SlotKind::Current => &mut self.current,
        }
    }

    pub fn result(&self) -> Option<&ComparisonResult> {
        self.result.as_ref()
    }

    pub fn classification(&self) -> Option<Classification> {
        self.result.as_ref().map(|r| presenter::classify(r.similarity_percentage))
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Current estimate, only while a request is outstanding
    pub fn progress(&self) -> Option<f32> {
        self.progress.as_ref().map(|p| p.value())
    }

    pub fn progress_feed(&self) -> Option<watch::Receiver<f32>> {
        self.progress.as_ref().map(|p| p.subscribe())
    }

    pub fn previews_pending(&self) -> bool {
        self.baseline.is_decoding() || self.current.is_decoding()
    }

    /// Put a user selected image into a slot.
    ///
    /// Refused while a request is outstanding. Assigning after a finished
    /// comparison drops the now stale result or error.
    pub fn assign(&mut self, kind: SlotKind, blob: ImageBlob) -> AppResult<()> {
        if self.state == SessionState::Submitting {
            let err = ErrType::SessionBusy.msg(BUSY_MESSAGE);
            err.trace();
            return Err(err);
        }

        let pending = self.slot_mut(kind).assign(blob).inspect_err(|err| err.trace())?;
        tracing::debug!(slot = %kind, message = "Image accepted, decoding preview");

        let tx = self.tx.clone();
        tokio::spawn(async move {
            let decoded = pending.run().await;
            let _ = tx.send(SessionEvent::PreviewDecoded(decoded));
        });

        self.result = None;
        self.error_message = None;
        self.recompute_readiness();
        Ok(())
    }

    fn recompute_readiness(&mut self) {
        self.state = if self.baseline.is_filled() && self.current.is_filled() {
            SessionState::Ready
        } else {
            SessionState::Idle
        };
    }

    /// Send both images to the comparison service.
    ///
    /// From Succeeded or Failed this re-runs the comparison with the current
    /// slot contents.
    pub fn submit(&mut self) -> AppResult<SubmitOutcome> {
        if self.state == SessionState::Submitting {
            tracing::debug!(token = %self.token, message = "Comparison already outstanding, submit ignored");
            return Ok(SubmitOutcome::AlreadySubmitting(self.token));
        }

        let (Some(baseline), Some(current)) = (self.baseline.blob().cloned(), self.current.blob().cloned()) else {
            let err = ErrType::Precondition.msg(PRECONDITION_MESSAGE);
            err.trace();
            return Err(err);
        };

        let rerun = self.state.is_terminal();
        self.token = self.token.next();
        self.state = SessionState::Submitting;
        self.result = None;
        self.error_message = None;
        self.progress = Some(ProgressEstimator::start(self.progress_config));

        let token = self.token;
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = service.compare(baseline, current).await;
            let _ = tx.send(SessionEvent::CompareFinished {
                token,
                outcome,
            });
        });

        tracing::info!(token = %token, rerun, message = "Comparison submitted");
        Ok(SubmitOutcome::Started(token))
    }

    /// Back to Idle from any state. A response still in flight becomes stale.
    pub fn reset(&mut self) {
        if self.state == SessionState::Submitting {
            tracing::info!(token = %self.token, message = "Reset while submitting, response will be discarded");
        }

        self.token = self.token.next();
        self.progress = None;
        self.baseline.clear();
        self.current.clear();
        self.result = None;
        self.error_message = None;
        self.state = SessionState::Idle;
    }

    fn apply(&mut self, event: SessionEvent) -> SessionUpdate {
        match event {
            SessionEvent::PreviewDecoded(decoded) => {
                let kind = decoded.kind;
                let slot = self.slot_mut(kind);
                if !slot.apply_preview(decoded) {
                    tracing::debug!(slot = %kind, message = "Superseded preview discarded");
                    return SessionUpdate::PreviewSuperseded(kind);
                }
                match slot.preview() {
                    Some(preview) if preview.is_passthrough() => SessionUpdate::PreviewPassthrough(kind),
                    _ => SessionUpdate::PreviewReady(kind),
                }
            }
            SessionEvent::CompareFinished {
                token,
                outcome,
            } => {
                if token != self.token || self.state != SessionState::Submitting {
                    tracing::info!(token = %token, current = %self.token, message = "Stale comparison response discarded");
                    return SessionUpdate::StaleResponse(token);
                }

                match outcome {
                    Ok(result) => {
                        if let Some(progress) = self.progress.take() {
                            progress.complete();
                        }
                        tracing::info!(
                            token = %token,
                            similarity = result.similarity_percentage,
                            diff = result.diff_filename,
                            message = "Comparison succeeded"
                        );
                        self.result = Some(result);
                        self.state = SessionState::Succeeded;
                        SessionUpdate::Succeeded(token)
                    }
                    Err(err) => {
                        self.progress = None;
                        err.trace();
                        self.error_message = Some(err.to_string());
                        self.state = SessionState::Failed;
                        SessionUpdate::Failed(token)
                    }
                }
            }
        }
    }

    /// Wait for the next completion and apply it
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let event = self.rx.recv().await?;
        Some(self.apply(event))
    }

    /// Apply completions until no request is outstanding
    pub async fn settle(&mut self) -> SessionState {
        while self.state == SessionState::Submitting {
            if self.next_update().await.is_none() {
                break;
            }
        }
        self.state
    }

    /// Apply completions until neither slot is decoding
    pub async fn settle_previews(&mut self) {
        while self.previews_pending() {
            if self.next_update().await.is_none() {
                break;
            }
        }
    }

    /// Fetch a diff artifact by id. Never changes the session state.
    pub async fn fetch_artifact(&self, artifact_id: &str, kind: ArtifactKind) -> AppResult<Vec<u8>> {
        self.service.fetch_artifact(artifact_id, kind).await.inspect_err(|err| err.trace())
    }

    /// Fetch the diff of the current result
    pub async fn fetch_diff(&self, kind: ArtifactKind) -> AppResult<Vec<u8>> {
        let result = self.result.as_ref().ok_or_else(|| ErrType::Precondition.msg("no comparison result yet"))?;
        self.fetch_artifact(&result.diff_filename, kind).await
    }

    /// Download the diff of the current result into `dir`, named by today's date
    pub async fn download_diff(&self, dir: &Path) -> AppResult<PathBuf> {
        let bytes = self.fetch_diff(ArtifactKind::Download).await?;
        artifact::save_download(dir, &bytes, artifact::today()).await
    }
}

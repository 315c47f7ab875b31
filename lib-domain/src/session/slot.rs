use lib_core::{
    AppResult,
    media::{self, ImageBlob, Preview},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Baseline,
    Current,
}
impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Baseline => "baseline",
            SlotKind::Current => "current",
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preview lifecycle. Every accepted blob ends in `Ready`, undecodable
/// bytes with a passthrough preview.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Empty,
    Decoding,
    Ready(Preview),
}

/// Decode work handed out by [`ImageInputSlot::assign`].
///
/// Tagged with the slot generation at assignment time so a late result
/// can be matched against the slot's current blob.
pub struct PendingDecode {
    kind: SlotKind,
    generation: u64,
    blob: ImageBlob,
}

impl PendingDecode {
    pub async fn run(self) -> DecodedPreview {
        let preview = media::preview_or_passthrough(self.blob).await;
        DecodedPreview {
            kind: self.kind,
            generation: self.generation,
            preview,
        }
    }
}

#[derive(Debug)]
pub struct DecodedPreview {
    pub kind: SlotKind,
    pub generation: u64,
    pub preview: Preview,
}

/// One of the two named image inputs of a session
#[derive(Debug)]
pub struct ImageInputSlot {
    kind: SlotKind,
    blob: Option<ImageBlob>,
    preview: PreviewState,
    generation: u64,
}

impl ImageInputSlot {
    pub fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            blob: None,
            preview: PreviewState::Empty,
            generation: 0,
        }
    }

    pub fn blob(&self) -> Option<&ImageBlob> {
        self.blob.as_ref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        match &self.preview {
            PreviewState::Ready(preview) => Some(preview),
            _ => None,
        }
    }

    pub fn preview_state(&self) -> &PreviewState {
        &self.preview
    }

    pub fn is_filled(&self) -> bool {
        self.blob.is_some()
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self.preview, PreviewState::Decoding)
    }

    /// Validate and take ownership of `blob`.
    ///
    /// On rejection the slot is left untouched. On acceptance any decode
    /// still running for an earlier blob is superseded.
    pub fn assign(&mut self, blob: ImageBlob) -> AppResult<PendingDecode> {
        media::validate_image(&blob)?;

        self.generation += 1;
        self.blob = Some(blob.clone());
        self.preview = PreviewState::Decoding;

        Ok(PendingDecode {
            kind: self.kind,
            generation: self.generation,
            blob,
        })
    }

    /// Attach a finished decode. Returns `false` when it was superseded.
    pub fn apply_preview(&mut self, decoded: DecodedPreview) -> bool {
        if decoded.kind != self.kind || decoded.generation != self.generation || self.blob.is_none() {
            return false;
        }

        self.preview = PreviewState::Ready(decoded.preview);
        true
    }

    pub fn clear(&mut self) {
        // outstanding decodes must not land on an emptied slot
        self.generation += 1;
        self.blob = None;
        self.preview = PreviewState::Empty;
    }
}

pub mod artifact;
pub mod presenter;
pub mod session;

pub use session::{
    ComparisonSession, SessionState, SessionUpdate, SubmitOutcome,
    slot::{ImageInputSlot, PreviewState, SlotKind},
};

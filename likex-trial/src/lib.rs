pub mod aggregate;
pub mod lifecycle;
pub mod media;

pub use aggregate::{ResponseGroup, SelectionSnapshot, VIDEO_GROUP, collect_responses, group_id};
pub use lifecycle::{
    FinishFn, SubmitOutcome, Surface, TrialController, TrialError, TrialLayout, TrialPhase,
    TrialView,
};
pub use media::{MediaGate, MediaOutcome, MediaPlayer, PlaybackState};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionState {
    Empty,
    FileSelected,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionEvent {
    FileAccepted,
    FileRejected,
    SubmitRequested,
    StoreResolved,
    StoreRejected,
}

/// Form-side effects of a transition. Store calls are not actions: they are
/// the work done while in `Submitting`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionAction {
    RetainFile,
    ClearFileInput,
    SurfaceRejection,
    ClearError,
    NavigateToBills,
    SurfaceStoreError,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: SubmissionState,
    pub to: SubmissionState,
    pub event: SubmissionEvent,
    pub actions: Vec<SubmissionAction>,
}

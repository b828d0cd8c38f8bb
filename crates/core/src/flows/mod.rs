pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, NewBillFlow};
pub use states::{SubmissionAction, SubmissionEvent, SubmissionState, TransitionOutcome};

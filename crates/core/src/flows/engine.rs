use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{
    SubmissionAction, SubmissionEvent, SubmissionState, TransitionOutcome,
};

pub trait FlowDefinition {
    fn initial_state(&self) -> SubmissionState;
    fn transition(
        &self,
        current: &SubmissionState,
        event: &SubmissionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Lifecycle of the new-bill form.
#[derive(Clone, Debug, Default)]
pub struct NewBillFlow;

impl FlowDefinition for NewBillFlow {
    fn initial_state(&self) -> SubmissionState {
        SubmissionState::Empty
    }

    fn transition(
        &self,
        current: &SubmissionState,
        event: &SubmissionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_new_bill(current, event)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> SubmissionState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &SubmissionState,
        event: &SubmissionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &SubmissionState,
        event: &SubmissionEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "submission.transition_applied",
                        category_for(&outcome.event),
                        outcome_for(&outcome.event),
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "submission.transition_rejected",
                        category_for(event),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<NewBillFlow> {
    fn default() -> Self {
        Self::new(NewBillFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("a receipt file must be selected before submitting")]
    MissingReceipt,
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: SubmissionState, event: SubmissionEvent },
}

fn category_for(event: &SubmissionEvent) -> AuditCategory {
    match event {
        SubmissionEvent::FileAccepted | SubmissionEvent::FileRejected => AuditCategory::Selection,
        SubmissionEvent::SubmitRequested => AuditCategory::Submission,
        SubmissionEvent::StoreResolved | SubmissionEvent::StoreRejected => AuditCategory::Store,
    }
}

fn outcome_for(event: &SubmissionEvent) -> AuditOutcome {
    match event {
        SubmissionEvent::StoreRejected => AuditOutcome::Failed,
        _ => AuditOutcome::Success,
    }
}

fn transition_new_bill(
    current: &SubmissionState,
    event: &SubmissionEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use SubmissionAction::{
        ClearError, ClearFileInput, NavigateToBills, RetainFile, SurfaceRejection,
        SurfaceStoreError,
    };
    use SubmissionEvent::{
        FileAccepted, FileRejected, StoreRejected, StoreResolved, SubmitRequested,
    };
    use SubmissionState::{Empty, Failed, FileSelected, Submitting, Succeeded};

    let (to, actions) = match (current, event) {
        (Empty | FileSelected | Failed, FileAccepted) => (FileSelected, vec![RetainFile]),
        (Empty | FileSelected | Failed, FileRejected) => {
            (Empty, vec![ClearFileInput, SurfaceRejection])
        }
        (Empty, SubmitRequested) => return Err(FlowTransitionError::MissingReceipt),
        (FileSelected | Failed, SubmitRequested) => (Submitting, vec![ClearError]),
        (Submitting, SubmitRequested) => return Err(FlowTransitionError::SubmissionInFlight),
        (Submitting, StoreResolved) => (Succeeded, vec![NavigateToBills]),
        (Submitting, StoreRejected) => (Failed, vec![SurfaceStoreError]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: *event,
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, NewBillFlow};
    use crate::flows::states::{SubmissionAction, SubmissionEvent, SubmissionState};

    #[test]
    fn happy_path_reaches_succeeded_and_navigates() {
        let engine = FlowEngine::new(NewBillFlow);
        let mut state = engine.initial_state();
        assert_eq!(state, SubmissionState::Empty);

        state = engine
            .apply(&state, &SubmissionEvent::FileAccepted)
            .expect("empty -> file selected")
            .to;
        let submitting =
            engine.apply(&state, &SubmissionEvent::SubmitRequested).expect("-> submitting");
        assert_eq!(submitting.to, SubmissionState::Submitting);
        assert_eq!(submitting.actions, vec![SubmissionAction::ClearError]);

        let done = engine
            .apply(&submitting.to, &SubmissionEvent::StoreResolved)
            .expect("submitting -> succeeded");
        assert_eq!(done.to, SubmissionState::Succeeded);
        assert_eq!(done.actions, vec![SubmissionAction::NavigateToBills]);
    }

    #[test]
    fn rejected_file_keeps_form_empty_and_clears_input() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&SubmissionState::Empty, &SubmissionEvent::FileRejected)
            .expect("rejection is a valid event");

        assert_eq!(outcome.to, SubmissionState::Empty);
        assert!(outcome.actions.contains(&SubmissionAction::ClearFileInput));
    }

    #[test]
    fn rejected_replacement_file_drops_the_previous_one() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&SubmissionState::FileSelected, &SubmissionEvent::FileRejected)
            .expect("rejection is a valid event");
        assert_eq!(outcome.to, SubmissionState::Empty);
    }

    #[test]
    fn submit_without_file_is_blocked() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&SubmissionState::Empty, &SubmissionEvent::SubmitRequested)
            .expect_err("no file selected");
        assert_eq!(error, FlowTransitionError::MissingReceipt);
    }

    #[test]
    fn second_submit_while_in_flight_is_refused() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&SubmissionState::Submitting, &SubmissionEvent::SubmitRequested)
            .expect_err("single flight");
        assert_eq!(error, FlowTransitionError::SubmissionInFlight);
    }

    #[test]
    fn failure_is_recoverable() {
        let engine = FlowEngine::default();
        let failed = engine
            .apply(&SubmissionState::Submitting, &SubmissionEvent::StoreRejected)
            .expect("submitting -> failed");
        assert_eq!(failed.to, SubmissionState::Failed);
        assert_eq!(failed.actions, vec![SubmissionAction::SurfaceStoreError]);

        let retry = engine
            .apply(&failed.to, &SubmissionEvent::SubmitRequested)
            .expect("failed -> submitting");
        assert_eq!(retry.to, SubmissionState::Submitting);
    }

    #[test]
    fn succeeded_is_terminal() {
        let engine = FlowEngine::default();
        for event in [
            SubmissionEvent::FileAccepted,
            SubmissionEvent::FileRejected,
            SubmissionEvent::SubmitRequested,
            SubmissionEvent::StoreResolved,
            SubmissionEvent::StoreRejected,
        ] {
            let error = engine
                .apply(&SubmissionState::Succeeded, &event)
                .expect_err("succeeded accepts no events");
            assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn file_input_is_locked_while_submitting() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&SubmissionState::Submitting, &SubmissionEvent::FileAccepted)
            .expect_err("no file changes mid-flight");
        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                state: SubmissionState::Submitting,
                event: SubmissionEvent::FileAccepted,
            }
        );
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::default();
        let events = [
            SubmissionEvent::FileAccepted,
            SubmissionEvent::SubmitRequested,
            SubmissionEvent::StoreRejected,
            SubmissionEvent::SubmitRequested,
            SubmissionEvent::StoreResolved,
        ];

        let run = |engine: &FlowEngine<NewBillFlow>| {
            let mut state = engine.initial_state();
            let mut actions = Vec::new();
            for event in &events {
                let outcome = engine.apply(&state, event).expect("deterministic run");
                actions.push(outcome.actions);
                state = outcome.to;
            }
            (state, actions)
        };

        let first = run(&engine);
        let second = run(&engine);

        assert_eq!(first, second);
        assert_eq!(first.0, SubmissionState::Succeeded);
        assert_eq!(NewBillFlow.initial_state(), SubmissionState::Empty);
    }

    #[test]
    fn transitions_emit_audit_events() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(None, "req-42", "a@a");

        let _ = engine
            .apply_with_audit(
                &SubmissionState::Empty,
                &SubmissionEvent::FileAccepted,
                &sink,
                &audit,
            )
            .expect("transition should succeed");
        let _ = engine.apply_with_audit(
            &SubmissionState::Succeeded,
            &SubmissionEvent::SubmitRequested,
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].correlation_id, "req-42");
        assert_eq!(events[0].event_type, "submission.transition_applied");
        assert_eq!(events[1].event_type, "submission.transition_rejected");
        assert_eq!(events[1].outcome, AuditOutcome::Rejected);
    }

    #[test]
    fn store_rejection_is_audited_as_failed() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(None, "req-43", "a@a");

        let outcome = engine
            .apply_with_audit(
                &SubmissionState::Submitting,
                &SubmissionEvent::StoreRejected,
                &sink,
                &audit,
            )
            .expect("submitting -> failed");

        assert_eq!(outcome.to, SubmissionState::Failed);
        let events = sink.events();
        assert_eq!(events[0].outcome, AuditOutcome::Failed);
        assert_eq!(events[0].metadata.get("event").map(String::as_str), Some("StoreRejected"));
    }
}

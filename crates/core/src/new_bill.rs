//! The new-bill form: receipt selection, validation and submission.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{AuditContext, AuditSink, NoopAuditSink};
use crate::config::AppConfig;
use crate::domain::bill::{Bill, ReceiptFile};
use crate::domain::form::{BillDraft, NewBillForm};
use crate::errors::{ApplicationError, DomainError, ValidationFailure};
use crate::flows::{
    FlowEngine, FlowTransitionError, NewBillFlow, SubmissionAction, SubmissionEvent,
    SubmissionState,
};
use crate::routes::{Navigator, Route};
use crate::session::Session;
use crate::store::{with_timeout, BillStore, StoreError};

/// Contents of the receipt `<input type="file">`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInput {
    files: Vec<ReceiptFile>,
}

impl FileInput {
    pub fn files(&self) -> &[ReceiptFile] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Option<&ReceiptFile> {
        self.files.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn select(&mut self, file: ReceiptFile) {
        self.files = vec![file];
    }

    fn clear(&mut self) {
        self.files.clear();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded(Bill),
    /// Another submission was already in flight; nothing was sent.
    Ignored,
}

/// Shown when a submission is dropped before the store answered.
pub const SUBMISSION_CANCELLED: &str = "Envoi interrompu, veuillez réessayer.";

/// Matches the media type essence (parameters stripped) against the
/// allow-list, ignoring case.
pub fn validate_media_type(media_type: &str, allowed: &[String]) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    !essence.is_empty() && allowed.iter().any(|entry| entry.trim().eq_ignore_ascii_case(essence))
}

/// Everything the new-bill page renders from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NewBillView {
    pub form: NewBillForm,
    pub file_name: Option<String>,
    pub error: Option<String>,
    pub submitting: bool,
    pub accept: String,
}

type Prepared = (ReceiptFile, BillDraft);

#[derive(Debug)]
struct FormState {
    state: SubmissionState,
    input: FileInput,
    last_error: Option<String>,
}

pub struct NewBillSubmitter<S: ?Sized, N> {
    store: Arc<S>,
    navigator: N,
    session: Session,
    engine: FlowEngine<NewBillFlow>,
    allowed_media_types: Vec<String>,
    store_timeout: Duration,
    audit: Arc<dyn AuditSink>,
    form: Mutex<FormState>,
}

impl<S, N> NewBillSubmitter<S, N>
where
    S: BillStore + ?Sized,
    N: Navigator,
{
    pub fn new(store: Arc<S>, navigator: N, session: Session, config: &AppConfig) -> Self {
        let engine = FlowEngine::default();
        let state = engine.initial_state();
        Self {
            store,
            navigator,
            session,
            engine,
            allowed_media_types: config.receipts.allowed_media_types.clone(),
            store_timeout: config.store.timeout(),
            audit: Arc::new(NoopAuditSink),
            form: Mutex::new(FormState { state, input: FileInput::default(), last_error: None }),
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn validate_file(&self, media_type: &str) -> bool {
        validate_media_type(media_type, &self.allowed_media_types)
    }

    pub fn state(&self) -> SubmissionState {
        self.with_form(|form| form.state)
    }

    pub fn file_input(&self) -> FileInput {
        self.with_form(|form| form.input.clone())
    }

    pub fn file_name(&self) -> Option<String> {
        self.with_form(|form| form.input.file(0).map(|file| file.file_name().to_string()))
    }

    /// Message of the last rejection or store failure, cleared by the next
    /// accepted file or submission.
    pub fn last_error(&self) -> Option<String> {
        self.with_form(|form| form.last_error.clone())
    }

    /// Snapshot of the form for rendering, with the given field values.
    pub fn view(&self, form: NewBillForm) -> NewBillView {
        self.with_form(|state| NewBillView {
            form,
            file_name: state.input.file(0).map(|file| file.file_name().to_string()),
            error: state.last_error.clone(),
            submitting: state.state == SubmissionState::Submitting,
            accept: self.allowed_media_types.join(","),
        })
    }

    /// Handles a change of the receipt input. Returns the retained file name.
    /// A disallowed type, or a path without a file name, clears the input.
    pub fn handle_change_file(&self, file: ReceiptFile) -> Result<String, DomainError> {
        let file_name = file.file_name().to_string();
        let media_type = file.media_type.clone();
        let rejection = if file_name.is_empty() {
            Some(ValidationFailure::EmptyFileName(file.path.clone()))
        } else if !self.validate_file(&media_type) {
            Some(ValidationFailure::DisallowedMediaType {
                media_type: media_type.clone(),
                allowed: self.allowed_media_types.join(", "),
            })
        } else {
            None
        };
        let event = match rejection {
            Some(_) => SubmissionEvent::FileRejected,
            None => SubmissionEvent::FileAccepted,
        };
        let audit = self.audit_context();
        let message = rejection.as_ref().map(ToString::to_string);

        self.with_form(|form| -> Result<(), DomainError> {
            let outcome =
                self.engine.apply_with_audit(&form.state, &event, self.audit.as_ref(), &audit)?;
            form.state = outcome.to;
            run_actions(form, &outcome.actions, Some(file), message);
            Ok(())
        })?;

        match rejection {
            None => {
                info!(
                    event_name = "new_bill.file.accepted",
                    user = %self.session.email,
                    file_name = %file_name,
                    media_type = %media_type,
                    "receipt file selected"
                );
                Ok(file_name)
            }
            Some(failure) => {
                warn!(
                    event_name = "new_bill.file.rejected",
                    user = %self.session.email,
                    media_type = %media_type,
                    error = %failure,
                    "receipt file rejected"
                );
                Err(failure.into())
            }
        }
    }

    /// Validates locally, uploads the receipt, creates the bill and navigates
    /// back to the list. Nothing reaches the store when there is no receipt
    /// or the form is invalid.
    pub async fn handle_submit(
        &self,
        values: NewBillForm,
    ) -> Result<SubmitOutcome, ApplicationError> {
        let audit = self.audit_context();

        let prepared = self.with_form(|form| -> Result<Option<Prepared>, ApplicationError> {
            match self.engine.apply(&form.state, &SubmissionEvent::SubmitRequested) {
                Ok(_) => {}
                Err(FlowTransitionError::SubmissionInFlight) => return Ok(None),
                Err(error) => return Err(error.into()),
            }

            let draft = values.into_draft(&self.session.email)?;
            let file = form.input.file(0).cloned().ok_or(FlowTransitionError::MissingReceipt)?;
            let outcome = self.engine.apply_with_audit(
                &form.state,
                &SubmissionEvent::SubmitRequested,
                self.audit.as_ref(),
                &audit,
            )?;
            form.state = outcome.to;
            run_actions(form, &outcome.actions, None, None);
            Ok(Some((file, draft)))
        });

        let Some((file, draft)) = prepared? else {
            info!(
                event_name = "new_bill.submit.ignored",
                user = %self.session.email,
                "submission already in flight"
            );
            return Ok(SubmitOutcome::Ignored);
        };

        let mut in_flight = InFlight {
            form: &self.form,
            engine: &self.engine,
            sink: self.audit.as_ref(),
            audit,
            settled: false,
        };
        let result = self.persist(&file, draft).await;
        let navigate = match &result {
            Ok(_) => in_flight.settle(SubmissionEvent::StoreResolved, None),
            Err(error) => in_flight.settle(SubmissionEvent::StoreRejected, Some(error.to_string())),
        };

        match result {
            Ok(bill) => {
                info!(
                    event_name = "new_bill.submit.succeeded",
                    user = %self.session.email,
                    bill_id = %bill.id,
                    "bill created"
                );
                if navigate {
                    self.navigator.navigate(Route::Bills);
                }
                Ok(SubmitOutcome::Succeeded(bill))
            }
            Err(error) => {
                warn!(
                    event_name = "new_bill.submit.failed",
                    user = %self.session.email,
                    error = %error,
                    "bill creation failed"
                );
                Err(error.into())
            }
        }
    }

    async fn persist(&self, file: &ReceiptFile, draft: BillDraft) -> Result<Bill, StoreError> {
        let stored = with_timeout(
            self.store_timeout,
            self.store.upload_receipt(file, &self.session.email),
        )
        .await?;
        let payload = draft.with_receipt(&stored, file.file_name());
        with_timeout(self.store_timeout, self.store.create(payload)).await
    }

    fn audit_context(&self) -> AuditContext {
        AuditContext::new(None, "new-bill-form", self.session.email.clone())
    }

    fn with_form<R>(&self, f: impl FnOnce(&mut FormState) -> R) -> R {
        lock_form(&self.form, f)
    }
}

/// A submission between the commit to `Submitting` and the store's answer.
/// Dropping it unsettled, when the caller abandons the future, moves the
/// form to `Failed` so a retry is possible.
struct InFlight<'a> {
    form: &'a Mutex<FormState>,
    engine: &'a FlowEngine<NewBillFlow>,
    sink: &'a dyn AuditSink,
    audit: AuditContext,
    settled: bool,
}

impl InFlight<'_> {
    /// Applies the store outcome. Returns whether the flow asked to navigate.
    fn settle(&mut self, event: SubmissionEvent, message: Option<String>) -> bool {
        self.settled = true;
        lock_form(self.form, |form| {
            match self.engine.apply_with_audit(&form.state, &event, self.sink, &self.audit) {
                Ok(outcome) => {
                    form.state = outcome.to;
                    run_actions(form, &outcome.actions, None, message)
                }
                Err(error) => {
                    warn!(
                        event_name = "new_bill.submit.unexpected_state",
                        error = %error,
                        "store result arrived outside of a submission"
                    );
                    false
                }
            }
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!(
            event_name = "new_bill.submit.cancelled",
            user = %self.audit.actor,
            "submission dropped before the store answered"
        );
        self.settle(SubmissionEvent::StoreRejected, Some(SUBMISSION_CANCELLED.to_string()));
    }
}

/// Applies the form-side effects of a transition. Navigation is reported
/// back so that it happens once the lock is released.
fn run_actions(
    form: &mut FormState,
    actions: &[SubmissionAction],
    mut selected: Option<ReceiptFile>,
    message: Option<String>,
) -> bool {
    let mut navigate = false;
    for action in actions {
        match action {
            SubmissionAction::RetainFile => {
                if let Some(file) = selected.take() {
                    form.input.select(file);
                }
                form.last_error = None;
            }
            SubmissionAction::ClearFileInput => form.input.clear(),
            SubmissionAction::ClearError => form.last_error = None,
            SubmissionAction::SurfaceRejection | SubmissionAction::SurfaceStoreError => {
                form.last_error = message.clone();
            }
            SubmissionAction::NavigateToBills => navigate = true,
        }
    }
    navigate
}

fn lock_form<R>(form: &Mutex<FormState>, f: impl FnOnce(&mut FormState) -> R) -> R {
    match form.lock() {
        Ok(mut form) => f(&mut form),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}

pub mod audit;
pub mod bills;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod format;
pub mod new_bill;
pub mod projector;
pub mod routes;
pub mod session;
pub mod store;
pub mod views;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use bills::{preview_receipt, BillsPage, BillsView, ReceiptPreview};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::bill::{Bill, BillId, BillStatus, ExpenseType, NewBill, ReceiptFile};
pub use domain::form::{BillDraft, NewBillForm};
pub use errors::{ApplicationError, DomainError, InterfaceError, ValidationFailure};
pub use flows::{FlowEngine, FlowTransitionError, NewBillFlow, SubmissionEvent, SubmissionState};
pub use format::Locale;
pub use new_bill::{validate_media_type, FileInput, NewBillSubmitter, NewBillView, SubmitOutcome};
pub use projector::{BillListProjector, BillRow, ReceiptLink};
pub use routes::{Navigator, RecordingNavigator, Route};
pub use session::{Session, SessionError, UserType};
pub use store::{with_timeout, BillStore, StoreError, StoredReceipt};
pub use views::{ViewError, ViewRenderer};

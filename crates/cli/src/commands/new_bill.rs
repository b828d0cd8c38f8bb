use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use billed_core::config::AppConfig;
use billed_core::domain::bill::ReceiptFile;
use billed_core::domain::form::NewBillForm;
use billed_core::errors::InterfaceError;
use billed_core::new_bill::{NewBillSubmitter, SubmitOutcome};
use billed_core::routes::RecordingNavigator;
use billed_core::session::Session;
use billed_core::store::StoreError;
use billed_store::{InMemoryBillStore, ScriptedBillStore, FIXTURE_EMAIL};

use crate::commands::{exit, runtime, CommandResult};

const COMMAND: &str = "new-bill";

#[derive(Clone, Debug, Default)]
pub struct NewBillArgs {
    pub receipt: PathBuf,
    /// Declared media type; guessed from the receipt's extension when absent.
    pub media_type: Option<String>,
    pub email: Option<String>,
    pub form: NewBillForm,
    /// Makes the store reject the creation with this status.
    pub simulate_status: Option<u16>,
}

pub fn run(config: &AppConfig, args: &NewBillArgs) -> CommandResult {
    let receipt = match read_receipt(&args.receipt, args.media_type.as_deref()) {
        Ok(receipt) => receipt,
        Err(error) => {
            return CommandResult::failure(COMMAND, "input", format!("{error:#}"), exit::INPUT)
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize runtime: {error}"),
                exit::INTERNAL,
            )
        }
    };

    let store = Arc::new(ScriptedBillStore::new(InMemoryBillStore::seeded()));
    if let Some(status) = args.simulate_status {
        store.fail_next_create(StoreError::Status(status));
    }
    let navigator = RecordingNavigator::default();
    let session = Session::employee(args.email.as_deref().unwrap_or(FIXTURE_EMAIL));
    let submitter = NewBillSubmitter::new(store.clone(), navigator.clone(), session, config);

    if let Err(error) = submitter.handle_change_file(receipt) {
        return CommandResult::failure(COMMAND, "validation", error.to_string(), exit::INPUT);
    }

    let correlation_id = format!("cli-{}", std::process::id());
    match runtime.block_on(submitter.handle_submit(args.form.clone())) {
        Ok(SubmitOutcome::Succeeded(bill)) => {
            let listed = runtime.block_on(store.inner().bills()).len();
            CommandResult::success_with(
                COMMAND,
                format!("bill {} created", bill.id),
                Some(json!({
                    "bill": bill,
                    "navigated_to": navigator.last().map(|route| route.path()),
                    "bills_in_store": listed,
                })),
            )
        }
        Ok(SubmitOutcome::Ignored) => CommandResult::failure(
            COMMAND,
            "internal",
            "submission was ignored",
            exit::INTERNAL,
        ),
        Err(error) => interface_failure(error.into_interface(correlation_id)),
    }
}

/// Reports the user-facing message, with the technical detail alongside.
fn interface_failure(error: InterfaceError) -> CommandResult {
    let (error_class, exit_code) = match &error {
        InterfaceError::BadRequest { .. } => ("validation", exit::INPUT),
        InterfaceError::ServiceUnavailable { .. } => ("store", exit::STORE),
    };
    CommandResult::failure_with(
        COMMAND,
        error_class,
        error.user_message(),
        exit_code,
        Some(json!({
            "detail": error.to_string(),
            "correlation_id": error.correlation_id(),
        })),
    )
}

fn read_receipt(path: &Path, media_type: Option<&str>) -> anyhow::Result<ReceiptFile> {
    let content =
        fs::read(path).with_context(|| format!("could not read receipt `{}`", path.display()))?;
    let media_type = media_type.map(str::to_string).unwrap_or_else(|| guess_media_type(path));
    Ok(ReceiptFile::new(path.display().to_string(), media_type, content))
}

fn guess_media_type(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
    .to_string()
}

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use billed_core::bills::{BillsPage, BillsView};
use billed_core::config::AppConfig;
use billed_core::routes::RecordingNavigator;
use billed_core::session::Session;
use billed_core::store::StoreError;
use billed_core::views::ViewRenderer;
use billed_store::{InMemoryBillStore, ScriptedBillStore, FIXTURE_EMAIL};

use crate::commands::{exit, runtime, CommandResult};

const COMMAND: &str = "bills";

#[derive(Clone, Debug, Default)]
pub struct BillsArgs {
    /// JSON array of bills; the sample bills are used when absent.
    pub file: Option<PathBuf>,
    pub email: Option<String>,
    pub html: bool,
    /// Makes the store reject the listing with this status.
    pub simulate_status: Option<u16>,
}

pub fn run(config: &AppConfig, args: &BillsArgs) -> CommandResult {
    let store = match open_store(args) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            return CommandResult::failure(COMMAND, "input", format!("{error:#}"), exit::INPUT)
        }
    };
    if let Some(status) = args.simulate_status {
        store.fail_next_list(StoreError::Status(status));
    }

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

    let session = Session::employee(args.email.as_deref().unwrap_or(FIXTURE_EMAIL));
    let page = BillsPage::new(store, RecordingNavigator::default(), session, config);
    let view = runtime.block_on(page.load());

    let html = if args.html {
        match ViewRenderer::new().and_then(|renderer| renderer.render_bills(page.session(), &view))
        {
            Ok(html) => Some(html),
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "render",
                    error.to_string(),
                    exit::INTERNAL,
                )
            }
        }
    } else {
        None
    };

    match view {
        BillsView::Loaded { rows } => CommandResult::success_with(
            COMMAND,
            format!("{} bill(s), most recent first", rows.len()),
            Some(json!({ "rows": rows, "html": html })),
        ),
        BillsView::Error { message } => CommandResult::failure_with(
            COMMAND,
            "store",
            message,
            exit::STORE,
            html.map(|html| json!({ "html": html })),
        ),
        BillsView::Loading => CommandResult::failure(
            COMMAND,
            "internal",
            "bills are still loading",
            exit::INTERNAL,
        ),
    }
}

fn open_store(args: &BillsArgs) -> anyhow::Result<ScriptedBillStore> {
    let inner = match &args.file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("could not read bills file `{}`", path.display()))?;
            InMemoryBillStore::from_json(&raw)
                .with_context(|| format!("bills file `{}` is not a JSON bill array", path.display()))?
        }
        None => InMemoryBillStore::seeded(),
    };
    Ok(ScriptedBillStore::new(inner))
}

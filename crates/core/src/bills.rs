//! The employee's bills page: loading, projection and row actions.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::projector::{BillListProjector, BillRow};
use crate::routes::{Navigator, Route};
use crate::session::Session;
use crate::store::{with_timeout, BillStore, StoreError};

pub const RECEIPT_MODAL_TITLE: &str = "Justificatif";

/// State the bills page renders from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BillsView {
    Loading,
    Loaded { rows: Vec<BillRow> },
    Error { message: String },
}

/// What the eye icon of a row opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiptPreview {
    Available { url: String, title: &'static str, image_width: u32 },
    Missing,
}

pub struct BillsPage<S: ?Sized, N> {
    store: Arc<S>,
    navigator: N,
    session: Session,
    projector: BillListProjector,
    store_timeout: Duration,
    modal_width_px: u32,
}

impl<S, N> BillsPage<S, N>
where
    S: BillStore + ?Sized,
    N: Navigator,
{
    pub fn new(store: Arc<S>, navigator: N, session: Session, config: &AppConfig) -> Self {
        Self {
            store,
            navigator,
            session,
            projector: BillListProjector::new(config.display.locale),
            store_timeout: config.store.timeout(),
            modal_width_px: config.display.modal_width_px,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetches and projects the bills, most recent first.
    pub async fn get_bills(&self) -> Result<Vec<BillRow>, StoreError> {
        let bills = with_timeout(self.store_timeout, self.store.list()).await?;
        let rows = self.projector.project(&bills);
        info!(
            event_name = "bills.list.loaded",
            user = %self.session.email,
            count = rows.len(),
            "bills loaded"
        );
        Ok(rows)
    }

    /// Never fails: a store error becomes the page's error state and keeps
    /// the store's message verbatim.
    pub async fn load(&self) -> BillsView {
        match self.get_bills().await {
            Ok(rows) => BillsView::Loaded { rows },
            Err(error) => {
                warn!(
                    event_name = "bills.list.failed",
                    user = %self.session.email,
                    error = %error,
                    "bills could not be loaded"
                );
                BillsView::Error { message: error.to_string() }
            }
        }
    }

    pub fn handle_click_new_bill(&self) {
        self.navigator.navigate(Route::NewBill);
    }

    pub fn handle_click_icon_eye(&self, row: &BillRow) -> ReceiptPreview {
        preview_receipt(row, self.modal_width_px)
    }
}

/// The image takes half of the modal's width.
pub fn preview_receipt(row: &BillRow, modal_width_px: u32) -> ReceiptPreview {
    match &row.receipt {
        Some(link) => ReceiptPreview::Available {
            url: link.url.clone(),
            title: RECEIPT_MODAL_TITLE,
            image_width: modal_width_px / 2,
        },
        None => ReceiptPreview::Missing,
    }
}

use std::sync::Arc;

use billed_core::config::AppConfig;
use billed_core::domain::bill::{BillStatus, ReceiptFile};
use billed_core::domain::form::NewBillForm;
use billed_core::errors::ApplicationError;
use billed_core::flows::SubmissionState;
use billed_core::new_bill::{NewBillSubmitter, SubmitOutcome};
use billed_core::routes::{RecordingNavigator, Route};
use billed_core::session::Session;
use billed_core::store::{BillStore, StoreError};
use billed_core::views::ViewRenderer;
use billed_store::{ScriptedBillStore, StoreCalls};

type Submitter = NewBillSubmitter<ScriptedBillStore, RecordingNavigator>;

fn submitter_with(
    config: &AppConfig,
) -> (Submitter, Arc<ScriptedBillStore>, RecordingNavigator) {
    let store = Arc::new(ScriptedBillStore::default());
    let navigator = RecordingNavigator::default();
    let submitter =
        NewBillSubmitter::new(store.clone(), navigator.clone(), Session::employee("a@a"), config);
    (submitter, store, navigator)
}

fn form() -> NewBillForm {
    NewBillForm {
        expense_type: "Hôtel et logement".to_string(),
        name: "encore".to_string(),
        amount: "400".to_string(),
        date: "2004-04-04".to_string(),
        vat: "80".to_string(),
        pct: String::new(),
        commentary: "séminaire billed".to_string(),
    }
}

fn png() -> ReceiptFile {
    ReceiptFile::new("test.png", "image/png", b"\x89PNG\r\n".to_vec())
}

#[tokio::test]
async fn submitted_bill_is_listed_as_pending_with_its_receipt() {
    let (submitter, store, navigator) = submitter_with(&AppConfig::default());
    submitter.handle_change_file(png()).expect("png accepted");

    let outcome = submitter.handle_submit(form()).await.expect("submission succeeds");
    let SubmitOutcome::Succeeded(created) = outcome else {
        panic!("first submission is not ignored");
    };

    assert_eq!(navigator.routes(), vec![Route::Bills]);
    assert_eq!(store.calls(), StoreCalls { list: 0, upload: 1, create: 1 });

    let listed = store.list().await.expect("list");
    assert_eq!(listed, vec![created.clone()]);
    assert_eq!(created.status, BillStatus::Pending);
    assert_eq!(created.pct, Some(20));
    assert_eq!(created.email, "a@a");
    assert_eq!(created.file_name.as_deref(), Some("test.png"));
    let url = created.receipt_url().expect("receipt linked");
    assert!(url.starts_with("memory://receipts/"));
    assert!(url.ends_with("/test.png"));
}

#[tokio::test]
async fn pdf_receipt_is_refused_before_any_store_call() {
    let (submitter, store, navigator) = submitter_with(&AppConfig::default());

    assert!(submitter.validate_file("image/jpeg"));
    assert!(!submitter.validate_file("application/pdf"));
    let rejected = submitter
        .handle_change_file(ReceiptFile::new("facture.pdf", "application/pdf", Vec::new()));
    assert!(rejected.is_err());

    let error = submitter.handle_submit(form()).await.expect_err("no receipt kept");
    assert!(matches!(error, ApplicationError::Domain(_)));
    assert_eq!(store.calls(), StoreCalls::default());
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn second_submit_while_in_flight_is_ignored() {
    let (submitter, store, navigator) = submitter_with(&AppConfig::default());
    submitter.handle_change_file(png()).expect("png accepted");
    let gate = store.gate_creates();

    let (first, second) = tokio::join!(submitter.handle_submit(form()), async {
        while submitter.state() != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }
        let second = submitter.handle_submit(form()).await;
        gate.add_permits(1);
        second
    });

    assert!(matches!(first, Ok(SubmitOutcome::Succeeded(_))));
    assert_eq!(second, Ok(SubmitOutcome::Ignored));
    assert_eq!(store.calls().create, 1);
    assert_eq!(store.inner().bills().await.len(), 1);
    assert_eq!(navigator.routes(), vec![Route::Bills]);
}

#[tokio::test(start_paused = true)]
async fn stalled_create_times_out_and_retry_succeeds() {
    let mut config = AppConfig::default();
    config.store.timeout_ms = 50;
    let (submitter, store, navigator) = submitter_with(&config);
    submitter.handle_change_file(png()).expect("png accepted");
    store.stall_next_create();

    let error = submitter.handle_submit(form()).await.expect_err("create stalls");
    assert_eq!(error, ApplicationError::Store(StoreError::Timeout { after_ms: 50 }));
    assert_eq!(submitter.state(), SubmissionState::Failed);
    assert!(navigator.routes().is_empty());

    submitter.handle_submit(form()).await.expect("retry succeeds");
    assert_eq!(submitter.state(), SubmissionState::Succeeded);
    assert_eq!(store.calls(), StoreCalls { list: 0, upload: 2, create: 2 });
    assert_eq!(store.inner().bills().await.len(), 1);
    assert_eq!(navigator.routes(), vec![Route::Bills]);
}

#[tokio::test]
async fn upload_failure_surfaces_and_skips_create() {
    let (submitter, store, _) = submitter_with(&AppConfig::default());
    submitter.handle_change_file(png()).expect("png accepted");
    store.fail_next_upload(StoreError::Status(500));

    let error = submitter.handle_submit(form()).await.expect_err("upload rejected");

    assert_eq!(error.to_string(), "Erreur 500");
    assert_eq!(store.calls(), StoreCalls { list: 0, upload: 1, create: 0 });
    assert_eq!(submitter.state(), SubmissionState::Failed);

    let html = ViewRenderer::new()
        .expect("templates")
        .render_new_bill(&Session::employee("a@a"), &submitter.view(form()))
        .expect("new bill page renders");
    assert!(html.contains("Envoyer une note de frais"));
    assert!(html.contains("Erreur 500"));
    assert!(html.contains("test.png"));
}

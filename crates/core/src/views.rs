//! HTML rendering of page state.

use std::collections::HashMap;

use serde_json::json;
use tera::{Context, Tera};
use thiserror::Error;

use crate::bills::{BillsView, ReceiptPreview, RECEIPT_MODAL_TITLE};
use crate::domain::bill::ExpenseType;
use crate::new_bill::NewBillView;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

const TEMPLATES: [(&str, &str); 6] = [
    ("layout.html", include_str!("../../../templates/ui/layout.html")),
    ("loading.html", include_str!("../../../templates/ui/loading.html")),
    ("error.html", include_str!("../../../templates/ui/error.html")),
    ("bills.html", include_str!("../../../templates/ui/bills.html")),
    ("new_bill.html", include_str!("../../../templates/ui/new_bill.html")),
    ("receipt_modal.html", include_str!("../../../templates/ui/receipt_modal.html")),
];

/// Formats an integer amount as `400 €`.
fn euros_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    match value {
        tera::Value::Number(number) => Ok(tera::Value::String(format!("{number} €"))),
        tera::Value::Null => Ok(tera::Value::String("0 €".to_string())),
        other => Err(tera::Error::msg(format!("euros filter expects a number, got {other}"))),
    }
}

pub struct ViewRenderer {
    tera: Tera,
}

impl ViewRenderer {
    pub fn new() -> Result<Self, ViewError> {
        let mut tera = Tera::default();
        tera.register_filter("euros", euros_filter);
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    /// Renders the loading, error or table page depending on the view state.
    pub fn render_bills(&self, session: &Session, view: &BillsView) -> Result<String, ViewError> {
        let mut context = layout_context(session, "bills");
        let template = match view {
            BillsView::Loading => "loading.html",
            BillsView::Error { message } => {
                context.insert("message", message);
                "error.html"
            }
            BillsView::Loaded { rows } => {
                context.insert("rows", rows);
                "bills.html"
            }
        };
        Ok(self.tera.render(template, &context)?)
    }

    pub fn render_new_bill(
        &self,
        session: &Session,
        view: &NewBillView,
    ) -> Result<String, ViewError> {
        let mut context = layout_context(session, "new_bill");
        context.insert("form", &view.form);
        context.insert("file_name", &view.file_name);
        context.insert("error", &view.error);
        context.insert("submitting", &view.submitting);
        context.insert("accept", &view.accept);
        context.insert(
            "expense_types",
            &ExpenseType::ALL.iter().map(ExpenseType::label).collect::<Vec<_>>(),
        );
        Ok(self.tera.render("new_bill.html", &context)?)
    }

    pub fn render_receipt_modal(&self, preview: &ReceiptPreview) -> Result<String, ViewError> {
        let values = match preview {
            ReceiptPreview::Available { url, title, image_width } => {
                json!({ "title": title, "url": url, "image_width": image_width })
            }
            ReceiptPreview::Missing => {
                json!({ "title": RECEIPT_MODAL_TITLE, "url": null, "image_width": 0 })
            }
        };
        let context = Context::from_value(values)?;
        Ok(self.tera.render("receipt_modal.html", &context)?)
    }
}

fn layout_context(session: &Session, active: &str) -> Context {
    let mut context = Context::new();
    context.insert("is_employee", &session.is_employee());
    context.insert("active", active);
    context
}

#[cfg(test)]
mod tests {
    use super::ViewRenderer;
    use crate::bills::{BillsView, ReceiptPreview};
    use crate::domain::bill::{Bill, BillId, BillStatus, ExpenseType};
    use crate::domain::form::NewBillForm;
    use crate::new_bill::NewBillView;
    use crate::projector::BillListProjector;
    use crate::session::Session;

    fn bill(id: &str, date: &str, status: BillStatus) -> Bill {
        Bill {
            id: BillId(id.to_string()),
            email: "a@a".to_string(),
            expense_type: ExpenseType::RestaurantsAndBars,
            name: format!("dîner {id}"),
            amount: 200,
            date: date.to_string(),
            status,
            file_url: Some(format!("https://storage.test/{id}.jpg")),
            file_name: Some(format!("{id}.jpg")),
            commentary: None,
            vat: None,
            pct: Some(20),
            comment_admin: None,
        }
    }

    fn renderer() -> ViewRenderer {
        ViewRenderer::new().expect("embedded templates compile")
    }

    #[test]
    fn bills_page_lists_dates_most_recent_first() {
        let rows = BillListProjector::default().project(&[
            bill("b", "2002-02-02", BillStatus::Refused),
            bill("d", "2004-04-04", BillStatus::Pending),
            bill("a", "2001-01-01", BillStatus::Accepted),
        ]);

        let html = renderer()
            .render_bills(&Session::employee("a@a"), &BillsView::Loaded { rows })
            .expect("bills page renders");

        let positions: Vec<usize> = ["2004-04-04", "2002-02-02", "2001-01-01"]
            .iter()
            .map(|date| html.find(&format!("datetime=\"{date}\"")).expect("date is rendered"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(html.contains("4 Avr. 04"));
        assert!(html.contains("En attente"));
        assert!(html.contains("200 €"));
        assert!(html.contains("data-testid=\"btn-new-bill\""));
        assert_eq!(html.matches("data-testid=\"icon-eye\"").count(), 3);
    }

    #[test]
    fn bills_page_highlights_the_window_icon_for_employees() {
        let html = renderer()
            .render_bills(&Session::employee("a@a"), &BillsView::Loaded { rows: Vec::new() })
            .expect("bills page renders");
        assert!(html.contains("data-testid=\"icon-window\" class=\"active-icon\""));
        assert!(!html.contains("data-testid=\"icon-mail\" class=\"active-icon\""));

        let html = renderer()
            .render_bills(&Session::admin("admin@a"), &BillsView::Loaded { rows: Vec::new() })
            .expect("bills page renders");
        assert!(!html.contains("icon-window"));
    }

    #[test]
    fn error_and_loading_states_have_their_own_pages() {
        let renderer = renderer();
        let session = Session::employee("a@a");

        let html = renderer
            .render_bills(&session, &BillsView::Error { message: "Erreur 404".to_string() })
            .expect("error page renders");
        assert!(html.contains("Erreur 404"));
        assert!(!html.contains("data-testid=\"tbody\""));

        let html = renderer.render_bills(&session, &BillsView::Loading).expect("loading renders");
        assert!(html.contains("Loading..."));
    }

    #[test]
    fn new_bill_page_shows_form_and_selected_file() {
        let view = NewBillView {
            form: NewBillForm { name: "Vol Paris Londres".to_string(), ..NewBillForm::default() },
            file_name: Some("test.png".to_string()),
            error: None,
            submitting: false,
            accept: "image/png".to_string(),
        };

        let html = renderer()
            .render_new_bill(&Session::employee("a@a"), &view)
            .expect("new bill page renders");

        assert!(html.contains("Envoyer une note de frais"));
        assert!(html.contains("data-testid=\"form-new-bill\""));
        assert!(html.contains("data-testid=\"icon-mail\" class=\"active-icon\""));
        assert!(html.contains("test.png"));
        assert!(html.contains("Hôtel et logement"));
        assert!(html.contains("value=\"Vol Paris Londres\""));
        assert!(!html.contains("data-testid=\"form-error\""));
    }

    #[test]
    fn receipt_modal_shows_title_and_sized_image() {
        let renderer = renderer();

        let html = renderer
            .render_receipt_modal(&ReceiptPreview::Available {
                url: "https://storage.test/a.jpg".to_string(),
                title: "Justificatif",
                image_width: 400,
            })
            .expect("modal renders");
        assert!(html.contains("Justificatif"));
        assert!(html.contains("width=\"400\""));

        let html = renderer.render_receipt_modal(&ReceiptPreview::Missing).expect("modal renders");
        assert!(html.contains("Justificatif"));
        assert!(html.contains("Aucun justificatif"));
        assert!(!html.contains("<img"));
    }
}

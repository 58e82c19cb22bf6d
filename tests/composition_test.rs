mod common;

use std::cell::Cell;

use common::{complete_source, item, overlay_listing, page_texts, sample_draft, template_with_page_attributes};
use studio_invoice::{
    assembler::PdfAssembler,
    configuration::Configuration,
    error::ErrorKind,
    generator::{GenerationState, InvoicePdfGenerator},
    invoice::{InvoiceDraft, InvoiceForm},
    templates::{MemoryTemplateSource, TemplateKind},
};
use time::OffsetDateTime;

fn assembler(source: MemoryTemplateSource) -> PdfAssembler<MemoryTemplateSource> {
    PdfAssembler::new(source, Configuration::default()).with_timestamp(OffsetDateTime::UNIX_EPOCH)
}

#[tokio::test]
async fn pages_follow_the_fixed_plan() {
    let bytes = assembler(complete_source()).compose(&sample_draft()).await.unwrap();
    let texts = page_texts(&bytes);

    assert_eq!(texts.len(), 5);
    assert_eq!(texts[0], "front 0");
    assert_eq!(texts[1], "front 1");
    assert!(texts[2].starts_with("estimate 0 | PHOTOGRAPHY"));
    assert!(texts[3].starts_with("deliverable 0 | Two Albums"));
    assert_eq!(texts[4], "last 0");
}

#[tokio::test]
async fn estimate_page_lists_groups_rows_and_total() {
    let bytes = assembler(complete_source()).compose(&sample_draft()).await.unwrap();

    similar_asserts::assert_eq!(
        overlay_listing(&bytes, 3),
        [
            "InvoiceF0 26 160 870 PHOTOGRAPHY",
            "InvoiceF0 26 175 825 Candid",
            "InvoiceF0 26 633 825 2",
            "InvoiceF0 26 175 788 Drone",
            "InvoiceF0 26 633 788 1",
            "InvoiceF0 26 160 731 VIDEO",
            "InvoiceF0 26 175 686 Highlights",
            "InvoiceF0 26 633 686 1",
            "InvoiceF0 26 260 629 TOTAL (THREE DAYS)",
            "InvoiceF1 26 310 594 2,500",
        ]
        .join("\n")
    );
}

#[tokio::test]
async fn deliverables_page_centers_each_deliverable() {
    let bytes = assembler(complete_source()).compose(&sample_draft()).await.unwrap();

    similar_asserts::assert_eq!(
        overlay_listing(&bytes, 4),
        [
            "InvoiceF0 32 316 750 Two Albums",
            "InvoiceF0 32 300 695 Wedding Prints",
        ]
        .join("\n")
    );
}

#[tokio::test]
async fn long_invoices_still_have_five_pages() {
    let mut draft = sample_draft();
    draft.items = (0..60)
        .map(|index| item(&format!("Service {index}"), 1.0, 100.0, &format!("Category {}", index % 7)))
        .collect();
    draft.deliverables = (0..40).map(|index| format!("Deliverable {index}")).collect();
    draft.days_of_shoot = 12;

    let bytes = assembler(complete_source()).compose(&draft).await.unwrap();
    assert_eq!(page_texts(&bytes).len(), 5);
    assert!(overlay_listing(&bytes, 3).contains("TOTAL (12 DAYS)"));
    assert!(overlay_listing(&bytes, 3).ends_with("6,000"));
}

#[tokio::test]
async fn identical_drafts_give_identical_documents() {
    let assembler = assembler(complete_source());
    let first = assembler.compose(&sample_draft()).await.unwrap();
    let second = assembler.compose(&sample_draft()).await.unwrap();
    assert!(first == second);

    // Without a fixed timestamp only the metadata may differ
    let assembler = PdfAssembler::new(complete_source(), Configuration::default());
    let first = assembler.compose(&sample_draft()).await.unwrap();
    let second = assembler.compose(&sample_draft()).await.unwrap();
    assert_eq!(page_texts(&first), page_texts(&second));
}

#[tokio::test]
async fn compressed_documents_keep_their_pages_and_text() {
    let configuration = Configuration {
        compress: true,
        title: Some("Reception".into()),
        ..Configuration::default()
    };
    let assembler = PdfAssembler::new(complete_source(), configuration).with_timestamp(OffsetDateTime::UNIX_EPOCH);
    let bytes = assembler.compose(&sample_draft()).await.unwrap();

    assert_eq!(page_texts(&bytes).len(), 5);
    assert!(overlay_listing(&bytes, 3).ends_with("InvoiceF1 26 310 594 2,500"));
}

#[tokio::test]
async fn missing_template_fails_without_notification() {
    let source = MemoryTemplateSource::new()
        .with_template(TemplateKind::Front, template_with_page_attributes(2, "front"))
        .with_template(TemplateKind::Deliverable, template_with_page_attributes(1, "deliverable"))
        .with_template(TemplateKind::Last, template_with_page_attributes(1, "last"));
    let generator = InvoicePdfGenerator::new(assembler(source));
    let notifications = Cell::new(0);

    let error = generator
        .generate(&sample_draft(), |_| notifications.set(notifications.get() + 1))
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::ResourceLoad);
    assert_eq!(notifications.get(), 0);
    assert!(matches!(generator.state(), GenerationState::Failed(_)));
}

#[tokio::test]
async fn malformed_template_is_a_parse_error() {
    let source = complete_source().with_template(TemplateKind::Estimate, b"not a pdf".to_vec());
    let error = assembler(source).compose(&sample_draft()).await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Parse);
}

#[tokio::test]
async fn front_template_with_a_single_page_is_a_composition_error() {
    let source = complete_source().with_template(TemplateKind::Front, template_with_page_attributes(1, "front"));
    let error = assembler(source).compose(&sample_draft()).await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Composition);
}

#[tokio::test]
async fn text_the_font_cannot_encode_fails_the_composition() {
    let mut draft = sample_draft();
    draft.deliverables = vec!["Album ₹5000".into()];
    let generator = InvoicePdfGenerator::new(assembler(complete_source()));
    let notifications = Cell::new(0);

    let error = generator
        .generate(&draft, |_| notifications.set(notifications.get() + 1))
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::Composition);
    assert!(error.context.contains("'₹'"));
    assert_eq!(notifications.get(), 0);
}

#[tokio::test]
async fn concurrent_triggers_generate_once() {
    let generator = InvoicePdfGenerator::new(assembler(complete_source()));
    let draft = sample_draft();
    let notifications = Cell::new(0);

    let (first, second) = tokio::join!(
        generator.generate(&draft, |_| notifications.set(notifications.get() + 1)),
        generator.generate(&draft, |_| notifications.set(notifications.get() + 1)),
    );
    let produced = [first.unwrap(), second.unwrap()]
        .into_iter()
        .flatten()
        .count();

    assert_eq!(produced, 1);
    assert_eq!(notifications.get(), 1);
    assert!(matches!(generator.state(), GenerationState::Ready(_)));
}

#[tokio::test]
async fn validated_form_is_composed() {
    let form: InvoiceForm = serde_json::from_str(
        r#"{
            "customerName": "Meera Iyer",
            "customerPhone": "9123456780",
            "customerAddress": "4 Temple Street",
            "invoiceDate": "2024-09-15",
            "eventName": "Reception",
            "eventDate": "2024-11-02",
            "daysOfShoot": 1,
            "items": [
                {"description": "Candid", "quantity": 4, "unitPrice": 12500, "type": "photography"}
            ],
            "deliverables": [{"name": "  Two Albums  "}]
        }"#,
    )
    .unwrap();
    let draft = InvoiceDraft::try_from(form).unwrap();

    let bytes = assembler(complete_source()).compose(&draft).await.unwrap();
    let estimate = overlay_listing(&bytes, 3);
    assert!(estimate.contains("TOTAL (ONE DAY)"));
    assert!(estimate.ends_with("50,000"));
    assert_eq!(overlay_listing(&bytes, 4), "InvoiceF0 32 316 750 Two Albums");
}

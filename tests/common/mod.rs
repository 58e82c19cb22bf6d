#![allow(dead_code)]

use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use studio_invoice::{
    invoice::{InvoiceDraft, LineItem},
    templates::{MemoryTemplateSource, TemplateKind},
};

/// A template of `page_count` 800x1000 pages, each showing `"<label> <index>"` in the font `F1`.
/// Every page carries its own media box and resources, nothing is inherited from the page tree.
pub fn template_with_page_attributes(page_count: usize, label: &str) -> Vec<u8> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for index in 0..page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(18)]),
                Operation::new("Td", vec![Object::Integer(40), Object::Integer(960)]),
                Operation::new("Tj", vec![Object::string_literal(format!("{label} {index}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = document.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(800),
                Object::Integer(1000),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count as i64),
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).unwrap();
    bytes
}

pub fn complete_source() -> MemoryTemplateSource {
    MemoryTemplateSource::new()
        .with_template(TemplateKind::Front, template_with_page_attributes(2, "front"))
        .with_template(TemplateKind::Estimate, template_with_page_attributes(1, "estimate"))
        .with_template(TemplateKind::Deliverable, template_with_page_attributes(1, "deliverable"))
        .with_template(TemplateKind::Last, template_with_page_attributes(1, "last"))
}

pub fn item(description: &str, quantity: f64, unit_price: f64, item_type: &str) -> LineItem {
    LineItem {
        description: description.into(),
        quantity,
        unit_price,
        item_type: item_type.into(),
    }
}

pub fn sample_draft() -> InvoiceDraft {
    InvoiceDraft {
        customer_name: "Meera Iyer".into(),
        customer_phone: "9123456780".into(),
        customer_address: "4 Temple Street, Madurai".into(),
        event_name: "Reception".into(),
        event_date: "2024-11-02".into(),
        days_of_shoot: 3,
        invoice_date: "2024-09-15".into(),
        items: vec![
            item("Candid", 2.0, 500.0, "Photography"),
            item("Highlights", 1.0, 1500.0, "Video"),
            item("Drone", 1.0, 0.0, "photography"),
        ],
        deliverables: vec!["Two Albums".into(), "Wedding Prints".into()],
    }
}

/// The text each page shows, decoded from the content streams of the pages in order.
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let document = Document::load_mem(bytes).unwrap();
    document
        .get_pages()
        .values()
        .map(|page_id| {
            let content = Content::decode(&document.get_page_content(*page_id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|operation| operation.operator == "Tj")
                .map(|operation| string_operand(&operation.operands[0]))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect()
}

/// One line per overlay text of the page (1-based): font, size, position and text.
pub fn overlay_listing(bytes: &[u8], page_number: u32) -> String {
    let document = Document::load_mem(bytes).unwrap();
    let page_id = document.get_pages()[&page_number];
    let content = Content::decode(&document.get_page_content(page_id).unwrap()).unwrap();

    let mut lines = Vec::new();
    let mut font = (String::new(), 0.0);
    let mut position = (0.0, 0.0);
    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                font = (
                    String::from_utf8_lossy(operation.operands[0].as_name().unwrap()).into_owned(),
                    operation.operands[1].as_float().unwrap(),
                );
            }
            "Td" => {
                position = (
                    operation.operands[0].as_float().unwrap(),
                    operation.operands[1].as_float().unwrap(),
                );
            }
            "Tj" if font.0.starts_with("InvoiceF") => {
                lines.push(format!(
                    "{} {} {} {} {}",
                    font.0,
                    font.1,
                    position.0,
                    position.1,
                    string_operand(&operation.operands[0])
                ));
            }
            _ => {}
        }
    }
    lines.join("\n")
}

/// The standard fonts are WinAnsi encoded, which is Latin-1 for the text of these tests.
fn string_operand(operand: &Object) -> String {
    operand.as_str().unwrap().iter().map(|&byte| byte as char).collect()
}

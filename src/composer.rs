use crate::error::ContextError;
use crate::fonts::OverlayFont;
use crate::formatting::{format_amount, format_days_of_shoot};
use crate::grouping::group_line_items;
use crate::invoice::InvoiceDraft;
use crate::pdf::PdfDocument;
use crate::templates::{TemplateKind, TemplateSet};

/// The color of every overlay text, a dark green-grey.
pub const TEXT_COLOR: [f32; 3] = [47.0 / 255.0, 58.0 / 255.0, 51.0 / 255.0];

pub const ESTIMATE_FONT_SIZE: f32 = 26.0;
/// Where the cursor of the estimate page starts.
pub const ESTIMATE_ORIGIN_Y: f32 = 870.0;
/// Left margin of the group titles.
pub const GROUP_TITLE_X: f32 = 160.0;
pub const ROW_DESCRIPTION_X: f32 = 175.0;
/// The quantities are right-aligned against this column.
pub const ROW_QUANTITY_RIGHT_X: f32 = 646.0;
pub const GROUP_HEADING_STEP: f32 = 45.0;
pub const ROW_STEP: f32 = 37.0;
pub const PARAGRAPH_GAP: f32 = 20.0;
pub const TOTAL_LABEL_X: f32 = 260.0;
/// Between the total label and the amount below it.
pub const TOTAL_STEP: f32 = 35.0;
pub const TOTAL_AMOUNT_X: f32 = 310.0;

pub const DELIVERABLE_FONT_SIZE: f32 = 32.0;
pub const DELIVERABLE_ORIGIN_Y: f32 = 750.0;
/// The deliverables are centered within this width, starting from the left edge of the page.
pub const DELIVERABLE_CONTENT_WIDTH: f32 = 800.0;
pub const DELIVERABLE_STEP: f32 = 55.0;

/// Which of the two overlay fonts a text is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    /// The regular serif used for everything but the total amount.
    Body,
    /// The bold sans-serif of the total amount.
    Total,
}

/// A text to draw, with its baseline origin in page points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub position: [f32; 2],
    pub font_size: f32,
    pub role: FontRole,
}

impl TextPlacement {
    fn body(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            position: [x, y],
            font_size,
            role: FontRole::Body,
        }
    }
}

/// The two fonts the overlays are drawn with.
#[derive(Debug, Clone)]
pub struct OverlayFonts {
    pub body: OverlayFont,
    pub total: OverlayFont,
}

/// Lay the grouped line items, the day count and the total out on the estimate page.
///
/// A cursor descends from the top of the page: every group title takes a heading step,
/// every row a row step and every group is followed by a paragraph gap. Nothing wraps or
/// breaks across pages, so a long enough estimate runs off the bottom of the page.
pub fn layout_estimate(draft: &InvoiceDraft, body_font: &OverlayFont) -> Vec<TextPlacement> {
    let mut placements = Vec::new();
    let mut cursor_y = ESTIMATE_ORIGIN_Y;

    for group in group_line_items(&draft.items) {
        placements.push(TextPlacement::body(
            group.title,
            GROUP_TITLE_X,
            cursor_y,
            ESTIMATE_FONT_SIZE,
        ));
        cursor_y -= GROUP_HEADING_STEP;

        for (description, quantity) in group.rows {
            placements.push(TextPlacement::body(
                description,
                ROW_DESCRIPTION_X,
                cursor_y,
                ESTIMATE_FONT_SIZE,
            ));
            let quantity_width = body_font.width_of_text_at_size(&quantity, ESTIMATE_FONT_SIZE);
            placements.push(TextPlacement::body(
                quantity,
                ROW_QUANTITY_RIGHT_X - quantity_width,
                cursor_y,
                ESTIMATE_FONT_SIZE,
            ));
            cursor_y -= ROW_STEP;
        }
        cursor_y -= PARAGRAPH_GAP;
    }

    placements.push(TextPlacement::body(
        format!("TOTAL ({})", format_days_of_shoot(draft.days_of_shoot)),
        TOTAL_LABEL_X,
        cursor_y,
        ESTIMATE_FONT_SIZE,
    ));
    cursor_y -= TOTAL_STEP;
    placements.push(TextPlacement {
        text: format_amount(draft.total()),
        position: [TOTAL_AMOUNT_X, cursor_y],
        font_size: ESTIMATE_FONT_SIZE,
        role: FontRole::Total,
    });

    placements
}

/// Lay the deliverables out one per line, each centered horizontally.
pub fn layout_deliverables(deliverables: &[String], body_font: &OverlayFont) -> Vec<TextPlacement> {
    let mut cursor_y = DELIVERABLE_ORIGIN_Y;

    deliverables
        .iter()
        .map(|deliverable| {
            let text_width = body_font.width_of_text_at_size(deliverable, DELIVERABLE_FONT_SIZE);
            let placement = TextPlacement::body(
                deliverable.as_str(),
                (DELIVERABLE_CONTENT_WIDTH - text_width) / 2.0,
                cursor_y,
                DELIVERABLE_FONT_SIZE,
            );
            cursor_y -= DELIVERABLE_STEP;
            placement
        })
        .collect()
}

/// Copy the template pages into the document in their fixed order (cover and about
/// pages, estimate, deliverables, closing page) and draw the overlays on the copied
/// estimate and deliverables pages.
pub fn compose_pages(
    document: &mut PdfDocument,
    templates: &TemplateSet,
    fonts: OverlayFonts,
    draft: &InvoiceDraft,
) -> Result<(), ContextError> {
    let estimate_placements = layout_estimate(draft, &fonts.body);
    let deliverable_placements = layout_deliverables(&draft.deliverables, &fonts.body);

    let body_font_index = document.add_font(fonts.body);
    let total_font_index = document.add_font(fonts.total);

    document.copy_pages(templates.get(TemplateKind::Front), &[0, 1])?;
    let estimate_page = single_page(document.copy_pages(templates.get(TemplateKind::Estimate), &[0])?)?;
    let deliverable_page = single_page(document.copy_pages(templates.get(TemplateKind::Deliverable), &[0])?)?;
    document.copy_pages(templates.get(TemplateKind::Last), &[0])?;

    for (page_index, placements) in [
        (estimate_page, estimate_placements),
        (deliverable_page, deliverable_placements),
    ] {
        for placement in placements {
            let font_index = match placement.role {
                FontRole::Body => body_font_index,
                FontRole::Total => total_font_index,
            };
            document.write_text_to_page(
                page_index,
                TEXT_COLOR,
                &placement.text,
                font_index,
                placement.font_size,
                placement.position,
            )?;
        }
    }

    Ok(())
}

fn single_page(page_indices: Vec<usize>) -> Result<usize, ContextError> {
    page_indices
        .first()
        .copied()
        .ok_or_else(|| ContextError::composition("No page was copied"))
}

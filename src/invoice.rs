use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};

/// One billable service or product row of an invoice.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Free-text category label, compared case-insensitively when grouping.
    #[serde(rename = "type")]
    pub item_type: String,
}

impl LineItem {
    /// The amount billed for this row.
    pub fn amount(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// The validated invoice handed to the composition core.
///
/// Values of this type are expected to come out of [`InvoiceForm`]'s conversion, which
/// enforces that there is at least one item, that every quantity is at least one and
/// that no unit price is negative. The composition itself never re-validates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub event_name: String,
    pub event_date: String,
    pub days_of_shoot: i64,
    pub invoice_date: String,
    pub items: Vec<LineItem>,
    /// Trimmed, non-empty deliverable names in display order.
    pub deliverables: Vec<String>,
}

impl InvoiceDraft {
    /// The invoice total, the sum of `quantity * unit_price` over every line item.
    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::amount).sum()
    }
}

/// A single deliverable as it is typed into the form.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableField {
    pub name: String,
}

/// The raw invoice form, as submitted by the user and before any validation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceForm {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub invoice_date: String,
    pub event_name: String,
    pub event_date: String,
    pub days_of_shoot: i64,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub deliverables: Vec<DeliverableField>,
}

impl InvoiceForm {
    /// Read the invoice form from a JSON file.
    pub fn from_path(form_path: &Path) -> Result<InvoiceForm, ContextError> {
        let form_content = std::fs::read_to_string(form_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Unable to read the invoice form {:?}", form_path),
                &error,
            )
        })?;
        let form: InvoiceForm = serde_json::from_str(&form_content).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Validation,
                format!("Unable to parse the invoice form {:?}", form_path),
                &error,
            )
        })?;

        Ok(form)
    }

    /// Collect every problem with the form, in field order. An empty list means the form is valid.
    pub fn validation_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut check = |condition: bool, field: String, message: &str| {
            if !condition {
                issues.push(ValidationIssue {
                    field,
                    message: message.to_string(),
                });
            }
        };

        check(
            self.customer_name.chars().count() >= 2,
            "customerName".into(),
            "Customer name is required",
        );
        check(
            self.customer_phone.len() == 10,
            "customerPhone".into(),
            "Phone number should be 10 digits",
        );
        check(
            self.customer_phone.chars().all(|character| character.is_ascii_digit()),
            "customerPhone".into(),
            "Phone number must contain only digits",
        );
        check(
            self.customer_address.chars().count() >= 5,
            "customerAddress".into(),
            "Address is required",
        );
        check(
            !self.invoice_date.is_empty(),
            "invoiceDate".into(),
            "Date is required",
        );
        check(
            self.event_name.chars().count() >= 3,
            "eventName".into(),
            "Event Name is required",
        );
        check(
            !self.event_date.is_empty(),
            "eventDate".into(),
            "Event Date is required",
        );
        check(
            self.days_of_shoot >= 1,
            "daysOfShoot".into(),
            "Days of shoot must be at least 1",
        );
        check(
            !self.items.is_empty(),
            "items".into(),
            "At least one item is required",
        );

        for (index, item) in self.items.iter().enumerate() {
            check(
                !item.description.is_empty(),
                format!("items.{index}.description"),
                "Description is required",
            );
            check(
                item.quantity.is_finite() && item.quantity >= 1.0,
                format!("items.{index}.quantity"),
                "Quantity must be at least 1",
            );
            check(
                item.unit_price.is_finite() && item.unit_price >= 0.0,
                format!("items.{index}.unitPrice"),
                "Price must be a positive number",
            );
            check(
                !item.item_type.is_empty(),
                format!("items.{index}.type"),
                "Type is required",
            );
        }

        for (index, deliverable) in self.deliverables.iter().enumerate() {
            check(
                deliverable.name.chars().count() >= 3 && !deliverable.name.trim().is_empty(),
                format!("deliverables.{index}.name"),
                "Deliverable must contain at least 3 characters",
            );
        }

        issues
    }
}

/// A single problem found while validating an [`InvoiceForm`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The path of the offending field, such as `items.0.quantity`.
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: {}", self.field, self.message)
    }
}

impl TryFrom<InvoiceForm> for InvoiceDraft {
    type Error = ContextError;

    fn try_from(form: InvoiceForm) -> Result<Self, Self::Error> {
        let issues = form.validation_issues();
        if !issues.is_empty() {
            let listing = issues
                .iter()
                .map(ValidationIssue::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ContextError::with_context(
                ErrorKind::Validation,
                format!("The invoice form is invalid ({listing})"),
            ));
        }

        Ok(InvoiceDraft {
            customer_name: form.customer_name,
            customer_phone: form.customer_phone,
            customer_address: form.customer_address,
            event_name: form.event_name,
            event_date: form.event_date,
            days_of_shoot: form.days_of_shoot,
            invoice_date: form.invoice_date,
            items: form.items,
            deliverables: form
                .deliverables
                .into_iter()
                .map(|deliverable| deliverable.name.trim().to_string())
                .collect(),
        })
    }
}

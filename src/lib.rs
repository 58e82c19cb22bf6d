//! Studio Invoice composes the PDF invoices of a photography studio. An invoice is assembled out of
//! four pre-designed template documents: their pages are copied in a fixed order into a new document,
//! and the grouped line items, the total and the deliverables of the invoice are drawn over two of them.
//!
//! The entry point is the `InvoicePdfGenerator`, which runs a `PdfAssembler` at most once for an invoice
//! and notifies the caller when the document is ready to be downloaded. The nitty-gritty details of the
//! PDF manipulation are hidden in the `PdfDocument` struct, built on top of `lopdf`.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

/// The module where the invoice data is presented.
///
/// `InvoiceForm` is the raw form as it is submitted, which is validated once and converted into
/// an `InvoiceDraft` through `TryFrom`. Only drafts are accepted by the rest of the crate.
pub mod invoice;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// Every error carries an `ErrorKind`, so that a template which could not be fetched can be told apart
/// from one which could not be parsed or from a failure while the pages were being assembled. If an error
/// happened in a function which was called inside a function of this library, then the user can expect to
/// also obtain information about this propagated error.
pub mod error;

/// Grouping of the line items by category.
pub mod grouping;

/// Text formatting of the day counts, quantities and amounts.
pub mod formatting;

/// The fonts the overlay text is drawn with, either one of the standard fonts of every PDF reader
/// or a TrueType font embedded into the document.
pub mod fonts;

/// The loading of the four template documents.
///
/// The templates are fetched through a `TemplateSource`, which can be a directory or memory, and
/// they are all loaded concurrently: either all four are parsed or the loading fails as a whole.
pub mod templates;

/// The module where the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. For it, I have implemented different convenience functions
/// such as `copy_pages`, `add_font`, `write_text_to_page`, `write_all` and `save_to_bytes` which allow the end user to interact
/// with a PDF document in a meaningful way, while keeping all the complexity hidden below a curtain of private methods.
///
/// Pages copied from another document bring along every object they refer to, and the attributes they
/// inherit from their page tree are set on them directly, so that they look the same once copied.
pub mod pdf;

/// The fixed page plan of an invoice and the layout of the text drawn over the estimate and deliverables pages.
pub mod composer;

/// The `PdfAssembler`, which turns an invoice draft into the bytes of its PDF document.
pub mod assembler;

/// The `InvoicePdfGenerator`, which guards against generating the document of an invoice twice.
pub mod generator;

/// The JSON configuration of the command line interface.
pub mod configuration;

#[cfg(test)]
mod test_support;

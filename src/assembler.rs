use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use time::OffsetDateTime;

use crate::composer::{compose_pages, OverlayFonts};
use crate::configuration::Configuration;
use crate::error::{ContextError, ErrorKind};
use crate::invoice::InvoiceDraft;
use crate::pdf::{DocumentMetadata, PdfDocument};
use crate::templates::{load_templates, TemplateSource};

/// The name the composed document is offered for download under.
pub const SUGGESTED_FILE_NAME: &str = "final_document.pdf";

/// A composed PDF, ready to be downloaded. Cloning it shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct PdfHandle {
    bytes: Arc<[u8]>,
    file_name: String,
}

impl std::fmt::Debug for PdfHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PdfHandle")
            .field("file_name", &self.file_name)
            .field("length", &self.bytes.len())
            .finish()
    }
}

impl PdfHandle {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The suggested file name of the download.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Write the document to the given path.
    pub fn save_to(&self, file_path: &Path) -> Result<(), ContextError> {
        std::fs::write(file_path, &self.bytes).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Io,
                format!("Failed to write the PDF document to {:?}", file_path),
                &error,
            )
        })
    }

    /// Write the document into the directory under its suggested file name, returning its path.
    pub fn save_in_directory(&self, directory: &Path) -> Result<PathBuf, ContextError> {
        let file_path = directory.join(&self.file_name);
        self.save_to(&file_path)?;
        Ok(file_path)
    }
}

/// Turns invoice drafts into PDF documents built out of the templates of a source.
///
/// The assembler holds no state from one composition to the next: each call loads the
/// templates again and builds a brand new document. With a fixed timestamp the same
/// draft always gives the same bytes.
pub struct PdfAssembler<S> {
    source: S,
    configuration: Configuration,
    timestamp: Option<OffsetDateTime>,
}

impl<S: TemplateSource> PdfAssembler<S> {
    pub fn new(source: S, configuration: Configuration) -> Self {
        Self {
            source,
            configuration,
            timestamp: None,
        }
    }

    /// Stamp the documents with the given creation date instead of the current time.
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Compose the PDF document of the draft and serialize it.
    pub async fn compose(&self, draft: &InvoiceDraft) -> Result<Vec<u8>, ContextError> {
        let templates = load_templates(&self.source).await?;
        let fonts = OverlayFonts {
            body: self.configuration.body_font.load()?,
            total: self.configuration.total_font.load()?,
        };

        let mut pdf_document = PdfDocument::new();
        compose_pages(&mut pdf_document, &templates, fonts, draft)?;

        let metadata = DocumentMetadata {
            title: self
                .configuration
                .title
                .clone()
                .unwrap_or_else(|| format!("Invoice - {}", draft.customer_name)),
            author: self.configuration.author.clone(),
            creation_date: self.timestamp.unwrap_or_else(OffsetDateTime::now_utc),
        };
        pdf_document.write_all(&metadata)?;
        if self.configuration.compress {
            pdf_document.optimize();
        }
        let pdf_document_bytes = pdf_document.save_to_bytes()?;

        log::info!(
            "Composed a {} pages document of {} bytes for {:?}",
            pdf_document.page_count(),
            pdf_document_bytes.len(),
            draft.event_name
        );
        Ok(pdf_document_bytes)
    }

    /// Compose the PDF document of the draft and wrap it under the configured file name.
    pub async fn compose_handle(&self, draft: &InvoiceDraft) -> Result<PdfHandle, ContextError> {
        let bytes = self.compose(draft).await?;
        Ok(PdfHandle::new(bytes, self.configuration.output_file_name.clone()))
    }
}

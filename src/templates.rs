use std::{collections::HashMap, path::PathBuf};

use crate::error::{ContextError, ErrorKind};

/// The four pre-designed documents every invoice is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
    /// Cover page followed by the about page.
    Front,
    /// The page receiving the grouped line items and the total.
    Estimate,
    /// The page receiving the list of deliverables.
    Deliverable,
    /// The closing page.
    Last,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::Front,
        TemplateKind::Estimate,
        TemplateKind::Deliverable,
        TemplateKind::Last,
    ];

    /// The stable name the template is stored under.
    pub fn file_name(self) -> &'static str {
        match self {
            TemplateKind::Front => "front.pdf",
            TemplateKind::Estimate => "estimate.pdf",
            TemplateKind::Deliverable => "deliverable.pdf",
            TemplateKind::Last => "last.pdf",
        }
    }

    /// How many pages the composition reads out of the template. A template with fewer
    /// pages is rejected as soon as it is loaded.
    pub fn minimum_page_count(self) -> usize {
        match self {
            TemplateKind::Front => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.file_name())
    }
}

/// Somewhere the raw bytes of the templates can be fetched from.
///
/// Implementations report a missing or unreachable template with an error; whatever
/// kind they give it, the loader reports it as [`ErrorKind::ResourceLoad`].
#[async_trait::async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, kind: TemplateKind) -> Result<Vec<u8>, ContextError>;
}

/// Templates stored as `front.pdf`, `estimate.pdf`, `deliverable.pdf` and `last.pdf` in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateSource {
    directory: PathBuf,
}

impl DirectoryTemplateSource {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait::async_trait]
impl TemplateSource for DirectoryTemplateSource {
    async fn fetch(&self, kind: TemplateKind) -> Result<Vec<u8>, ContextError> {
        let template_path = self.directory.join(kind.file_name());
        tokio::fs::read(&template_path).await.map_err(|error| {
            ContextError::with_error(
                ErrorKind::ResourceLoad,
                format!("Unable to read the template {:?}", template_path),
                &error,
            )
        })
    }
}

/// Templates already held in memory, for instance compiled in with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateSource {
    templates: HashMap<TemplateKind, Vec<u8>>,
}

impl MemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bytes of a template, replacing any previous ones.
    pub fn with_template(mut self, kind: TemplateKind, bytes: Vec<u8>) -> Self {
        self.templates.insert(kind, bytes);
        self
    }
}

#[async_trait::async_trait]
impl TemplateSource for MemoryTemplateSource {
    async fn fetch(&self, kind: TemplateKind) -> Result<Vec<u8>, ContextError> {
        self.templates.get(&kind).cloned().ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::ResourceLoad,
                format!("The template {} has not been provided", kind),
            )
        })
    }
}

/// The four parsed templates of one composition run.
#[derive(Debug)]
pub struct TemplateSet {
    pub front: lopdf::Document,
    pub estimate: lopdf::Document,
    pub deliverable: lopdf::Document,
    pub last: lopdf::Document,
}

impl TemplateSet {
    pub fn get(&self, kind: TemplateKind) -> &lopdf::Document {
        match kind {
            TemplateKind::Front => &self.front,
            TemplateKind::Estimate => &self.estimate,
            TemplateKind::Deliverable => &self.deliverable,
            TemplateKind::Last => &self.last,
        }
    }
}

/// Fetch and parse the four templates concurrently.
///
/// The loads do not wait on one another, and the first failure is the result of the
/// whole batch: either all four templates come back or none does.
pub async fn load_templates<S>(source: &S) -> Result<TemplateSet, ContextError>
where
    S: TemplateSource + ?Sized,
{
    let (front, estimate, deliverable, last) = tokio::try_join!(
        load_template(source, TemplateKind::Front),
        load_template(source, TemplateKind::Estimate),
        load_template(source, TemplateKind::Deliverable),
        load_template(source, TemplateKind::Last),
    )?;

    Ok(TemplateSet {
        front,
        estimate,
        deliverable,
        last,
    })
}

async fn load_template<S>(source: &S, kind: TemplateKind) -> Result<lopdf::Document, ContextError>
where
    S: TemplateSource + ?Sized,
{
    let bytes = source
        .fetch(kind)
        .await
        .map_err(|error| ContextError {
            kind: ErrorKind::ResourceLoad,
            ..error
        })?;
    log::debug!("Fetched the template {} ({} bytes)", kind, bytes.len());

    let document = tokio::task::spawn_blocking(move || lopdf::Document::load_mem(&bytes))
        .await
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Parse,
                format!("The parsing of the template {} was interrupted", kind),
                &error,
            )
        })?
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Parse,
                format!("Unable to parse the template {}", kind),
                &error,
            )
        })?;

    let page_count = document.get_pages().len();
    if page_count < kind.minimum_page_count() {
        return Err(ContextError::composition(format!(
            "The template {} has {} pages, at least {} are needed",
            kind,
            page_count,
            kind.minimum_page_count()
        )));
    }
    log::debug!("Parsed the template {} with {} pages", kind, page_count);

    Ok(document)
}

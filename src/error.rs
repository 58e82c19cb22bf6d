use serde::{Deserialize, Serialize};

/// The family an error belongs to, so that callers can tell a missing template
/// apart from a malformed one or from a failure while assembling the pages.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// A template could not be fetched from its source.
    ResourceLoad,
    /// A fetched template (or font) is not a well-formed document.
    Parse,
    /// Copying pages, drawing text or serializing the output failed.
    Composition,
    /// The invoice form did not pass the boundary validation.
    Validation,
    /// The configuration file could not be read or understood.
    Configuration,
    /// Reading or writing a file on behalf of the caller failed.
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::ResourceLoad => "resource load error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Composition => "composition error",
            ErrorKind::Validation => "validation error",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Io => "I/O error",
        };
        write!(formatter, "{name}")
    }
}

/// A struct that represents an error with a kind, a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` of the given kind with the given context.
    pub fn with_context<S: Into<String>>(kind: ErrorKind, context: S) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` of the given kind with the given context and source error.
    pub fn with_error<S: Into<String>>(
        kind: ErrorKind,
        context: S,
        error: &dyn std::error::Error,
    ) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }

    /// Shorthand for the errors raised while assembling the output document.
    pub(crate) fn composition<S: Into<String>>(context: S) -> ContextError {
        ContextError::with_context(ErrorKind::Composition, context)
    }
}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

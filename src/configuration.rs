use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assembler::SUGGESTED_FILE_NAME;
use crate::error::{ContextError, ErrorKind};
use crate::fonts::{FontSource, StandardFont};

/// The settings of a composition run, as read from a JSON file. Every field is optional.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// The directory holding `front.pdf`, `estimate.pdf`, `deliverable.pdf` and `last.pdf`.
    pub templates_directory: PathBuf,
    pub body_font: FontSource,
    pub total_font: FontSource,
    pub output_file_name: String,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Prune, renumber and compress the objects of the output before saving it.
    pub compress: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            templates_directory: PathBuf::from("templates"),
            body_font: FontSource::Standard(StandardFont::TimesRoman),
            total_font: FontSource::Standard(StandardFont::HelveticaBold),
            output_file_name: SUGGESTED_FILE_NAME.to_string(),
            title: None,
            author: None,
            compress: false,
        }
    }
}

impl Configuration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents =
            std::fs::read_to_string(configuration_file_path).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!("Failed to read the configuration file {:?}", configuration_file_path),
                    &error,
                )
            })?;
        let configuration: Configuration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    "Failed to parse the configuration file",
                    &error,
                )
            })?;

        Ok(configuration)
    }
}

//! Output formatting for command results.
//!
//! Results are rendered as JSON or YAML and written to stdout. A closed
//! stdout (for example `vinfra volume list | head -1`) surfaces as
//! [`VinfraError::BrokenPipe`].

use std::io::Write;
use std::str::FromStr;

use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};

use crate::error::VinfraError;

pub const JSON: &str = "json";
pub const YAML: &str = "yaml";

/// Error types that can occur during formatting operations
#[derive(Debug, thiserror::Error)]
pub enum FormattingError {
    /// Error when an unsupported output format is requested
    #[error("invalid output format {0}")]
    UnsupportedOutputFormat(String),

    #[error("JSON serialization error: {0}")]
    JsonSerializationError(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    YamlSerializationError(#[from] serde_yaml::Error),
}

impl From<FormattingError> for VinfraError {
    fn from(error: FormattingError) -> Self {
        match error {
            FormattingError::UnsupportedOutputFormat(_) => VinfraError::Validation(error.to_string()),
            other => VinfraError::Client(other.to_string()),
        }
    }
}

/// Enum representing the supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// Returns all supported format names
    pub fn names() -> Vec<&'static str> {
        OutputFormat::iter().map(|format| format.name()).collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Json => JSON,
            OutputFormat::Yaml => YAML,
        }
    }

    /// Render any serializable value in this format
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, FormattingError> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => {
                let yaml = serde_yaml::to_string(value)?;
                Ok(yaml.trim_end().to_string())
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = FormattingError;

    fn from_str(format_str: &str) -> Result<OutputFormat, FormattingError> {
        let normalized_format = format_str.to_lowercase();
        match normalized_format.as_str() {
            JSON => Ok(OutputFormat::Json),
            YAML => Ok(OutputFormat::Yaml),
            _ => Err(FormattingError::UnsupportedOutputFormat(normalized_format)),
        }
    }
}

/// Write one rendered result to `out`, followed by a newline
pub fn write_output<W: Write, T: Serialize + ?Sized>(
    out: &mut W,
    format: OutputFormat,
    value: &T,
) -> Result<(), VinfraError> {
    let text = format.render(value)?;
    writeln!(out, "{}", text)?;
    out.flush()?;
    Ok(())
}

/// Write one rendered result to stdout
pub fn print_output<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<(), VinfraError> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_output(&mut lock, format, value)
}

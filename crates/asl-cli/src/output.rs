//! Output formatting for CLI commands.
//!
//! Supports table (`key value` lines) and JSON output formats, plus
//! user-supplied record templates.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value in human-readable form.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Records returned by a search, as attribute snapshots.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RecordList {
    /// One sorted attribute map per record.
    pub records: Vec<BTreeMap<String, String>>,
}

impl TableDisplay for RecordList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        for record in &self.records {
            for (key, value) in record {
                writeln!(writer, "{key} {value}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

/// Renders `template` against `record`.
///
/// `{Key}` is replaced with the attribute value, or nothing when the record
/// lacks it. `{{` and `}}` produce literal braces.
///
/// # Errors
///
/// Returns [`CliError::Format`] for an unterminated or stray brace.
pub fn render_template(template: &str, record: &BTreeMap<String, String>) -> Result<String, CliError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(CliError::Format(format!(
                                "unterminated placeholder in format: {template}"
                            )));
                        }
                        Some(k) => key.push(k),
                    }
                }
                if let Some(value) = record.get(&key) {
                    out.push_str(value);
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(CliError::Format(format!("single '}}' in format: {template}")));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

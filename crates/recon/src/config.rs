use serde::Deserialize;

use crate::error::ReconError;
use crate::report::ReportFormat;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A `.recon.toml` run description: which two files to compare and how to
/// render the result. File paths are relative to the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub source: TableConfig,
    pub target: TableConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "reconciliation".into()
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// How to read one side. Also used directly by callers that load CSV text
/// without a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub file: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Columns declared as dates in addition to any whose name contains "date".
    #[serde(default)]
    pub date_columns: Vec<String>,
}

fn default_delimiter() -> char {
    ','
}

impl TableConfig {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            delimiter: default_delimiter(),
            date_columns: Vec::new(),
        }
    }

    pub fn delimiter_byte(&self) -> Result<u8, ReconError> {
        if self.delimiter.is_ascii() && !matches!(self.delimiter, '"' | '\n' | '\r') {
            Ok(self.delimiter as u8)
        } else {
            Err(ReconError::ConfigValidation(format!(
                "delimiter {:?} must be a single ASCII character other than a quote or newline",
                self.delimiter
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Report mode name (`json`, `csv`, `html`).
    #[serde(default = "default_format")]
    pub format: String,
    /// Write the report here instead of stdout.
    #[serde(default)]
    pub path: Option<String>,
}

fn default_format() -> String {
    ReportFormat::default().as_str().into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            path: None,
        }
    }
}

impl OutputConfig {
    pub fn report_format(&self) -> Result<ReportFormat, ReconError> {
        self.format.parse()
    }
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(s: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(s).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ReconError> {
        for (side, table) in [("source", &self.source), ("target", &self.target)] {
            if table.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{side}.file must not be empty"
                )));
            }
            table.delimiter_byte()?;
            if let Some(blank) = table.date_columns.iter().find(|c| c.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "{side}.date_columns contains a blank name: {blank:?}"
                )));
            }
        }

        self.output.report_format()?;
        Ok(())
    }
}

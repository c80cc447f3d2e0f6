//! CLI Exit Code Registry
//!
//! Single source of truth for `tabrecon` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | Differences found (only with `--fail-on-diff`)      |
//! | 2    | Usage error (bad args, missing input)               |
//! | 3    | Schema mismatch (no common columns, malformed CSV)  |
//! | 4    | Unsupported report format                           |
//! | 5    | Input/output error (cannot read or write a file)    |
//! | 6    | Invalid run config                                  |

use tabrecon_core::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Differences found. Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_DIFFS: u8 = 1;

/// Usage error - bad arguments, missing required inputs.
pub const EXIT_USAGE: u8 = 2;

/// Tables share no columns, or an input is structurally malformed.
pub const EXIT_SCHEMA_MISMATCH: u8 = 3;

/// Requested report format is not one of json, csv, html.
pub const EXIT_UNSUPPORTED_FORMAT: u8 = 4;

/// Cannot read an input or write the report.
pub const EXIT_IO: u8 = 5;

/// Run config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::SchemaMismatch(_) => EXIT_SCHEMA_MISMATCH,
        ReconError::UnsupportedFormat(_) => EXIT_UNSUPPORTED_FORMAT,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Io(_) => EXIT_IO,
    }
}

//! `tabrecon-core`: two-table normalization and reconciliation engine.
//!
//! Pure engine crate: receives already-parsed tables, returns missing rows,
//! discrepancies and a rendered report. No CLI or file IO.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;

pub use config::{ReconConfig, TableConfig};
pub use engine::{load_csv_pair, load_csv_table, reconcile_tables, run, run_with_mode};
pub use error::ReconError;
pub use model::{
    CellValue, Column, ColumnKind, Discrepancy, ReconOutcome, ReconSummary, Record, Table,
};
pub use normalize::{is_date_column, normalize};
pub use reconcile::reconcile;
pub use report::{render, render_as, DisplayContext, RenderedReport, ReportFormat};

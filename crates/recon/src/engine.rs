use crate::config::TableConfig;
use crate::error::ReconError;
use crate::model::{CellValue, Column, ColumnKind, ReconOutcome, Table};
use crate::normalize::normalize;
use crate::reconcile::reconcile;
use crate::report::{render_as, RenderedReport, ReportFormat};

/// Normalize both tables and reconcile them.
pub fn reconcile_tables(source: &Table, target: &Table) -> Result<ReconOutcome, ReconError> {
    let source = normalize(source);
    let target = normalize(target);
    reconcile(&source, &target)
}

/// Full pipeline: normalize, reconcile, render.
pub fn run(
    source: &Table,
    target: &Table,
    format: ReportFormat,
) -> Result<RenderedReport, ReconError> {
    let outcome = reconcile_tables(source, target)?;
    log::info!(
        "{} missing in target, {} missing in source, {} discrepancies",
        outcome.summary.missing_in_target,
        outcome.summary.missing_in_source,
        outcome.summary.discrepancies,
    );
    render_as(&outcome, format)
}

/// Like [`run`], with the mode given by name. An unknown name fails with
/// `UnsupportedFormat` before any table is touched.
pub fn run_with_mode(
    source: &Table,
    target: &Table,
    mode: &str,
) -> Result<RenderedReport, ReconError> {
    let format: ReportFormat = mode.parse()?;
    run(source, target, format)
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

/// Header plus raw cell text, before any column kind is decided.
struct RawCsv {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawCsv {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn has_values(&self, ci: usize) -> bool {
        self.rows.iter().any(|r| !r[ci].is_empty())
    }

    fn all_numeric(&self, ci: usize) -> bool {
        self.rows
            .iter()
            .all(|r| r[ci].is_empty() || parse_number(&r[ci]).is_some())
    }
}

fn read_csv(label: &str, csv_data: &str, config: &TableConfig) -> Result<RawCsv, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.delimiter_byte()?)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(format!("{label}: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ReconError::SchemaMismatch(format!("{label}: missing header row")));
    }

    for name in &config.date_columns {
        if !headers.iter().any(|h| h == name) {
            return Err(ReconError::SchemaMismatch(format!(
                "{label}: date column '{name}' not found"
            )));
        }
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| match e.kind() {
            csv::ErrorKind::UnequalLengths { .. } => {
                ReconError::SchemaMismatch(format!("{label}: record {}: {e}", i + 1))
            }
            _ => ReconError::Io(format!("{label}: {e}")),
        })?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    Ok(RawCsv { headers, rows })
}

/// Decide each column's kind. When `other` is given, a column both files
/// share gets one kind for both: `Date` if either side declares it, `Number`
/// only if every non-empty cell on both sides is numeric.
fn column_kinds(
    raw: &RawCsv,
    config: &TableConfig,
    other: Option<(&RawCsv, &TableConfig)>,
) -> Vec<ColumnKind> {
    raw.headers
        .iter()
        .enumerate()
        .map(|(ci, name)| {
            let mut sides = vec![(raw, ci, config)];
            if let Some((other_raw, other_config)) = other {
                if let Some(oi) = other_raw.column(name) {
                    sides.push((other_raw, oi, other_config));
                }
            }

            let declared_date = sides
                .iter()
                .any(|(_, _, cfg)| cfg.date_columns.iter().any(|d| d == name));
            let numeric = sides.iter().any(|(t, i, _)| t.has_values(*i))
                && sides.iter().all(|(t, i, _)| t.all_numeric(*i));

            if declared_date {
                ColumnKind::Date
            } else if numeric {
                ColumnKind::Number
            } else {
                ColumnKind::Text
            }
        })
        .collect()
}

fn build_table(label: &str, raw: RawCsv, kinds: Vec<ColumnKind>) -> Result<Table, ReconError> {
    let rows = raw
        .rows
        .into_iter()
        .map(|r| {
            r.into_iter()
                .zip(&kinds)
                .map(|(text, kind)| match (text.is_empty(), kind) {
                    (true, _) => CellValue::Empty,
                    (false, ColumnKind::Number) => {
                        parse_number(&text).map_or(CellValue::String(text), CellValue::number)
                    }
                    (false, _) => CellValue::String(text),
                })
                .collect()
        })
        .collect();

    let columns = raw
        .headers
        .into_iter()
        .zip(kinds)
        .map(|(name, kind)| Column::new(name, kind))
        .collect();

    let table = Table::new(columns, rows)?;
    log::debug!(
        "{label}: loaded {} row(s), {} column(s)",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

/// Load CSV text into a [`Table`].
///
/// The first record is the header. A column whose non-empty cells all parse as
/// finite numbers becomes a `Number` column; columns listed in
/// `config.date_columns` are declared `Date` and kept as text for the
/// normalizer; everything else is `Text`. Empty cells are `Empty`. Cell text
/// is not trimmed here.
///
/// Kinds are decided from this file alone. Use [`load_csv_pair`] when the
/// table is going to be reconciled against another file.
pub fn load_csv_table(
    label: &str,
    csv_data: &str,
    config: &TableConfig,
) -> Result<Table, ReconError> {
    let raw = read_csv(label, csv_data, config)?;
    let kinds = column_kinds(&raw, config, None);
    build_table(label, raw, kinds)
}

/// Load the source and target CSV files together.
///
/// Same rules as [`load_csv_table`], except that a column present in both
/// files gets its kind from both: `1` in one file and `A7` in the other make
/// the column `Text` on both sides, so equal cell text stays equal.
pub fn load_csv_pair(
    source_csv: &str,
    source_config: &TableConfig,
    target_csv: &str,
    target_config: &TableConfig,
) -> Result<(Table, Table), ReconError> {
    let source_raw = read_csv("source", source_csv, source_config)?;
    let target_raw = read_csv("target", target_csv, target_config)?;

    let source_kinds =
        column_kinds(&source_raw, source_config, Some((&target_raw, target_config)));
    let target_kinds =
        column_kinds(&target_raw, target_config, Some((&source_raw, source_config)));

    Ok((
        build_table("source", source_raw, source_kinds)?,
        build_table("target", target_raw, target_kinds)?,
    ))
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

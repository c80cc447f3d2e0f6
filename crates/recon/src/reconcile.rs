//! Whole-row reconciliation of two normalized tables.
//!
//! Rows carry no key: two rows are the same record only when every common
//! column holds an equal value. Set difference and the matched-pair join both
//! use that identity.

use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::{CellValue, Discrepancy, FieldDifferences, ReconOutcome, ReconSummary, Table};

/// Column positions shared by both tables, in source column order.
#[derive(Debug, Clone)]
pub struct CommonColumns {
    pub names: Vec<String>,
    source_idx: Vec<usize>,
    target_idx: Vec<usize>,
}

impl CommonColumns {
    pub fn resolve(source: &Table, target: &Table) -> Result<Self, ReconError> {
        let mut names = Vec::new();
        let mut source_idx = Vec::new();
        let mut target_idx = Vec::new();

        for (si, col) in source.columns().iter().enumerate() {
            if let Some(ti) = target.column_index(&col.name) {
                names.push(col.name.clone());
                source_idx.push(si);
                target_idx.push(ti);
            }
        }

        if names.is_empty() {
            return Err(ReconError::SchemaMismatch(format!(
                "source columns [{}] and target columns [{}] have nothing in common",
                source.column_names().join(", "),
                target.column_names().join(", "),
            )));
        }

        Ok(Self {
            names,
            source_idx,
            target_idx,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Common-column tuple of a row, by match key.
type RowKey<'a> = Vec<&'a CellValue>;

fn row_key<'a>(row: &'a [CellValue], idx: &[usize]) -> RowKey<'a> {
    idx.iter().map(|&i| row[i].match_key()).collect()
}

/// Index rows by common-column tuple, preserving row order within a group.
fn index_rows<'a>(table: &'a Table, idx: &[usize]) -> HashMap<RowKey<'a>, Vec<usize>> {
    let mut index: HashMap<RowKey<'a>, Vec<usize>> = HashMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        index.entry(row_key(row, idx)).or_default().push(i);
    }
    index
}

/// Compare two rows column by column over the common columns.
pub fn compare_rows(
    common: &CommonColumns,
    source_row: &[CellValue],
    target_row: &[CellValue],
) -> FieldDifferences {
    FieldDifferences(
        common
            .names
            .iter()
            .zip(common.source_idx.iter().zip(&common.target_idx))
            .map(|(name, (&si, &ti))| (name.clone(), !source_row[si].matches(&target_row[ti])))
            .collect(),
    )
}

/// Reconcile two normalized tables.
///
/// Returns rows missing from the target (source order), rows missing from the
/// source (target order), and a discrepancy for every joined pair whose
/// column-by-column comparison finds a difference (join order: source row,
/// then target row). Fails with `SchemaMismatch` when the tables share no
/// column; nothing is computed in that case.
pub fn reconcile(source: &Table, target: &Table) -> Result<ReconOutcome, ReconError> {
    let common = CommonColumns::resolve(source, target)?;

    let target_index = index_rows(target, &common.target_idx);
    let source_index = index_rows(source, &common.source_idx);

    let mut missing_in_target = Vec::new();
    let mut discrepancies = Vec::new();
    let mut matched_source_rows = 0;
    let mut join_pairs = 0usize;

    for (si, row) in source.rows().iter().enumerate() {
        let Some(partners) = target_index.get(&row_key(row, &common.source_idx)) else {
            missing_in_target.extend(source.record(si));
            continue;
        };

        matched_source_rows += 1;
        for &ti in partners {
            join_pairs += 1;
            let target_row = &target.rows()[ti];
            let differences = compare_rows(&common, row, target_row);
            if differences.any() {
                if let (Some(source_record), Some(target_record)) =
                    (source.record(si), target.record(ti))
                {
                    discrepancies.push(Discrepancy {
                        source_row: si,
                        target_row: ti,
                        source_record,
                        target_record,
                        differences,
                    });
                }
            }
        }
    }

    let mut missing_in_source = Vec::new();
    let mut matched_target_rows = 0;
    for (ti, row) in target.rows().iter().enumerate() {
        if source_index.contains_key(&row_key(row, &common.target_idx)) {
            matched_target_rows += 1;
        } else {
            missing_in_source.extend(target.record(ti));
        }
    }

    log::debug!(
        "reconciled {} source / {} target row(s) over {} common column(s): \
         {} join pair(s), {} missing in target, {} missing in source, {} discrepancies",
        source.len(),
        target.len(),
        common.len(),
        join_pairs,
        missing_in_target.len(),
        missing_in_source.len(),
        discrepancies.len(),
    );

    let summary = ReconSummary {
        source_rows: source.len(),
        target_rows: target.len(),
        common_columns: common.len(),
        matched_source_rows,
        matched_target_rows,
        missing_in_target: missing_in_target.len(),
        missing_in_source: missing_in_source.len(),
        discrepancies: discrepancies.len(),
    };

    Ok(ReconOutcome {
        source_columns: source.column_names(),
        target_columns: target.column_names(),
        common_columns: common.names,
        missing_in_target,
        missing_in_source,
        discrepancies,
        summary,
    })
}

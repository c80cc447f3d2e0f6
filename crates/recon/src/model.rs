use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single scalar cell.
///
/// `Unparseable` is what date normalization leaves behind for a value it could
/// not read as a date. It stays a distinct variant so callers can count bad
/// dates, but it renders like `Empty` and matches like `Empty`: a bad date, a
/// different bad date and a blank cell are all the same null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    String(String),
    Number(OrderedFloat<f64>),
    Date(NaiveDate),
    Empty,
    Unparseable,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn number(n: f64) -> Self {
        Self::Number(OrderedFloat(n))
    }

    pub fn is_unparseable(&self) -> bool {
        matches!(self, Self::Unparseable)
    }

    /// The value rows are matched on: `Unparseable` collapses to `Empty`.
    pub fn match_key(&self) -> &CellValue {
        static NULL: CellValue = CellValue::Empty;
        match self {
            Self::Unparseable => &NULL,
            other => other,
        }
    }

    /// Value equality used for row matching and field comparison.
    pub fn matches(&self, other: &CellValue) -> bool {
        self.match_key() == other.match_key()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n.0),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Empty | Self::Unparseable => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => {
                let n = n.0;
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serializer.serialize_i64(n as i64)
                } else {
                    serializer.serialize_f64(n)
                }
            }
            Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Self::Empty | Self::Unparseable => serializer.serialize_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Number,
    Date,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Date => write!(f, "date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Ordered columns plus ordered rows; each row holds one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table, rejecting duplicate or blank column names and rows whose
    /// width differs from the header.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<CellValue>>) -> Result<Self, ReconError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if col.name.trim().is_empty() {
                return Err(ReconError::SchemaMismatch("blank column name".into()));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(ReconError::SchemaMismatch(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }

        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(ReconError::SchemaMismatch(format!(
                "row {i} has {} cell(s), expected {}",
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Convenience constructor for all-text tables (column kind `Text`,
    /// blank strings become `Empty`).
    pub fn from_text(headers: &[&str], rows: &[&[&str]]) -> Result<Self, ReconError> {
        let columns = headers
            .iter()
            .map(|h| Column::new(*h, ColumnKind::Text))
            .collect();
        let rows = rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|s| {
                        if s.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::text(*s)
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    /// Shape is preserved by construction, so crate-internal transforms skip
    /// re-validation.
    pub(crate) fn from_parts(columns: Vec<Column>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let ci = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(ci))
    }

    /// Row `index` as an owned column→value record.
    pub fn record(&self, index: usize) -> Option<Record> {
        let row = self.rows.get(index)?;
        Some(Record {
            row: index,
            fields: self
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A row copied out of a table, keeping its original position.
/// Serializes as an ordered column→value object.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub row: usize,
    pub fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.fields.iter().map(|(_, v)| v)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Per-column "does this field differ" flags, in common-column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDifferences(pub Vec<(String, bool)>);

impl FieldDifferences {
    pub fn any(&self) -> bool {
        self.0.iter().any(|(_, differs)| *differs)
    }

    pub fn differing_columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, d)| *d).map(|(c, _)| c.as_str())
    }
}

impl Serialize for FieldDifferences {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, differs) in &self.0 {
            map.serialize_entry(column, differs)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub source_row: usize,
    pub target_row: usize,
    pub source_record: Record,
    pub target_record: Record,
    pub differences: FieldDifferences,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub source_rows: usize,
    pub target_rows: usize,
    pub common_columns: usize,
    pub matched_source_rows: usize,
    pub matched_target_rows: usize,
    pub missing_in_target: usize,
    pub missing_in_source: usize,
    pub discrepancies: usize,
}

impl ReconSummary {
    pub fn is_reconciled(&self) -> bool {
        self.missing_in_target == 0 && self.missing_in_source == 0 && self.discrepancies == 0
    }
}

/// Everything a reconciliation call produces: the three result collections
/// plus the column metadata needed to render them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconOutcome {
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub common_columns: Vec<String>,
    pub missing_in_target: Vec<Record>,
    pub missing_in_source: Vec<Record>,
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ReconSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_row_rejected() {
        let cols = vec![
            Column::new("id", ColumnKind::Text),
            Column::new("name", ColumnKind::Text),
        ];
        let err = Table::new(cols, vec![vec![CellValue::text("1")]]).unwrap_err();
        assert!(matches!(err, ReconError::SchemaMismatch(_)));
        assert!(err.to_string().contains("row 0 has 1 cell(s), expected 2"));
    }

    #[test]
    fn duplicate_column_rejected() {
        let err = Table::from_text(&["id", "id"], &[]).unwrap_err();
        assert_eq!(err, ReconError::SchemaMismatch("duplicate column 'id'".into()));
    }

    #[test]
    fn unparseable_matches_as_null() {
        assert!(CellValue::Unparseable.matches(&CellValue::Unparseable));
        assert!(CellValue::Unparseable.matches(&CellValue::Empty));
        assert!(CellValue::Empty.matches(&CellValue::Empty));
        assert!(!CellValue::Unparseable.matches(&CellValue::text("")));
        assert_eq!(CellValue::Unparseable.match_key(), &CellValue::Empty);
        assert!(!CellValue::number(1.0).matches(&CellValue::text("1")));
    }

    #[test]
    fn cell_serialization() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let json = serde_json::to_string(&vec![
            CellValue::number(3.0),
            CellValue::number(2.5),
            CellValue::Date(d),
            CellValue::Empty,
            CellValue::Unparseable,
            CellValue::text("a"),
        ])
        .unwrap();
        assert_eq!(json, r#"[3,2.5,"2024-01-05",null,null,"a"]"#);
    }

    #[test]
    fn record_keeps_column_order() {
        let t = Table::from_text(&["b", "a"], &[&["2", "1"]]).unwrap();
        let rec = t.record(0).unwrap();
        assert_eq!(serde_json::to_string(&rec).unwrap(), r#"{"b":"2","a":"1"}"#);
        assert_eq!(rec.get("a"), Some(&CellValue::text("1")));
        assert!(t.record(1).is_none());
    }
}

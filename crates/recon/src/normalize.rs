//! Cell canonicalization applied to both tables before they are compared.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::model::{CellValue, Column, ColumnKind, Table};

/// Date layouts tried in order. Input is already trimmed and lower-cased.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d %b %Y",
    "%b %d %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dt%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dt%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dt%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// True when `column` should be canonicalized as a date: its declared kind is
/// `Date`, or its name contains "date" in any case.
pub fn is_date_column(schema: &[Column], column: &str) -> bool {
    let declared = schema
        .iter()
        .find(|c| c.name == column)
        .is_some_and(|c| c.kind == ColumnKind::Date);
    declared || column.to_lowercase().contains("date")
}

/// Canonicalize every cell so semantically equal values compare equal.
///
/// Strings are trimmed and lower-cased. Cells in date columns (see
/// [`is_date_column`]) become `YYYY-MM-DD` dates. This step is lossy: a value
/// that cannot be read as a date is replaced by [`CellValue::Unparseable`] and
/// the original text is gone; it matches like an empty cell. Empty cells stay
/// empty.
///
/// Never fails, and `normalize(&normalize(t)) == normalize(t)`.
pub fn normalize(table: &Table) -> Table {
    let schema = table.columns();
    let date_cols: Vec<bool> = schema
        .iter()
        .map(|c| is_date_column(schema, &c.name))
        .collect();

    let mut unparseable = 0usize;
    let rows: Vec<Vec<CellValue>> = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&date_cols)
                .map(|(cell, &is_date)| {
                    let cell = normalize_cell(cell);
                    if is_date {
                        let cell = to_date(cell);
                        if cell.is_unparseable() {
                            unparseable += 1;
                        }
                        cell
                    } else {
                        cell
                    }
                })
                .collect()
        })
        .collect();

    let columns = schema
        .iter()
        .zip(&date_cols)
        .map(|(c, &is_date)| Column {
            name: c.name.clone(),
            kind: if is_date { ColumnKind::Date } else { c.kind },
        })
        .collect();

    log::debug!(
        "normalized {} row(s) x {} column(s), {} date column(s), {} unparseable date(s)",
        table.len(),
        schema.len(),
        date_cols.iter().filter(|d| **d).count(),
        unparseable,
    );

    Table::from_parts(columns, rows)
}

fn normalize_cell(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::String(s) => CellValue::String(s.trim().to_lowercase()),
        other => other.clone(),
    }
}

fn to_date(cell: CellValue) -> CellValue {
    match cell {
        CellValue::Date(_) | CellValue::Empty | CellValue::Unparseable => cell,
        CellValue::String(s) if s.is_empty() => CellValue::Empty,
        CellValue::String(s) => parse_date(&s).map_or(CellValue::Unparseable, CellValue::Date),
        CellValue::Number(n) => parse_date(&n.0.to_string())
            .map_or(CellValue::Unparseable, CellValue::Date),
    }
}

/// Read a date from any of the accepted spellings.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(&value.to_uppercase())
                .ok()
                .map(|dt| dt.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    #[test]
    fn trims_and_lowercases_strings() {
        let t = Table::from_text(&["id", "name"], &[&["1", " Alice "]]).unwrap();
        let n = normalize(&t);
        assert_eq!(n.cell(0, "name"), Some(&CellValue::text("alice")));
        assert_eq!(n.cell(0, "id"), Some(&CellValue::text("1")));
    }

    #[test]
    fn date_column_by_name() {
        let t = Table::from_text(&["Posting_Date"], &[&["2024-1-5"], &["not a date"], &[""]])
            .unwrap();
        let n = normalize(&t);
        assert_eq!(n.cell(0, "Posting_Date"), Some(&d(2024, 1, 5)));
        assert_eq!(n.cell(1, "Posting_Date"), Some(&CellValue::Unparseable));
        assert_eq!(n.cell(2, "Posting_Date"), Some(&CellValue::Empty));
        assert_eq!(n.columns()[0].kind, ColumnKind::Date);
    }

    #[test]
    fn date_column_by_declared_kind() {
        let t = Table::new(
            vec![Column::new("posted", ColumnKind::Date)],
            vec![vec![CellValue::text("01/15/2024")]],
        )
        .unwrap();
        assert_eq!(normalize(&t).cell(0, "posted"), Some(&d(2024, 1, 15)));
    }

    #[test]
    fn numbers_pass_through_outside_date_columns() {
        let t = Table::new(
            vec![Column::new("amount", ColumnKind::Number)],
            vec![vec![CellValue::number(12.5)]],
        )
        .unwrap();
        assert_eq!(normalize(&t).cell(0, "amount"), Some(&CellValue::number(12.5)));
    }

    #[test]
    fn numeric_compact_date() {
        let t = Table::new(
            vec![Column::new("date", ColumnKind::Number)],
            vec![vec![CellValue::number(20240105.0)]],
        )
        .unwrap();
        assert_eq!(normalize(&t).cell(0, "date"), Some(&d(2024, 1, 5)));
    }

    #[test]
    fn predicate() {
        let schema = vec![
            Column::new("UpdateDATE", ColumnKind::Text),
            Column::new("posted", ColumnKind::Date),
            Column::new("name", ColumnKind::Text),
        ];
        assert!(is_date_column(&schema, "UpdateDATE"));
        assert!(is_date_column(&schema, "posted"));
        assert!(!is_date_column(&schema, "name"));
        assert!(is_date_column(&schema, "date_not_in_schema"));
    }

    #[test]
    fn accepted_spellings() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7);
        for s in [
            "2024-03-07",
            "2024-3-7",
            "2024/03/07",
            "03/07/2024",
            "07.03.2024",
            "20240307",
            "7 mar 2024",
            "mar 7 2024",
            "march 7, 2024",
            "2024-03-07 10:30:00",
            "2024-03-07t10:30:00",
            "2024-03-07t10:30:00z",
        ] {
            assert_eq!(parse_date(s), expected, "{s}");
        }
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn idempotent_on_mixed_table() {
        let t = Table::from_text(
            &["id", "Date", "note"],
            &[&[" A ", "2024-1-5", "  Hi"], &["b", "garbage", ""]],
        )
        .unwrap();
        let once = normalize(&t);
        assert_eq!(normalize(&once), once);
    }
}

//! Report rendering: a pure projection of a [`ReconOutcome`] into one of the
//! supported encodings.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{CellValue, Discrepancy, ReconOutcome, ReconSummary, Record};

pub const MISSING_IN_TARGET: &str = "Missing in Target";
pub const MISSING_IN_SOURCE: &str = "Missing in Source";
pub const DISCREPANCIES: &str = "Discrepancies";

// ---------------------------------------------------------------------------
// Format selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Nested column→value records for machine consumption (`json`).
    #[default]
    Structured,
    /// Single RFC 4180 document with three labeled sections (`csv`).
    Delimited,
    /// Collections plus column metadata for a templating layer (`html`).
    DisplayMarkup,
}

impl ReportFormat {
    /// Boundary name of the mode, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::Delimited => "csv",
            Self::DisplayMarkup => "html",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Structured => "application/json",
            Self::Delimited => "text/csv",
            Self::DisplayMarkup => "text/html",
        }
    }

    pub fn default_filename(&self) -> &'static str {
        match self {
            Self::Structured => "reconciliation_report.json",
            Self::Delimited => "reconciliation_report.csv",
            Self::DisplayMarkup => "reconciliation_report.html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "structured" => Ok(Self::Structured),
            "csv" | "delimited" => Ok(Self::Delimited),
            "html" | "display" | "display_markup" => Ok(Self::DisplayMarkup),
            _ => Err(ReconError::UnsupportedFormat(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendered output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedReport {
    Structured(serde_json::Value),
    Delimited(String),
    DisplayMarkup(DisplayContext),
}

impl RenderedReport {
    pub fn format(&self) -> ReportFormat {
        match self {
            Self::Structured(_) => ReportFormat::Structured,
            Self::Delimited(_) => ReportFormat::Delimited,
            Self::DisplayMarkup(_) => ReportFormat::DisplayMarkup,
        }
    }
}

/// Everything a markup template needs: the two missing-row sections with
/// their column headers, the discrepancies field by field, and the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayContext {
    pub common_columns: Vec<String>,
    pub missing_in_target: DisplaySection,
    pub missing_in_source: DisplaySection,
    pub discrepancies: Vec<DisplayDiscrepancy>,
    pub summary: ReconSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySection {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<DisplayRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub row: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayDiscrepancy {
    pub source_row: usize,
    pub target_row: usize,
    pub fields: Vec<DisplayField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayField {
    pub column: String,
    pub source: String,
    pub target: String,
    pub differs: bool,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render `outcome` in the mode named by `mode` (`json`, `csv`, `html` or
/// their long names). Unknown names fail before anything is rendered.
pub fn render(outcome: &ReconOutcome, mode: &str) -> Result<RenderedReport, ReconError> {
    let format: ReportFormat = mode.parse()?;
    render_as(outcome, format)
}

pub fn render_as(
    outcome: &ReconOutcome,
    format: ReportFormat,
) -> Result<RenderedReport, ReconError> {
    let rendered = match format {
        ReportFormat::Structured => RenderedReport::Structured(to_structured(outcome)?),
        ReportFormat::Delimited => RenderedReport::Delimited(to_delimited(outcome)?),
        ReportFormat::DisplayMarkup => RenderedReport::DisplayMarkup(to_display(outcome)),
    };
    log::debug!("rendered report as {format}");
    Ok(rendered)
}

#[derive(Serialize)]
struct StructuredReport<'a> {
    missing_in_target: &'a [Record],
    missing_in_source: &'a [Record],
    discrepancies: &'a [Discrepancy],
    summary: &'a ReconSummary,
}

fn to_structured(outcome: &ReconOutcome) -> Result<serde_json::Value, ReconError> {
    serde_json::to_value(StructuredReport {
        missing_in_target: &outcome.missing_in_target,
        missing_in_source: &outcome.missing_in_source,
        discrepancies: &outcome.discrepancies,
        summary: &outcome.summary,
    })
    .map_err(|e| ReconError::Io(format!("cannot encode report: {e}")))
}

/// Three sections in fixed order, separated by a blank line. Rows are written
/// without a column header; each discrepancy is one compact JSON field.
fn to_delimited(outcome: &ReconOutcome) -> Result<String, ReconError> {
    let mut sections = Vec::with_capacity(3);

    sections.push(delimited_section(
        MISSING_IN_TARGET,
        outcome
            .missing_in_target
            .iter()
            .map(|r| r.values().map(CellValue::to_string).collect()),
    )?);

    sections.push(delimited_section(
        MISSING_IN_SOURCE,
        outcome
            .missing_in_source
            .iter()
            .map(|r| r.values().map(CellValue::to_string).collect()),
    )?);

    let mut discrepancy_lines = Vec::with_capacity(outcome.discrepancies.len());
    for d in &outcome.discrepancies {
        let text = serde_json::to_string(d)
            .map_err(|e| ReconError::Io(format!("cannot encode discrepancy: {e}")))?;
        discrepancy_lines.push(vec![text]);
    }
    sections.push(delimited_section(DISCREPANCIES, discrepancy_lines.into_iter())?);

    Ok(sections.join("\n"))
}

fn delimited_section(
    title: &str,
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<String, ReconError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record([title])?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReconError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReconError::Io(e.to_string()))
}

fn to_display(outcome: &ReconOutcome) -> DisplayContext {
    let section = |title: &str, columns: &[String], records: &[Record]| DisplaySection {
        title: title.to_string(),
        columns: columns.to_vec(),
        rows: records
            .iter()
            .map(|r| DisplayRow {
                row: r.row,
                cells: r.values().map(CellValue::to_string).collect(),
            })
            .collect(),
    };

    let text_of = |record: &Record, column: &str| {
        record.get(column).map(CellValue::to_string).unwrap_or_default()
    };

    let discrepancies = outcome
        .discrepancies
        .iter()
        .map(|d| DisplayDiscrepancy {
            source_row: d.source_row,
            target_row: d.target_row,
            fields: d
                .differences
                .0
                .iter()
                .map(|(column, differs)| DisplayField {
                    column: column.clone(),
                    source: text_of(&d.source_record, column),
                    target: text_of(&d.target_record, column),
                    differs: *differs,
                })
                .collect(),
        })
        .collect();

    DisplayContext {
        common_columns: outcome.common_columns.clone(),
        missing_in_target: section(
            MISSING_IN_TARGET,
            &outcome.source_columns,
            &outcome.missing_in_target,
        ),
        missing_in_source: section(
            MISSING_IN_SOURCE,
            &outcome.target_columns,
            &outcome.missing_in_source,
        ),
        discrepancies,
        summary: outcome.summary.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDifferences, Table};
    use crate::reconcile::reconcile;

    fn outcome(source: &[&[&str]], target: &[&[&str]]) -> ReconOutcome {
        let s = Table::from_text(&["id", "name"], source).unwrap();
        let t = Table::from_text(&["id", "name"], target).unwrap();
        reconcile(&s, &t).unwrap()
    }

    fn with_discrepancy() -> ReconOutcome {
        let mut out = outcome(&[], &[]);
        let s = Table::from_text(&["id", "name"], &[&["1", "a, b"]]).unwrap();
        let t = Table::from_text(&["id", "name"], &[&["1", "c"]]).unwrap();
        out.discrepancies.push(Discrepancy {
            source_row: 0,
            target_row: 0,
            source_record: s.record(0).unwrap(),
            target_record: t.record(0).unwrap(),
            differences: FieldDifferences(vec![("id".into(), false), ("name".into(), true)]),
        });
        out
    }

    #[test]
    fn parse_modes() {
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Structured);
        assert_eq!("CSV".parse::<ReportFormat>().unwrap(), ReportFormat::Delimited);
        assert_eq!("html".parse::<ReportFormat>().unwrap(), ReportFormat::DisplayMarkup);
        assert_eq!(
            "xml".parse::<ReportFormat>().unwrap_err(),
            ReconError::UnsupportedFormat("xml".into())
        );
    }

    #[test]
    fn unknown_mode_is_an_error() {
        let out = outcome(&[&["1", "a"]], &[]);
        assert!(matches!(render(&out, "xml"), Err(ReconError::UnsupportedFormat(m)) if m == "xml"));
    }

    #[test]
    fn empty_delimited_keeps_three_headers() {
        let out = outcome(&[], &[]);
        let RenderedReport::Delimited(text) = render_as(&out, ReportFormat::Delimited).unwrap()
        else {
            panic!("expected delimited output");
        };
        assert_eq!(text, "Missing in Target\n\nMissing in Source\n\nDiscrepancies\n");
    }

    #[test]
    fn delimited_rows_and_quoting() {
        let out = outcome(&[&["1", "x,y"], &["2", "plain"]], &[&["3", "say \"hi\""]]);
        let RenderedReport::Delimited(text) = render_as(&out, ReportFormat::Delimited).unwrap()
        else {
            panic!("expected delimited output");
        };
        assert_eq!(
            text,
            "Missing in Target\n1,\"x,y\"\n2,plain\n\nMissing in Source\n3,\"say \"\"hi\"\"\"\n\nDiscrepancies\n"
        );
    }

    #[test]
    fn delimited_discrepancy_is_one_field_per_line() {
        let out = with_discrepancy();
        let RenderedReport::Delimited(text) = render_as(&out, ReportFormat::Delimited).unwrap()
        else {
            panic!("expected delimited output");
        };
        let last = text.trim_end().lines().last().unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(last.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&record[0]).unwrap();
        assert_eq!(value["differences"]["name"], serde_json::json!(true));
        assert_eq!(value["source_record"]["name"], serde_json::json!("a, b"));
    }

    #[test]
    fn structured_shape() {
        let out = outcome(&[&["1", "a"]], &[&["2", "b"]]);
        let RenderedReport::Structured(v) = render(&out, "json").unwrap() else {
            panic!("expected structured output");
        };
        assert_eq!(v["missing_in_target"], serde_json::json!([{"id": "1", "name": "a"}]));
        assert_eq!(v["missing_in_source"], serde_json::json!([{"id": "2", "name": "b"}]));
        assert_eq!(v["discrepancies"], serde_json::json!([]));
        assert_eq!(v["summary"]["missing_in_target"], serde_json::json!(1));
    }

    #[test]
    fn display_context_carries_columns() {
        let out = with_discrepancy();
        let RenderedReport::DisplayMarkup(ctx) = render(&out, "html").unwrap() else {
            panic!("expected display context");
        };
        assert_eq!(ctx.missing_in_target.title, MISSING_IN_TARGET);
        assert_eq!(ctx.missing_in_target.columns, vec!["id", "name"]);
        assert_eq!(ctx.discrepancies.len(), 1);
        let name = &ctx.discrepancies[0].fields[1];
        assert_eq!((name.source.as_str(), name.target.as_str(), name.differs), ("a, b", "c", true));
    }

    #[test]
    fn rendering_does_not_touch_outcome() {
        let out = with_discrepancy();
        let before = out.clone();
        for f in [ReportFormat::Structured, ReportFormat::Delimited, ReportFormat::DisplayMarkup] {
            assert_eq!(render_as(&out, f).unwrap().format(), f);
        }
        assert_eq!(out, before);
    }
}

//! Minimal HTML page for the display-markup report mode.

use std::fmt::Write;

use tabrecon_core::report::{DisplayContext, DisplaySection};

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn section(html: &mut String, s: &DisplaySection) {
    let _ = writeln!(html, "<h2>{} ({})</h2>", escape(&s.title), s.rows.len());
    if s.rows.is_empty() {
        html.push_str("<p class=\"empty\">none</p>\n");
        return;
    }
    html.push_str("<table>\n<tr><th>row</th>");
    for c in &s.columns {
        let _ = write!(html, "<th>{}</th>", escape(c));
    }
    html.push_str("</tr>\n");
    for row in &s.rows {
        // Row numbers are 1-based data rows, header excluded.
        let _ = write!(html, "<tr><td>{}</td>", row.row + 1);
        for cell in &row.cells {
            let _ = write!(html, "<td>{}</td>", escape(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

pub fn render_page(title: &str, ctx: &DisplayContext) -> String {
    let mut html = String::new();
    let _ = writeln!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>",
        escape(title)
    );
    let _ = writeln!(html, "<h1>{}</h1>", escape(title));

    let s = &ctx.summary;
    let _ = writeln!(
        html,
        "<p>{} source row(s), {} target row(s), {} common column(s)</p>",
        s.source_rows, s.target_rows, s.common_columns
    );

    section(&mut html, &ctx.missing_in_target);
    section(&mut html, &ctx.missing_in_source);

    let _ = writeln!(html, "<h2>Discrepancies ({})</h2>", ctx.discrepancies.len());
    for d in &ctx.discrepancies {
        let _ = writeln!(
            html,
            "<table>\n<tr><th>column</th><th>source row {}</th><th>target row {}</th></tr>",
            d.source_row + 1,
            d.target_row + 1
        );
        for f in &d.fields {
            let class = if f.differs { " class=\"diff\"" } else { "" };
            let _ = writeln!(
                html,
                "<tr{class}><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&f.column),
                escape(&f.source),
                escape(&f.target)
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

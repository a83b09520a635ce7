//! Document assembly: one self-contained HTML document per render job.

use crate::geometry;
use crate::options::{DataRow, RenderOptions};
use chrono::Utc;
use std::fmt::Write as _;

/// Hard cap on preview table rows. Not configurable.
pub const PREVIEW_ROW_LIMIT: usize = 100;

/// Builds the markup document for a job: style block, optional header,
/// truncated data preview table, one container per chart, optional footer.
///
/// Chart containers are left empty; the execution context injects each
/// compiled SVG fragment into its container by id.
pub fn assemble_document(options: &RenderOptions) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    let _ = write!(html, "<title>{}</title>", html_escape(&options.title));
    html.push_str("<style>");
    html.push_str(&style_block(options));
    html.push_str("</style></head><body>");

    if options.layout.header.show {
        let header = &options.layout.header;
        let style = header.style.as_deref().unwrap_or("");
        let _ = write!(
            html,
            "<div class=\"report-header\" style=\"height:{}px;{style}\">{}</div>",
            header.height,
            html_escape(&header.content)
        );
    }

    let _ = write!(html, "<h1>{}</h1>", html_escape(&options.title));
    if let Some(subtitle) = &options.subtitle {
        let _ = write!(html, "<h2 class=\"subtitle\">{}</h2>", html_escape(subtitle));
    }

    html.push_str(&preview_table(&options.data));

    html.push_str("<div class=\"chart-grid\">");
    for chart in &options.charts {
        let _ = write!(
            html,
            "<div class=\"chart-container\" id=\"{}\" style=\"width:{}px;height:{}px\"></div>",
            html_escape(&chart.id),
            chart.width,
            chart.height
        );
    }
    html.push_str("</div>");

    if options.layout.footer.show {
        html.push_str(&footer_block(options));
    }

    html.push_str("</body></html>");
    html
}

fn style_block(options: &RenderOptions) -> String {
    let styling = &options.styling;
    let layout = &options.layout;
    let palette = styling.theme.palette();

    let overrides = styling.colors.as_ref();
    let background = overrides
        .and_then(|c| c.background.as_deref())
        .unwrap_or(palette.background);
    let text = overrides.and_then(|c| c.text.as_deref()).unwrap_or(palette.text);
    let border = overrides.and_then(|c| c.border.as_deref()).unwrap_or(palette.border);

    let (page_w, _) = geometry::page_pixels(layout.page_size, layout.orientation);
    let content_width = (page_w as f64
        - geometry::mm_to_px(layout.margins.left)
        - geometry::mm_to_px(layout.margins.right))
    .max(0.0);

    let mut css = format!(
        "body{{background:{background};color:{text};font-family:{};font-size:{}px;\
         width:{content_width:.0}px;margin:0 auto;padding:0}}",
        styling.font_family, styling.font_size
    );
    let _ = write!(
        css,
        ".chart-grid{{display:grid;grid-template-columns:repeat({},1fr);gap:{}px}}",
        layout.columns.max(1),
        layout.spacing
    );
    let _ = write!(
        css,
        "table.preview{{border-collapse:collapse;width:100%}}\
         table.preview th,table.preview td{{border:1px solid {border};padding:4px 8px;text-align:left}}\
         .chart-container{{overflow:hidden}}\
         .subtitle{{font-weight:normal;color:{border}}}"
    );
    for rule in &styling.custom_rules {
        css.push_str(rule);
    }
    css
}

fn footer_block(options: &RenderOptions) -> String {
    let footer = &options.layout.footer;
    let mut content = footer.content.clone();
    if !content.is_empty() {
        content.push_str(" | ");
    }
    let _ = write!(content, "Generated {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
    if let Some(author) = options.metadata.as_ref().and_then(|m| m.author.as_deref()) {
        let _ = write!(content, " by {author}");
    }
    let style = footer.style.as_deref().unwrap_or("");
    format!(
        "<div class=\"report-footer\" style=\"height:{}px;{style}\">{}</div>",
        footer.height,
        html_escape(&content)
    )
}

/// Renders the data preview table, truncated to the first
/// [`PREVIEW_ROW_LIMIT`] records regardless of input size.
fn preview_table(data: &[DataRow]) -> String {
    let Some(first) = data.first() else {
        return String::new();
    };
    let columns: Vec<&String> = first.keys().collect();

    let mut table = String::from("<table class=\"preview\"><thead><tr>");
    for column in &columns {
        let _ = write!(table, "<th>{}</th>", html_escape(column));
    }
    table.push_str("</tr></thead><tbody>");

    for row in data.iter().take(PREVIEW_ROW_LIMIT) {
        table.push_str("<tr class=\"preview-row\">");
        for column in &columns {
            let cell = match row.get(*column) {
                Some(serde_json::Value::String(s)) => html_escape(s),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => html_escape(&other.to_string()),
            };
            let _ = write!(table, "<td>{cell}</td>");
        }
        table.push_str("</tr>");
    }
    table.push_str("</tbody></table>");
    table
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: serde_json::Value) -> RenderOptions {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> serde_json::Value {
        json!({"title": "Report", "format": "html"})
    }

    #[test]
    fn test_preview_table_capped_at_100_rows() {
        let rows: Vec<_> = (0..1000).map(|i| json!({"id": i, "value": i * 2})).collect();
        let mut opts = base();
        opts["data"] = json!(rows);
        let html = assemble_document(&options(opts));
        assert_eq!(html.matches("<tr class=\"preview-row\">").count(), 100);
    }

    #[test]
    fn test_small_input_keeps_all_rows() {
        let mut opts = base();
        opts["data"] = json!([{"id": 1}, {"id": 2}]);
        let html = assemble_document(&options(opts));
        assert_eq!(html.matches("<tr class=\"preview-row\">").count(), 2);
    }

    #[test]
    fn test_chart_containers_keyed_and_sized() {
        let mut opts = base();
        opts["charts"] = json!([
            {"id": "revenue", "type": "bar", "width": 500, "height": 280},
            {"id": "trend", "type": "line", "width": 300, "height": 200},
        ]);
        let html = assemble_document(&options(opts));
        assert!(html.contains("id=\"revenue\" style=\"width:500px;height:280px\""));
        assert!(html.contains("id=\"trend\" style=\"width:300px;height:200px\""));
    }

    #[test]
    fn test_header_footer_only_when_shown() {
        let html = assemble_document(&options(base()));
        assert!(!html.contains("report-header"));
        assert!(!html.contains("report-footer"));

        let mut opts = base();
        opts["layout"] = json!({
            "header": {"show": true, "content": "ACME Quarterly"},
            "footer": {"show": true},
        });
        opts["metadata"] = json!({"author": "jsmith"});
        let html = assemble_document(&options(opts));
        assert!(html.contains("ACME Quarterly"));
        assert!(html.contains("Generated "));
        assert!(html.contains("by jsmith"));
    }

    #[test]
    fn test_theme_palette_with_overrides() {
        let mut opts = base();
        opts["styling"] = json!({"theme": "dark", "colors": {"text": "#ff0000"}});
        let html = assemble_document(&options(opts));
        assert!(html.contains("background:#1a1a1a"));
        assert!(html.contains("color:#ff0000"));
    }

    #[test]
    fn test_custom_rules_pass_through() {
        let mut opts = base();
        opts["styling"] = json!({"customRules": ["h1{letter-spacing:2px}"]});
        let html = assemble_document(&options(opts));
        assert!(html.contains("h1{letter-spacing:2px}"));
    }

    #[test]
    fn test_cell_values_escaped() {
        let mut opts = base();
        opts["data"] = json!([{"name": "<script>alert(1)</script>"}]);
        let html = assemble_document(&options(opts));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}

//! Workbook adapter: multi-sheet xlsx export, built entirely outside the
//! browser. Must produce a valid result even when the rendering engine is
//! unavailable.

use crate::error::RenderError;
use crate::options::{DataRow, RenderOptions};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;
use tracing::info;

/// Auto-sized column widths are capped at this many characters.
const MAX_COLUMN_WIDTH: f64 = 50.0;

/// Chart sheet titles are truncated to this many characters after
/// sanitization.
const MAX_SHEET_TITLE: usize = 20;

/// Placeholder for statistics over fields with no numeric values.
const NOT_APPLICABLE: &str = "N/A";

/// Builds the workbook: a "Data" sheet, a "Metadata" sheet, one sheet per
/// chart with that chart's raw rows, and a "Summary" sheet of per-field
/// statistics. Returns the written file size in bytes.
pub fn export_workbook(options: &RenderOptions, path: &Path) -> Result<u64, RenderError> {
    let mut workbook = Workbook::new();

    let data_sheet = workbook.add_worksheet();
    data_sheet.set_name("Data")?;
    write_rows(data_sheet, &options.data)?;

    write_metadata_sheet(workbook.add_worksheet(), options)?;

    for (index, chart) in options.charts.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sanitize_sheet_name(index, &chart.id))?;
        write_rows(sheet, &chart.data)?;
    }

    write_summary_sheet(workbook.add_worksheet(), &options.data)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    workbook.save(path)?;

    let size = std::fs::metadata(path)?.len();
    info!(path = %path.display(), bytes = size, "workbook written");
    Ok(size)
}

/// Header row from the record keys, then one sheet row per record, with
/// column widths auto-sized to content length.
fn write_rows(sheet: &mut Worksheet, rows: &[DataRow]) -> Result<(), RenderError> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let columns: Vec<&String> = first.keys().collect();

    let mut widths: Vec<f64> = columns.iter().map(|c| c.len() as f64).collect();
    for (col, column) in columns.iter().enumerate() {
        sheet.write_string(0, col as u16, column.as_str())?;
        for (row_index, row) in rows.iter().enumerate() {
            let cell_row = row_index as u32 + 1;
            match row.get(*column) {
                Some(serde_json::Value::Number(n)) => {
                    let value = n.as_f64().unwrap_or(0.0);
                    sheet.write_number(cell_row, col as u16, value)?;
                    widths[col] = widths[col].max(value.to_string().len() as f64);
                }
                Some(serde_json::Value::Bool(b)) => {
                    sheet.write_boolean(cell_row, col as u16, *b)?;
                    widths[col] = widths[col].max(5.0);
                }
                Some(serde_json::Value::Null) | None => {}
                Some(serde_json::Value::String(s)) => {
                    sheet.write_string(cell_row, col as u16, s.as_str())?;
                    widths[col] = widths[col].max(s.len() as f64);
                }
                Some(other) => {
                    let text = other.to_string();
                    sheet.write_string(cell_row, col as u16, text.as_str())?;
                    widths[col] = widths[col].max(text.len() as f64);
                }
            }
        }
    }
    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, (width + 2.0).min(MAX_COLUMN_WIDTH))?;
    }
    Ok(())
}

fn write_metadata_sheet(sheet: &mut Worksheet, options: &RenderOptions) -> Result<(), RenderError> {
    sheet.set_name("Metadata")?;

    let meta = options.metadata.clone().unwrap_or_default();
    let pairs: Vec<(&str, String)> = vec![
        ("Title", options.title.clone()),
        ("Subtitle", options.subtitle.clone().unwrap_or_default()),
        ("Generated At", Utc::now().to_rfc3339()),
        ("Template", options.template.clone()),
        ("Format", options.format.to_string()),
        ("Record Count", options.data.len().to_string()),
        ("Chart Count", options.charts.len().to_string()),
        ("Author", meta.author.unwrap_or_default()),
        ("Company", meta.company.unwrap_or_default()),
        ("Department", meta.department.unwrap_or_default()),
        ("Version", meta.version.unwrap_or_default()),
        ("Description", meta.description.unwrap_or_default()),
    ];

    for (row, (key, value)) in pairs.iter().enumerate() {
        sheet.write_string(row as u32, 0, *key)?;
        sheet.write_string(row as u32, 1, value.as_str())?;
    }
    sheet.set_column_width(0, 16)?;
    sheet.set_column_width(1, 40)?;
    Ok(())
}

fn write_summary_sheet(sheet: &mut Worksheet, rows: &[DataRow]) -> Result<(), RenderError> {
    sheet.set_name("Summary")?;

    for (col, header) in ["Field", "Count", "Min", "Max", "Average", "Sum"]
        .iter()
        .enumerate()
    {
        sheet.write_string(0, col as u16, *header)?;
    }

    let Some(first) = rows.first() else {
        return Ok(());
    };
    for (index, field) in first.keys().enumerate() {
        let row = index as u32 + 1;
        let summary = summarize_field(rows, field);
        sheet.write_string(row, 0, field.as_str())?;
        sheet.write_number(row, 1, summary.count as f64)?;
        match summary.stats {
            Some(stats) => {
                sheet.write_number(row, 2, stats.min)?;
                sheet.write_number(row, 3, stats.max)?;
                sheet.write_number(row, 4, stats.average)?;
                sheet.write_number(row, 5, stats.sum)?;
            }
            None => {
                for col in 2..=5u16 {
                    sheet.write_string(row, col, NOT_APPLICABLE)?;
                }
            }
        }
    }
    Ok(())
}

/// Per-field statistics over the numeric subset of a field's values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    /// Number of numeric values found.
    pub count: usize,
    /// `None` when the field holds no numeric values.
    pub stats: Option<FieldStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub sum: f64,
}

pub fn summarize_field(rows: &[DataRow], field: &str) -> FieldSummary {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.get(field).and_then(|v| v.as_f64()))
        .collect();
    if values.is_empty() {
        return FieldSummary {
            count: 0,
            stats: None,
        };
    }
    let sum: f64 = values.iter().sum();
    FieldSummary {
        count: values.len(),
        stats: Some(FieldStats {
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            average: sum / values.len() as f64,
            sum,
        }),
    }
}

/// Chart sheet name: alphanumerics of the chart id, truncated to
/// [`MAX_SHEET_TITLE`] characters, prefixed by the chart index.
pub fn sanitize_sheet_name(index: usize, id: &str) -> String {
    let mut sanitized: String = id.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    sanitized.truncate(MAX_SHEET_TITLE);
    if sanitized.is_empty() {
        sanitized.push_str("Chart");
    }
    format!("{}_{sanitized}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<DataRow> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_mixed_field_uses_numeric_subset() {
        let rows = rows(json!([
            {"v": 1}, {"v": 2}, {"v": 3}, {"v": "a"},
        ]));
        let summary = summarize_field(&rows, "v");
        assert_eq!(summary.count, 3);
        let stats = summary.stats.unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.average, 2.0);
        assert_eq!(stats.sum, 6.0);
    }

    #[test]
    fn test_non_numeric_field_has_no_stats() {
        let rows = rows(json!([{"name": "a"}, {"name": "b"}]));
        let summary = summarize_field(&rows, "name");
        assert_eq!(summary.count, 0);
        assert!(summary.stats.is_none());
    }

    #[test]
    fn test_sheet_name_sanitization() {
        assert_eq!(sanitize_sheet_name(0, "Revenue & Cost (Q3)"), "1_RevenueCostQ3");
        assert_eq!(
            sanitize_sheet_name(2, "a-very-long-chart-identifier-here"),
            "3_averylongchartident"
        );
        assert_eq!(sanitize_sheet_name(1, "---"), "2_Chart");
    }

    #[test]
    fn test_workbook_written_to_disk() {
        let options: RenderOptions = serde_json::from_value(json!({
            "title": "Inventory",
            "format": "xlsx",
            "data": [
                {"sku": "A-1", "qty": 4},
                {"sku": "B-2", "qty": 9},
            ],
            "charts": [
                {"id": "qty-by-sku", "type": "bar", "width": 400, "height": 300,
                 "data": [{"x": "A-1", "y": 4}, {"x": "B-2", "y": 9}]},
            ],
            "metadata": {"author": "ops"},
        }))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.xlsx");
        let size = export_workbook(&options, &path).unwrap();
        assert!(size > 0);
        assert!(path.exists());
    }
}

//! Chart compilation: declarative chart descriptors to typed drawing
//! instructions, serialized as SVG fragments.
//!
//! Each implemented chart kind is a pure function from a
//! [`ChartDefinition`] to a list of [`DrawInstruction`]s, so every kind is
//! unit-testable without a browser. The execution context only ever receives
//! the serialized fragment; no chart code is synthesized as source text.

use crate::error::RenderError;
use crate::options::{ChartDefinition, ChartType, DataRow};
use std::f64::consts::PI;
use std::fmt::Write as _;

/// One primitive drawing operation on the chart surface.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawInstruction {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: String,
    },
    Path {
        d: String,
        stroke: Option<String>,
        stroke_width: f64,
        fill: Option<String>,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        anchor: TextAnchor,
        size: f64,
        fill: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_svg(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// The compiled output for one chart: either an SVG fragment ready for
/// injection into the chart's container, or a warning for kinds with no
/// rendering routine.
#[derive(Debug, Clone)]
pub struct ChartScript {
    pub chart_id: String,
    pub svg: Option<String>,
    pub warning: Option<String>,
}

const AXIS_COLOR: &str = "#666666";
const LABEL_COLOR: &str = "#333333";
const LABEL_SIZE: f64 = 11.0;
const BAND_PADDING: f64 = 0.1;
const DEFAULT_TICK_COUNT: u32 = 5;

/// Compiles one chart descriptor.
///
/// Unimplemented kinds (scatter, area, histogram, heatmap, treemap, gauge,
/// bubble) produce no drawing instructions and a warning instead; they never
/// fail the job.
pub fn compile_chart(def: &ChartDefinition) -> ChartScript {
    let instructions = match def.chart_type {
        ChartType::Bar => Some(bar_instructions(def)),
        ChartType::Line => Some(line_instructions(def)),
        ChartType::Pie => Some(pie_instructions(def)),
        _ => None,
    };

    match instructions {
        Some(instructions) => ChartScript {
            chart_id: def.id.clone(),
            svg: Some(render_svg(def.width, def.height, &instructions)),
            warning: None,
        },
        None => ChartScript {
            chart_id: def.id.clone(),
            svg: None,
            warning: Some(
                RenderError::UnsupportedChart(format!(
                    "{} (chart '{}')",
                    def.chart_type, def.id
                ))
                .to_string(),
            ),
        },
    }
}

/// Bar chart: band scale over the distinct x values, linear y over
/// `[0, max]`, one rect per datum, bottom and left axes.
pub fn bar_instructions(def: &ChartDefinition) -> Vec<DrawInstruction> {
    let m = &def.config.margins;
    let inner_w = (def.width as f64 - m.left - m.right).max(0.0);
    let inner_h = (def.height as f64 - m.top - m.bottom).max(0.0);

    let categories = distinct_categories(&def.data, def.x_field());
    let y_max = def
        .data
        .iter()
        .filter_map(|row| field_number(row, def.y_field()))
        .fold(f64::NEG_INFINITY, f64::max);
    let y_max = if y_max.is_finite() && y_max > 0.0 { y_max } else { 1.0 };

    let mut out = axes(def, m.left, m.top, inner_w, inner_h);

    // Band geometry: evenly spaced steps with fixed padding on either side.
    let step = if categories.is_empty() { 0.0 } else { inner_w / categories.len() as f64 };
    let band = step * (1.0 - BAND_PADDING);

    for (i, row) in def.data.iter().enumerate() {
        let category = field_string(row, def.x_field());
        let value = match field_number(row, def.y_field()) {
            Some(v) if v >= 0.0 => v,
            _ => continue,
        };
        let Some(slot) = categories.iter().position(|c| *c == category) else {
            continue;
        };
        let bar_h = inner_h * value / y_max;
        out.push(DrawInstruction::Rect {
            x: m.left + slot as f64 * step + step * BAND_PADDING / 2.0,
            y: m.top + inner_h - bar_h,
            width: band,
            height: bar_h,
            fill: pick_color(def, i),
        });
    }

    // Category labels under each band.
    for (slot, category) in categories.iter().enumerate() {
        out.push(DrawInstruction::Text {
            x: m.left + slot as f64 * step + step / 2.0,
            y: m.top + inner_h + LABEL_SIZE + 3.0,
            content: category.clone(),
            anchor: TextAnchor::Middle,
            size: LABEL_SIZE,
            fill: LABEL_COLOR.to_string(),
        });
    }
    out.extend(y_tick_labels(def, 0.0, y_max, m.left, m.top, inner_h));

    out
}

/// Line chart: linear scales over the min/max extents of both fields, one
/// monotone-interpolated stroke path in data order, no fill.
pub fn line_instructions(def: &ChartDefinition) -> Vec<DrawInstruction> {
    let m = &def.config.margins;
    let inner_w = (def.width as f64 - m.left - m.right).max(0.0);
    let inner_h = (def.height as f64 - m.top - m.bottom).max(0.0);

    let points: Vec<(f64, f64)> = def
        .data
        .iter()
        .filter_map(|row| {
            Some((
                field_number(row, def.x_field())?,
                field_number(row, def.y_field())?,
            ))
        })
        .collect();

    let mut out = axes(def, m.left, m.top, inner_w, inner_h);
    if points.is_empty() {
        return out;
    }

    let (x_min, x_max) = extent(points.iter().map(|p| p.0));
    let (y_min, y_max) = extent(points.iter().map(|p| p.1));

    let scaled: Vec<(f64, f64)> = points
        .iter()
        .map(|&(x, y)| {
            (
                m.left + project(x, x_min, x_max, inner_w),
                m.top + inner_h - project(y, y_min, y_max, inner_h),
            )
        })
        .collect();

    out.push(DrawInstruction::Path {
        d: monotone_path(&scaled),
        stroke: Some(pick_color(def, 0)),
        stroke_width: 2.0,
        fill: None,
    });
    out.extend(y_tick_labels(def, y_min, y_max, m.left, m.top, inner_h));

    out
}

/// Pie chart: slice angles proportional to the y-field, outer radius
/// `min(width, height) / 2 - margin`, inner radius zero, category label at
/// the arc centroid.
pub fn pie_instructions(def: &ChartDefinition) -> Vec<DrawInstruction> {
    let margin = def.config.margins.top;
    let w = def.width as f64;
    let h = def.height as f64;
    let cx = w / 2.0;
    let cy = h / 2.0;
    let radius = (w.min(h) / 2.0 - margin).max(0.0);

    let slices: Vec<(String, f64)> = def
        .data
        .iter()
        .filter_map(|row| {
            let value = field_number(row, def.y_field())?;
            (value > 0.0).then(|| (field_string(row, def.x_field()), value))
        })
        .collect();
    let total: f64 = slices.iter().map(|s| s.1).sum();
    if total <= 0.0 || radius <= 0.0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    // Start at 12 o'clock, sweep clockwise.
    let mut angle = -PI / 2.0;
    for (i, (category, value)) in slices.iter().enumerate() {
        let sweep = value / total * 2.0 * PI;
        let end = angle + sweep;
        out.push(DrawInstruction::Path {
            d: arc_path(cx, cy, radius, angle, end),
            stroke: Some("#ffffff".to_string()),
            stroke_width: 1.0,
            fill: Some(pick_color(def, i)),
        });

        let mid = (angle + end) / 2.0;
        out.push(DrawInstruction::Text {
            x: cx + radius * 0.6 * mid.cos(),
            y: cy + radius * 0.6 * mid.sin(),
            content: category.clone(),
            anchor: TextAnchor::Middle,
            size: LABEL_SIZE,
            fill: LABEL_COLOR.to_string(),
        });
        angle = end;
    }

    out
}

/// Serializes drawing instructions into a standalone SVG fragment.
pub fn render_svg(width: u32, height: u32, instructions: &[DrawInstruction]) -> String {
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\">"
    );
    for instruction in instructions {
        match instruction {
            DrawInstruction::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                let _ = write!(
                    svg,
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{fill}\"/>"
                );
            }
            DrawInstruction::Line { x1, y1, x2, y2, stroke } => {
                let _ = write!(
                    svg,
                    "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{stroke}\"/>"
                );
            }
            DrawInstruction::Path {
                d,
                stroke,
                stroke_width,
                fill,
            } => {
                let stroke = stroke.as_deref().unwrap_or("none");
                let fill = fill.as_deref().unwrap_or("none");
                let _ = write!(
                    svg,
                    "<path d=\"{d}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width:.1}\" fill=\"{fill}\"/>"
                );
            }
            DrawInstruction::Text {
                x,
                y,
                content,
                anchor,
                size,
                fill,
            } => {
                let _ = write!(
                    svg,
                    "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{}\" font-size=\"{size:.1}\" fill=\"{fill}\">{}</text>",
                    anchor.as_svg(),
                    xml_escape(content)
                );
            }
        }
    }
    svg.push_str("</svg>");
    svg
}

fn axes(def: &ChartDefinition, left: f64, top: f64, inner_w: f64, inner_h: f64) -> Vec<DrawInstruction> {
    let mut out = Vec::new();
    if def.config.x_axis.show {
        out.push(DrawInstruction::Line {
            x1: left,
            y1: top + inner_h,
            x2: left + inner_w,
            y2: top + inner_h,
            stroke: AXIS_COLOR.to_string(),
        });
    }
    if def.config.y_axis.show {
        out.push(DrawInstruction::Line {
            x1: left,
            y1: top,
            x2: left,
            y2: top + inner_h,
            stroke: AXIS_COLOR.to_string(),
        });
    }
    out
}

fn y_tick_labels(
    def: &ChartDefinition,
    min: f64,
    max: f64,
    left: f64,
    top: f64,
    inner_h: f64,
) -> Vec<DrawInstruction> {
    if !def.config.y_axis.show {
        return Vec::new();
    }
    let ticks = def.config.y_axis.tick_count.unwrap_or(DEFAULT_TICK_COUNT).max(1);
    (0..=ticks)
        .map(|i| {
            let fraction = i as f64 / ticks as f64;
            DrawInstruction::Text {
                x: left - 5.0,
                y: top + inner_h - fraction * inner_h + LABEL_SIZE / 3.0,
                content: format_tick(min + fraction * (max - min)),
                anchor: TextAnchor::End,
                size: LABEL_SIZE,
                fill: LABEL_COLOR.to_string(),
            }
        })
        .collect()
}

fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.1}")
    }
}

fn pick_color(def: &ChartDefinition, index: usize) -> String {
    let colors = &def.config.colors;
    if colors.is_empty() {
        "#1f77b4".to_string()
    } else {
        colors[index % colors.len()].clone()
    }
}

fn distinct_categories(rows: &[DataRow], field: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for row in rows {
        let value = field_string(row, field);
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn field_number(row: &DataRow, field: &str) -> Option<f64> {
    row.get(field).and_then(|v| v.as_f64())
}

fn field_string(row: &DataRow, field: &str) -> String {
    match row.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() { (min, max) } else { (0.0, 1.0) }
}

/// Projects a domain value onto `[0, range]`, collapsing degenerate domains
/// to the range midpoint.
fn project(value: f64, min: f64, max: f64, range: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        range / 2.0
    } else {
        (value - min) / (max - min) * range
    }
}

/// Monotone cubic interpolation (Fritsch-Carlson tangents) through the
/// scaled points, in data order.
fn monotone_path(points: &[(f64, f64)]) -> String {
    let n = points.len();
    if n == 0 {
        return String::new();
    }
    let mut d = format!("M{:.2},{:.2}", points[0].0, points[0].1);
    if n == 1 {
        return d;
    }

    let slopes: Vec<f64> = points
        .windows(2)
        .map(|w| {
            let dx = w[1].0 - w[0].0;
            if dx.abs() < f64::EPSILON { 0.0 } else { (w[1].1 - w[0].1) / dx }
        })
        .collect();

    let mut tangents = vec![0.0; n];
    tangents[0] = slopes[0];
    tangents[n - 1] = slopes[n - 2];
    for i in 1..n - 1 {
        // Zero tangent at local extrema keeps the curve from overshooting.
        if slopes[i - 1] * slopes[i] <= 0.0 {
            tangents[i] = 0.0;
        } else {
            tangents[i] = 2.0 * slopes[i - 1] * slopes[i] / (slopes[i - 1] + slopes[i]);
        }
    }

    for i in 0..n - 1 {
        let (x0, y0) = points[i];
        let (x1, y1) = points[i + 1];
        let dx = (x1 - x0) / 3.0;
        let _ = write!(
            d,
            "C{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
            x0 + dx,
            y0 + tangents[i] * dx,
            x1 - dx,
            y1 - tangents[i + 1] * dx,
            x1,
            y1
        );
    }
    d
}

/// Pie slice path from center through two radial points, clockwise.
fn arc_path(cx: f64, cy: f64, r: f64, start: f64, end: f64) -> String {
    let sweep = end - start;
    // A single slice covering the whole circle degenerates to a point with
    // one arc command, so split it in two.
    if sweep >= 2.0 * PI - 1e-6 {
        let opposite = start + PI;
        return format!(
            "M{:.2},{:.2} A{r:.2},{r:.2} 0 1,1 {:.2},{:.2} A{r:.2},{r:.2} 0 1,1 {:.2},{:.2} Z",
            cx + r * start.cos(),
            cy + r * start.sin(),
            cx + r * opposite.cos(),
            cy + r * opposite.sin(),
            cx + r * start.cos(),
            cy + r * start.sin(),
        );
    }
    let large_arc = i32::from(sweep > PI);
    format!(
        "M{cx:.2},{cy:.2} L{:.2},{:.2} A{r:.2},{r:.2} 0 {large_arc},1 {:.2},{:.2} Z",
        cx + r * start.cos(),
        cy + r * start.sin(),
        cx + r * end.cos(),
        cy + r * end.sin(),
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart(chart_type: &str, data: serde_json::Value) -> ChartDefinition {
        serde_json::from_value(json!({
            "id": "test-chart",
            "type": chart_type,
            "data": data,
            "width": 400,
            "height": 300,
        }))
        .unwrap()
    }

    fn sales_rows() -> serde_json::Value {
        json!([
            {"x": "north", "y": 10},
            {"x": "south", "y": 30},
            {"x": "east", "y": 20},
        ])
    }

    #[test]
    fn test_bar_one_rect_per_datum() {
        let def = chart("bar", sales_rows());
        let instructions = bar_instructions(&def);
        let rects = instructions
            .iter()
            .filter(|i| matches!(i, DrawInstruction::Rect { .. }))
            .count();
        assert_eq!(rects, 3);
    }

    #[test]
    fn test_bar_tallest_value_fills_inner_height() {
        let def = chart("bar", sales_rows());
        let inner_h = 300.0 - def.config.margins.top - def.config.margins.bottom;
        let max_height = bar_instructions(&def)
            .iter()
            .filter_map(|i| match i {
                DrawInstruction::Rect { height, .. } => Some(*height),
                _ => None,
            })
            .fold(0.0, f64::max);
        assert!((max_height - inner_h).abs() < 1e-9);
    }

    #[test]
    fn test_line_single_monotone_path() {
        let def = chart(
            "line",
            json!([{"x": 0, "y": 5}, {"x": 1, "y": 2}, {"x": 2, "y": 8}]),
        );
        let paths: Vec<_> = line_instructions(&def)
            .into_iter()
            .filter_map(|i| match i {
                DrawInstruction::Path { d, fill, .. } => Some((d, fill)),
                _ => None,
            })
            .collect();
        assert_eq!(paths.len(), 1);
        let (d, fill) = &paths[0];
        assert!(d.starts_with('M'));
        assert!(d.contains('C'), "expected cubic segments, got {d}");
        assert!(fill.is_none(), "line must not be filled");
    }

    #[test]
    fn test_pie_slices_and_labels() {
        let def = chart("pie", sales_rows());
        let instructions = pie_instructions(&def);
        let slices = instructions
            .iter()
            .filter(|i| matches!(i, DrawInstruction::Path { .. }))
            .count();
        let labels: Vec<_> = instructions
            .iter()
            .filter_map(|i| match i {
                DrawInstruction::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(slices, 3);
        assert_eq!(labels, vec!["north", "south", "east"]);
    }

    #[test]
    fn test_pie_inner_radius_is_zero() {
        // Every slice path starts at the center: inner radius is always 0.
        let def = chart("pie", sales_rows());
        for instruction in pie_instructions(&def) {
            if let DrawInstruction::Path { d, .. } = instruction {
                assert!(d.starts_with("M200.00,150.00"), "slice not centered: {d}");
            }
        }
    }

    #[test]
    fn test_unsupported_type_warns_without_svg() {
        let def = chart("heatmap", sales_rows());
        let script = compile_chart(&def);
        assert!(script.svg.is_none());
        let warning = script.warning.unwrap();
        assert_eq!(
            warning,
            RenderError::UnsupportedChart("heatmap (chart 'test-chart')".into()).to_string()
        );
    }

    #[test]
    fn test_empty_data_produces_finite_svg() {
        for kind in ["bar", "line", "pie"] {
            let def = chart(kind, json!([]));
            let script = compile_chart(&def);
            let svg = script.svg.expect(kind);
            assert!(!svg.contains("NaN"), "{kind} emitted NaN: {svg}");
        }
    }

    #[test]
    fn test_svg_fragment_is_well_formed_root() {
        let def = chart("bar", sales_rows());
        let svg = compile_chart(&def).svg.unwrap();
        assert!(svg.starts_with("<svg xmlns="));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("viewBox=\"0 0 400 300\""));
    }

    #[test]
    fn test_labels_are_escaped() {
        let def = chart("bar", json!([{"x": "a<b&c", "y": 1}]));
        let svg = compile_chart(&def).svg.unwrap();
        assert!(svg.contains("a&lt;b&amp;c"));
    }
}

//! Render request models: report options, chart descriptors, layout and styling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One uniform data record. Field order within a record is normalized
/// (keys sort lexicographically), which keeps table columns and workbook
/// sheets deterministic.
pub type DataRow = serde_json::Map<String, serde_json::Value>;

/// Complete description of one report render request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub format: OutputFormat,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub data: Vec<DataRow>,
    #[serde(default)]
    pub charts: Vec<ChartDefinition>,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub styling: StylingConfig,
    #[serde(default)]
    pub metadata: Option<ReportMetadata>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub performance: Option<PerformanceHints>,
}

fn default_template() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

/// Target output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Png,
    Html,
    Svg,
    Xlsx,
}

impl OutputFormat {
    /// File extension for artifacts of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
            OutputFormat::Html => "html",
            OutputFormat::Svg => "svg",
            OutputFormat::Xlsx => "xlsx",
        }
    }

    /// Whether rendering this format needs the headless browser.
    ///
    /// The html adapter persists the assembled markup verbatim and the
    /// workbook adapter is built entirely outside the browser, so both
    /// succeed even when the engine is unavailable.
    pub fn requires_engine(&self) -> bool {
        matches!(self, OutputFormat::Pdf | OutputFormat::Png | OutputFormat::Svg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Declarative description of one chart, independent of how it is drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDefinition {
    /// Unique within a job; doubles as the container element id.
    pub id: String,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(default)]
    pub data: Vec<DataRow>,
    /// Field bindings into the chart's data rows.
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub position: Option<ChartPosition>,
    #[serde(default)]
    pub config: ChartConfig,
}

impl ChartDefinition {
    /// The bound x-field, defaulting to `"x"`.
    pub fn x_field(&self) -> &str {
        self.x.as_deref().unwrap_or("x")
    }

    /// The bound y-field, defaulting to `"y"`.
    pub fn y_field(&self) -> &str {
        self.y.as_deref().unwrap_or("y")
    }
}

/// Declared chart kinds. Only bar, line and pie have rendering routines;
/// the rest degrade to a warning on the job result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
    Histogram,
    Heatmap,
    Treemap,
    Gauge,
    Bubble,
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
            ChartType::Area => "area",
            ChartType::Histogram => "histogram",
            ChartType::Heatmap => "heatmap",
            ChartType::Treemap => "treemap",
            ChartType::Gauge => "gauge",
            ChartType::Bubble => "bubble",
        };
        f.write_str(name)
    }
}

/// Grid placement of a chart within the report layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartPosition {
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub column: u32,
}

/// Per-chart presentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(default = "ChartConfig::default_margins")]
    pub margins: Margins,
    #[serde(default = "ChartConfig::default_colors")]
    pub colors: Vec<String>,
    #[serde(default)]
    pub x_scale: ScaleConfig,
    #[serde(default)]
    pub y_scale: ScaleConfig,
    #[serde(default)]
    pub x_axis: AxisConfig,
    #[serde(default)]
    pub y_axis: AxisConfig,
    #[serde(default)]
    pub legend: LegendConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    /// Interaction flags are declarative only: output is static, so these
    /// are accepted but have no runtime effect.
    #[serde(default)]
    pub interactions: InteractionConfig,
}

impl ChartConfig {
    fn default_margins() -> Margins {
        Margins {
            top: 20.0,
            right: 20.0,
            bottom: 30.0,
            left: 40.0,
        }
    }

    fn default_colors() -> Vec<String> {
        [
            "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
            "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            margins: Self::default_margins(),
            colors: Self::default_colors(),
            x_scale: ScaleConfig::default(),
            y_scale: ScaleConfig::default(),
            x_axis: AxisConfig::default(),
            y_axis: AxisConfig::default(),
            legend: LegendConfig::default(),
            animation: AnimationConfig::default(),
            interactions: InteractionConfig::default(),
        }
    }
}

/// Edge insets, in pixels for charts and millimeters for page layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(20.0)
    }
}

/// Axis scale descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleConfig {
    #[serde(rename = "type", default)]
    pub scale_type: ScaleType,
    /// Explicit domain override; computed from the data when absent.
    #[serde(default)]
    pub domain: Option<(f64, f64)>,
    /// Explicit output range override; derived from the chart's inner
    /// dimensions when absent.
    #[serde(default)]
    pub range: Option<(f64, f64)>,
    #[serde(default)]
    pub nice: bool,
    #[serde(default)]
    pub clamp: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    #[default]
    Linear,
    Log,
    Time,
    Ordinal,
    Band,
}

/// Axis display descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisConfig {
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tick_count: Option<u32>,
    #[serde(default)]
    pub grid: bool,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            show: true,
            label: None,
            tick_count: None,
            grid: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendConfig {
    #[serde(default)]
    pub show: bool,
    #[serde(default)]
    pub position: LegendPosition,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            show: false,
            position: LegendPosition::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    #[default]
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "AnimationConfig::default_duration")]
    pub duration_ms: u64,
}

impl AnimationConfig {
    fn default_duration() -> u64 {
        750
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_ms: Self::default_duration(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default)]
    pub hover: bool,
    #[serde(default)]
    pub tooltip: bool,
    #[serde(default)]
    pub zoom: bool,
    #[serde(default)]
    pub pan: bool,
    #[serde(default)]
    pub brush: bool,
}

/// Page layout of the assembled document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default)]
    pub orientation: Orientation,
    /// Page margins, in millimeters.
    #[serde(default)]
    pub margins: Margins,
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Gap between grid cells, in pixels.
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    #[serde(default)]
    pub header: HeaderFooterConfig,
    #[serde(default)]
    pub footer: HeaderFooterConfig,
    #[serde(default)]
    pub grid: GridConfig,
}

fn default_columns() -> u32 {
    1
}

fn default_spacing() -> f64 {
    16.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            orientation: Orientation::default(),
            margins: Margins::default(),
            columns: default_columns(),
            spacing: default_spacing(),
            header: HeaderFooterConfig::default(),
            footer: HeaderFooterConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
    Tabloid,
}

impl PageSize {
    pub const ALL: [PageSize; 5] = [
        PageSize::A4,
        PageSize::A3,
        PageSize::Letter,
        PageSize::Legal,
        PageSize::Tabloid,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooterConfig {
    #[serde(default)]
    pub show: bool,
    /// Block height in pixels.
    #[serde(default = "HeaderFooterConfig::default_height")]
    pub height: f64,
    #[serde(default)]
    pub content: String,
    /// Raw CSS declarations applied to the block.
    #[serde(default)]
    pub style: Option<String>,
}

impl HeaderFooterConfig {
    fn default_height() -> f64 {
        40.0
    }
}

impl Default for HeaderFooterConfig {
    fn default() -> Self {
        Self {
            show: false,
            height: Self::default_height(),
            content: String::new(),
            style: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_grid_dim")]
    pub rows: u32,
    #[serde(default = "default_grid_dim")]
    pub columns: u32,
    #[serde(default = "default_spacing")]
    pub gap: f64,
}

fn default_grid_dim() -> u32 {
    2
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rows: default_grid_dim(),
            columns: default_grid_dim(),
            gap: default_spacing(),
        }
    }
}

/// Visual styling of the assembled document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylingConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "StylingConfig::default_font_family")]
    pub font_family: String,
    #[serde(default = "StylingConfig::default_font_size")]
    pub font_size: f64,
    /// Explicit overrides on top of the theme palette.
    #[serde(default)]
    pub colors: Option<ColorOverrides>,
    /// Raw CSS rules appended verbatim to the style block.
    #[serde(default)]
    pub custom_rules: Vec<String>,
}

impl StylingConfig {
    fn default_font_family() -> String {
        "Helvetica, Arial, sans-serif".to_string()
    }

    fn default_font_size() -> f64 {
        14.0
    }
}

impl Default for StylingConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_family: Self::default_font_family(),
            font_size: Self::default_font_size(),
            colors: None,
            custom_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Corporate,
    Modern,
    Minimal,
}

/// Fixed palette carried by each theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub background: &'static str,
    pub text: &'static str,
    pub border: &'static str,
}

impl Theme {
    pub fn palette(&self) -> ThemePalette {
        match self {
            Theme::Light => ThemePalette {
                background: "#ffffff",
                text: "#333333",
                border: "#dddddd",
            },
            Theme::Dark => ThemePalette {
                background: "#1a1a1a",
                text: "#e0e0e0",
                border: "#444444",
            },
            Theme::Corporate => ThemePalette {
                background: "#f8f9fa",
                text: "#212529",
                border: "#ced4da",
            },
            Theme::Modern => ThemePalette {
                background: "#fafafa",
                text: "#2d2d2d",
                border: "#e0e0e0",
            },
            Theme::Minimal => ThemePalette {
                background: "#ffffff",
                text: "#000000",
                border: "#eeeeee",
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorOverrides {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub border: Option<String>,
}

/// Free-form report metadata, surfaced in footers and the workbook
/// metadata sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportMetadata {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-job performance hints.
///
/// Only `timeout` is load-bearing today; the concurrency hint does not
/// override the queue's operational cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceHints {
    /// Execution ceiling in milliseconds.
    #[serde(rename = "timeout", default)]
    pub timeout_ms: Option<u64>,
    #[serde(rename = "memoryLimit", default)]
    pub memory_limit_mb: Option<u64>,
    #[serde(default)]
    pub concurrency: Option<u32>,
    #[serde(default)]
    pub cache: bool,
    #[serde(default)]
    pub optimize: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trip() {
        for (name, format) in [
            ("\"pdf\"", OutputFormat::Pdf),
            ("\"png\"", OutputFormat::Png),
            ("\"html\"", OutputFormat::Html),
            ("\"svg\"", OutputFormat::Svg),
            ("\"xlsx\"", OutputFormat::Xlsx),
        ] {
            let parsed: OutputFormat = serde_json::from_str(name).unwrap();
            assert_eq!(parsed, format);
        }
        assert!(serde_json::from_str::<OutputFormat>("\"docx\"").is_err());
    }

    #[test]
    fn test_engine_requirements() {
        assert!(OutputFormat::Pdf.requires_engine());
        assert!(OutputFormat::Png.requires_engine());
        assert!(OutputFormat::Svg.requires_engine());
        assert!(!OutputFormat::Html.requires_engine());
        assert!(!OutputFormat::Xlsx.requires_engine());
    }

    #[test]
    fn test_minimal_options_deserialize() {
        let options: RenderOptions = serde_json::from_str(
            r#"{"title": "Q3 Revenue", "format": "pdf"}"#,
        )
        .unwrap();
        assert_eq!(options.template, "default");
        assert_eq!(options.layout.page_size, PageSize::A4);
        assert_eq!(options.layout.orientation, Orientation::Portrait);
        assert!(options.charts.is_empty());
    }

    #[test]
    fn test_chart_field_defaults() {
        let chart: ChartDefinition = serde_json::from_str(
            r#"{"id": "c1", "type": "bar", "width": 400, "height": 300}"#,
        )
        .unwrap();
        assert_eq!(chart.x_field(), "x");
        assert_eq!(chart.y_field(), "y");
        assert_eq!(chart.config.margins.left, 40.0);
        assert!(!chart.config.interactions.tooltip);
    }

    #[test]
    fn test_scale_overrides_survive_round_trip() {
        let chart: ChartDefinition = serde_json::from_str(
            r#"{"id": "c1", "type": "line", "width": 400, "height": 300,
                "config": {"yScale": {"type": "linear", "domain": [0, 10], "range": [0, 300]}}}"#,
        )
        .unwrap();
        assert_eq!(chart.config.y_scale.domain, Some((0.0, 10.0)));
        assert_eq!(chart.config.y_scale.range, Some((0.0, 300.0)));

        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["config"]["yScale"]["range"], serde_json::json!([0.0, 300.0]));
    }

    #[test]
    fn test_theme_palettes_distinct() {
        let light = Theme::Light.palette();
        let dark = Theme::Dark.palette();
        assert_ne!(light.background, dark.background);
        assert_eq!(light.background, "#ffffff");
    }
}

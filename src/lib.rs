//! Report Rendering Pipeline
//!
//! Asynchronous pipeline that turns a declarative report description
//! (tabular data, chart definitions, layout, styling) into a rendered
//! artifact: pdf, png, svg, html or xlsx.
//!
//! ## Module Overview
//!
//! - `queue`: FIFO render queue with a bounded worker pool
//! - `browser`: shared headless Chrome engine and per-job execution contexts
//! - `document`: self-contained HTML document assembly
//! - `charts`: chart descriptors compiled to typed drawing instructions
//! - `export`: pdf/png/svg/html format adapters
//! - `workbook`: browser-independent xlsx adapter
//! - `geometry`: paper size and orientation to pixel dimensions
//! - `telemetry`: OpenTelemetry integration and structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use report_renderer::{ChromeEngine, RenderQueue, RendererConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::from_env();
//!     let engine = Arc::new(ChromeEngine::new(&config));
//!     engine.init()?;
//!
//!     let queue = RenderQueue::new(engine.clone(), config);
//!     let options = serde_json::from_str(
//!         r#"{"title": "Quarterly Report", "format": "pdf"}"#,
//!     )?;
//!     let result = queue.render(options).await?;
//!     assert!(result.success);
//!
//!     engine.teardown();
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod charts;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod geometry;
pub mod job;
pub mod options;
pub mod queue;
pub mod telemetry;
pub mod workbook;

pub use browser::{ChromeEngine, ExecutionContext, RenderEngine};
pub use config::RendererConfig;
pub use error::RenderError;
pub use job::{RenderResult, ResultMetadata};
pub use options::{
    ChartDefinition, ChartType, LayoutConfig, Orientation, OutputFormat, PageSize, RenderOptions,
    StylingConfig, Theme,
};
pub use queue::RenderQueue;

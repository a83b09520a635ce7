//! Browser session management: one shared headless Chrome engine for the
//! process lifetime, with an isolated execution context ("page") per job.
//!
//! The engine is an explicitly owned resource with `init()`/`teardown()`
//! lifecycle methods, injected into the render queue rather than held as
//! global state. Jobs whose format needs the browser fail with an
//! initialization error while the engine is unavailable; workbook and html
//! jobs are unaffected.

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::options::Margins;
use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::{Bounds, PrintToPdfOptions};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Fixed pixel-density factor for crisp raster capture.
pub const DEVICE_PIXEL_RATIO: f64 = 2.0;

/// Chrome print settings derived from the report layout, all in inches.
#[derive(Debug, Clone)]
pub struct PdfSettings {
    pub landscape: bool,
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub margins_in: Margins,
}

/// The shared rendering resource.
///
/// `open_context` hands out an isolated per-job context; no two jobs share
/// mutable page state.
#[cfg_attr(test, mockall::automock)]
pub trait RenderEngine: Send + Sync {
    /// Whether the engine has been initialized and can open contexts.
    fn is_available(&self) -> bool;

    /// Opens an isolated execution context sized to the given page pixels,
    /// with `timeout` as its hard execution ceiling.
    fn open_context(
        &self,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<Box<dyn ExecutionContext>, RenderError>;
}

/// One isolated per-job page within the shared engine.
///
/// Contexts must be closed after use on success, failure and timeout paths.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionContext: Send {
    /// Loads the assembled markup document into the page.
    fn load_document(&self, html: &str) -> Result<()>;

    /// Injects a compiled SVG fragment into the chart container with the
    /// given id. Fails if the container does not exist in the document.
    fn inject_chart(&self, container_id: &str, svg: &str) -> Result<()>;

    /// Prints the current page to PDF bytes.
    fn print_pdf(&self, settings: &PdfSettings) -> Result<Vec<u8>>;

    /// Captures a full-page PNG at [`DEVICE_PIXEL_RATIO`] scale.
    fn capture_png(&self) -> Result<Vec<u8>>;

    /// Serialized markup of the first inline `<svg>` root in the executed
    /// document, or `None` when the document contains no vector content.
    fn extract_svg(&self) -> Result<Option<String>>;

    /// Releases the context.
    fn close(&self) -> Result<()>;
}

/// Headless Chrome implementation of [`RenderEngine`].
pub struct ChromeEngine {
    browser: Mutex<Option<Browser>>,
    chrome_path: Option<PathBuf>,
}

impl ChromeEngine {
    /// Creates the engine in the uninitialized ("unavailable") state.
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            browser: Mutex::new(None),
            chrome_path: config.chrome_path.clone(),
        }
    }

    /// Launches the shared browser. Idempotent; a failed launch leaves the
    /// engine unavailable.
    pub fn init(&self) -> Result<(), RenderError> {
        let mut guard = self
            .browser
            .lock()
            .map_err(|_| RenderError::Initialization("engine lock poisoned".into()))?;
        if guard.is_some() {
            return Ok(());
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1280, 1024)))
            .path(self.chrome_path.clone())
            .build()
            .map_err(|e| RenderError::Initialization(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| RenderError::Initialization(format!("failed to launch Chrome: {e:#}")))?;
        *guard = Some(browser);

        info!("headless browser started");
        Ok(())
    }

    /// Shuts the shared browser down. Subsequent engine-dependent jobs fail
    /// with an initialization error until `init` is called again.
    pub fn teardown(&self) {
        if let Ok(mut guard) = self.browser.lock() {
            if guard.take().is_some() {
                info!("headless browser stopped");
            }
        }
    }
}

impl RenderEngine for ChromeEngine {
    fn is_available(&self) -> bool {
        self.browser.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn open_context(
        &self,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<Box<dyn ExecutionContext>, RenderError> {
        let guard = self
            .browser
            .lock()
            .map_err(|_| RenderError::Initialization("engine lock poisoned".into()))?;
        let browser = guard
            .as_ref()
            .ok_or_else(|| RenderError::Initialization("browser not initialized".into()))?;

        let tab = browser.new_tab()?;
        tab.set_default_timeout(timeout);
        tab.set_bounds(Bounds::Normal {
            left: None,
            top: None,
            width: Some(width as f64),
            height: Some(height as f64),
        })?;

        debug!(width, height, "opened execution context");
        Ok(Box::new(ChromePage {
            tab,
            width: width as f64,
            height: height as f64,
        }))
    }
}

/// One Chrome tab acting as an isolated execution context.
struct ChromePage {
    tab: Arc<Tab>,
    width: f64,
    height: f64,
}

impl ExecutionContext for ChromePage {
    fn load_document(&self, html: &str) -> Result<()> {
        // Data URL keeps the document self-contained; no disk or network I/O.
        let url = format!("data:text/html;base64,{}", BASE64.encode(html));
        self.tab.navigate_to(&url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn inject_chart(&self, container_id: &str, svg: &str) -> Result<()> {
        let js = format!(
            "(() => {{ const el = document.getElementById({id}); \
             if (!el) return false; el.innerHTML = {svg}; return true; }})()",
            id = serde_json::to_string(container_id)?,
            svg = serde_json::to_string(svg)?,
        );
        let result = self.tab.evaluate(&js, false)?;
        match result.value {
            Some(serde_json::Value::Bool(true)) => Ok(()),
            _ => bail!("chart container '{container_id}' not found in document"),
        }
    }

    fn print_pdf(&self, settings: &PdfSettings) -> Result<Vec<u8>> {
        let options = PrintToPdfOptions {
            landscape: Some(settings.landscape),
            print_background: Some(true),
            paper_width: Some(settings.paper_width_in),
            paper_height: Some(settings.paper_height_in),
            margin_top: Some(settings.margins_in.top),
            margin_bottom: Some(settings.margins_in.bottom),
            margin_left: Some(settings.margins_in.left),
            margin_right: Some(settings.margins_in.right),
            ..Default::default()
        };
        Ok(self.tab.print_to_pdf(Some(options))?)
    }

    fn capture_png(&self) -> Result<Vec<u8>> {
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.width,
            height: self.height,
            scale: DEVICE_PIXEL_RATIO,
        };
        Ok(self.tab.capture_screenshot(
            Page::CaptureScreenshotFormatOption::Png,
            None,
            Some(clip),
            true,
        )?)
    }

    fn extract_svg(&self) -> Result<Option<String>> {
        let result = self.tab.evaluate(
            "(() => { const el = document.querySelector('svg'); \
             return el ? el.outerHTML : null; })()",
            false,
        )?;
        match result.value {
            Some(serde_json::Value::String(markup)) => Ok(Some(markup)),
            _ => Ok(None),
        }
    }

    fn close(&self) -> Result<()> {
        self.tab.close(true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_engine_is_unavailable() {
        let engine = ChromeEngine::new(&RendererConfig::default());
        assert!(!engine.is_available());

        let err = engine
            .open_context(794, 1123, Duration::from_secs(30))
            .err()
            .expect("context without browser must fail");
        assert!(matches!(err, RenderError::Initialization(_)));
    }

    #[test]
    fn test_teardown_without_init_is_noop() {
        let engine = ChromeEngine::new(&RendererConfig::default());
        engine.teardown();
        assert!(!engine.is_available());
    }

    // Requires a local Chrome/Chromium install.
    // Run with: cargo test -- --ignored
    #[test]
    #[ignore]
    fn test_chrome_load_and_extract() {
        let engine = ChromeEngine::new(&RendererConfig::default());
        engine.init().unwrap();
        assert!(engine.is_available());

        let ctx = engine
            .open_context(794, 1123, Duration::from_secs(30))
            .unwrap();
        ctx.load_document("<html><body><div id=\"c1\"></div></body></html>")
            .unwrap();
        assert!(ctx.extract_svg().unwrap().is_none());

        ctx.inject_chart("c1", "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>")
            .unwrap();
        assert!(ctx.extract_svg().unwrap().is_some());

        ctx.close().unwrap();
        engine.teardown();
        assert!(!engine.is_available());
    }
}

//! Renderer configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Operational configuration for the render queue and browser engine.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Maximum number of concurrently executing render jobs.
    ///
    /// This is a fixed operational constant. The per-job
    /// `performance.concurrency` hint is accepted on [`crate::options::RenderOptions`]
    /// but is not load-bearing here.
    pub max_concurrency: usize,
    /// Directory for generated artifacts when no explicit output path is given.
    pub output_dir: PathBuf,
    /// Default per-job execution ceiling, overridable via `performance.timeout`.
    pub default_timeout: Duration,
    /// Explicit Chrome/Chromium binary path; autodetected when `None`.
    pub chrome_path: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            output_dir: PathBuf::from("./output"),
            default_timeout: Duration::from_secs(30),
            chrome_path: None,
        }
    }
}

impl RendererConfig {
    /// Loads configuration from environment variables.
    ///
    /// - `RENDER_MAX_CONCURRENCY`: concurrent job cap (default: 4)
    /// - `RENDER_OUTPUT_DIR`: artifact directory (default: ./output)
    /// - `RENDER_TIMEOUT_SECONDS`: default job timeout (default: 30)
    /// - `CHROME_PATH`: Chrome binary path (default: autodetect)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_concurrency = std::env::var("RENDER_MAX_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_concurrency);

        let output_dir = std::env::var("RENDER_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let default_timeout = std::env::var("RENDER_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_timeout);

        let chrome_path = std::env::var("CHROME_PATH").ok().map(PathBuf::from);

        Self {
            max_concurrency,
            output_dir,
            default_timeout,
            chrome_path,
        }
    }
}

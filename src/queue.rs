//! Render queue and concurrency controller.
//!
//! An unbounded in-process FIFO feeds a bounded worker pool: the dispatcher
//! acquires a semaphore permit before pulling the next job, so admission is
//! FIFO and at most `max_concurrency` jobs execute at once. Completion order
//! across concurrently admitted jobs is not guaranteed.

use crate::browser::RenderEngine;
use crate::charts::{self, ChartScript};
use crate::config::RendererConfig;
use crate::document;
use crate::error::RenderError;
use crate::export;
use crate::geometry;
use crate::job::{RenderJob, RenderResult, ResultMetadata};
use crate::options::{OutputFormat, RenderOptions};
use crate::telemetry;
use crate::workbook;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, error, info, warn};

/// Fixed settle delay after chart injection, standing in for a completion
/// signal from the page.
const CHART_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Accepts render requests and drives the pipeline to completion per job.
///
/// Must be created inside a Tokio runtime; the dispatcher runs as a
/// background task for the queue's lifetime.
pub struct RenderQueue {
    tx: mpsc::UnboundedSender<RenderJob>,
}

impl RenderQueue {
    /// Creates the queue with an injected rendering engine.
    pub fn new(engine: Arc<dyn RenderEngine>, config: RendererConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_loop(rx, engine, config));
        Self { tx }
    }

    /// Enqueues a render request.
    ///
    /// Structurally invalid options are rejected here, synchronously, with
    /// a validation error. Once enqueued, a job never fails out of band: it
    /// resolves to exactly one [`RenderResult`], carrying any failure in its
    /// `errors` list.
    pub fn submit(
        &self,
        options: RenderOptions,
    ) -> Result<oneshot::Receiver<RenderResult>, RenderError> {
        validate(&options)?;
        let (done_tx, done_rx) = oneshot::channel();
        let job = RenderJob::new(options, done_tx);
        info!(job_id = %job.job_id, format = %job.options.format, "job enqueued");
        self.tx.send(job).map_err(|_| RenderError::QueueClosed)?;
        Ok(done_rx)
    }

    /// Submits and awaits the result.
    pub async fn render(&self, options: RenderOptions) -> Result<RenderResult, RenderError> {
        let receiver = self.submit(options)?;
        receiver.await.map_err(|_| RenderError::QueueClosed)
    }
}

fn validate(options: &RenderOptions) -> Result<(), RenderError> {
    if options.title.trim().is_empty() {
        return Err(RenderError::Validation("title must not be empty".into()));
    }
    let mut seen = HashSet::new();
    for chart in &options.charts {
        if !seen.insert(chart.id.as_str()) {
            return Err(RenderError::Validation(format!(
                "duplicate chart id '{}'",
                chart.id
            )));
        }
        if chart.width == 0 || chart.height == 0 {
            return Err(RenderError::Validation(format!(
                "chart '{}' has zero width or height",
                chart.id
            )));
        }
    }
    Ok(())
}

async fn dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<RenderJob>,
    engine: Arc<dyn RenderEngine>,
    config: RendererConfig,
) {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
    info!(max_concurrency = config.max_concurrency, "render queue started");

    while let Some(job) = rx.recv().await {
        // Admission gate: the permit is held before the job starts and
        // released when it completes, so the pool never over-admits.
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        telemetry::record_queue_depth(semaphore.available_permits());

        let engine = engine.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let RenderJob {
                job_id,
                options,
                enqueued_at,
                completion,
            } = job;
            let queued_ms = (chrono::Utc::now() - enqueued_at).num_milliseconds();
            debug!(job_id = %job_id, queued_ms, "job admitted");

            let result = process_job(job_id, options, engine, &config).await;
            telemetry::record_job_telemetry(&result);
            if completion.send(result).is_err() {
                warn!("job result receiver dropped before delivery");
            }
            drop(permit);
        });
    }
    info!("render queue stopped");
}

/// Processes a single render job to a result. Never panics across the job
/// boundary: all failures fold into the result's error list.
async fn process_job(
    job_id: String,
    options: RenderOptions,
    engine: Arc<dyn RenderEngine>,
    config: &RendererConfig,
) -> RenderResult {
    let started = Instant::now();
    let format = options.format;
    let chart_count = options.charts.len();
    let data_point_count = options.data.len();
    info!(job_id = %job_id, format = %format, "processing render job");

    let mut warnings = Vec::new();
    match run_pipeline(options, engine, config, &mut warnings).await {
        Ok((output_path, size_bytes, content)) => {
            let duration_ms = started.elapsed().as_millis() as i64;
            info!(job_id = %job_id, duration_ms, size_bytes, "render job complete");
            RenderResult {
                job_id,
                success: true,
                output_path,
                format,
                size_bytes,
                duration_ms,
                metadata: ResultMetadata {
                    page_count: 1,
                    chart_count,
                    data_point_count,
                    errors: Vec::new(),
                    warnings,
                },
                content,
            }
        }
        Err(e) => {
            let duration_ms = started.elapsed().as_millis() as i64;
            error!(job_id = %job_id, duration_ms, error = %e, "render job failed");
            RenderResult {
                job_id,
                success: false,
                output_path: None,
                format,
                size_bytes: 0,
                duration_ms,
                metadata: ResultMetadata {
                    page_count: 0,
                    chart_count,
                    data_point_count,
                    errors: vec![e.to_string()],
                    warnings,
                },
                content: None,
            }
        }
    }
}

async fn run_pipeline(
    options: RenderOptions,
    engine: Arc<dyn RenderEngine>,
    config: &RendererConfig,
    warnings: &mut Vec<String>,
) -> Result<(Option<String>, u64, Option<Vec<u8>>), RenderError> {
    let timeout = options
        .performance
        .as_ref()
        .and_then(|p| p.timeout_ms)
        .map(Duration::from_millis)
        .unwrap_or(config.default_timeout);
    let format = options.format;

    // Charts are compiled up front: unsupported kinds warn for every format,
    // and the compiled fragments are what the execution context receives.
    let scripts: Vec<ChartScript> = options.charts.iter().map(charts::compile_chart).collect();
    warnings.extend(scripts.iter().filter_map(|s| s.warning.clone()));

    if format.requires_engine() && !engine.is_available() {
        return Err(RenderError::Initialization(
            "rendering engine is unavailable".into(),
        ));
    }

    match format {
        OutputFormat::Xlsx => {
            // The workbook adapter bypasses the browser entirely; it must
            // succeed even while the engine is unavailable.
            let path = export::resolve_output_path(&options, &config.output_dir);
            let task_path = path.clone();
            let build = tokio::task::spawn_blocking(move || {
                workbook::export_workbook(&options, &task_path)
            });
            let size = tokio::time::timeout(timeout, build)
                .await
                .map_err(|_| RenderError::Timeout(timeout.as_millis() as u64))?
                .map_err(|e| RenderError::Engine(anyhow::anyhow!(e)))??;
            Ok((Some(path.display().to_string()), size, None))
        }
        OutputFormat::Html => {
            let markup = document::assemble_document(&options);
            let path = options.output_path.as_ref().map(PathBuf::from);
            let (size, content) = export::export_html(&markup, path.as_deref())?;
            Ok((path.map(|p| p.display().to_string()), size, content))
        }
        OutputFormat::Pdf | OutputFormat::Png | OutputFormat::Svg => {
            let path = export::resolve_output_path(&options, &config.output_dir);
            let markup = document::assemble_document(&options);
            let (width, height) =
                geometry::page_pixels(options.layout.page_size, options.layout.orientation);

            let task_path = path.clone();
            let render = tokio::task::spawn_blocking(move || -> Result<u64, RenderError> {
                let ctx = engine.open_context(width, height, timeout)?;
                let outcome = (|| -> Result<u64, RenderError> {
                    ctx.load_document(&markup)?;
                    for script in &scripts {
                        if let Some(svg) = &script.svg {
                            ctx.inject_chart(&script.chart_id, svg)?;
                        }
                    }
                    std::thread::sleep(CHART_SETTLE_DELAY);
                    match format {
                        OutputFormat::Pdf => export::export_pdf(ctx.as_ref(), &options, &task_path),
                        OutputFormat::Png => export::export_png(ctx.as_ref(), &task_path),
                        OutputFormat::Svg => export::export_svg(ctx.as_ref(), &task_path),
                        _ => unreachable!("engine formats handled above"),
                    }
                })();
                // Context release is unconditional. A timed-out job's
                // blocking task keeps running past the deadline and still
                // reaches this close.
                if let Err(e) = ctx.close() {
                    warn!(error = %e, "failed to close execution context");
                }
                outcome
            });

            let timeout_ms = timeout.as_millis() as u64;
            match tokio::time::timeout(timeout, render).await {
                Err(_) => Err(RenderError::Timeout(timeout_ms)),
                Ok(Err(join_error)) => Err(RenderError::Engine(anyhow::anyhow!(join_error))),
                Ok(Ok(outcome)) => {
                    outcome.map(|size| (Some(path.display().to_string()), size, None))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{MockExecutionContext, MockRenderEngine};
    use serde_json::json;

    fn options(value: serde_json::Value) -> RenderOptions {
        serde_json::from_value(value).unwrap()
    }

    fn unavailable_engine() -> Arc<dyn RenderEngine> {
        let mut engine = MockRenderEngine::new();
        engine.expect_is_available().return_const(false);
        Arc::new(engine)
    }

    #[tokio::test]
    async fn test_duplicate_chart_ids_rejected_synchronously() {
        let queue = RenderQueue::new(unavailable_engine(), RendererConfig::default());
        let err = queue
            .submit(options(json!({
                "title": "r",
                "format": "pdf",
                "charts": [
                    {"id": "c1", "type": "bar", "width": 100, "height": 100},
                    {"id": "c1", "type": "line", "width": 100, "height": 100},
                ],
            })))
            .err()
            .expect("duplicate ids must be rejected");
        assert!(matches!(err, RenderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let queue = RenderQueue::new(unavailable_engine(), RendererConfig::default());
        let err = queue
            .submit(options(json!({"title": "  ", "format": "html"})))
            .err()
            .expect("blank title must be rejected");
        assert!(matches!(err, RenderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_pdf_fails_when_engine_unavailable() {
        let queue = RenderQueue::new(unavailable_engine(), RendererConfig::default());
        let result = queue
            .render(options(json!({"title": "r", "format": "pdf"})))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output_path.is_none());
        assert!(result.metadata.errors[0].contains("unavailable"));
    }

    #[tokio::test]
    async fn test_xlsx_succeeds_when_engine_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.xlsx");
        let queue = RenderQueue::new(unavailable_engine(), RendererConfig::default());
        let result = queue
            .render(options(json!({
                "title": "r",
                "format": "xlsx",
                "data": [{"a": 1}],
                "outputPath": out.to_str().unwrap(),
            })))
            .await
            .unwrap();
        assert!(result.success, "errors: {:?}", result.metadata.errors);
        assert!(out.exists());
    }

    #[tokio::test]
    async fn test_html_returned_in_memory_without_path() {
        let queue = RenderQueue::new(unavailable_engine(), RendererConfig::default());
        let result = queue
            .render(options(json!({"title": "Memo", "format": "html"})))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output_path.is_none());
        let content = String::from_utf8(result.content.unwrap()).unwrap();
        assert!(content.contains("<h1>Memo</h1>"));
        assert_eq!(result.size_bytes as usize, content.len());
    }

    #[tokio::test]
    async fn test_unsupported_chart_warns_without_failing_job() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.html");
        let queue = RenderQueue::new(unavailable_engine(), RendererConfig::default());
        let result = queue
            .render(options(json!({
                "title": "r",
                "format": "html",
                "charts": [
                    {"id": "ok", "type": "bar", "width": 100, "height": 100},
                    {"id": "nope", "type": "treemap", "width": 100, "height": 100},
                ],
                "outputPath": out.to_str().unwrap(),
            })))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.metadata.warnings.len(), 1);
        assert!(result.metadata.warnings[0].contains("treemap"));
    }

    #[tokio::test]
    async fn test_xlsx_honors_execution_ceiling() {
        let rows: Vec<_> = (0..20_000)
            .map(|i| json!({"id": i, "name": format!("item-{i}"), "qty": i * 3}))
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let queue = RenderQueue::new(unavailable_engine(), RendererConfig::default());
        let result = queue
            .render(options(json!({
                "title": "big",
                "format": "xlsx",
                "data": rows,
                "outputPath": dir.path().join("big.xlsx").to_str().unwrap(),
                "performance": {"timeout": 1},
            })))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.metadata.errors[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_timeout_fails_only_that_job() {
        let mut engine = MockRenderEngine::new();
        engine.expect_is_available().return_const(true);
        engine.expect_open_context().returning(|_, _, _| {
            let mut ctx = MockExecutionContext::new();
            ctx.expect_load_document().returning(|_| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            });
            ctx.expect_extract_svg().returning(|| Ok(None));
            ctx.expect_close().returning(|| Ok(()));
            Ok(Box::new(ctx))
        });

        let dir = tempfile::tempdir().unwrap();
        let queue = RenderQueue::new(Arc::new(engine), RendererConfig::default());
        let result = queue
            .render(options(json!({
                "title": "slow",
                "format": "svg",
                "outputPath": dir.path().join("slow.svg").to_str().unwrap(),
                "performance": {"timeout": 50},
            })))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.metadata.errors[0].contains("timed out"));
        assert!(result.duration_ms >= 0, "duration recorded on failure");
    }
}

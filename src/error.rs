//! Error taxonomy for the report rendering pipeline.

use thiserror::Error;

/// Errors produced by the rendering pipeline.
///
/// Per-job errors never escape the pipeline: every submitted job resolves to
/// a [`crate::job::RenderResult`], and failures are folded into its `errors`
/// list. `Validation` is the one exception, surfaced synchronously at
/// submission time before a job is enqueued.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The rendering engine could not be started or is unavailable.
    ///
    /// Fatal for formats that need the browser (pdf/png/svg); the workbook
    /// and html adapters must still succeed.
    #[error("rendering engine unavailable: {0}")]
    Initialization(String),

    /// The job exceeded its execution ceiling.
    #[error("render timed out after {0} ms")]
    Timeout(u64),

    /// A chart declared a type with no rendering routine.
    ///
    /// Recorded as a warning on the job result, never a hard failure.
    #[error("unsupported chart type: {0}")]
    UnsupportedChart(String),

    /// Output file could not be written.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// Input structurally incompatible with the pipeline, rejected before
    /// enqueueing.
    #[error("invalid render options: {0}")]
    Validation(String),

    /// Workbook construction failed.
    #[error("workbook build failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// The queue's dispatcher has shut down.
    #[error("render queue is closed")]
    QueueClosed,

    /// Engine-internal failure from the browser layer.
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

//! Job and result models for the render queue.

use crate::options::{OutputFormat, RenderOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

/// One accepted render request, owned exclusively by the queue until
/// dequeued and consumed by exactly one worker.
pub struct RenderJob {
    pub job_id: String,
    pub options: RenderOptions,
    pub enqueued_at: DateTime<Utc>,
    /// Delivers the job's single result back to the submitter.
    pub(crate) completion: oneshot::Sender<RenderResult>,
}

impl RenderJob {
    pub(crate) fn new(options: RenderOptions, completion: oneshot::Sender<RenderResult>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            options,
            enqueued_at: Utc::now(),
            completion,
        }
    }
}

/// Outcome of one render job. Every submitted job resolves to exactly one
/// of these, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub job_id: String,
    pub success: bool,
    /// Absent on failure, and for in-memory html delivery.
    pub output_path: Option<String>,
    pub format: OutputFormat,
    pub size_bytes: u64,
    /// Recorded on failures too, for observability.
    pub duration_ms: i64,
    pub metadata: ResultMetadata,
    /// In-memory document bytes, populated only for html without an
    /// explicit output path.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub page_count: u32,
    pub chart_count: usize,
    pub data_point_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

//! Format adapters: turn an executed document into bytes on disk.

use crate::browser::{ExecutionContext, PdfSettings};
use crate::error::RenderError;
use crate::geometry;
use crate::options::{Margins, Orientation, RenderOptions};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fallback for documents with no inline vector content. A defined result,
/// not an error.
pub const EMPTY_SVG_ROOT: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\"/>";

const MM_PER_INCH: f64 = 25.4;

/// Resolves the artifact path: the explicit `outputPath` when present,
/// otherwise `{output_dir}/report-{epoch_millis}.{ext}`.
pub fn resolve_output_path(options: &RenderOptions, output_dir: &Path) -> PathBuf {
    match &options.output_path {
        Some(path) => PathBuf::from(path),
        None => output_dir.join(format!(
            "report-{}.{}",
            Utc::now().timestamp_millis(),
            options.format.extension()
        )),
    }
}

/// Prints the executed document to PDF and writes it to `path`.
///
/// Paper dimensions come from the geometry table in portrait; Chrome applies
/// the rotation itself when the landscape flag is set.
pub fn export_pdf(
    ctx: &dyn ExecutionContext,
    options: &RenderOptions,
    path: &Path,
) -> Result<u64, RenderError> {
    let layout = &options.layout;
    let (paper_width_in, paper_height_in) =
        geometry::page_inches(layout.page_size, Orientation::Portrait);
    let settings = PdfSettings {
        landscape: layout.orientation == Orientation::Landscape,
        paper_width_in,
        paper_height_in,
        margins_in: Margins {
            top: layout.margins.top / MM_PER_INCH,
            right: layout.margins.right / MM_PER_INCH,
            bottom: layout.margins.bottom / MM_PER_INCH,
            left: layout.margins.left / MM_PER_INCH,
        },
    };
    let bytes = ctx.print_pdf(&settings)?;
    write_artifact(path, &bytes)
}

/// Captures a full-page raster of the executed document.
pub fn export_png(ctx: &dyn ExecutionContext, path: &Path) -> Result<u64, RenderError> {
    let bytes = ctx.capture_png()?;
    write_artifact(path, &bytes)
}

/// Extracts the first inline SVG root from the executed document, falling
/// back to a well-formed empty root when none exists.
pub fn export_svg(ctx: &dyn ExecutionContext, path: &Path) -> Result<u64, RenderError> {
    let markup = ctx
        .extract_svg()?
        .unwrap_or_else(|| EMPTY_SVG_ROOT.to_string());
    write_artifact(path, markup.as_bytes())
}

/// Persists the assembled markup verbatim when a path is requested,
/// otherwise returns it for in-memory delivery. Needs neither the engine
/// nor successful chart execution.
pub fn export_html(
    document: &str,
    path: Option<&Path>,
) -> Result<(u64, Option<Vec<u8>>), RenderError> {
    match path {
        Some(path) => {
            let size = write_artifact(path, document.as_bytes())?;
            Ok((size, None))
        }
        None => Ok((document.len() as u64, Some(document.as_bytes().to_vec()))),
    }
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<u64, RenderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(bytes.len() as u64)
}

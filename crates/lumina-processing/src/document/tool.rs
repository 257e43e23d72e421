//! External document tool abstraction and its poppler implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::poppler;
use crate::command::{validate_binary, validate_path};
use crate::error::{ProcessingError, ProcessingResult};

/// Operations the derivative path needs for multi-page documents.
#[async_trait]
pub trait DocumentTool: Send + Sync {
    /// Number of pages in the document, at least 1.
    async fn page_count(&self, path: &Path) -> ProcessingResult<u32>;

    /// Encoded PNG of the 0-based `page`.
    async fn render_page(&self, path: &Path, page: u32) -> ProcessingResult<Vec<u8>>;
}

/// Runs the poppler `pdfinfo` and `pdftoppm` binaries as child processes.
#[derive(Debug, Clone)]
pub struct PopplerTool {
    pdfinfo_path: String,
    pdftoppm_path: String,
    dpi: u32,
}

impl PopplerTool {
    pub fn new(
        pdfinfo_path: impl Into<String>,
        pdftoppm_path: impl Into<String>,
        dpi: u32,
    ) -> ProcessingResult<Self> {
        let pdfinfo_path = pdfinfo_path.into();
        let pdftoppm_path = pdftoppm_path.into();
        validate_binary(&pdfinfo_path)?;
        validate_binary(&pdftoppm_path)?;

        Ok(Self {
            pdfinfo_path,
            pdftoppm_path,
            dpi,
        })
    }
}

#[async_trait]
impl DocumentTool for PopplerTool {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "pdfinfo",
        process.executable.path = %self.pdfinfo_path
    ))]
    async fn page_count(&self, path: &Path) -> ProcessingResult<u32> {
        validate_path(path)?;

        let output = Command::new(&self.pdfinfo_path)
            .args(poppler::info_args(path))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ProcessingError::ProbeFailed(format!("Failed to execute pdfinfo: {}", e))
            })?;

        if !output.status.success() {
            return Err(ProcessingError::ProbeFailed(format!(
                "pdfinfo failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let pages = poppler::parse_page_count(&output.stdout)?;
        tracing::debug!(pages = pages, "Document probe completed");
        Ok(pages)
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "pdftoppm",
        dpi = self.dpi
    ))]
    async fn render_page(&self, path: &Path, page: u32) -> ProcessingResult<Vec<u8>> {
        let start = std::time::Instant::now();
        validate_path(path)?;

        let scratch = tempfile::tempdir()?;
        let output = Command::new(&self.pdftoppm_path)
            .args(poppler::render_args(path, scratch.path(), page, self.dpi))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProcessingError::RenderFailed(format!("Failed to execute pdftoppm: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(stderr = %stderr, "Page rendering failed");
            return Err(ProcessingError::RenderFailed(format!(
                "pdftoppm failed: {}",
                stderr
            )));
        }

        let png = match tokio::fs::read(scratch.path().join(poppler::RENDERED_PAGE_FILE)).await {
            Ok(png) if !png.is_empty() => png,
            _ => {
                return Err(ProcessingError::RenderFailed(format!(
                    "no page {} in {}",
                    page + 1,
                    path.display()
                )))
            }
        };

        tracing::debug!(
            duration_ms = start.elapsed().as_millis(),
            size_bytes = png.len(),
            "Document page rendered"
        );
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unsafe_binary_paths() {
        assert!(PopplerTool::new("pdfinfo", "pdftoppm", 150).is_ok());
        assert!(PopplerTool::new("/usr/bin/pdfinfo", "pdftoppm | sh", 150).is_err());
    }

    #[tokio::test]
    async fn test_render_rejects_traversal_before_spawning() {
        let tool = PopplerTool::new("pdfinfo", "pdftoppm", 150).unwrap();
        let result = tool.render_page(Path::new("/docs/../etc/shadow"), 0).await;
        assert!(matches!(result, Err(ProcessingError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_missing_pdfinfo_fails_page_count() {
        let tool = PopplerTool::new("/nonexistent/pdfinfo", "pdftoppm", 150).unwrap();
        let result = tool.page_count(Path::new("/docs/report.pdf")).await;
        assert!(matches!(result, Err(ProcessingError::ProbeFailed(_))));
    }
}

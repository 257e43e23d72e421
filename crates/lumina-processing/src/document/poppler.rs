//! Argument builders and output parsing for pdfinfo/pdftoppm.

use std::path::Path;

use crate::error::{ProcessingError, ProcessingResult};

pub fn info_args(input: &Path) -> Vec<String> {
    vec![input.to_string_lossy().to_string()]
}

/// File name pdftoppm writes for `output_root` in single-file mode.
pub const RENDERED_PAGE_FILE: &str = "page.png";
const OUTPUT_ROOT: &str = "page";

/// Rasterize the 0-based `page` of `input` to `RENDERED_PAGE_FILE` inside
/// `output_dir`.
pub fn render_args(input: &Path, output_dir: &Path, page: u32, dpi: u32) -> Vec<String> {
    let page = (page + 1).to_string();
    vec![
        "-f".to_string(),
        page.clone(),
        "-l".to_string(),
        page,
        "-r".to_string(),
        dpi.to_string(),
        "-png".to_string(),
        "-singlefile".to_string(),
        input.to_string_lossy().to_string(),
        output_dir.join(OUTPUT_ROOT).to_string_lossy().to_string(),
    ]
}

/// Page count from the `Pages:` line of pdfinfo output.
pub fn parse_page_count(output: &[u8]) -> ProcessingResult<u32> {
    let text = String::from_utf8_lossy(output);
    let value = text
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .ok_or_else(|| ProcessingError::ProbeFailed("pdfinfo reported no page count".into()))?;

    let pages: u32 = value.trim().parse().map_err(|_| {
        ProcessingError::ProbeFailed(format!("Invalid page count: {}", value.trim()))
    })?;
    if pages == 0 {
        return Err(ProcessingError::ProbeFailed("document has no pages".into()));
    }
    Ok(pages)
}

//! Page counting and page rasterization for multi-page documents through
//! the poppler command line tools.

pub mod poppler;
pub mod tool;

pub use tool::{DocumentTool, PopplerTool};

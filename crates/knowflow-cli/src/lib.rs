//! KnowFlow CLI - drive the incremental extraction pipeline from a terminal.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::CliConfig;
pub use error::{CliError, Result};

use knowflow_domain::traits::PageRasterizer;

/// Placeholder for the PDF rasterization collaborator.
///
/// Rasterization is an external capability this binary does not bundle;
/// PDF operations fail with a clear message until a backend is wired in.
pub struct UnavailableRasterizer;

impl PageRasterizer for UnavailableRasterizer {
    type Error = String;

    fn page_count(&self, _pdf: &[u8]) -> std::result::Result<u32, Self::Error> {
        Err("PDF rasterization backend is not configured".to_string())
    }

    fn rasterize_png(&self, _pdf: &[u8], _page: u32) -> std::result::Result<Vec<u8>, Self::Error> {
        Err("PDF rasterization backend is not configured".to_string())
    }
}

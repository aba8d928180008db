//! `knowflow ingest` - create a sidecar for a source file.

use crate::error::{CliError, Result};
use crate::UnavailableRasterizer;
use knowflow_domain::traits::PageRasterizer;
use knowflow_domain::{Document, SourceDescriptor, SourceKind, SourcePayload};
use knowflow_store::{save, sidecar_path, SidecarFile, SourceFileType};
use std::path::Path;

pub async fn execute_ingest(file: &Path) -> Result<()> {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let file_type = SourceFileType::from_extension(extension).ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "unsupported file type '{}' (expected txt, md, pdf, png, jpg, jpeg)",
            extension
        ))
    })?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::InvalidArgument("path has no file name".to_string()))?;

    let source = match file_type.source_kind() {
        SourceKind::Text => {
            let content = std::fs::read_to_string(file)?;
            SourceDescriptor::from_text(content, file_name)
        }
        SourceKind::Image => {
            let bytes = std::fs::read(file)?;
            SourceDescriptor::from_image(bytes, file_name)
        }
        SourceKind::Pdf => {
            let bytes = std::fs::read(file)?;
            let pages = UnavailableRasterizer
                .page_count(&bytes)
                .map_err(CliError::Config)?;
            SourceDescriptor::new(SourcePayload::Bytes(bytes), SourceKind::Pdf, file_name, pages as u64)
        }
    };

    let document = Document::new(source.display_name(), source.total_units);
    let path = sidecar_path(file);
    let sidecar = SidecarFile::snapshot(&source, file_type, document.clone());
    save(&path, &sidecar)?;

    println!(
        "Ingested '{}' ({} units) -> {}",
        document.name,
        source.total_units,
        path.display()
    );
    println!("Run `knowflow batch {}` to start extracting.", file.display());
    Ok(())
}

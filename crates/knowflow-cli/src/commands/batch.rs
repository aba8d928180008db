//! `knowflow batch` - run one extraction batch.

use crate::commands::resolve_sidecar;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::output;
use crate::UnavailableRasterizer;
use knowflow_extractor::BatchRunner;
use knowflow_llm::ChatClient;
use knowflow_store::{load, DocumentRecord, DocumentService};
use std::path::Path;
use std::sync::Arc;

pub async fn execute_batch(file: &Path, workers: Option<usize>, config: &CliConfig) -> Result<()> {
    if config.api.api_key.is_empty() {
        return Err(CliError::Config(
            "API key not configured; set [api].api_key in config.toml".to_string(),
        ));
    }

    let path = resolve_sidecar(file);
    let sidecar = load(&path)?;
    let source = sidecar.descriptor()?;

    let mut extraction = config.extraction.clone();
    if let Some(workers) = workers {
        extraction.worker_count = workers;
    }

    let provider = Arc::new(ChatClient::new(
        &config.api.base_url,
        &config.api.api_key,
        &config.api.text_model,
        &config.api.vision_model,
    )?);
    let runner = BatchRunner::new(provider, Arc::new(UnavailableRasterizer), extraction)?;

    let service = DocumentService::new();
    let id = service.insert(DocumentRecord {
        document: sidecar.app,
        source,
        file_type: sidecar.original_file_type,
        sidecar_path: Some(path),
    });
    let mut record = service
        .get(&id)
        .ok_or_else(|| CliError::Config("document record vanished after insert".to_string()))?;

    let report = runner
        .run_batch(&mut record.document, &mut record.source)
        .await?;

    // Commit through the state owner: persists the sidecar best-effort and
    // broadcasts the change.
    service.update(&id, move |r| {
        r.document = record.document;
        r.source = record.source;
    })?;

    output::print_report(&report);
    if let Some(record) = service.get(&id) {
        output::print_document(&record.document);
    }
    Ok(())
}

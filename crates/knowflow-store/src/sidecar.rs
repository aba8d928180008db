//! Versioned sidecar files
//!
//! A sidecar holds everything needed to resume tearing a document: the raw
//! source content (UTF-8 for text, base64 for binary), the cursor, and the
//! full document snapshot including its learning context. It lives next to
//! the source file with the extension replaced by `.zsd`.

use crate::StoreError;
use base64::Engine;
use knowflow_domain::{
    Document, DocumentStatus, KnowledgePoint, KnowledgeType, LearningContext, QuestionSession,
    SourceDescriptor, SourceKind, SourcePayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Current sidecar format version.
pub const SIDECAR_VERSION: u32 = 3;

/// Extension of sidecar files.
pub const SIDECAR_EXTENSION: &str = "zsd";

/// Original file type recorded in the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum SourceFileType {
    Txt,
    Md,
    Pdf,
    Png,
    Jpg,
    Jpeg,
}

impl SourceFileType {
    /// Map a file extension (case-insensitive) to a supported type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(SourceFileType::Txt),
            "md" => Some(SourceFileType::Md),
            "pdf" => Some(SourceFileType::Pdf),
            "png" => Some(SourceFileType::Png),
            "jpg" => Some(SourceFileType::Jpg),
            "jpeg" => Some(SourceFileType::Jpeg),
            _ => None,
        }
    }

    /// The source kind this file type yields.
    pub fn source_kind(self) -> SourceKind {
        match self {
            SourceFileType::Txt | SourceFileType::Md => SourceKind::Text,
            SourceFileType::Pdf => SourceKind::Pdf,
            SourceFileType::Png | SourceFileType::Jpg | SourceFileType::Jpeg => SourceKind::Image,
        }
    }
}

/// One sidecar file (version 3 layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarFile {
    /// Format version (3)
    pub version: u32,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
    /// Raw source content: UTF-8 text, or base64 for PDF/image
    pub raw_content: String,
    /// Original file type
    pub original_file_type: SourceFileType,
    /// Original file name
    pub original_file_name: String,
    /// Units consumed so far
    pub processed_offset: u64,
    /// Total units
    pub total_size: u64,
    /// Full document snapshot, learning context included
    pub app: Document,
}

impl SidecarFile {
    /// Snapshot the current source and document state.
    pub fn snapshot(
        source: &SourceDescriptor,
        file_type: SourceFileType,
        document: Document,
    ) -> Self {
        let raw_content = match &source.payload {
            SourcePayload::Text(text) => text.clone(),
            SourcePayload::Bytes(bytes) => {
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
        };
        Self {
            version: SIDECAR_VERSION,
            created_at: document.created_at,
            raw_content,
            original_file_type: file_type,
            original_file_name: source.file_name.clone(),
            processed_offset: source.processed_offset,
            total_size: source.total_units,
            app: document,
        }
    }

    /// Rebuild the source descriptor from the stored raw content.
    pub fn descriptor(&self) -> Result<SourceDescriptor, StoreError> {
        let kind = self.original_file_type.source_kind();
        let payload = match kind {
            SourceKind::Text => SourcePayload::Text(self.raw_content.clone()),
            SourceKind::Pdf | SourceKind::Image => SourcePayload::Bytes(
                base64::engine::general_purpose::STANDARD
                    .decode(&self.raw_content)
                    .map_err(|e| StoreError::Decode(e.to_string()))?,
            ),
        };
        let mut source = SourceDescriptor::new(
            payload,
            kind,
            self.original_file_name.clone(),
            self.total_size,
        );
        source.advance(self.processed_offset);
        Ok(source)
    }
}

/// Sidecar path for a source file: same location, `.zsd` extension.
pub fn sidecar_path(source: &Path) -> PathBuf {
    source.with_extension(SIDECAR_EXTENSION)
}

/// Write a sidecar file (pretty-printed JSON).
pub fn save(path: &Path, sidecar: &SidecarFile) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(sidecar)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a sidecar of any supported version.
///
/// Version 3 is read directly; versions 1 and 2 pass through the normalizing
/// loader, which fills defaults for the fields they lack (no raw content, no
/// offsets) so an old sidecar still opens as a complete-but-unresumable
/// document.
pub fn load(path: &Path) -> Result<SidecarFile, StoreError> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    let version = value.get("version").and_then(Value::as_u64).unwrap_or(1);

    match version {
        3 => Ok(serde_json::from_value(value)?),
        1 | 2 => normalize_legacy(&value),
        other => Err(StoreError::UnsupportedVersion(other)),
    }
}

/// Build a v3 structure from a v1/v2 sidecar, filling defaults.
fn normalize_legacy(value: &Value) -> Result<SidecarFile, StoreError> {
    let app = value
        .get("app")
        .filter(|v| v.is_object())
        .ok_or_else(|| StoreError::InvalidData("sidecar has no app object".to_string()))?;

    let document = normalize_document(app);
    let file_name = app
        .get("sourceFile")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let file_type = app
        .get("fileType")
        .and_then(Value::as_str)
        .and_then(SourceFileType::from_extension)
        .unwrap_or(SourceFileType::Txt);

    Ok(SidecarFile {
        version: SIDECAR_VERSION,
        created_at: value
            .get("createdAt")
            .and_then(Value::as_u64)
            .unwrap_or_else(knowflow_domain::epoch_millis),
        raw_content: String::new(),
        original_file_type: file_type,
        original_file_name: file_name,
        processed_offset: document.content_cursor,
        total_size: document.content_total,
        app: document,
    })
}

/// Field-by-field document normalization for legacy snapshots.
fn normalize_document(app: &Value) -> Document {
    let now = knowflow_domain::epoch_millis();

    let knowledge_points: Vec<KnowledgePoint> = app
        .get("knowledgePoints")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|v| normalize_knowledge_point(v, now)).collect())
        .unwrap_or_default();

    let question_sessions: Vec<QuestionSession> = app
        .get("questionSessions")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let learning_context: LearningContext = app
        .get("learningContext")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    let status = match app.get("status").and_then(Value::as_str) {
        Some("done") => DocumentStatus::Done,
        Some("processing") => DocumentStatus::Processing,
        _ => DocumentStatus::Pending,
    };

    let processed_count = app
        .get("processedCount")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(knowledge_points.len());
    let content_cursor = app.get("contentCursor").and_then(Value::as_u64).unwrap_or(0);
    let content_total = app.get("contentTotal").and_then(Value::as_u64).unwrap_or(0);

    Document {
        id: app
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| now.to_string()),
        name: app
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("untitled")
            .to_string(),
        knowledge_points,
        processed_count,
        status,
        content_cursor,
        content_total,
        has_more: app
            .get("hasMore")
            .and_then(Value::as_bool)
            .unwrap_or(content_cursor < content_total),
        batch_index: app.get("batchIndex").and_then(Value::as_u64).unwrap_or(0) as u32,
        batch_target: app.get("batchTarget").and_then(Value::as_u64).unwrap_or(10) as usize,
        batch_produced_count: app
            .get("batchProducedCount")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize,
        learning_context,
        question_sessions,
        created_at: app.get("createdAt").and_then(Value::as_u64).unwrap_or(now),
        updated_at: app.get("updatedAt").and_then(Value::as_u64).unwrap_or(now),
    }
}

fn normalize_knowledge_point(value: &Value, now: u64) -> Option<KnowledgePoint> {
    let content = value.get("content").and_then(Value::as_str)?.to_string();

    Some(KnowledgePoint {
        id: value.get("id").and_then(Value::as_str)?.to_string(),
        title: value
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| content.chars().take(60).collect()),
        content,
        kind: value
            .get("type")
            .and_then(Value::as_str)
            .map(KnowledgeType::from_raw)
            .unwrap_or(KnowledgeType::Other),
        level: value.get("level").and_then(Value::as_u64).unwrap_or(0) as u32,
        parent_id: value
            .get("parentId")
            .and_then(Value::as_str)
            .map(str::to_string),
        children: value
            .get("children")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        selected: value
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        has_answer: value
            .get("hasAnswer")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        answer: value
            .get("answer")
            .and_then(Value::as_str)
            .map(str::to_string),
        question_number: value
            .get("questionNumber")
            .and_then(Value::as_str)
            .map(str::to_string),
        // Legacy snapshots stored this under refPath
        ancestor_path: value
            .get("refPath")
            .or_else(|| value.get("ancestorPath"))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        created_at: value.get("createdAt").and_then(Value::as_u64).unwrap_or(now),
    })
}

//! Source descriptors and the tearing cursor
//!
//! A source is consumed incrementally ("torn" page by page or slice by
//! slice) across batches. The descriptor tracks how much has been consumed
//! in source-specific units: characters for text, pages for PDF, and a
//! single unit for an image.

use serde::{Deserialize, Serialize};

/// What kind of raw content a source holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain text or markdown; units are code points
    Text,
    /// PDF; units are 1-based pages
    Pdf,
    /// A single image; exactly one unit
    Image,
}

/// Raw content of a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    /// UTF-8 text content
    Text(String),
    /// Binary content (PDF or image bytes)
    Bytes(Vec<u8>),
}

impl SourcePayload {
    /// Borrow the text content, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SourcePayload::Text(s) => Some(s),
            SourcePayload::Bytes(_) => None,
        }
    }

    /// Borrow the binary content, if this is a binary payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SourcePayload::Text(_) => None,
            SourcePayload::Bytes(b) => Some(b),
        }
    }
}

/// One ingested document source with its consumption cursor.
///
/// Invariant: `0 <= processed_offset <= total_units`, and the offset only
/// ever increases ([`SourceDescriptor::advance`] enforces both).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    /// Raw content
    pub payload: SourcePayload,
    /// Content kind, which fixes the unit semantics
    pub kind: SourceKind,
    /// Original file name (used for naming and archetype hints)
    pub file_name: String,
    /// Total units in the source
    pub total_units: u64,
    /// Units consumed so far
    pub processed_offset: u64,
}

impl SourceDescriptor {
    /// Create a descriptor with an explicit unit total and a zero cursor.
    pub fn new(
        payload: SourcePayload,
        kind: SourceKind,
        file_name: impl Into<String>,
        total_units: u64,
    ) -> Self {
        Self {
            payload,
            kind,
            file_name: file_name.into(),
            total_units,
            processed_offset: 0,
        }
    }

    /// Create a text descriptor; the unit total is the code-point count.
    pub fn from_text(content: impl Into<String>, file_name: impl Into<String>) -> Self {
        let content = content.into();
        let total = content.chars().count() as u64;
        Self::new(SourcePayload::Text(content), SourceKind::Text, file_name, total)
    }

    /// Create an image descriptor (always exactly one unit).
    pub fn from_image(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self::new(SourcePayload::Bytes(bytes), SourceKind::Image, file_name, 1)
    }

    /// Advance the cursor, clamped to be non-decreasing and within bounds.
    /// Returns the cursor after the move.
    pub fn advance(&mut self, new_offset: u64) -> u64 {
        self.processed_offset = new_offset.clamp(self.processed_offset, self.total_units);
        self.processed_offset
    }

    /// True when every unit has been consumed.
    pub fn exhausted(&self) -> bool {
        self.processed_offset >= self.total_units
    }

    /// Display name: the file name with its extension stripped.
    pub fn display_name(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(dot) if dot > 0 => &self.file_name[..dot],
            _ => &self.file_name,
        }
    }
}

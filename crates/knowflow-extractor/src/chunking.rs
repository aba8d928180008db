//! Source chunking - the tearing mechanism
//!
//! Yields one processable unit per call and reports the new cursor value.
//! Units are source-specific: a boundary-snapped text slice, one OCR'd PDF
//! page, or the whole image. Text offsets are code points, never bytes.

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use knowflow_domain::traits::{ChatProvider, PageRasterizer};
use knowflow_domain::{SourceDescriptor, SourceKind};
use tracing::warn;

/// Sentence-ending punctuation used as the secondary snap point.
const SENTENCE_ENDS: [char; 7] = ['。', '．', '！', '？', '.', '!', '?'];

/// One unit of source content ready for extraction.
#[derive(Debug, Clone)]
pub struct ChunkUnit {
    /// The unit's text (chunk slice or OCR output)
    pub text: String,
    /// Cursor value after consuming this unit
    pub new_offset: u64,
    /// OCR output was suspiciously short (possible misrecognition)
    pub ocr_suspect: bool,
}

/// Reads units from a source, invoking the OCR/rasterization collaborators
/// for non-text kinds.
pub struct ChunkReader<'a, P, R> {
    source: &'a SourceDescriptor,
    provider: &'a P,
    rasterizer: &'a R,
    config: &'a ExtractorConfig,
}

impl<'a, P, R> ChunkReader<'a, P, R>
where
    P: ChatProvider,
    R: PageRasterizer,
{
    /// Create a reader over `source`.
    pub fn new(
        source: &'a SourceDescriptor,
        provider: &'a P,
        rasterizer: &'a R,
        config: &'a ExtractorConfig,
    ) -> Self {
        Self {
            source,
            provider,
            rasterizer,
            config,
        }
    }

    /// The source being read.
    pub fn source(&self) -> &SourceDescriptor {
        self.source
    }

    /// Read the unit starting at `offset`, or `None` past the end.
    pub async fn next_unit(&self, offset: u64) -> Result<Option<ChunkUnit>, ExtractorError> {
        if offset >= self.source.total_units {
            return Ok(None);
        }

        match self.source.kind {
            SourceKind::Text => {
                let content = self.source.payload.as_text().ok_or_else(|| {
                    ExtractorError::Source("text source without text payload".to_string())
                })?;
                Ok(
                    next_text_chunk(content, offset, self.config.text_chunk_size).map(
                        |(text, new_offset)| ChunkUnit {
                            text,
                            new_offset,
                            ocr_suspect: false,
                        },
                    ),
                )
            }
            SourceKind::Pdf => {
                let pdf = self.source.payload.as_bytes().ok_or_else(|| {
                    ExtractorError::Source("pdf source without binary payload".to_string())
                })?;
                let page = offset + 1;
                let png = self
                    .rasterizer
                    .rasterize_png(pdf, page as u32)
                    .map_err(|e| ExtractorError::Rasterize(e.to_string()))?;
                let text = self
                    .provider
                    .recognize("image/png", &png)
                    .await
                    .map_err(|e| ExtractorError::Ocr(e.to_string()))?;
                Ok(Some(self.ocr_unit(text, page)))
            }
            SourceKind::Image => {
                let bytes = self.source.payload.as_bytes().ok_or_else(|| {
                    ExtractorError::Source("image source without binary payload".to_string())
                })?;
                let mime = mime_for_file_name(&self.source.file_name);
                let text = self
                    .provider
                    .recognize(mime, bytes)
                    .await
                    .map_err(|e| ExtractorError::Ocr(e.to_string()))?;
                Ok(Some(self.ocr_unit(text, 1)))
            }
        }
    }

    fn ocr_unit(&self, text: String, new_offset: u64) -> ChunkUnit {
        let ocr_suspect = text.chars().count() < self.config.min_ocr_chars;
        if ocr_suspect {
            warn!(
                length = text.chars().count(),
                file = %self.source.file_name,
                "OCR output unusually short, possible misrecognition"
            );
        }
        ChunkUnit {
            text,
            new_offset,
            ocr_suspect,
        }
    }
}

/// Slice the next text chunk starting at code-point `offset`.
///
/// Reads up to `chunk_size` code points. When that would end mid-document,
/// the cut snaps backward to the last paragraph break, falling back to the
/// last sentence-ending punctuation - but only if the snap point lies past
/// 50% of the slice, so a boundary-poor chunk is cut hard rather than
/// degenerating into a sliver.
pub fn next_text_chunk(content: &str, offset: u64, chunk_size: usize) -> Option<(String, u64)> {
    let total = content.chars().count();
    let start = offset as usize;
    if start >= total {
        return None;
    }
    let end = std::cmp::min(start + chunk_size, total);

    let start_byte = byte_at_char(content, start);
    let end_byte = byte_at_char(content, end);
    let slice = &content[start_byte..end_byte];

    let mut kept_chars = end - start;
    if end < total {
        if let Some(cut) = snap_point(slice, chunk_size) {
            kept_chars = cut;
        }
    }

    let text: String = slice.chars().take(kept_chars).collect();
    Some((text, (start + kept_chars) as u64))
}

/// Code points to keep in `slice`, when a good boundary exists past half of
/// the intended chunk.
fn snap_point(slice: &str, chunk_size: usize) -> Option<usize> {
    if let Some(break_byte) = slice.rfind("\n\n") {
        let break_chars = slice[..break_byte].chars().count();
        if break_chars > chunk_size / 2 {
            // Keep the blank line itself
            return Some(break_chars + 2);
        }
    }

    let (punct_byte, _) = slice
        .char_indices()
        .rev()
        .find(|(_, c)| SENTENCE_ENDS.contains(c))?;
    let punct_chars = slice[..punct_byte].chars().count();
    if punct_chars > chunk_size / 2 {
        return Some(punct_chars + 1);
    }
    None
}

fn byte_at_char(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Provisional cursor after one unit, computed from static step sizes only.
///
/// Used to pre-assign worker start offsets before dispatch. For text this is
/// the un-snapped estimate, so a worker's actual boundary-snapped offset may
/// land slightly earlier than the next worker's pre-computed start.
pub fn provisional_step(kind: SourceKind, offset: u64, chunk_size: usize, total: u64) -> u64 {
    match kind {
        SourceKind::Text => std::cmp::min(offset + chunk_size as u64, total),
        SourceKind::Pdf => offset + 1,
        SourceKind::Image => 1,
    }
}

/// MIME type for an image file name's extension.
pub fn mime_for_file_name(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let (text, new_offset) = next_text_chunk("short text", 0, 3000).unwrap();
        assert_eq!(text, "short text");
        assert_eq!(new_offset, 10);
        assert!(next_text_chunk("short text", 10, 3000).is_none());
    }

    #[test]
    fn test_snaps_to_paragraph_break() {
        // Break at 80% of the chunk: snap applies.
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(200));
        let (chunk, new_offset) = next_text_chunk(&text, 0, 100).unwrap();
        assert_eq!(new_offset, 82);
        assert!(chunk.ends_with("\n\n"));
    }

    #[test]
    fn test_early_break_falls_back_to_punctuation() {
        // Paragraph break at 20% is ignored; sentence end at 90% wins.
        let text = format!("{}\n\n{}。{}", "a".repeat(20), "b".repeat(68), "c".repeat(200));
        let (chunk, new_offset) = next_text_chunk(&text, 0, 100).unwrap();
        assert_eq!(new_offset, 91);
        assert!(chunk.ends_with('。'));
    }

    #[test]
    fn test_no_boundary_cuts_hard() {
        let text = "x".repeat(250);
        let (chunk, new_offset) = next_text_chunk(&text, 0, 100).unwrap();
        assert_eq!(chunk.chars().count(), 100);
        assert_eq!(new_offset, 100);
    }

    #[test]
    fn test_offsets_are_code_points_not_bytes() {
        // Multibyte text: 10 chars of 3 bytes each.
        let text = "当".repeat(10);
        let (chunk, new_offset) = next_text_chunk(&text, 0, 4).unwrap();
        assert_eq!(chunk.chars().count(), 4);
        assert_eq!(new_offset, 4);
        let (chunk2, new_offset2) = next_text_chunk(&text, new_offset, 4).unwrap();
        assert_eq!(chunk2.chars().count(), 4);
        assert_eq!(new_offset2, 8);
    }

    #[test]
    fn test_consecutive_chunks_cover_document() {
        let text = format!("{}。{}", "a".repeat(70), "b".repeat(60));
        let mut offset = 0u64;
        let mut collected = String::new();
        while let Some((chunk, next)) = next_text_chunk(&text, offset, 100) {
            collected.push_str(&chunk);
            assert!(next > offset);
            offset = next;
        }
        assert_eq!(collected, text);
    }

    #[test]
    fn test_provisional_steps() {
        assert_eq!(provisional_step(SourceKind::Text, 0, 3000, 9000), 3000);
        assert_eq!(provisional_step(SourceKind::Text, 8000, 3000, 9000), 9000);
        assert_eq!(provisional_step(SourceKind::Pdf, 4, 3000, 12), 5);
        assert_eq!(provisional_step(SourceKind::Image, 0, 3000, 1), 1);
    }

    #[test]
    fn test_mime_for_file_name() {
        assert_eq!(mime_for_file_name("scan.PNG"), "image/png");
        assert_eq!(mime_for_file_name("photo.jpeg"), "image/jpeg");
        assert_eq!(mime_for_file_name("weird.bin"), "application/octet-stream");
    }
}

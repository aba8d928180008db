//! Document state ownership
//!
//! A single owner of the in-memory document map. Mutations go through
//! [`DocumentService::update`]; after the mutation commits, the sidecar is
//! saved best-effort and a change event is broadcast to subscribers. The
//! broadcast is outside the consistency boundary: a missed event delays a
//! viewer's refresh, it never corrupts state.

use crate::sidecar::{save, SidecarFile, SourceFileType};
use crate::StoreError;
use knowflow_domain::{Document, SourceDescriptor};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::warn;

/// Capacity of the change-event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notification sent after a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A document was inserted or updated
    Updated {
        /// Id of the affected document
        document_id: String,
    },
    /// A document was removed
    Removed {
        /// Id of the removed document
        document_id: String,
    },
}

/// Everything the service tracks per document.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    /// The document snapshot
    pub document: Document,
    /// Its source with the tearing cursor
    pub source: SourceDescriptor,
    /// Original file type, needed to write sidecars
    pub file_type: SourceFileType,
    /// Where to persist the sidecar; `None` disables persistence
    pub sidecar_path: Option<PathBuf>,
}

/// Owner of the in-memory document map.
pub struct DocumentService {
    records: RwLock<HashMap<String, DocumentRecord>>,
    events: broadcast::Sender<StoreEvent>,
}

impl DocumentService {
    /// Create an empty service.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Insert a record, persist its sidecar, and notify subscribers.
    /// Returns the document id.
    pub fn insert(&self, record: DocumentRecord) -> String {
        let id = record.document.id.clone();
        self.persist(&record);
        self.records.write().unwrap().insert(id.clone(), record);
        self.notify(StoreEvent::Updated {
            document_id: id.clone(),
        });
        id
    }

    /// Clone of the record for `id`, if present.
    pub fn get(&self, id: &str) -> Option<DocumentRecord> {
        self.records.read().unwrap().get(id).cloned()
    }

    /// Ids of all tracked documents.
    pub fn ids(&self) -> Vec<String> {
        self.records.read().unwrap().keys().cloned().collect()
    }

    /// Apply a mutation to the record for `id`, then persist the sidecar
    /// best-effort and broadcast the change.
    pub fn update<F>(&self, id: &str, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut DocumentRecord),
    {
        let snapshot = {
            let mut records = self.records.write().unwrap();
            let record = records
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            mutate(record);
            record.clone()
        };

        self.persist(&snapshot);
        self.notify(StoreEvent::Updated {
            document_id: id.to_string(),
        });
        Ok(())
    }

    /// Remove a record and notify subscribers.
    pub fn remove(&self, id: &str) -> Option<DocumentRecord> {
        let removed = self.records.write().unwrap().remove(id);
        if removed.is_some() {
            self.notify(StoreEvent::Removed {
                document_id: id.to_string(),
            });
        }
        removed
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Best-effort sidecar save; failure is logged, never propagated, and
    /// does not roll back the in-memory commit.
    fn persist(&self, record: &DocumentRecord) {
        let Some(path) = &record.sidecar_path else {
            return;
        };
        let sidecar =
            SidecarFile::snapshot(&record.source, record.file_type, record.document.clone());
        if let Err(e) = save(path, &sidecar) {
            warn!(path = %path.display(), error = %e, "sidecar save failed, in-memory state kept");
        }
    }

    /// Fire-and-forget broadcast; a send with no receivers is fine.
    fn notify(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for DocumentService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowflow_domain::DocumentStatus;

    fn record(sidecar_path: Option<PathBuf>) -> DocumentRecord {
        let source = SourceDescriptor::from_text("content here", "a.txt");
        let document = Document::new("a", source.total_units);
        DocumentRecord {
            document,
            source,
            file_type: SourceFileType::Txt,
            sidecar_path,
        }
    }

    #[test]
    fn test_insert_get_update() {
        let service = DocumentService::new();
        let id = service.insert(record(None));

        assert!(service.get(&id).is_some());
        service
            .update(&id, |r| r.document.status = DocumentStatus::Done)
            .unwrap();
        assert_eq!(service.get(&id).unwrap().document.status, DocumentStatus::Done);
    }

    #[test]
    fn test_update_unknown_id_errors() {
        let service = DocumentService::new();
        let result = service.update("nope", |_| {});
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_broadcasts_after_commit() {
        let service = DocumentService::new();
        let id = service.insert(record(None));

        let mut events = service.subscribe();
        service.update(&id, |r| r.document.batch_index = 2).unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event, StoreEvent::Updated { document_id: id });
    }

    #[test]
    fn test_missed_broadcast_does_not_fail_update() {
        // No subscribers at all: the send error is swallowed.
        let service = DocumentService::new();
        let id = service.insert(record(None));
        assert!(service.update(&id, |r| r.document.batch_index = 1).is_ok());
    }

    #[test]
    fn test_update_persists_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zsd");
        let service = DocumentService::new();
        let id = service.insert(record(Some(path.clone())));

        service
            .update(&id, |r| {
                r.source.advance(5);
                r.document.content_cursor = 5;
            })
            .unwrap();

        let loaded = crate::sidecar::load(&path).unwrap();
        assert_eq!(loaded.processed_offset, 5);
    }

    #[test]
    fn test_failed_sidecar_save_keeps_memory_state() {
        // Unwritable path: persistence fails, the update still commits.
        let service = DocumentService::new();
        let id = service.insert(record(Some(PathBuf::from(
            "/nonexistent-dir-for-sure/a.zsd",
        ))));

        service
            .update(&id, |r| r.document.batch_index = 7)
            .unwrap();
        assert_eq!(service.get(&id).unwrap().document.batch_index, 7);
    }

    #[test]
    fn test_remove_notifies() {
        let service = DocumentService::new();
        let id = service.insert(record(None));
        let mut events = service.subscribe();

        service.remove(&id);
        assert!(service.get(&id).is_none());
        let event = events.try_recv().unwrap();
        assert_eq!(event, StoreEvent::Removed { document_id: id });
    }
}

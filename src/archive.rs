use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use opendal::{EntryMode, Operator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::ArchiveWriteError;
use crate::legacy;
use crate::record::NoteRecord;
use crate::storage::StorageConfig;

pub const NOTES_ARCHIVED: &str = "notes_archived";
pub const DRAWINGS_ARCHIVED: &str = "drawings_archived";

/// Snapshot of a note taken right before it was deleted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArchivedNoteRecord {
    pub original_id: String,
    pub archived_at: String,
    #[serde(flatten)]
    pub note: NoteRecord,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArchivedDrawingRecord {
    pub drawing_id: String,
    pub note_id: String,
    pub base64_data: String,
    pub height: f64,
    pub color: String,
    pub archived_at: String,
    pub user_id: String,
}

pub fn legacy_drawing_id(note_id: &str, index: usize) -> String {
    format!("{note_id}_drawing_{index}")
}

pub fn single_drawing_id(note_id: &str) -> String {
    format!("{note_id}_single_drawing")
}

/// Outcome of one archival pass. Failures are informational; the delete
/// proceeds regardless.
#[derive(Debug, Default)]
pub struct ArchiveResult {
    pub note_archived: bool,
    pub archived_drawings: Vec<String>,
    pub failures: Vec<ArchiveWriteError>,
}

impl ArchiveResult {
    pub fn is_complete(&self) -> bool {
        self.note_archived && self.failures.is_empty()
    }
}

/// Write side of the archive. Writes to an existing key overwrite it.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    async fn write_note(&self, record: &ArchivedNoteRecord) -> Result<(), ArchiveWriteError>;
    async fn write_drawing(&self, record: &ArchivedDrawingRecord) -> Result<(), ArchiveWriteError>;
}

/// Archive kept as JSON documents in an OpenDAL operator:
/// `notes_archived/{id}.json` and `drawings_archived/{id}.json`, relative to
/// the operator root.
#[derive(Clone, Debug)]
pub struct OpendalArchiveStore {
    op: Operator,
}

impl OpendalArchiveStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    /// Opens the store at a configured location.
    pub fn open(storage: &StorageConfig) -> anyhow::Result<Self> {
        Ok(Self::new(storage.operator()?))
    }

    fn note_path(note_id: &str) -> String {
        format!("{}/{}.json", NOTES_ARCHIVED, note_id)
    }

    fn drawing_path(drawing_id: &str) -> String {
        format!("{}/{}.json", DRAWINGS_ARCHIVED, drawing_id)
    }

    async fn put<T: Serialize + Sync>(
        &self,
        key: &str,
        path: &str,
        value: &T,
    ) -> Result<(), ArchiveWriteError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArchiveWriteError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.op
            .write(path, bytes)
            .await
            .map_err(|source| ArchiveWriteError::Storage {
                key: key.to_string(),
                source,
            })?;
        Ok(())
    }

    pub async fn get_archived_note(&self, note_id: &str) -> anyhow::Result<Option<ArchivedNoteRecord>> {
        let path = Self::note_path(note_id);
        if !self.op.exists(&path).await? {
            return Ok(None);
        }
        let bytes = self.op.read(&path).await?;
        Ok(Some(serde_json::from_slice(&bytes.to_vec())?))
    }

    /// Archived drawings of one note, ordered by drawing id.
    pub async fn list_archived_drawings(
        &self,
        note_id: &str,
    ) -> anyhow::Result<Vec<ArchivedDrawingRecord>> {
        let dir = format!("{}/", DRAWINGS_ARCHIVED);
        if !self.op.exists(&dir).await? {
            return Ok(vec![]);
        }

        let prefix = format!("{}_", note_id);
        let mut lister = self.op.lister(&dir).await?;
        let mut drawings = Vec::new();
        while let Some(entry) = lister.try_next().await? {
            if entry.metadata().mode() != EntryMode::FILE {
                continue;
            }
            let name = entry.name().split('/').next_back().unwrap_or("");
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }
            let bytes = self.op.read(&format!("{}{}", dir, name)).await?;
            let record: ArchivedDrawingRecord = serde_json::from_slice(&bytes.to_vec())?;
            if record.note_id == note_id {
                drawings.push(record);
            }
        }
        drawings.sort_by(|a, b| a.drawing_id.cmp(&b.drawing_id));
        Ok(drawings)
    }
}

#[async_trait]
impl ArchiveStore for OpendalArchiveStore {
    async fn write_note(&self, record: &ArchivedNoteRecord) -> Result<(), ArchiveWriteError> {
        self.put(&record.original_id, &Self::note_path(&record.original_id), record)
            .await
    }

    async fn write_drawing(&self, record: &ArchivedDrawingRecord) -> Result<(), ArchiveWriteError> {
        self.put(&record.drawing_id, &Self::drawing_path(&record.drawing_id), record)
            .await
    }
}

/// Archives a note and all of its drawings ahead of a hard delete.
///
/// The snapshot write completes before any drawing write starts. Every
/// failure is logged and collected; none stops the remaining writes.
pub async fn archive_before_delete<S: ArchiveStore + ?Sized>(
    store: &S,
    user_id: &str,
    note_id: &str,
    record: &NoteRecord,
) -> ArchiveResult {
    let archived_at = Utc::now().to_rfc3339();
    let mut result = ArchiveResult::default();

    let snapshot = ArchivedNoteRecord {
        original_id: note_id.to_string(),
        archived_at: archived_at.clone(),
        note: record.clone(),
    };
    match store.write_note(&snapshot).await {
        Ok(()) => result.note_archived = true,
        Err(error) => {
            tracing::warn!(note_id, %error, "failed to archive note snapshot");
            result.failures.push(error);
        }
    }

    let rtf = record.rtf_bytes();
    let mut markers = legacy::scan_note(&record.content, rtf.as_deref());
    legacy::extend_distinct(&mut markers, record.legacy_drawings.iter().cloned());
    let mut drawings: Vec<ArchivedDrawingRecord> = markers
        .iter()
        .enumerate()
        .map(|(index, marker)| ArchivedDrawingRecord {
            drawing_id: legacy_drawing_id(note_id, index),
            note_id: note_id.to_string(),
            base64_data: marker.payload.clone(),
            height: marker.height_value(),
            color: marker.color.clone(),
            archived_at: archived_at.clone(),
            user_id: user_id.to_string(),
        })
        .collect();
    if record.has_drawing {
        if let Some(data) = &record.drawing_data {
            drawings.push(ArchivedDrawingRecord {
                drawing_id: single_drawing_id(note_id),
                note_id: note_id.to_string(),
                base64_data: data.clone(),
                height: record.drawing_height,
                color: record.drawing_color.clone(),
                archived_at: archived_at.clone(),
                user_id: user_id.to_string(),
            });
        }
    }

    for drawing in &drawings {
        match store.write_drawing(drawing).await {
            Ok(()) => result.archived_drawings.push(drawing.drawing_id.clone()),
            Err(error) => {
                tracing::warn!(
                    note_id,
                    drawing_id = %drawing.drawing_id,
                    %error,
                    "failed to archive drawing, skipping"
                );
                result.failures.push(error);
            }
        }
    }

    tracing::info!(
        note_id,
        note_archived = result.note_archived,
        drawings = result.archived_drawings.len(),
        failures = result.failures.len(),
        "archived note before delete"
    );
    result
}

/// Archive handle bound to a store and the owning user.
pub struct Archiver<S: ?Sized> {
    store: Arc<S>,
    user_id: String,
}

impl<S: ?Sized> Clone for Archiver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            user_id: self.user_id.clone(),
        }
    }
}

impl<S: ArchiveStore + ?Sized + 'static> Archiver<S> {
    pub fn new(store: Arc<S>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn archive_before_delete(&self, note_id: &str, record: &NoteRecord) -> ArchiveResult {
        archive_before_delete(self.store.as_ref(), &self.user_id, note_id, record).await
    }

    /// Runs the archival on a background task.
    pub fn spawn_archive(&self, note_id: String, record: NoteRecord) -> JoinHandle<ArchiveResult> {
        let archiver = self.clone();
        tokio::spawn(async move { archiver.archive_before_delete(&note_id, &record).await })
    }
}

/// Where archives go and on whose behalf. `storage.root` is the archive
/// directory inside the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    pub storage: StorageConfig,
    pub user_id: String,
}

impl ArchiveConfig {
    pub fn build(&self) -> anyhow::Result<Archiver<OpendalArchiveStore>> {
        let store = OpendalArchiveStore::open(&self.storage)?;
        Ok(Archiver::new(Arc::new(store), self.user_id.clone()))
    }
}

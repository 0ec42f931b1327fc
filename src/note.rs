use anyhow::{anyhow, Result};
use futures::TryStreamExt;
use opendal::{EntryMode, Operator};

use crate::archive::{ArchiveResult, ArchiveStore, Archiver};
use crate::model::NoteDocument;
use crate::record::NoteRecord;

fn note_path(ws_path: &str, note_id: &str) -> String {
    format!("{}/notes/{}.json", ws_path, note_id)
}

/// Encodes the document and stores its record, replacing any previous one.
pub async fn save_note(
    op: &Operator,
    ws_path: &str,
    note_id: &str,
    doc: &NoteDocument,
) -> Result<NoteRecord> {
    let record = NoteRecord::from_document(doc);
    write_note_record(op, ws_path, note_id, &record).await?;
    Ok(record)
}

pub async fn write_note_record(
    op: &Operator,
    ws_path: &str,
    note_id: &str,
    record: &NoteRecord,
) -> Result<()> {
    op.write(&note_path(ws_path, note_id), serde_json::to_vec_pretty(record)?)
        .await?;
    Ok(())
}

pub async fn get_note_record(op: &Operator, ws_path: &str, note_id: &str) -> Result<NoteRecord> {
    let path = note_path(ws_path, note_id);
    if !op.exists(&path).await? {
        return Err(anyhow!("Note not found: {}", note_id));
    }
    let bytes = op.read(&path).await?;
    let record: NoteRecord = serde_json::from_slice(&bytes.to_vec())?;
    Ok(record)
}

/// Loads a note into an editable document.
pub async fn load_note(op: &Operator, ws_path: &str, note_id: &str) -> Result<NoteDocument> {
    Ok(get_note_record(op, ws_path, note_id).await?.to_document())
}

pub async fn list_notes(op: &Operator, ws_path: &str) -> Result<Vec<String>> {
    let notes_path = format!("{}/notes/", ws_path);
    if !op.exists(&notes_path).await? {
        return Ok(vec![]);
    }

    let mut lister = op.lister(&notes_path).await?;
    let mut notes = Vec::new();
    while let Some(entry) = lister.try_next().await? {
        if entry.metadata().mode() != EntryMode::FILE {
            continue;
        }
        let name = entry.name().split('/').next_back().unwrap_or("");
        if let Some(id) = name.strip_suffix(".json") {
            if !id.is_empty() {
                notes.push(id.to_string());
            }
        }
    }
    notes.sort();
    Ok(notes)
}

/// Archives the note and its drawings, then removes the live record.
///
/// Archival failures never stop the delete; they are reported in the
/// returned [`ArchiveResult`].
pub async fn delete_note<S: ArchiveStore + ?Sized + 'static>(
    op: &Operator,
    ws_path: &str,
    note_id: &str,
    archiver: &Archiver<S>,
) -> Result<ArchiveResult> {
    let record = get_note_record(op, ws_path, note_id).await?;
    let result = archiver.archive_before_delete(note_id, &record).await;
    op.delete(&note_path(ws_path, note_id)).await?;
    Ok(result)
}

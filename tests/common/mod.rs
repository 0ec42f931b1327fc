use anyhow::Result;
use async_trait::async_trait;
use note_codec::archive::{ArchiveStore, ArchivedDrawingRecord, ArchivedNoteRecord};
use note_codec::error::ArchiveWriteError;
use note_codec::model::{Attachment, CheckboxAttachment, NoteDocument, StyledRun};
use opendal::services::Memory;
use opendal::Operator;
use std::collections::HashSet;
use std::sync::Mutex;

#[allow(dead_code)]
pub fn setup_operator() -> Result<Operator> {
    init_tracing();
    let builder = Memory::default();
    let op = Operator::new(builder)?.finish();
    Ok(op)
}

#[allow(dead_code)]
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Builds a document from `(text, style)` parts, filling in offsets and
/// checkbox anchors.
#[allow(dead_code)]
pub fn styled_doc(title: &str, parts: Vec<(&str, StyledRun)>) -> NoteDocument {
    let mut doc = NoteDocument::new(title);
    let mut offset = 0;
    for (text, mut run) in parts {
        let len = text.chars().count();
        run.start_offset = offset;
        run.end_offset = offset + len;
        if let Some(Attachment::Checkbox(checkbox)) = &mut run.attachment {
            checkbox.anchor_offset = offset;
        }
        doc.plain_text.push_str(text);
        doc.runs.push(run);
        offset += len;
    }
    doc
}

#[allow(dead_code)]
pub fn checkbox_part(checked: bool) -> (&'static str, StyledRun) {
    let run = StyledRun {
        attachment: Some(Attachment::Checkbox(CheckboxAttachment {
            anchor_offset: 0,
            checked,
        })),
        ..StyledRun::default()
    };
    (ANCHOR_STR, run)
}

const ANCHOR_STR: &str = "\u{FFFC}";

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    NoteStarted(String),
    NoteFinished(String),
    DrawingStarted(String),
    DrawingFinished(String),
}

/// Archive store that records every call and can reject chosen keys.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingArchiveStore {
    pub calls: Mutex<Vec<StoreCall>>,
    pub notes: Mutex<Vec<ArchivedNoteRecord>>,
    pub drawings: Mutex<Vec<ArchivedDrawingRecord>>,
    pub fail_keys: HashSet<String>,
}

#[allow(dead_code)]
impl RecordingArchiveStore {
    pub fn failing(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn drawing_ids(&self) -> Vec<String> {
        self.drawings
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.drawing_id.clone())
            .collect()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, key: &str) -> Result<(), ArchiveWriteError> {
        if self.fail_keys.contains(key) {
            return Err(ArchiveWriteError::Rejected {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArchiveStore for RecordingArchiveStore {
    async fn write_note(&self, record: &ArchivedNoteRecord) -> Result<(), ArchiveWriteError> {
        self.record(StoreCall::NoteStarted(record.original_id.clone()));
        tokio::task::yield_now().await;
        self.check(&record.original_id)?;
        self.notes.lock().unwrap().push(record.clone());
        self.record(StoreCall::NoteFinished(record.original_id.clone()));
        Ok(())
    }

    async fn write_drawing(&self, record: &ArchivedDrawingRecord) -> Result<(), ArchiveWriteError> {
        self.record(StoreCall::DrawingStarted(record.drawing_id.clone()));
        tokio::task::yield_now().await;
        self.check(&record.drawing_id)?;
        self.drawings.lock().unwrap().push(record.clone());
        self.record(StoreCall::DrawingFinished(record.drawing_id.clone()));
        Ok(())
    }
}

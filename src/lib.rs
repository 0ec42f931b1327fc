#![warn(warnings)]
#![deny(clippy::all)]

//! Note content codec: converts rich notes (styled runs, checkboxes, an
//! optional drawing) to and from their stored form, an RTF body plus
//! base64 sibling fields, and archives notes before deletion.

pub mod archive;
pub mod codec;
pub mod error;
pub mod legacy;
pub mod model;
pub mod note;
pub mod record;
pub mod rtf;
pub mod storage;
pub mod transform;

pub use archive::{
    archive_before_delete, ArchiveConfig, ArchiveResult, ArchiveStore, ArchivedDrawingRecord,
    ArchivedNoteRecord, Archiver, OpendalArchiveStore,
};
pub use codec::{decode, decode_plain, encode};
pub use error::{ArchiveWriteError, DecodeError, EncodeError};
pub use legacy::scan;
pub use model::{
    Attachment, CheckboxAttachment, DrawingAttachment, LegacyDrawingMarker, NoteDocument, RgbHex,
    StyledRun,
};
pub use record::NoteRecord;
pub use storage::StorageConfig;
pub use transform::transform;

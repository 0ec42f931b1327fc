/// Run-range violations found while serializing a [`crate::NoteDocument`].
///
/// All offsets are counted in Unicode scalar values of `plain_text`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("run {index} ends before it starts ({start}..{end})")]
    InvertedRun {
        index: usize,
        start: usize,
        end: usize,
    },

    #[error("run {index} starts at {found}, expected {expected}")]
    RunGap {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("run {index} ends at {end}, past the end of the text ({len})")]
    RunOutOfBounds { index: usize, end: usize, len: usize },

    #[error("runs cover {covered} of {len} characters")]
    UncoveredText { covered: usize, len: usize },

    #[error("checkbox at offset {offset} is not a single anchor character")]
    InvalidCheckboxAnchor { offset: usize },
}

/// Structural failures of the RTF reader.
///
/// [`crate::decode`] recovers from every variant by falling back to plain
/// text; only [`crate::rtf::reader::parse`] surfaces them.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("byte stream does not start with an RTF header")]
    MissingHeader,

    #[error("unbalanced closing brace at byte {0}")]
    UnbalancedGroup(usize),

    #[error("{0} group(s) left open at end of stream")]
    UnterminatedGroup(usize),
}

/// A single archive record could not be written.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveWriteError {
    #[error("archive store write failed for {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: opendal::Error,
    },

    #[error("archive record {key} could not be serialized: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("archive store rejected {key}: {reason}")]
    Rejected { key: String, reason: String },
}

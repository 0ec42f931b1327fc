use regex::Regex;
use std::sync::OnceLock;

use crate::error::{DecodeError, EncodeError};
use crate::legacy;
use crate::model::{Attachment, CheckboxAttachment, NoteDocument, StyledRun, ATTACHMENT_ANCHOR};
use crate::rtf::reader::{self, Segment};
use crate::rtf::{font, writer};

pub const CHECKED_TOKEN: &str = "(CHECKED)";
pub const UNCHECKED_TOKEN: &str = "(UNCHECKED)";

/// Every checkbox spelling the decoder accepts, with the state it encodes.
/// Only the first two are ever written.
pub const CHECKBOX_TOKENS: [(&str, bool); 6] = [
    (CHECKED_TOKEN, true),
    (UNCHECKED_TOKEN, false),
    ("<CHECKED>", true),
    ("<UNCHECKED>", false),
    ("[CHECKED]", true),
    ("[UNCHECKED]", false),
];

/// Text used for an empty note body.
pub const PLACEHOLDER_TEXT: &str = " ";

fn checkbox_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = CHECKBOX_TOKENS
            .iter()
            .map(|(token, _)| regex::escape(token))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&alternation).expect("checkbox token pattern is valid")
    })
}

pub fn checkbox_token(checked: bool) -> &'static str {
    if checked {
        CHECKED_TOKEN
    } else {
        UNCHECKED_TOKEN
    }
}

fn token_state(token: &str) -> Option<bool> {
    CHECKBOX_TOKENS
        .iter()
        .find(|(candidate, _)| *candidate == token)
        .map(|(_, checked)| *checked)
}

/// Serializes the document body to RTF.
///
/// Checkbox anchors become `(CHECKED)`/`(UNCHECKED)` tokens and custom fonts
/// are folded into system fonts. The drawing is not part of the output.
pub fn encode(doc: &NoteDocument) -> Result<Vec<u8>, EncodeError> {
    doc.validate()?;
    let chars: Vec<char> = doc.plain_text.chars().collect();

    let runs: Vec<writer::RtfRun> = doc
        .runs
        .iter()
        .filter(|run| !run.is_empty())
        .map(|run| writer::RtfRun {
            style: font::normalize(run),
            text: match run.checkbox() {
                Some(checkbox) => checkbox_token(checkbox.checked).to_string(),
                None => chars[run.start_offset..run.end_offset].iter().collect(),
            },
        })
        .collect();

    Ok(writer::write_document(&doc.title, &runs))
}

/// `plain_text` with checkbox anchors spelled as tokens, as stored in the
/// record's `content` field.
pub fn tokenized_text(doc: &NoteDocument) -> String {
    let chars: Vec<char> = doc.plain_text.chars().collect();
    let mut out = String::with_capacity(doc.plain_text.len());
    let mut cursor = 0;
    for run in doc.runs.iter() {
        let Some(checkbox) = run.checkbox() else {
            continue;
        };
        let anchor = checkbox.anchor_offset.min(chars.len());
        if anchor < cursor {
            continue;
        }
        out.extend(&chars[cursor..anchor]);
        out.push_str(checkbox_token(checkbox.checked));
        cursor = (anchor + 1).min(chars.len());
    }
    out.extend(&chars[cursor..]);
    out
}

/// Rebuilds a document from RTF bytes.
///
/// Bytes that are not RTF, or RTF that does not parse, are decoded as plain
/// text instead, so this never fails in practice.
pub fn decode(bytes: &[u8]) -> Result<NoteDocument, DecodeError> {
    match reader::parse(bytes) {
        Ok(parsed) => Ok(assemble(parsed.title, parsed.segments)),
        Err(error) => {
            tracing::debug!(%error, "rtf parse failed, decoding as plain text");
            Ok(decode_plain(&String::from_utf8_lossy(bytes)))
        }
    }
}

/// Builds a document from plain text with default styling, restoring
/// checkbox tokens.
pub fn decode_plain(text: &str) -> NoteDocument {
    assemble(
        String::new(),
        vec![Segment {
            text: text.to_string(),
            style: StyledRun::default(),
        }],
    )
}

fn assemble(title: String, segments: Vec<Segment>) -> NoteDocument {
    let mut doc = NoteDocument::new(title);
    let mut offset = 0;
    for segment in segments {
        append_segment(&mut doc, &mut offset, segment);
    }
    ensure_placeholder(&mut doc);
    doc.legacy_markers = legacy::scan(&doc.plain_text);
    doc
}

fn append_segment(doc: &mut NoteDocument, offset: &mut usize, segment: Segment) {
    let mut last = 0;
    for found in checkbox_token_re().find_iter(&segment.text) {
        let Some(checked) = token_state(found.as_str()) else {
            continue;
        };
        push_text(doc, offset, &segment.text[last..found.start()], &segment.style);

        let mut run = segment.style.restyled(*offset, *offset + 1);
        run.attachment = Some(Attachment::Checkbox(CheckboxAttachment {
            anchor_offset: *offset,
            checked,
        }));
        doc.plain_text.push(ATTACHMENT_ANCHOR);
        doc.runs.push(run);
        *offset += 1;
        last = found.end();
    }
    push_text(doc, offset, &segment.text[last..], &segment.style);
}

fn push_text(doc: &mut NoteDocument, offset: &mut usize, text: &str, style: &StyledRun) {
    let len = text.chars().count();
    if len == 0 {
        return;
    }
    doc.plain_text.push_str(text);
    doc.runs.push(style.restyled(*offset, *offset + len));
    *offset += len;
}

/// Replaces a body that is empty after trimming with [`PLACEHOLDER_TEXT`].
pub(crate) fn ensure_placeholder(doc: &mut NoteDocument) {
    if doc.plain_text.trim().is_empty() {
        doc.plain_text = PLACEHOLDER_TEXT.to_string();
        doc.runs = vec![StyledRun::new(0, PLACEHOLDER_TEXT.chars().count())];
    }
}

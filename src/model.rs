use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EncodeError;

/// Placeholder character occupying the single text position of an inline
/// attachment.
pub const ATTACHMENT_ANCHOR: char = '\u{FFFC}';

/// Height given to a freshly added drawing, and to legacy drawings whose
/// height field does not parse.
pub const DEFAULT_DRAWING_HEIGHT: f64 = 200.0;

/// A `#RRGGBB` colour.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(into = "String", try_from = "String")]
pub struct RgbHex(pub u32);

impl RgbHex {
    pub const BLACK: RgbHex = RgbHex(0x000000);

    pub fn red(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn blue(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for RgbHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0 & 0xFF_FFFF)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid hex colour: {0:?}")]
pub struct InvalidColor(pub String);

impl FromStr for RgbHex {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidColor(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(RgbHex)
            .map_err(|_| InvalidColor(s.to_string()))
    }
}

impl From<RgbHex> for String {
    fn from(value: RgbHex) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for RgbHex {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckboxAttachment {
    pub anchor_offset: usize,
    pub checked: bool,
}

/// Non-text element carried by a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    Checkbox(CheckboxAttachment),
}

/// A contiguous span of `plain_text` sharing one style.
///
/// Offsets are counted in Unicode scalar values, `start_offset` inclusive and
/// `end_offset` exclusive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledRun {
    pub start_offset: usize,
    pub end_offset: usize,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub bullet_level: Option<u8>,
    pub indent_level: u8,
    /// Font resource chosen by the editor. The encoder folds it into a system
    /// font plus trait flags, so it never survives a round trip.
    #[serde(default)]
    pub font: Option<String>,
    pub attachment: Option<Attachment>,
}

impl StyledRun {
    pub fn new(start_offset: usize, end_offset: usize) -> Self {
        Self {
            start_offset,
            end_offset,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn checkbox(&self) -> Option<&CheckboxAttachment> {
        match &self.attachment {
            Some(Attachment::Checkbox(checkbox)) => Some(checkbox),
            None => None,
        }
    }

    /// Same style over a new range, without the attachment.
    pub fn restyled(&self, start_offset: usize, end_offset: usize) -> Self {
        Self {
            start_offset,
            end_offset,
            attachment: None,
            ..self.clone()
        }
    }

    fn shift(&mut self, delta: isize) {
        self.start_offset = self.start_offset.saturating_add_signed(delta);
        self.end_offset = self.end_offset.saturating_add_signed(delta);
        if let Some(Attachment::Checkbox(checkbox)) = &mut self.attachment {
            checkbox.anchor_offset = self.start_offset;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingAttachment {
    pub payload: Vec<u8>,
    pub height: f64,
    pub stroke_color: RgbHex,
}

impl Default for DrawingAttachment {
    fn default() -> Self {
        Self {
            payload: Vec::new(),
            height: DEFAULT_DRAWING_HEIGHT,
            stroke_color: RgbHex::BLACK,
        }
    }
}

/// A drawing inlined in a historical note body. Fields are kept verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegacyDrawingMarker {
    pub payload: String,
    pub height: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoteDocument {
    pub title: String,
    pub plain_text: String,
    pub runs: Vec<StyledRun>,
    pub drawing: Option<DrawingAttachment>,
    pub legacy_markers: Vec<LegacyDrawingMarker>,
}

impl NoteDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Unstyled document with one default run over the whole text.
    pub fn from_plain_text(title: impl Into<String>, text: impl Into<String>) -> Self {
        let plain_text = text.into();
        let len = plain_text.chars().count();
        let runs = if len == 0 {
            Vec::new()
        } else {
            vec![StyledRun::new(0, len)]
        };
        Self {
            title: title.into(),
            plain_text,
            runs,
            ..Self::default()
        }
    }

    /// Length of `plain_text` in Unicode scalar values.
    pub fn char_len(&self) -> usize {
        self.plain_text.chars().count()
    }

    /// Checks that the runs partition `plain_text` and that every checkbox
    /// sits on exactly one anchor character.
    pub fn validate(&self) -> Result<(), EncodeError> {
        let chars: Vec<char> = self.plain_text.chars().collect();
        let len = chars.len();
        let mut expected = 0;

        for (index, run) in self.runs.iter().enumerate() {
            if run.end_offset < run.start_offset {
                return Err(EncodeError::InvertedRun {
                    index,
                    start: run.start_offset,
                    end: run.end_offset,
                });
            }
            if run.start_offset != expected {
                return Err(EncodeError::RunGap {
                    index,
                    expected,
                    found: run.start_offset,
                });
            }
            if run.end_offset > len {
                return Err(EncodeError::RunOutOfBounds {
                    index,
                    end: run.end_offset,
                    len,
                });
            }
            if let Some(checkbox) = run.checkbox() {
                let anchored = run.len() == 1
                    && checkbox.anchor_offset == run.start_offset
                    && chars[run.start_offset] == ATTACHMENT_ANCHOR;
                if !anchored {
                    return Err(EncodeError::InvalidCheckboxAnchor {
                        offset: checkbox.anchor_offset,
                    });
                }
            }
            expected = run.end_offset;
        }

        if expected != len {
            return Err(EncodeError::UncoveredText {
                covered: expected,
                len,
            });
        }
        Ok(())
    }

    pub fn checkboxes(&self) -> impl Iterator<Item = &CheckboxAttachment> {
        self.runs.iter().filter_map(StyledRun::checkbox)
    }

    /// Flips the checkbox anchored at `anchor_offset`. Returns the new state,
    /// or `None` when no checkbox sits there.
    pub fn toggle_checkbox(&mut self, anchor_offset: usize) -> Option<bool> {
        self.runs.iter_mut().find_map(|run| match &mut run.attachment {
            Some(Attachment::Checkbox(checkbox)) if checkbox.anchor_offset == anchor_offset => {
                checkbox.checked = !checkbox.checked;
                Some(checkbox.checked)
            }
            _ => None,
        })
    }

    /// Inserts a checkbox anchor at `offset`, taking the style of the run it
    /// lands in. Offsets past the end append.
    pub fn insert_checkbox(&mut self, offset: usize, checked: bool) {
        let offset = offset.min(self.char_len());
        let byte = byte_offset(&self.plain_text, offset);
        self.plain_text.insert(byte, ATTACHMENT_ANCHOR);

        let idx = self
            .runs
            .iter()
            .position(|run| offset < run.end_offset)
            .unwrap_or(self.runs.len());
        let mut checkbox_run = self
            .runs
            .get(idx)
            .or_else(|| self.runs.last())
            .map(|run| run.restyled(offset, offset + 1))
            .unwrap_or_else(|| StyledRun::new(offset, offset + 1));
        checkbox_run.attachment = Some(Attachment::Checkbox(CheckboxAttachment {
            anchor_offset: offset,
            checked,
        }));

        let mut runs = Vec::with_capacity(self.runs.len() + 2);
        let mut inserted = false;
        for mut run in std::mem::take(&mut self.runs) {
            if !inserted && offset < run.end_offset {
                if run.start_offset < offset {
                    runs.push(run.restyled(run.start_offset, offset));
                    run.start_offset = offset;
                }
                runs.push(checkbox_run.clone());
                inserted = true;
            }
            if inserted {
                run.shift(1);
            }
            runs.push(run);
        }
        if !inserted {
            runs.push(checkbox_run);
        }
        self.runs = runs;
    }

    pub fn has_drawing(&self) -> bool {
        self.drawing.is_some()
    }

    /// Creates the note's drawing with an empty payload, or returns the
    /// existing one.
    pub fn add_drawing(&mut self) -> &mut DrawingAttachment {
        self.drawing.get_or_insert_with(DrawingAttachment::default)
    }

    /// Replaces the stroke payload. Returns `false` when the note has no
    /// drawing.
    pub fn update_drawing(&mut self, payload: Vec<u8>) -> bool {
        match &mut self.drawing {
            Some(drawing) => {
                drawing.payload = payload;
                true
            }
            None => false,
        }
    }

    pub fn delete_drawing(&mut self) -> Option<DrawingAttachment> {
        self.drawing.take()
    }

    /// Deletes the characters in `start..end`, clipping and shifting runs.
    /// Runs left empty are dropped.
    pub(crate) fn remove_range(&mut self, start: usize, end: usize) {
        let len = self.char_len();
        let end = end.min(len);
        if start >= end {
            return;
        }
        let from = byte_offset(&self.plain_text, start);
        let to = byte_offset(&self.plain_text, end);
        self.plain_text.replace_range(from..to, "");

        let removed = end - start;
        let map = |offset: usize| {
            if offset <= start {
                offset
            } else if offset >= end {
                offset - removed
            } else {
                start
            }
        };
        self.runs = std::mem::take(&mut self.runs)
            .into_iter()
            .filter_map(|mut run| {
                run.start_offset = map(run.start_offset);
                run.end_offset = map(run.end_offset);
                if let Some(Attachment::Checkbox(checkbox)) = &mut run.attachment {
                    checkbox.anchor_offset = run.start_offset;
                }
                (!run.is_empty()).then_some(run)
            })
            .collect();
    }
}

/// Byte index of the `char_offset`-th scalar value, or `text.len()` past the
/// end.
pub(crate) fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

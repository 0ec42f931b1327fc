use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::legacy;
use crate::model::{
    DrawingAttachment, LegacyDrawingMarker, NoteDocument, RgbHex, DEFAULT_DRAWING_HEIGHT,
};

fn default_drawing_height() -> f64 {
    DEFAULT_DRAWING_HEIGHT
}

fn default_drawing_color() -> String {
    RgbHex::BLACK.to_string()
}

/// A note as stored in the remote document store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NoteRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtf_content: Option<String>,
    #[serde(default)]
    pub has_drawing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_data: Option<String>,
    #[serde(default = "default_drawing_height")]
    pub drawing_height: f64,
    #[serde(default = "default_drawing_color")]
    pub drawing_color: String,
    /// Set when the body could not be encoded and only plain text was kept.
    #[serde(default)]
    pub formatting_lost: bool,
    /// Inline drawings migrated out of the body. Only the first of them is
    /// live; all of them are archived on delete.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_drawings: Vec<LegacyDrawingMarker>,
}

impl Default for NoteRecord {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            rtf_content: None,
            has_drawing: false,
            drawing_data: None,
            drawing_height: DEFAULT_DRAWING_HEIGHT,
            drawing_color: default_drawing_color(),
            formatting_lost: false,
            legacy_drawings: Vec::new(),
        }
    }
}

impl NoteRecord {
    /// Derives the stored fields from an editing session's document.
    ///
    /// Encoding failures are not returned: the record keeps the plain text
    /// and is flagged with `formatting_lost`.
    pub fn from_document(doc: &NoteDocument) -> Self {
        let (rtf_content, formatting_lost) = match codec::encode(doc) {
            Ok(bytes) => (Some(general_purpose::STANDARD.encode(bytes)), false),
            Err(error) => {
                tracing::warn!(%error, title = %doc.title, "note formatting lost, storing plain text");
                (None, true)
            }
        };
        let content = if formatting_lost {
            doc.plain_text.clone()
        } else {
            codec::tokenized_text(doc)
        };

        let mut record = Self {
            title: doc.title.clone(),
            content,
            rtf_content,
            formatting_lost,
            legacy_drawings: legacy::stripped_markers(doc),
            ..Self::default()
        };
        if let Some(drawing) = &doc.drawing {
            record.has_drawing = true;
            record.drawing_data = Some(general_purpose::STANDARD.encode(&drawing.payload));
            record.drawing_height = drawing.height;
            record.drawing_color = drawing.stroke_color.to_string();
        }
        record
    }

    /// Raw RTF bytes, if the record carries a decodable `rtf_content`.
    pub fn rtf_bytes(&self) -> Option<Vec<u8>> {
        let encoded = self.rtf_content.as_deref()?;
        match general_purpose::STANDARD.decode(encoded.trim()) {
            Ok(bytes) => Some(bytes),
            Err(error) => {
                tracing::warn!(%error, title = %self.title, "rtf_content is not valid base64");
                None
            }
        }
    }

    /// The out-of-band drawing, when `has_drawing` is set and its payload
    /// decodes.
    pub fn drawing(&self) -> Option<DrawingAttachment> {
        if !self.has_drawing {
            return None;
        }
        let payload = match self.drawing_data.as_deref() {
            Some(encoded) => match general_purpose::STANDARD.decode(encoded.trim()) {
                Ok(bytes) => bytes,
                Err(error) => {
                    tracing::warn!(%error, title = %self.title, "drawing_data is not valid base64");
                    return None;
                }
            },
            None => Vec::new(),
        };
        Some(DrawingAttachment {
            payload,
            height: self.drawing_height,
            stroke_color: self.drawing_color.parse().unwrap_or(RgbHex::BLACK),
        })
    }

    /// Rebuilds the editable document, migrating inline legacy drawings when
    /// the record has no current drawing. Previously migrated drawings come
    /// back in `legacy_markers`.
    pub fn to_document(&self) -> NoteDocument {
        let mut doc = match self.rtf_bytes() {
            Some(bytes) => codec::decode(&bytes).unwrap_or_else(|_| codec::decode_plain(&self.content)),
            None => codec::decode_plain(&self.content),
        };
        doc.title = self.title.clone();
        doc.drawing = self.drawing();

        if doc.drawing.is_none() && !doc.legacy_markers.is_empty() {
            legacy::migrate(&mut doc);
        }
        legacy::extend_distinct(&mut doc.legacy_markers, self.legacy_drawings.iter().cloned());
        doc
    }
}

//! Drawings inlined in note bodies by older clients, written as
//! `🎨DRAWING:<base64>:<height>:<#color>🎨`.

use base64::Engine as _;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::codec;
use crate::model::{DrawingAttachment, LegacyDrawingMarker, NoteDocument, RgbHex, DEFAULT_DRAWING_HEIGHT};

pub const MARKER_GLYPH: char = '🎨';
pub const MARKER_PREFIX: &str = "🎨DRAWING:";

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"🎨DRAWING:([^:🎨]+):([^:🎨]+):([^:🎨]+)🎨")
            .expect("drawing marker pattern is valid")
    })
}

/// Extracts every well-formed marker in source order.
pub fn scan(content: &str) -> Vec<LegacyDrawingMarker> {
    if !content.contains(MARKER_PREFIX) {
        return Vec::new();
    }
    marker_re()
        .captures_iter(content)
        .map(|caps| LegacyDrawingMarker {
            payload: caps[1].to_string(),
            height: caps[2].to_string(),
            color: caps[3].to_string(),
        })
        .collect()
}

/// Markers found in a stored note: those in `content` followed by any extra
/// ones recovered from the RTF body. A marker already seen in `content` is
/// not repeated, but repeats within one source are kept.
pub fn scan_note(content: &str, rtf: Option<&[u8]>) -> Vec<LegacyDrawingMarker> {
    let mut markers = scan(content);
    if let Some(bytes) = rtf {
        if let Ok(doc) = codec::decode(bytes) {
            extend_distinct(&mut markers, doc.legacy_markers);
        }
    }
    markers
}

/// Appends the markers of another source, skipping any that `markers`
/// already holds.
pub fn extend_distinct(
    markers: &mut Vec<LegacyDrawingMarker>,
    more: impl IntoIterator<Item = LegacyDrawingMarker>,
) {
    let seen: HashSet<LegacyDrawingMarker> = markers.iter().cloned().collect();
    markers.extend(more.into_iter().filter(|marker| !seen.contains(marker)));
}

/// Markers of `doc` that are no longer spelled out in its body.
pub fn stripped_markers(doc: &NoteDocument) -> Vec<LegacyDrawingMarker> {
    let in_body: HashSet<LegacyDrawingMarker> = scan(&doc.plain_text).into_iter().collect();
    doc.legacy_markers
        .iter()
        .filter(|marker| !in_body.contains(*marker))
        .cloned()
        .collect()
}

impl LegacyDrawingMarker {
    /// Height in points, falling back to the default for unparsable text.
    pub fn height_value(&self) -> f64 {
        self.height
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(DEFAULT_DRAWING_HEIGHT)
    }

    pub fn color_value(&self) -> RgbHex {
        self.color.parse().unwrap_or(RgbHex::BLACK)
    }

    /// Converts the marker into the current drawing model. An undecodable
    /// payload yields an empty drawing.
    pub fn to_drawing(&self) -> DrawingAttachment {
        let payload = match base64::engine::general_purpose::STANDARD.decode(self.payload.trim()) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(%error, "legacy drawing payload is not valid base64");
                Vec::new()
            }
        };
        DrawingAttachment {
            payload,
            height: self.height_value(),
            stroke_color: self.color_value(),
        }
    }
}

/// Moves inline drawings out of the body.
///
/// All marker text is removed from `plain_text` and the markers are kept in
/// `legacy_markers`, which [`crate::NoteRecord`] persists so every one of
/// them stays archivable. The first marker becomes the note's drawing unless
/// one is already set. Returns `true` if the document changed.
pub fn migrate(doc: &mut NoteDocument) -> bool {
    let spans: Vec<(usize, usize, LegacyDrawingMarker)> = marker_re()
        .captures_iter(&doc.plain_text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let start = doc.plain_text[..whole.start()].chars().count();
            let len = whole.as_str().chars().count();
            Some((
                start,
                start + len,
                LegacyDrawingMarker {
                    payload: caps[1].to_string(),
                    height: caps[2].to_string(),
                    color: caps[3].to_string(),
                },
            ))
        })
        .collect();
    if spans.is_empty() {
        return false;
    }

    for (start, end, _) in spans.iter().rev() {
        doc.remove_range(*start, *end);
    }
    codec::ensure_placeholder(doc);

    let markers: Vec<LegacyDrawingMarker> = spans.into_iter().map(|(_, _, marker)| marker).collect();
    if doc.drawing.is_none() {
        tracing::debug!(
            markers = markers.len(),
            "promoting first legacy drawing marker to note drawing"
        );
        doc.drawing = Some(markers[0].to_drawing());
    }
    doc.legacy_markers = markers;
    true
}

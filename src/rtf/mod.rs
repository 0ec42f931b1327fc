//! RTF reading and writing for the flat run model.
//!
//! The writer emits one group per run with explicit trait control words on
//! top of a fixed system font table. The reader understands that output and
//! the common subset produced by other writers: group-scoped character
//! state, `\uN` escapes, cp1252 `\'hh` escapes and ignorable destinations.

pub mod font;
pub mod reader;
pub mod writer;

/// `\fs` is measured in half points; 24 is 12pt.
pub const BASE_FONT_HALF_POINTS: u32 = 24;

/// Left indent per indent level, in twips.
pub const INDENT_TWIPS: i32 = 720;

/// List id written with `\ls` for bulleted runs.
pub const BULLET_LIST_ID: u32 = 1;

use std::fmt::Write as _;

use super::font::{self, SYSTEM_FONTS};
use super::{BASE_FONT_HALF_POINTS, BULLET_LIST_ID, INDENT_TWIPS};
use crate::model::StyledRun;

/// One run ready for serialization: a normalized style and the exact text
/// to emit for it.
#[derive(Debug, Clone)]
pub struct RtfRun {
    pub style: StyledRun,
    pub text: String,
}

/// Serializes runs into an RTF document. Each run becomes its own group so
/// run boundaries survive a read back.
pub fn write_document(title: &str, runs: &[RtfRun]) -> Vec<u8> {
    let mut out = String::with_capacity(256 + runs.iter().map(|r| r.text.len() + 32).sum::<usize>());
    out.push_str("{\\rtf1\\ansi\\ansicpg1252\\deff0\\uc1\n");

    out.push_str("{\\fonttbl");
    for (index, font) in SYSTEM_FONTS.iter().enumerate() {
        let _ = write!(
            out,
            "{{\\f{}\\{}\\fcharset0 {};}}",
            index,
            font.family.control_word(),
            font.name
        );
    }
    out.push_str("}\n");

    if !title.is_empty() {
        out.push_str("{\\info{\\title ");
        push_escaped(&mut out, title);
        out.push_str("}}\n");
    }

    out.push_str("\\pard\\plain\n");
    for run in runs {
        push_run(&mut out, run);
    }
    out.push_str("\n}");
    out.into_bytes()
}

fn push_run(out: &mut String, run: &RtfRun) {
    let style = &run.style;
    let traits = font::traits_of(style);
    let _ = write!(out, "{{\\f{}\\fs{}", traits.font_index(), BASE_FONT_HALF_POINTS);
    if style.bold {
        out.push_str("\\b");
    }
    if style.italic {
        out.push_str("\\i");
    }
    if style.underline {
        out.push_str("\\ul");
    }
    if style.strikethrough {
        out.push_str("\\strike");
    }
    if let Some(level) = style.bullet_level {
        let _ = write!(out, "\\ls{}\\ilvl{}", BULLET_LIST_ID, level);
    }
    if style.indent_level > 0 {
        let _ = write!(out, "\\li{}", i32::from(style.indent_level) * INDENT_TWIPS);
    }
    out.push(' ');
    push_escaped(out, &run.text);
    out.push('}');
}

/// Escapes text for an RTF body. Non-ASCII characters are written as UTF-16
/// code units with a `?` fallback.
fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\par "),
            '\t' => out.push_str("\\tab "),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{}?", *unit as i16);
                }
            }
        }
    }
}

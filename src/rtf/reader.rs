use std::collections::HashMap;

use super::font::FontTraits;
use super::INDENT_TWIPS;
use crate::error::DecodeError;
use crate::model::StyledRun;

/// Text sharing one resolved style. Offsets in `style` are left at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub style: StyledRun,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRtf {
    pub title: String,
    pub segments: Vec<Segment>,
}

impl ParsedRtf {
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Parses an RTF byte stream into styled segments.
///
/// A segment ends at every group close and at every style change, so runs
/// written as separate groups come back as separate segments.
pub fn parse(bytes: &[u8]) -> Result<ParsedRtf, DecodeError> {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    if !bytes[start..].starts_with(b"{\\rtf") {
        return Err(DecodeError::MissingHeader);
    }

    let mut reader = Reader::new(bytes, start);
    reader.read()?;
    Ok(reader.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Body,
    FontTable,
    Info,
    Title,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct CharState {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    font: Option<i32>,
    list: bool,
    list_level: u8,
    left_indent: i32,
}

#[derive(Debug, Clone, Copy)]
struct GroupState {
    chars: CharState,
    dest: Destination,
    uc: usize,
}

#[derive(Debug, Default)]
struct FontEntry {
    name: String,
    modern: bool,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    state: GroupState,
    stack: Vec<GroupState>,
    default_font: Option<i32>,
    fonts: HashMap<i32, FontEntry>,
    pending_font: Option<(i32, FontEntry)>,
    title: String,
    segments: Vec<(String, CharState)>,
    current: Option<(String, CharState)>,
    fallback_left: usize,
    high_surrogate: Option<u16>,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos,
            state: GroupState {
                chars: CharState::default(),
                dest: Destination::Body,
                uc: 1,
            },
            stack: Vec::new(),
            default_font: None,
            fonts: HashMap::new(),
            pending_font: None,
            title: String::new(),
            segments: Vec::new(),
            current: None,
            fallback_left: 0,
            high_surrogate: None,
        }
    }

    fn read(&mut self) -> Result<(), DecodeError> {
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b'{' => {
                    self.pos += 1;
                    self.stack.push(self.state);
                    self.fallback_left = 0;
                }
                b'}' => {
                    let at = self.pos;
                    self.pos += 1;
                    self.flush();
                    self.state = self.stack.pop().ok_or(DecodeError::UnbalancedGroup(at))?;
                    self.fallback_left = 0;
                    if self.stack.is_empty() {
                        return Ok(());
                    }
                }
                b'\\' => self.control(),
                b'\r' | b'\n' => self.pos += 1,
                _ => {
                    self.pos += 1;
                    self.literal(cp1252(byte));
                }
            }
        }
        Err(DecodeError::UnterminatedGroup(self.stack.len()))
    }

    fn finish(mut self) -> ParsedRtf {
        self.flush();
        let segments = std::mem::take(&mut self.segments)
            .into_iter()
            .map(|(text, chars)| Segment {
                text,
                style: self.resolve(chars),
            })
            .collect();
        ParsedRtf {
            title: self.title,
            segments,
        }
    }

    fn control(&mut self) {
        let bytes = self.bytes;
        self.pos += 1;
        let Some(&next) = bytes.get(self.pos) else {
            return;
        };

        if !next.is_ascii_alphabetic() {
            self.pos += 1;
            match next {
                b'\\' | b'{' | b'}' => self.literal(next as char),
                b'\'' => {
                    let hex = bytes
                        .get(self.pos..self.pos + 2)
                        .and_then(|h| std::str::from_utf8(h).ok())
                        .and_then(|h| u8::from_str_radix(h, 16).ok());
                    if let Some(value) = hex {
                        self.pos += 2;
                        self.literal(cp1252(value));
                    }
                }
                b'*' => self.state.dest = Destination::Skip,
                b'~' => self.emit('\u{A0}'),
                b'_' => self.emit('\u{2011}'),
                b'\n' | b'\r' => self.emit('\n'),
                _ => {}
            }
            return;
        }

        let start = self.pos;
        while bytes.get(self.pos).is_some_and(u8::is_ascii_alphabetic) {
            self.pos += 1;
        }
        let word = std::str::from_utf8(&bytes[start..self.pos]).unwrap_or_default();

        let negative = bytes.get(self.pos) == Some(&b'-')
            && bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit);
        if negative {
            self.pos += 1;
        }
        let digits = self.pos;
        while bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        let param = (self.pos > digits).then(|| {
            let value = std::str::from_utf8(&bytes[digits..self.pos])
                .ok()
                .and_then(|d| d.parse::<i64>().ok())
                .unwrap_or(i64::from(i32::MAX));
            let value = if negative { -value } else { value };
            value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        });
        if bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }

        self.word(word, param);
    }

    fn word(&mut self, word: &str, param: Option<i32>) {
        let on = param != Some(0);
        let dest = self.state.dest;
        match word {
            "deff" => self.default_font = param,
            "fonttbl" => self.state.dest = Destination::FontTable,
            "info" => self.state.dest = Destination::Info,
            "title" if dest == Destination::Info => self.state.dest = Destination::Title,
            "colortbl" | "stylesheet" | "pict" | "listtable" | "listoverridetable" | "header"
            | "headerl" | "headerr" | "footer" | "footerl" | "footerr" | "footnote"
            | "expandedcolortbl" | "generator" | "themedata" | "colorschememapping"
            | "latentstyles" | "datastore" | "xmlnstbl" | "rsidtbl" | "fldinst" | "object" => {
                self.state.dest = Destination::Skip
            }
            "f" if dest == Destination::FontTable => {
                self.pending_font = param.map(|index| (index, FontEntry::default()));
            }
            "f" => self.state.chars.font = param,
            "fmodern" => {
                if let Some((_, entry)) = &mut self.pending_font {
                    entry.modern = true;
                }
            }
            "par" | "line" | "sect" | "page" => self.emit('\n'),
            "tab" => self.emit('\t'),
            "emdash" => self.emit('\u{2014}'),
            "endash" => self.emit('\u{2013}'),
            "bullet" => self.emit('\u{2022}'),
            "lquote" => self.emit('\u{2018}'),
            "rquote" => self.emit('\u{2019}'),
            "ldblquote" => self.emit('\u{201C}'),
            "rdblquote" => self.emit('\u{201D}'),
            "emspace" | "enspace" | "qmspace" => self.emit(' '),
            "b" => self.state.chars.bold = on,
            "i" => self.state.chars.italic = on,
            "ul" | "uld" | "uldb" | "ulw" | "uldash" | "ulth" => self.state.chars.underline = on,
            "ulnone" => self.state.chars.underline = false,
            "strike" | "striked" => self.state.chars.strike = on,
            "plain" => {
                self.state.chars.bold = false;
                self.state.chars.italic = false;
                self.state.chars.underline = false;
                self.state.chars.strike = false;
                self.state.chars.font = None;
            }
            "pard" => {
                self.state.chars.list = false;
                self.state.chars.list_level = 0;
                self.state.chars.left_indent = 0;
            }
            "ls" => self.state.chars.list = true,
            "ilvl" => self.state.chars.list_level = param.unwrap_or(0).clamp(0, i32::from(u8::MAX)) as u8,
            "li" => self.state.chars.left_indent = param.unwrap_or(0),
            "uc" => self.state.uc = param.unwrap_or(1).max(0) as usize,
            "u" => self.unicode(param.unwrap_or(0)),
            _ => {}
        }
    }

    fn unicode(&mut self, param: i32) {
        let unit = param as i16 as u16;
        self.fallback_left = self.state.uc;
        match unit {
            0xD800..=0xDBFF => self.high_surrogate = Some(unit),
            0xDC00..=0xDFFF => {
                let ch = self.high_surrogate.take().and_then(|high| {
                    let scalar = 0x10000
                        + ((u32::from(high) - 0xD800) << 10)
                        + (u32::from(unit) - 0xDC00);
                    char::from_u32(scalar)
                });
                self.emit(ch.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            _ => {
                self.high_surrogate = None;
                self.emit(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
    }

    /// A character read from the stream itself rather than produced by a
    /// control word. It may be the fallback of a preceding `\u`.
    fn literal(&mut self, ch: char) {
        if self.fallback_left > 0 {
            self.fallback_left -= 1;
            return;
        }
        self.high_surrogate = None;
        self.emit(ch);
    }

    fn emit(&mut self, ch: char) {
        match self.state.dest {
            Destination::Body => {
                let chars = self.state.chars;
                match &mut self.current {
                    Some((text, style)) if *style == chars => text.push(ch),
                    _ => {
                        self.flush();
                        self.current = Some((ch.to_string(), chars));
                    }
                }
            }
            Destination::FontTable => {
                if ch == ';' {
                    if let Some((index, mut entry)) = self.pending_font.take() {
                        entry.name = entry.name.trim().to_string();
                        self.fonts.insert(index, entry);
                    }
                } else if let Some((_, entry)) = &mut self.pending_font {
                    entry.name.push(ch);
                }
            }
            Destination::Title => self.title.push(ch),
            Destination::Info | Destination::Skip => {}
        }
    }

    fn flush(&mut self) {
        if let Some((text, chars)) = self.current.take() {
            if !text.is_empty() {
                self.segments.push((text, chars));
            }
        }
    }

    fn resolve(&self, chars: CharState) -> StyledRun {
        let font_traits = chars
            .font
            .or(self.default_font)
            .and_then(|index| self.fonts.get(&index))
            .map(|entry| {
                let traits = FontTraits::from_name(&entry.name);
                FontTraits {
                    mono: traits.mono || entry.modern,
                    ..traits
                }
            })
            .unwrap_or_default();
        let traits = FontTraits {
            bold: chars.bold,
            italic: chars.italic,
            mono: false,
        }
        .union(font_traits);

        StyledRun {
            bold: traits.bold,
            italic: traits.italic,
            underline: chars.underline,
            strikethrough: chars.strike,
            code: traits.mono,
            bullet_level: chars.list.then_some(chars.list_level),
            indent_level: (chars.left_indent / INDENT_TWIPS).clamp(0, i32::from(u8::MAX)) as u8,
            ..StyledRun::default()
        }
    }
}

const CP1252_HIGH: [u16; 32] = [
    0x20AC, 0x0081, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0x008D, 0x017D, 0x008F, 0x0090, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014,
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x009D, 0x017E, 0x0178,
];

fn cp1252(byte: u8) -> char {
    match byte {
        0x80..=0x9F => char::from_u32(u32::from(CP1252_HIGH[usize::from(byte - 0x80)]))
            .unwrap_or(char::REPLACEMENT_CHARACTER),
        _ => char::from(byte),
    }
}

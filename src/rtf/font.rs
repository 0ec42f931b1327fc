use crate::model::StyledRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Swiss,
    Modern,
}

impl FontFamily {
    pub fn control_word(self) -> &'static str {
        match self {
            FontFamily::Swiss => "fswiss",
            FontFamily::Modern => "fmodern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemFont {
    pub name: &'static str,
    pub family: FontFamily,
}

/// Font table written into every document. The index of an entry is
/// `mono * 4 + italic * 2 + bold`.
pub const SYSTEM_FONTS: [SystemFont; 8] = [
    SystemFont { name: "Helvetica", family: FontFamily::Swiss },
    SystemFont { name: "Helvetica-Bold", family: FontFamily::Swiss },
    SystemFont { name: "Helvetica-Oblique", family: FontFamily::Swiss },
    SystemFont { name: "Helvetica-BoldOblique", family: FontFamily::Swiss },
    SystemFont { name: "Menlo-Regular", family: FontFamily::Modern },
    SystemFont { name: "Menlo-Bold", family: FontFamily::Modern },
    SystemFont { name: "Menlo-Italic", family: FontFamily::Modern },
    SystemFont { name: "Menlo-BoldItalic", family: FontFamily::Modern },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontTraits {
    pub bold: bool,
    pub italic: bool,
    pub mono: bool,
}

impl FontTraits {
    /// Guesses traits from a PostScript-style font name such as
    /// `Nunito-SemiBoldItalic` or `SFMono-Regular`.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        Self {
            bold: has(&["bold", "heavy", "black"]),
            italic: has(&["italic", "oblique"]),
            mono: has(&["mono", "menlo", "courier", "consol", "code"]),
        }
    }

    pub fn union(self, other: FontTraits) -> Self {
        Self {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            mono: self.mono || other.mono,
        }
    }

    pub fn font_index(self) -> usize {
        usize::from(self.mono) * 4 + usize::from(self.italic) * 2 + usize::from(self.bold)
    }
}

/// Folds a run's font resource into its trait flags and clears it, leaving
/// a run whose style maps onto a [`SYSTEM_FONTS`] entry.
pub fn normalize(run: &StyledRun) -> StyledRun {
    let mut normalized = run.clone();
    if let Some(name) = normalized.font.take() {
        let traits = FontTraits::from_name(&name);
        normalized.bold |= traits.bold;
        normalized.italic |= traits.italic;
        normalized.code |= traits.mono;
    }
    normalized
}

pub fn traits_of(run: &StyledRun) -> FontTraits {
    FontTraits {
        bold: run.bold,
        italic: run.italic,
        mono: run.code,
    }
}

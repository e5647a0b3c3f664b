//! Text width estimation used by the layout adjuster.
//!
//! This is a heuristic tuned for the CJK sans fonts the templates use, not a
//! font-metrics engine.

/// EMU per typographic point.
pub const EMU_PER_PT: f64 = 12_700.0;

/// Font size assumed when a paragraph has no explicit run size.
pub const DEFAULT_FONT_SIZE_PT: f64 = 28.0;

/// Per-character advance widths in em.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharWidthTable {
    /// Advance of code points below U+0080.
    pub narrow: f64,
    /// Advance of every other code point (CJK, full-width punctuation, ...).
    pub wide: f64,
}

impl CharWidthTable {
    /// The table the templates were tuned against.
    pub const DEFAULT: CharWidthTable = CharWidthTable {
        narrow: 0.55,
        wide: 1.0,
    };

    /// Advance of one character in em.
    pub fn weight(&self, c: char) -> f64 {
        if (c as u32) < 0x80 {
            self.narrow
        } else {
            self.wide
        }
    }

    /// Advance of a whole line in em.
    pub fn line_em(&self, line: &str) -> f64 {
        line.chars().map(|c| self.weight(c)).sum()
    }

    /// Estimated rendered width of a line in EMU.
    pub fn line_width_emu(&self, line: &str, font_size_pt: f64) -> f64 {
        self.line_em(line) * font_size_pt * EMU_PER_PT
    }
}

impl Default for CharWidthTable {
    fn default() -> Self {
        Self::DEFAULT
    }
}

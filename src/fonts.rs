//! Text styles and width measurement for the builtin Helvetica family.
//!
//! The PDF uses the standard-14 fonts, so no font bytes are embedded. Widths
//! use an average-advance heuristic, which is accurate enough to centre and
//! right-align short numeric cells.

use serde::{Deserialize, Serialize};

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Helvetica variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFace {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontFace {
    pub fn is_bold(self) -> bool {
        matches!(self, FontFace::Bold | FontFace::BoldItalic)
    }
}

/// Font face and size, passed explicitly to every draw call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub face: FontFace,
    /// Size in points.
    pub size: f32,
}

impl TextStyle {
    pub const fn new(face: FontFace, size: f32) -> Self {
        Self { face, size }
    }

    pub const fn regular(size: f32) -> Self {
        Self::new(FontFace::Regular, size)
    }

    pub const fn bold(size: f32) -> Self {
        Self::new(FontFace::Bold, size)
    }

    pub const fn italic(size: f32) -> Self {
        Self::new(FontFace::Italic, size)
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::regular(8.0)
    }
}

/// Width of `text` in millimetres.
///
/// Average char width ≈ 0.5 × font size for proportional fonts; bold is
/// ~10 % wider.
pub fn measure_text_width(text: &str, style: TextStyle) -> f32 {
    let avg = if style.face.is_bold() { 0.55 } else { 0.5 };
    text.chars().count() as f32 * style.size * avg / PT_PER_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_text_width() {
        // 5 chars × 16 pt × 0.5 = 40 pt
        let w = measure_text_width("Hello", TextStyle::regular(16.0));
        assert!((w * PT_PER_MM - 40.0).abs() < 0.01);
    }

    #[test]
    fn bold_is_wider() {
        let regular = measure_text_width("1250.00", TextStyle::regular(8.0));
        let bold = measure_text_width("1250.00", TextStyle::bold(8.0));
        assert!(bold > regular);
        assert_eq!(measure_text_width("", TextStyle::bold(8.0)), 0.0);
    }
}

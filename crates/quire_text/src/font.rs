//! Font capability
//!
//! Fonts are registered in [`crate::TextLayerShared`] and referenced from
//! styles and text properties through a [`FontHandle`].

use crate::shaper::Shaper;

/// Handle of a font registered in the shared layer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontHandle(pub(crate) u32);

impl FontHandle {
    /// Position of the font in the shared font list
    pub fn index(self) -> u32 {
        self.0
    }
}

/// An opened font instance
///
/// Metrics are in font units at [`Font::size`], ascent positive above the
/// baseline and descent negative below it.
pub trait Font {
    /// Size the font was opened at, which is also the size glyphs were
    /// rasterized into the glyph cache at
    fn size(&self) -> f32;

    fn ascent(&self) -> f32;

    fn descent(&self) -> f32;

    fn glyph_count(&self) -> u32;

    /// Create a shaper for this font. The text layer creates one shaper per
    /// font and reuses it for all shaping.
    fn create_shaper(&self) -> Box<dyn Shaper>;
}

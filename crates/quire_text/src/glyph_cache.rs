//! Glyph cache lookup
//!
//! The glyph cache owns the atlas texture with rasterized glyphs. The text
//! layer only needs to know where each glyph lives in it.

use quire_core::{Range2D, Vec2};
use rustc_hash::FxHashMap;

use crate::{Result, TextError};

/// Location of a rasterized glyph in the cache
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CachedGlyph {
    /// Offset of the rectangle's top-left corner from the pen position, in
    /// cache pixels, Y down
    pub offset: Vec2,
    /// Texture array layer
    pub layer: u32,
    /// Rectangle in the cache texture, in pixels
    pub rectangle: Range2D,
}

impl CachedGlyph {
    pub fn new(offset: Vec2, layer: u32, rectangle: Range2D) -> Self {
        Self {
            offset,
            layer,
            rectangle,
        }
    }
}

/// Glyph cache lookup capability
pub trait GlyphCache {
    /// Size of one texture layer in pixels, used to normalize texture
    /// coordinates
    fn size(&self) -> Vec2;

    fn font_count(&self) -> u32;

    /// Number of glyphs the font with given cache font ID has
    fn font_glyph_count(&self, font_id: u32) -> u32;

    /// Look up a font-local glyph, `None` if it isn't in the cache
    fn glyph(&self, font_id: u32, glyph_id: u32) -> Option<CachedGlyph>;

    /// Placeholder drawn for glyphs missing from the cache
    fn invalid_glyph(&self) -> CachedGlyph;
}

/// A glyph cache described by a lookup table
///
/// The host rasterizes glyphs into its atlas texture and records where
/// each one went.
#[derive(Debug, Clone, Default)]
pub struct AtlasGlyphCache {
    size: Vec2,
    /// Glyph count of each font
    fonts: Vec<u32>,
    glyphs: FxHashMap<(u32, u32), CachedGlyph>,
    invalid: CachedGlyph,
}

impl AtlasGlyphCache {
    /// Create an empty cache with texture layers of given size in pixels
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            fonts: Vec::new(),
            glyphs: FxHashMap::default(),
            invalid: CachedGlyph::default(),
        }
    }

    /// Add a font with given glyph count, returning its cache font ID
    pub fn add_font(&mut self, glyph_count: u32) -> u32 {
        self.fonts.push(glyph_count);
        self.fonts.len() as u32 - 1
    }

    /// Record a rasterized glyph
    pub fn add_glyph(
        &mut self,
        font_id: u32,
        glyph_id: u32,
        offset: Vec2,
        layer: u32,
        rectangle: Range2D,
    ) -> Result<()> {
        let glyph_count = *self
            .fonts
            .get(font_id as usize)
            .ok_or_else(|| TextError::out_of_range("font", font_id, self.fonts.len() as u32))?;
        if glyph_id >= glyph_count {
            return Err(TextError::out_of_range("glyph", glyph_id, glyph_count));
        }
        self.glyphs.insert(
            (font_id, glyph_id),
            CachedGlyph::new(offset, layer, rectangle),
        );
        Ok(())
    }

    pub fn set_invalid_glyph(&mut self, offset: Vec2, layer: u32, rectangle: Range2D) {
        self.invalid = CachedGlyph::new(offset, layer, rectangle);
    }

    /// Number of glyphs recorded across all fonts
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

impl GlyphCache for AtlasGlyphCache {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn font_count(&self) -> u32 {
        self.fonts.len() as u32
    }

    fn font_glyph_count(&self, font_id: u32) -> u32 {
        self.fonts.get(font_id as usize).copied().unwrap_or(0)
    }

    fn glyph(&self, font_id: u32, glyph_id: u32) -> Option<CachedGlyph> {
        self.glyphs.get(&(font_id, glyph_id)).copied()
    }

    fn invalid_glyph(&self) -> CachedGlyph {
        self.invalid
    }
}

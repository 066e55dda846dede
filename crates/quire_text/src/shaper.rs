//! Shaper capability
//!
//! A shaper turns a byte range of text into positioned glyphs. The text
//! layer treats it as a black box with a small fixed interface so any
//! shaping backend can be plugged in through [`crate::Font::create_shaper`].

use quire_core::Vec2;

/// Text flow direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeDirection {
    /// Detected by the shaper from the text contents
    #[default]
    Unspecified,
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl ShapeDirection {
    pub fn is_vertical(self) -> bool {
        matches!(self, ShapeDirection::TopToBottom | ShapeDirection::BottomToTop)
    }
}

/// ISO 15924 script tag, such as `Latn` or `Arab`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Script(pub [u8; 4]);

impl Script {
    pub const LATIN: Script = Script(*b"Latn");
    pub const ARABIC: Script = Script(*b"Arab");
    pub const HEBREW: Script = Script(*b"Hebr");
    pub const GREEK: Script = Script(*b"Grek");
    pub const CYRILLIC: Script = Script(*b"Cyrl");

    pub const fn from_bytes(tag: &[u8; 4]) -> Self {
        Script(*tag)
    }
}

/// OpenType feature tag, such as `kern` or `smcp`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature(pub [u8; 4]);

impl Feature {
    pub const KERNING: Feature = Feature(*b"kern");
    pub const STANDARD_LIGATURES: Feature = Feature(*b"liga");
    pub const DISCRETIONARY_LIGATURES: Feature = Feature(*b"dlig");
    pub const SMALL_CAPITALS: Feature = Feature(*b"smcp");
    pub const OLDSTYLE_FIGURES: Feature = Feature(*b"onum");
    pub const TABULAR_FIGURES: Feature = Feature(*b"tnum");
    pub const SLASHED_ZERO: Feature = Feature(*b"zero");

    pub const fn from_bytes(tag: &[u8; 4]) -> Self {
        Feature(*tag)
    }
}

/// A feature with its value, applied to a whole text
///
/// This is what styles carry. A value of `1` enables a boolean feature,
/// `0` disables it, other values pick an alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextFeatureValue {
    pub feature: Feature,
    pub value: u32,
}

impl TextFeatureValue {
    pub const fn new(feature: Feature, value: u32) -> Self {
        Self { feature, value }
    }

    pub const fn enabled(feature: Feature) -> Self {
        Self::new(feature, 1)
    }

    pub const fn disabled(feature: Feature) -> Self {
        Self::new(feature, 0)
    }

    /// Feature applied to the whole shaped range
    pub const fn to_range(self) -> FeatureRange {
        FeatureRange {
            feature: self.feature,
            value: self.value,
            begin: 0,
            end: u32::MAX,
        }
    }
}

/// A feature with its value, applied to a byte range of the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureRange {
    pub feature: Feature,
    pub value: u32,
    /// First byte the feature applies to
    pub begin: u32,
    /// One past the last byte the feature applies to, `u32::MAX` for the
    /// rest of the text
    pub end: u32,
}

impl FeatureRange {
    pub const fn new(feature: Feature, value: u32, begin: u32, end: u32) -> Self {
        Self {
            feature,
            value,
            begin,
            end,
        }
    }
}

/// Text shaping capability
///
/// `set_script`, `set_language` and `set_direction` apply to the next
/// [`Shaper::shape`] call only. Each returns `false` if the value isn't
/// supported by the backend, in which case it's ignored. After shaping, the
/// `*_into` queries fill slices of exactly the returned glyph count.
///
/// Offsets and advances are in font units at the font's own size, with the
/// Y axis pointing up as is customary for font metrics. Clusters are byte
/// indices into the `text` slice passed to `shape`.
pub trait Shaper {
    fn set_script(&mut self, script: Script) -> bool;

    fn set_language(&mut self, language: &str) -> bool;

    fn set_direction(&mut self, direction: ShapeDirection) -> bool;

    /// Shape the `begin..end` byte range of `text`, returning the glyph count
    fn shape(&mut self, text: &[u8], begin: usize, end: usize, features: &[FeatureRange])
        -> usize;

    fn glyph_ids_into(&self, ids: &mut [u32]);

    fn glyph_offsets_advances_into(&self, offsets: &mut [Vec2], advances: &mut [Vec2]);

    fn glyph_clusters_into(&self, clusters: &mut [u32]);

    /// Direction used by the last `shape` call, either the requested one or
    /// the one detected from the text
    fn direction(&self) -> ShapeDirection;
}

/// Owned result of one shaping call
#[derive(Debug, Clone, Default)]
pub(crate) struct ShapedGlyphs {
    pub ids: Vec<u32>,
    pub offsets: Vec<Vec2>,
    pub advances: Vec<Vec2>,
    pub clusters: Vec<u32>,
    pub direction: ShapeDirection,
}

impl ShapedGlyphs {
    /// Shape the whole `text` and collect the results
    pub fn collect(shaper: &mut dyn Shaper, text: &[u8], features: &[FeatureRange]) -> Self {
        let count = shaper.shape(text, 0, text.len(), features);
        let mut shaped = ShapedGlyphs {
            ids: vec![0; count],
            offsets: vec![Vec2::ZERO; count],
            advances: vec![Vec2::ZERO; count],
            clusters: vec![0; count],
            direction: shaper.direction(),
        };
        shaper.glyph_ids_into(&mut shaped.ids);
        shaper.glyph_offsets_advances_into(&mut shaped.offsets, &mut shaped.advances);
        shaper.glyph_clusters_into(&mut shaped.clusters);
        shaped
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

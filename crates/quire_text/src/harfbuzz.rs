//! HarfBuzz-backed font and shaper
//!
//! Uses rustybuzz for shaping and ttf-parser for font metrics. Text may
//! contain invalid UTF-8; every malformed byte is shaped as U+FFFD with its
//! own cluster so clusters always index the original bytes.

use std::str::FromStr;

use quire_core::Vec2;
use rustybuzz::ttf_parser::Tag;
use rustybuzz::{Direction, Face, GlyphBuffer, Language, UnicodeBuffer};

use crate::font::Font;
use crate::shaper::{FeatureRange, Script, ShapeDirection, Shaper};
use crate::{Result, TextError};

/// A font loaded from TTF/OTF data
///
/// The face is parsed once and shared by all shapers created from it.
#[derive(Clone)]
pub struct RustybuzzFont {
    face: Face<'static>,
    face_index: u32,
    size: f32,
    /// Font units to pixels at `size`
    scale: f32,
    ascent: f32,
    descent: f32,
    glyph_count: u32,
}

impl std::fmt::Debug for RustybuzzFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustybuzzFont")
            .field("face_index", &self.face_index)
            .field("size", &self.size)
            .field("ascent", &self.ascent)
            .field("descent", &self.descent)
            .field("glyph_count", &self.glyph_count)
            // Skip the face tables
            .finish()
    }
}

impl RustybuzzFont {
    /// Open a face from static font file data at given size in pixels
    pub fn from_static(data: &'static [u8], face_index: u32, size: f32) -> Result<Self> {
        let face = ttf_parser::Face::parse(data, face_index).map_err(|_| TextError::InvalidFontData)?;

        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(TextError::InvalidFontData);
        }
        let scale = size / units_per_em as f32;
        let ascent = face.ascender() as f32 * scale;
        let descent = face.descender() as f32 * scale;
        let glyph_count = face.number_of_glyphs() as u32;

        tracing::debug!(
            "Opened font face {} at {}px: ascent {}, descent {}, {} glyphs",
            face_index,
            size,
            ascent,
            descent,
            glyph_count
        );

        Ok(Self {
            face: Face::from_face(face),
            face_index,
            size,
            scale,
            ascent,
            descent,
            glyph_count,
        })
    }

    /// Open a face from owned font file data
    ///
    /// The data is leaked and stays alive for the rest of the process, so
    /// open every font only once.
    pub fn from_data(data: Vec<u8>, face_index: u32, size: f32) -> Result<Self> {
        let data: &'static [u8] = Box::leak(data.into_boxed_slice());
        Self::from_static(data, face_index, size)
    }

    /// Open a face from a font file on disk, see [`Self::from_data`]
    pub fn from_file(path: &std::path::Path, face_index: u32, size: f32) -> Result<Self> {
        let data = std::fs::read(path).map_err(|_| TextError::InvalidFontData)?;
        Self::from_data(data, face_index, size)
    }
}

impl Font for RustybuzzFont {
    fn size(&self) -> f32 {
        self.size
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn descent(&self) -> f32 {
        self.descent
    }

    fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    fn create_shaper(&self) -> Box<dyn Shaper> {
        Box::new(RustybuzzShaper {
            face: self.face.clone(),
            scale: self.scale,
            script: None,
            language: None,
            direction: None,
            glyphs: None,
            shaped_direction: ShapeDirection::Unspecified,
        })
    }
}

/// Shaper for a [`RustybuzzFont`]
pub struct RustybuzzShaper {
    face: Face<'static>,
    scale: f32,
    script: Option<rustybuzz::Script>,
    language: Option<Language>,
    direction: Option<Direction>,
    glyphs: Option<GlyphBuffer>,
    shaped_direction: ShapeDirection,
}

fn to_rustybuzz_direction(direction: ShapeDirection) -> Option<Direction> {
    match direction {
        ShapeDirection::Unspecified => None,
        ShapeDirection::LeftToRight => Some(Direction::LeftToRight),
        ShapeDirection::RightToLeft => Some(Direction::RightToLeft),
        ShapeDirection::TopToBottom => Some(Direction::TopToBottom),
        ShapeDirection::BottomToTop => Some(Direction::BottomToTop),
    }
}

fn from_rustybuzz_direction(direction: Direction) -> ShapeDirection {
    match direction {
        Direction::LeftToRight => ShapeDirection::LeftToRight,
        Direction::RightToLeft => ShapeDirection::RightToLeft,
        Direction::TopToBottom => ShapeDirection::TopToBottom,
        Direction::BottomToTop => ShapeDirection::BottomToTop,
        Direction::Invalid => ShapeDirection::Unspecified,
    }
}

/// Characters of `text` with their byte offset plus `begin` as cluster
///
/// Every malformed byte becomes U+FFFD with its own cluster.
fn chars_with_clusters(text: &[u8], begin: usize) -> impl Iterator<Item = (char, u32)> + '_ {
    let mut offset = begin;
    text.utf8_chunks().flat_map(move |chunk| {
        let valid = chunk.valid();
        let valid_begin = offset;
        let invalid_begin = valid_begin + valid.len();
        offset = invalid_begin + chunk.invalid().len();
        valid
            .char_indices()
            .map(move |(index, c)| (c, (valid_begin + index) as u32))
            .chain((0..chunk.invalid().len()).map(move |index| {
                (char::REPLACEMENT_CHARACTER, (invalid_begin + index) as u32)
            }))
    })
}

impl Shaper for RustybuzzShaper {
    fn set_script(&mut self, script: Script) -> bool {
        self.script = rustybuzz::Script::from_iso15924_tag(Tag::from_bytes(&script.0));
        self.script.is_some()
    }

    fn set_language(&mut self, language: &str) -> bool {
        self.language = Language::from_str(language).ok();
        self.language.is_some()
    }

    fn set_direction(&mut self, direction: ShapeDirection) -> bool {
        self.direction = to_rustybuzz_direction(direction);
        true
    }

    fn shape(
        &mut self,
        text: &[u8],
        begin: usize,
        end: usize,
        features: &[FeatureRange],
    ) -> usize {
        // Properties only apply to this call
        let script = self.script.take();
        let language = self.language.take();
        let direction = self.direction.take();
        self.glyphs = None;

        let end = end.min(text.len());
        let begin = begin.min(end);
        let mut buffer = UnicodeBuffer::new();
        for (c, cluster) in chars_with_clusters(&text[begin..end], begin) {
            buffer.add(c, cluster);
        }
        if let Some(script) = script {
            buffer.set_script(script);
        }
        if let Some(language) = language {
            buffer.set_language(language);
        }
        if let Some(direction) = direction {
            buffer.set_direction(direction);
        }
        buffer.guess_segment_properties();
        self.shaped_direction = from_rustybuzz_direction(buffer.direction());

        let features: Vec<rustybuzz::Feature> = features
            .iter()
            .map(|f| {
                let range_end = if f.end == u32::MAX {
                    usize::MAX
                } else {
                    f.end as usize
                };
                rustybuzz::Feature::new(
                    Tag::from_bytes(&f.feature.0),
                    f.value,
                    f.begin as usize..range_end,
                )
            })
            .collect();

        let glyphs = rustybuzz::shape(&self.face, &features, buffer);
        let count = glyphs.len();
        self.glyphs = Some(glyphs);
        count
    }

    fn glyph_ids_into(&self, ids: &mut [u32]) {
        if let Some(glyphs) = &self.glyphs {
            for (id, info) in ids.iter_mut().zip(glyphs.glyph_infos()) {
                *id = info.glyph_id;
            }
        }
    }

    fn glyph_offsets_advances_into(&self, offsets: &mut [Vec2], advances: &mut [Vec2]) {
        if let Some(glyphs) = &self.glyphs {
            for ((offset, advance), position) in offsets
                .iter_mut()
                .zip(advances.iter_mut())
                .zip(glyphs.glyph_positions())
            {
                *offset = Vec2::new(
                    position.x_offset as f32 * self.scale,
                    position.y_offset as f32 * self.scale,
                );
                *advance = Vec2::new(
                    position.x_advance as f32 * self.scale,
                    position.y_advance as f32 * self.scale,
                );
            }
        }
    }

    fn glyph_clusters_into(&self, clusters: &mut [u32]) {
        if let Some(glyphs) = &self.glyphs {
            for (cluster, info) in clusters.iter_mut().zip(glyphs.glyph_infos()) {
                *cluster = info.cluster;
            }
        }
    }

    fn direction(&self) -> ShapeDirection {
        self.shaped_direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static MONO: &[u8] = include_bytes!("../tests/fonts/DejaVuSansMono.ttf");

    fn clusters(shaper: &dyn Shaper, count: usize) -> Vec<u32> {
        let mut clusters = vec![0; count];
        shaper.glyph_clusters_into(&mut clusters);
        clusters
    }

    #[test]
    fn test_invalid_font_data_is_rejected() {
        let result = RustybuzzFont::from_data(vec![0, 1, 2, 3], 0, 16.0);
        assert!(matches!(result, Err(TextError::InvalidFontData)));
    }

    #[test]
    fn test_direction_mapping_round_trips() {
        for direction in [
            ShapeDirection::LeftToRight,
            ShapeDirection::RightToLeft,
            ShapeDirection::TopToBottom,
            ShapeDirection::BottomToTop,
        ] {
            let mapped = to_rustybuzz_direction(direction).unwrap();
            assert_eq!(from_rustybuzz_direction(mapped), direction);
        }
        assert_eq!(to_rustybuzz_direction(ShapeDirection::Unspecified), None);
    }

    #[test]
    fn test_malformed_bytes_get_own_clusters() {
        let chars: Vec<_> = chars_with_clusters(b"b\xff\xfehnu", 0).collect();
        assert_eq!(
            chars,
            [
                ('b', 0),
                (char::REPLACEMENT_CHARACTER, 1),
                (char::REPLACEMENT_CHARACTER, 2),
                ('h', 3),
                ('n', 4),
                ('u', 5)
            ]
        );

        // Multi-byte characters keep their first byte, offset by the range begin
        let chars: Vec<_> = chars_with_clusters("a\u{5d0}b".as_bytes(), 3).collect();
        assert_eq!(chars, [('a', 3), ('\u{5d0}', 4), ('b', 6)]);

        let chars: Vec<_> = chars_with_clusters(b"\xe2\x82", 0).collect();
        assert_eq!(
            chars,
            [(char::REPLACEMENT_CHARACTER, 0), (char::REPLACEMENT_CHARACTER, 1)]
        );
    }

    #[test]
    fn test_font_metrics() {
        let font = RustybuzzFont::from_static(MONO, 0, 16.0).unwrap();
        assert_eq!(font.size(), 16.0);
        assert!(font.ascent() > 0.0);
        assert!(font.descent() < 0.0);
        assert!(font.glyph_count() > 128);
    }

    #[test]
    fn test_shape_left_to_right() {
        let font = RustybuzzFont::from_static(MONO, 0, 16.0).unwrap();
        let mut shaper = font.create_shaper();

        let count = shaper.shape(b"hello", 0, 5, &[]);
        assert_eq!(count, 5);
        assert_eq!(shaper.direction(), ShapeDirection::LeftToRight);
        assert_eq!(clusters(shaper.as_ref(), count), [0, 1, 2, 3, 4]);

        let mut ids = vec![0; count];
        shaper.glyph_ids_into(&mut ids);
        assert!(ids.iter().all(|&id| id != 0));
        // Both `l`s are the same glyph
        assert_eq!(ids[2], ids[3]);

        let mut offsets = vec![Vec2::ZERO; count];
        let mut advances = vec![Vec2::ZERO; count];
        shaper.glyph_offsets_advances_into(&mut offsets, &mut advances);
        assert!(advances[0].x > 0.0);
        assert!(advances.iter().all(|advance| *advance == advances[0]));
    }

    #[test]
    fn test_shape_subrange_with_malformed_bytes() {
        let font = RustybuzzFont::from_static(MONO, 0, 16.0).unwrap();
        let mut shaper = font.create_shaper();

        let count = shaper.shape(b"xab\xffcx", 1, 5, &[]);
        assert_eq!(count, 4);
        assert_eq!(clusters(shaper.as_ref(), count), [1, 2, 3, 4]);
    }

    #[test]
    fn test_shape_detects_right_to_left() {
        let font = RustybuzzFont::from_static(MONO, 0, 16.0).unwrap();
        let mut shaper = font.create_shaper();

        let text = "\u{5d0}\u{5d1}".as_bytes();
        let count = shaper.shape(text, 0, text.len(), &[]);
        assert_eq!(count, 2);
        assert_eq!(shaper.direction(), ShapeDirection::RightToLeft);
        // Glyphs come in visual order
        assert_eq!(clusters(shaper.as_ref(), count), [2, 0]);

        // The explicit direction applies to one call only
        assert!(shaper.set_direction(ShapeDirection::RightToLeft));
        shaper.shape(b"ab", 0, 2, &[]);
        assert_eq!(shaper.direction(), ShapeDirection::RightToLeft);
        shaper.shape(b"ab", 0, 2, &[]);
        assert_eq!(shaper.direction(), ShapeDirection::LeftToRight);
    }
}

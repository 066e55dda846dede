//! Deterministic font and shaper for layer tests
//!
//! Every character is one glyph with a 2 unit advance. ASCII characters
//! map to glyphs of the same ID, everything else including invalid bytes to
//! glyph 0. Text starting with a Hebrew letter is detected as right to
//! left. An enabled `smcp` feature maps lowercase letters to uppercase.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use quire_core::{NodeId, Range2D, Vec2};
use quire_text::{
    utf8, Alignment, AtlasGlyphCache, Feature, FeatureRange, Font, FontHandle, NodeGeometry,
    ShapeDirection, Shaper, TextEditingStyle, TextLayerEditingStyleUniform, TextLayerShared,
    TextLayerSharedConfig, TextLayerStyleUniform, TextStyle,
};

pub const FONT_SIZE: f32 = 10.0;
pub const ASCENT: f32 = 7.0;
pub const DESCENT: f32 = -4.0;
pub const ADVANCE: f32 = 2.0;
pub const GLYPH_COUNT: u32 = 128;

pub struct FakeFont {
    pub shape_count: Rc<Cell<u32>>,
}

impl Font for FakeFont {
    fn size(&self) -> f32 {
        FONT_SIZE
    }

    fn ascent(&self) -> f32 {
        ASCENT
    }

    fn descent(&self) -> f32 {
        DESCENT
    }

    fn glyph_count(&self) -> u32 {
        GLYPH_COUNT
    }

    fn create_shaper(&self) -> Box<dyn Shaper> {
        Box::new(FakeShaper {
            shape_count: Rc::clone(&self.shape_count),
            direction: ShapeDirection::Unspecified,
            shaped_direction: ShapeDirection::Unspecified,
            glyphs: Vec::new(),
        })
    }
}

pub struct FakeShaper {
    shape_count: Rc<Cell<u32>>,
    direction: ShapeDirection,
    shaped_direction: ShapeDirection,
    /// Glyph ID and cluster
    glyphs: Vec<(u32, u32)>,
}

impl Shaper for FakeShaper {
    fn set_script(&mut self, _script: quire_text::Script) -> bool {
        false
    }

    fn set_language(&mut self, _language: &str) -> bool {
        false
    }

    fn set_direction(&mut self, direction: ShapeDirection) -> bool {
        self.direction = direction;
        true
    }

    fn shape(&mut self, text: &[u8], begin: usize, end: usize, features: &[FeatureRange]) -> usize {
        self.shape_count.set(self.shape_count.get() + 1);
        self.glyphs.clear();

        let mut position = begin;
        while position < end {
            let next = utf8::next_char(text, position).unwrap_or(end);
            let byte = text[position];
            // Later ranges override earlier ones
            let small_caps = features
                .iter()
                .filter(|feature| {
                    feature.feature == Feature::SMALL_CAPITALS
                        && (feature.begin as usize..feature.end as usize).contains(&position)
                })
                .last()
                .is_some_and(|feature| feature.value != 0);
            let id = match byte {
                b'a'..=b'z' if small_caps => byte.to_ascii_uppercase() as u32,
                0..=0x7f if next - position == 1 => byte as u32,
                _ => 0,
            };
            self.glyphs.push((id, position as u32));
            position = next;
        }

        self.shaped_direction = match self.direction {
            ShapeDirection::Unspecified if text.get(begin) == Some(&0xd7) => ShapeDirection::RightToLeft,
            ShapeDirection::Unspecified => ShapeDirection::LeftToRight,
            direction => direction,
        };
        if self.shaped_direction == ShapeDirection::RightToLeft {
            self.glyphs.reverse();
        }
        self.direction = ShapeDirection::Unspecified;
        self.glyphs.len()
    }

    fn glyph_ids_into(&self, ids: &mut [u32]) {
        for (id, glyph) in ids.iter_mut().zip(&self.glyphs) {
            *id = glyph.0;
        }
    }

    fn glyph_offsets_advances_into(&self, offsets: &mut [Vec2], advances: &mut [Vec2]) {
        offsets.fill(Vec2::ZERO);
        advances.fill(Vec2::new(ADVANCE, 0.0));
    }

    fn glyph_clusters_into(&self, clusters: &mut [u32]) {
        for (cluster, glyph) in clusters.iter_mut().zip(&self.glyphs) {
            *cluster = glyph.1;
        }
    }

    fn direction(&self) -> ShapeDirection {
        self.shaped_direction
    }
}

/// A 256x16 cache with one font whose glyph `i` sits at `(2i, 0)`, two
/// units wide and as tall as the font, with the top at the ascent
pub fn glyph_cache() -> AtlasGlyphCache {
    let mut cache = AtlasGlyphCache::new(Vec2::new(256.0, 16.0));
    let font = cache.add_font(GLYPH_COUNT);
    for id in 0..GLYPH_COUNT {
        cache
            .add_glyph(
                font,
                id,
                Vec2::new(0.0, -ASCENT),
                0,
                Range2D::from_size(Vec2::new(2.0 * id as f32, 0.0), Vec2::new(ADVANCE, ASCENT - DESCENT)),
            )
            .unwrap();
    }
    cache
}

pub struct Fixture {
    pub shared: Rc<RefCell<TextLayerShared>>,
    pub font: FontHandle,
    pub shape_count: Rc<Cell<u32>>,
}

impl Fixture {
    /// Shared state with the fake font added at its own size, no styles set
    pub fn new(config: TextLayerSharedConfig) -> Self {
        let shape_count = Rc::new(Cell::new(0));
        let mut shared = TextLayerShared::new(glyph_cache(), config);
        let font = shared
            .add_font(
                Box::new(FakeFont {
                    shape_count: Rc::clone(&shape_count),
                }),
                0,
                FONT_SIZE,
            )
            .unwrap();
        Self {
            shared: Rc::new(RefCell::new(shared)),
            font,
            shape_count,
        }
    }

    /// Two top-left aligned styles without editing styles
    pub fn plain() -> Self {
        let fixture = Self::new(TextLayerSharedConfig::with_style_count(2));
        fixture
            .shared
            .borrow_mut()
            .set_styles(
                &[TextLayerStyleUniform::default(), TextLayerStyleUniform::default()],
                &[
                    TextStyle::new(0, Some(fixture.font), Alignment::TopLeft),
                    TextStyle::new(1, Some(fixture.font), Alignment::TopLeft),
                ],
                &[],
            )
            .unwrap();
        fixture
    }

    /// Style 0 with a cursor, style 1 with a selection that recolors text
    /// through uniform 2, and style 2 with a padded cursor and selection
    pub fn editing() -> Self {
        let fixture = Self::new(TextLayerSharedConfig::new(3, 3).with_editing_styles(2, 3));
        let mut shared = fixture.shared.borrow_mut();
        shared
            .set_styles(
                &[TextLayerStyleUniform::default(); 3],
                &[
                    TextStyle::new(0, Some(fixture.font), Alignment::TopLeft).with_cursor_style(0),
                    TextStyle::new(1, Some(fixture.font), Alignment::TopLeft)
                        .with_cursor_style(0)
                        .with_selection_style(1),
                    TextStyle::new(0, Some(fixture.font), Alignment::TopLeft)
                        .with_cursor_style(2)
                        .with_selection_style(2),
                ],
                &[],
            )
            .unwrap();
        shared
            .set_editing_styles(
                &[TextLayerEditingStyleUniform::default(); 2],
                &[
                    TextEditingStyle::new(0),
                    TextEditingStyle::new(1).with_text_uniform(2),
                    TextEditingStyle::new(1).with_padding(quire_core::Padding::new(1.0, 2.0, 3.0, 4.0)),
                ],
            )
            .unwrap();
        drop(shared);
        fixture
    }
}

/// Geometry of `count` enabled, opaque nodes at `(10, 20)` sized 100x50
pub struct Nodes {
    pub offsets: Vec<Vec2>,
    pub sizes: Vec<Vec2>,
    pub opacities: Vec<f32>,
    pub enabled: Vec<bool>,
}

impl Nodes {
    pub fn new(count: usize) -> Self {
        Self {
            offsets: vec![Vec2::new(10.0, 20.0); count],
            sizes: vec![Vec2::new(100.0, 50.0); count],
            opacities: vec![1.0; count],
            enabled: vec![true; count],
        }
    }

    pub fn geometry(&self) -> NodeGeometry<'_> {
        NodeGeometry::new(&self.offsets, &self.sizes, &self.opacities, &self.enabled)
    }
}

pub const NODE: Option<NodeId> = Some(NodeId(0));

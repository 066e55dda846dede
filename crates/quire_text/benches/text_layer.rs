//! Benchmarks for the text layer hot paths.
//!
//! - **Typing**: one character inserted into an editable text per keystroke,
//!   which reshapes the whole text.
//! - **Update**: laying out a screen worth of labels into vertex buffers.
//! - **Churn**: removing and recreating labels, so every update compacts.

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use quire_core::{NodeId, Range2D, Vec2};
use quire_text::{
    utf8, Alignment, AtlasGlyphCache, FeatureRange, Font, NodeGeometry, Script, ShapeDirection,
    Shaper, TextDataFlags, TextEdit, TextEditingStyle, TextLayer, TextLayerConfig,
    TextLayerEditingStyleUniform, TextLayerShared, TextLayerSharedConfig, TextLayerStyleUniform,
    TextProperties, TextStyle,
};

/// Label counts that represent real screens.
const LABEL_COUNTS: [usize; 3] = [10, 100, 1000];

/// Monospace font with one glyph per ASCII character.
struct MonoFont;

impl Font for MonoFont {
    fn size(&self) -> f32 {
        16.0
    }

    fn ascent(&self) -> f32 {
        12.0
    }

    fn descent(&self) -> f32 {
        -4.0
    }

    fn glyph_count(&self) -> u32 {
        128
    }

    fn create_shaper(&self) -> Box<dyn Shaper> {
        Box::new(MonoShaper::default())
    }
}

#[derive(Default)]
struct MonoShaper {
    glyphs: Vec<(u32, u32)>,
}

impl Shaper for MonoShaper {
    fn set_script(&mut self, _script: Script) -> bool {
        false
    }

    fn set_language(&mut self, _language: &str) -> bool {
        false
    }

    fn set_direction(&mut self, _direction: ShapeDirection) -> bool {
        false
    }

    fn shape(&mut self, text: &[u8], begin: usize, end: usize, _features: &[FeatureRange]) -> usize {
        self.glyphs.clear();
        let mut position = begin;
        while position < end {
            let id = if text[position] < 0x80 { text[position] as u32 } else { 0 };
            self.glyphs.push((id, position as u32));
            position = utf8::next_char(text, position).unwrap_or(end);
        }
        self.glyphs.len()
    }

    fn glyph_ids_into(&self, ids: &mut [u32]) {
        for (id, glyph) in ids.iter_mut().zip(&self.glyphs) {
            *id = glyph.0;
        }
    }

    fn glyph_offsets_advances_into(&self, offsets: &mut [Vec2], advances: &mut [Vec2]) {
        offsets.fill(Vec2::ZERO);
        advances.fill(Vec2::new(9.0, 0.0));
    }

    fn glyph_clusters_into(&self, clusters: &mut [u32]) {
        for (cluster, glyph) in clusters.iter_mut().zip(&self.glyphs) {
            *cluster = glyph.1;
        }
    }

    fn direction(&self) -> ShapeDirection {
        ShapeDirection::LeftToRight
    }
}

fn shared() -> Rc<RefCell<TextLayerShared>> {
    let mut cache = AtlasGlyphCache::new(Vec2::new(1024.0, 1024.0));
    let cache_font = cache.add_font(128);
    for id in 0..128 {
        let min = Vec2::new((id % 64) as f32 * 16.0, (id / 64) as f32 * 16.0);
        cache
            .add_glyph(cache_font, id, Vec2::new(0.0, -12.0), 0, Range2D::from_size(min, Vec2::new(9.0, 16.0)))
            .unwrap();
    }

    let mut shared = TextLayerShared::new(cache, TextLayerSharedConfig::new(1, 1).with_editing_styles(1, 1));
    let font = shared.add_font(Box::new(MonoFont), cache_font, 16.0).unwrap();
    shared
        .set_styles(
            &[TextLayerStyleUniform::default()],
            &[TextStyle::new(0, Some(font), Alignment::MiddleLeft)
                .with_cursor_style(0)
                .with_selection_style(0)],
            &[],
        )
        .unwrap();
    shared
        .set_editing_styles(&[TextLayerEditingStyleUniform::default()], &[TextEditingStyle::new(0)])
        .unwrap();
    Rc::new(RefCell::new(shared))
}

struct Nodes {
    offsets: Vec<Vec2>,
    sizes: Vec<Vec2>,
    opacities: Vec<f32>,
    enabled: Vec<bool>,
}

impl Nodes {
    fn new(count: usize) -> Self {
        Self {
            offsets: (0..count).map(|i| Vec2::new(0.0, i as f32 * 20.0)).collect(),
            sizes: vec![Vec2::new(400.0, 20.0); count],
            opacities: vec![1.0; count],
            enabled: vec![true; count],
        }
    }

    fn geometry(&self) -> NodeGeometry<'_> {
        NodeGeometry::new(&self.offsets, &self.sizes, &self.opacities, &self.enabled)
    }
}

fn label(i: usize) -> String {
    format!("Label number {i} with some text")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Typing at the end of a growing paragraph, then erasing it again.
fn bench_typing(c: &mut Criterion) {
    c.bench_function("typing_100_chars", |b| {
        let mut layer = TextLayer::new(shared(), TextLayerConfig::default());
        let data = layer
            .create(0, "", &TextProperties::new(), TextDataFlags::EDITABLE, Some(NodeId(0)))
            .unwrap();
        b.iter(|| {
            for i in 0..100u8 {
                let ch = [b'a' + i % 26];
                layer.handle_text_input(data, ch).unwrap();
            }
            for _ in 0..100 {
                layer.edit_text(data, TextEdit::RemoveBeforeCursor, "").unwrap();
            }
            black_box(layer.cursor(data).unwrap());
        });
    });
}

/// Full relayout of every label, as after a shared style change.
fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    for count in LABEL_COUNTS {
        let mut layer = TextLayer::new(shared(), TextLayerConfig::default());
        let handles: Vec<_> = (0..count)
            .map(|i| {
                layer
                    .create(0, label(i), &TextProperties::new(), TextDataFlags::empty(), Some(NodeId(i as u32)))
                    .unwrap()
            })
            .collect();
        let nodes = Nodes::new(count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                layer.update(&handles, &nodes.geometry()).unwrap();
                black_box(layer.vertices().len());
            });
        });
    }
    group.finish();
}

/// Every other label replaced between frames.
fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    for count in LABEL_COUNTS {
        let mut layer = TextLayer::new(shared(), TextLayerConfig::default());
        let mut handles: Vec<_> = (0..count)
            .map(|i| {
                layer
                    .create(0, label(i), &TextProperties::new(), TextDataFlags::empty(), Some(NodeId(i as u32)))
                    .unwrap()
            })
            .collect();
        let nodes = Nodes::new(count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                for (i, handle) in handles.iter_mut().enumerate().step_by(2) {
                    layer.remove(*handle).unwrap();
                    *handle = layer
                        .create(0, label(i + 1), &TextProperties::new(), TextDataFlags::empty(), Some(NodeId(i as u32)))
                        .unwrap();
                }
                layer.update(&handles, &nodes.geometry()).unwrap();
                black_box(layer.glyph_storage_len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_typing, bench_update, bench_churn);
criterion_main!(benches);

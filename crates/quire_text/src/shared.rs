//! State shared by text layers
//!
//! The shared state holds everything that isn't specific to one layer: the
//! glyph cache, registered fonts with their shapers, static styles and
//! editing styles. It's usually wrapped in `Rc<RefCell<_>>` and handed to
//! any number of [`crate::TextLayer`]s. Every change bumps a generation
//! counter, which layers compare at the start of their update to know
//! their layout is stale.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::font::{Font, FontHandle};
use crate::glyph_cache::GlyphCache;
use crate::shaper::{Shaper, TextFeatureValue};
use crate::style::{
    ResolvedEditingStyle, ResolvedStyle, TextEditingStyle, TextLayerEditingStyleUniform,
    TextLayerStyleUniform, TextStyle,
};
use crate::{Result, TextError};

bitflags! {
    /// Shared state behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TextLayerSharedFlags: u8 {
        /// Glyphs are rendered from a signed distance field. Layers then
        /// output an inverted run scale for every vertex.
        const DISTANCE_FIELD = 1 << 0;
    }
}

/// Shared state configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextLayerSharedConfig {
    pub uniform_count: u32,
    pub style_count: u32,
    pub editing_uniform_count: u32,
    pub editing_style_count: u32,
    pub flags: TextLayerSharedFlags,
}

impl TextLayerSharedConfig {
    /// Configuration with given style uniform and style count
    pub fn new(uniform_count: u32, style_count: u32) -> Self {
        Self {
            uniform_count,
            style_count,
            ..Self::default()
        }
    }

    /// Same count of uniforms and styles, each style using its own uniform
    pub fn with_style_count(style_count: u32) -> Self {
        Self::new(style_count, style_count)
    }

    pub fn with_editing_styles(mut self, uniform_count: u32, style_count: u32) -> Self {
        self.editing_uniform_count = uniform_count;
        self.editing_style_count = style_count;
        self
    }

    pub fn with_flags(mut self, flags: TextLayerSharedFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether cursor and selection styles are enabled
    pub fn has_editing_styles(&self) -> bool {
        self.editing_style_count != 0
    }
}

struct FontEntry {
    /// `None` for instance-less fonts
    font: Option<Box<dyn Font>>,
    /// Created on first shaping
    shaper: Option<Box<dyn Shaper>>,
    cache_font_id: u32,
    /// Font units to layout units
    scale: f32,
}

/// Layout-relevant properties of a registered font
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FontMetrics {
    pub cache_font_id: u32,
    pub scale: f32,
    /// Ascent and descent in font units, zero for instance-less fonts
    pub ascent: f32,
    pub descent: f32,
}

/// State shared by all text layers using the same styles
pub struct TextLayerShared {
    config: TextLayerSharedConfig,
    glyph_cache: Box<dyn GlyphCache>,
    fonts: Vec<FontEntry>,
    style_uniforms: Vec<TextLayerStyleUniform>,
    styles: Vec<TextStyle>,
    style_features: Vec<TextFeatureValue>,
    styles_set: bool,
    editing_style_uniforms: Vec<TextLayerEditingStyleUniform>,
    editing_styles: Vec<TextEditingStyle>,
    editing_styles_set: bool,
    style_transition: Option<Box<dyn Fn(u32) -> u32>>,
    generation: u64,
}

impl std::fmt::Debug for TextLayerShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayerShared")
            .field("config", &self.config)
            .field("font_count", &self.fonts.len())
            .field("styles_set", &self.styles_set)
            .field("editing_styles_set", &self.editing_styles_set)
            .field("generation", &self.generation)
            .finish()
    }
}

impl TextLayerShared {
    pub fn new(glyph_cache: impl GlyphCache + 'static, config: TextLayerSharedConfig) -> Self {
        Self {
            config,
            glyph_cache: Box::new(glyph_cache),
            fonts: Vec::new(),
            style_uniforms: Vec::new(),
            styles: Vec::new(),
            style_features: Vec::new(),
            styles_set: false,
            editing_style_uniforms: Vec::new(),
            editing_styles: Vec::new(),
            editing_styles_set: false,
            style_transition: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &TextLayerSharedConfig {
        &self.config
    }

    pub fn glyph_cache(&self) -> &dyn GlyphCache {
        self.glyph_cache.as_ref()
    }

    /// Incremented on every style, font or transition change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn font_count(&self) -> u32 {
        self.fonts.len() as u32
    }

    /// Register a font whose glyphs are in the glyph cache under
    /// `cache_font_id`, to be laid out at `size`
    pub fn add_font(&mut self, font: Box<dyn Font>, cache_font_id: u32, size: f32) -> Result<FontHandle> {
        self.check_cache_font(cache_font_id)?;
        if font.glyph_count() > self.glyph_cache.font_glyph_count(cache_font_id) {
            return Err(TextError::InvalidArgument(
                "font has more glyphs than its glyph cache font",
            ));
        }
        if !(size > 0.0 && font.size() > 0.0) {
            return Err(TextError::InvalidArgument("font size has to be positive"));
        }

        let scale = size / font.size();
        tracing::debug!(
            "Added font {} for cache font {} at scale {}",
            self.fonts.len(),
            cache_font_id,
            scale
        );
        Ok(self.push_font(FontEntry {
            font: Some(font),
            shaper: None,
            cache_font_id,
            scale,
        }))
    }

    /// Register a font without an instance, usable only for single glyphs
    pub fn add_instanceless_font(&mut self, cache_font_id: u32, scale: f32) -> Result<FontHandle> {
        self.check_cache_font(cache_font_id)?;
        Ok(self.push_font(FontEntry {
            font: None,
            shaper: None,
            cache_font_id,
            scale,
        }))
    }

    /// Whether the font was added with an instance and can shape text
    pub fn has_font_instance(&self, font: FontHandle) -> Result<bool> {
        Ok(self.font_entry(font)?.font.is_some())
    }

    /// Set all styles at once
    ///
    /// `uniforms` and `styles` have to be exactly as long as configured.
    /// Style feature ranges index into `features`.
    pub fn set_styles(
        &mut self,
        uniforms: &[TextLayerStyleUniform],
        styles: &[TextStyle],
        features: &[TextFeatureValue],
    ) -> Result<()> {
        if uniforms.len() != self.config.uniform_count as usize {
            return Err(TextError::InvalidArgument("style uniform count doesn't match"));
        }
        if styles.len() != self.config.style_count as usize {
            return Err(TextError::InvalidArgument("style count doesn't match"));
        }
        for style in styles {
            if style.uniform >= self.config.uniform_count {
                return Err(TextError::out_of_range("uniform", style.uniform, self.config.uniform_count));
            }
            if let Some(font) = style.font {
                self.font_entry(font)?;
            }
            let feature_end = style.feature_offset as u64 + style.feature_count as u64;
            if feature_end > features.len() as u64 {
                return Err(TextError::out_of_range("feature", feature_end, features.len() as u64));
            }
            for editing_style in [style.cursor_style, style.selection_style].into_iter().flatten() {
                if editing_style >= self.config.editing_style_count {
                    return Err(TextError::out_of_range(
                        "editing style",
                        editing_style,
                        self.config.editing_style_count,
                    ));
                }
            }
        }

        self.style_uniforms = uniforms.to_vec();
        self.styles = styles.to_vec();
        self.style_features = features.to_vec();
        self.styles_set = true;
        self.generation += 1;
        Ok(())
    }

    /// Set all editing styles at once
    pub fn set_editing_styles(
        &mut self,
        uniforms: &[TextLayerEditingStyleUniform],
        styles: &[TextEditingStyle],
    ) -> Result<()> {
        if uniforms.len() != self.config.editing_uniform_count as usize {
            return Err(TextError::InvalidArgument("editing style uniform count doesn't match"));
        }
        if styles.len() != self.config.editing_style_count as usize {
            return Err(TextError::InvalidArgument("editing style count doesn't match"));
        }
        for style in styles {
            if style.uniform >= self.config.editing_uniform_count {
                return Err(TextError::out_of_range(
                    "editing uniform",
                    style.uniform,
                    self.config.editing_uniform_count,
                ));
            }
            if let Some(text_uniform) = style.text_uniform {
                if text_uniform >= self.config.uniform_count {
                    return Err(TextError::out_of_range("uniform", text_uniform, self.config.uniform_count));
                }
            }
        }

        self.editing_style_uniforms = uniforms.to_vec();
        self.editing_styles = styles.to_vec();
        self.editing_styles_set = true;
        self.generation += 1;
        Ok(())
    }

    /// Style remapping for text whose node is disabled
    pub fn set_style_transition(&mut self, transition: impl Fn(u32) -> u32 + 'static) {
        self.style_transition = Some(Box::new(transition));
        self.generation += 1;
    }

    pub fn clear_style_transition(&mut self) {
        self.style_transition = None;
        self.generation += 1;
    }

    pub fn styles(&self) -> &[TextStyle] {
        &self.styles
    }

    pub fn style_uniforms(&self) -> &[TextLayerStyleUniform] {
        &self.style_uniforms
    }

    pub fn style_features(&self) -> &[TextFeatureValue] {
        &self.style_features
    }

    pub fn editing_styles(&self) -> &[TextEditingStyle] {
        &self.editing_styles
    }

    pub fn editing_style_uniforms(&self) -> &[TextLayerEditingStyleUniform] {
        &self.editing_style_uniforms
    }

    /// Check that update can run
    pub(crate) fn check_style_data(&self) -> Result<()> {
        if !self.styles_set {
            return Err(TextError::NoStyleData);
        }
        if self.config.has_editing_styles() && !self.editing_styles_set {
            return Err(TextError::NoEditingStyleData);
        }
        Ok(())
    }

    pub(crate) fn transition_style(&self, style: u32) -> u32 {
        self.style_transition
            .as_ref()
            .map_or(style, |transition| transition(style))
    }

    /// Static style with uniforms as given, `None` if styles weren't set
    pub(crate) fn resolve_style(&self, id: u32) -> Option<ResolvedStyle> {
        let style = self.styles.get(id as usize)?;
        let editing = |index: Option<u32>| {
            index
                .and_then(|index| self.editing_styles.get(index as usize))
                .map(ResolvedEditingStyle::from)
        };
        let features = &self.style_features
            [style.feature_offset as usize..(style.feature_offset + style.feature_count) as usize];
        Some(ResolvedStyle {
            uniform: style.uniform,
            font: style.font,
            alignment: style.alignment,
            padding: style.padding,
            features: SmallVec::from_slice(features),
            selection: editing(style.selection_style),
            cursor: editing(style.cursor_style),
        })
    }

    pub(crate) fn font_metrics(&self, font: FontHandle) -> Result<FontMetrics> {
        let entry = self.font_entry(font)?;
        let (ascent, descent) = entry
            .font
            .as_ref()
            .map_or((0.0, 0.0), |font| (font.ascent(), font.descent()));
        Ok(FontMetrics {
            cache_font_id: entry.cache_font_id,
            scale: entry.scale,
            ascent,
            descent,
        })
    }

    /// Shaper of a font, created on first use
    pub(crate) fn shaper(&mut self, font: FontHandle) -> Result<&mut dyn Shaper> {
        self.font_entry(font)?;
        let entry = &mut self.fonts[font.0 as usize];
        let Some(instance) = &entry.font else {
            return Err(TextError::NotImplemented(
                "instance-less fonts can't be used for shaping",
            ));
        };
        let shaper = entry.shaper.get_or_insert_with(|| instance.create_shaper());
        Ok(shaper.as_mut())
    }

    fn font_entry(&self, font: FontHandle) -> Result<&FontEntry> {
        self.fonts
            .get(font.0 as usize)
            .ok_or_else(|| TextError::out_of_range("font", font.0, self.fonts.len() as u32))
    }

    fn check_cache_font(&self, cache_font_id: u32) -> Result<()> {
        let font_count = self.glyph_cache.font_count();
        if cache_font_id >= font_count {
            return Err(TextError::out_of_range("cache font", cache_font_id, font_count));
        }
        Ok(())
    }

    fn push_font(&mut self, entry: FontEntry) -> FontHandle {
        self.fonts.push(entry);
        self.generation += 1;
        FontHandle(self.fonts.len() as u32 - 1)
    }
}

//! Dynamic styles
//!
//! Dynamic styles are owned by a single layer and can be changed at any
//! time, for example to animate a color or to give one text a unique look
//! without reserving a static style for it. Their IDs follow the static
//! styles, so dynamic style `d` is style `style_count + d`.
//!
//! Uniforms of dynamic style `d` are at `uniform_count + d`. If the shared
//! state has editing styles, every dynamic style additionally reserves two
//! editing styles at `editing_style_count + 2d` for the selection and
//! `editing_style_count + 2d + 1` for the cursor, with editing uniforms at
//! `editing_uniform_count + 2d + {0, 1}` and uniforms for the text under
//! them at `uniform_count + dynamic_style_count + 2d + {0, 1}`.

use quire_core::Padding;
use smallvec::SmallVec;

use crate::features::FeatureAllocator;
use crate::font::FontHandle;
use crate::shaper::TextFeatureValue;
use crate::style::{
    Alignment, ResolvedEditingStyle, ResolvedStyle, TextLayerEditingStyleUniform,
    TextLayerStyleUniform,
};

/// Cursor or selection decoration of a dynamic style
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DynamicEditingStyle {
    pub uniform: TextLayerEditingStyleUniform,
    /// Uniform for text covered by the decoration, `None` keeps the text
    /// uniform of the style
    pub text_uniform: Option<TextLayerStyleUniform>,
    /// Grows the decoration rectangle outwards
    pub padding: Padding,
}

impl DynamicEditingStyle {
    pub fn new(uniform: TextLayerEditingStyleUniform) -> Self {
        Self {
            uniform,
            text_uniform: None,
            padding: Padding::ZERO,
        }
    }

    pub fn with_text_uniform(mut self, uniform: TextLayerStyleUniform) -> Self {
        self.text_uniform = Some(uniform);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }
}

/// Contents of a dynamic style
///
/// Font and features are used the next time a text with this style is
/// shaped. Everything else takes effect at the next update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicTextStyle {
    pub uniform: TextLayerStyleUniform,
    pub font: Option<FontHandle>,
    pub alignment: Alignment,
    pub features: SmallVec<[TextFeatureValue; 4]>,
    pub padding: Padding,
    pub cursor: Option<DynamicEditingStyle>,
    pub selection: Option<DynamicEditingStyle>,
}

impl DynamicTextStyle {
    pub fn new(uniform: TextLayerStyleUniform, font: Option<FontHandle>, alignment: Alignment) -> Self {
        Self {
            uniform,
            font,
            alignment,
            ..Self::default()
        }
    }

    pub fn with_features(mut self, features: &[TextFeatureValue]) -> Self {
        self.features = SmallVec::from_slice(features);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_cursor(mut self, cursor: DynamicEditingStyle) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_selection(mut self, selection: DynamicEditingStyle) -> Self {
        self.selection = Some(selection);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DynamicStyleSlot {
    font: Option<FontHandle>,
    alignment: Alignment,
    padding: Padding,
    /// Padding and whether the text uniform is overridden, for the
    /// selection and the cursor
    editing: [Option<(Padding, bool)>; 2],
}

/// Dynamic styles of one layer
#[derive(Debug, Clone)]
pub(crate) struct DynamicStyles {
    slots: Vec<DynamicStyleSlot>,
    /// Style uniforms followed by the editing text uniforms, if any
    uniforms: Vec<TextLayerStyleUniform>,
    editing_uniforms: Vec<TextLayerEditingStyleUniform>,
    features: FeatureAllocator,
    editing: bool,
}

const SELECTION: usize = 0;
const CURSOR: usize = 1;

impl DynamicStyles {
    pub fn new(count: u32, editing: bool) -> Self {
        let editing_count = if editing { 2 * count as usize } else { 0 };
        Self {
            slots: vec![DynamicStyleSlot::default(); count as usize],
            uniforms: vec![TextLayerStyleUniform::default(); count as usize + editing_count],
            editing_uniforms: vec![TextLayerEditingStyleUniform::default(); editing_count],
            features: FeatureAllocator::new(count),
            editing,
        }
    }

    pub fn count(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn has_editing(&self) -> bool {
        self.editing
    }

    pub fn uniforms(&self) -> &[TextLayerStyleUniform] {
        &self.uniforms
    }

    pub fn editing_uniforms(&self) -> &[TextLayerEditingStyleUniform] {
        &self.editing_uniforms
    }

    pub fn features(&self, id: u32) -> &[TextFeatureValue] {
        self.features.features(id)
    }

    /// Offset and count of the style's features in [`Self::all_features`]
    pub fn feature_range(&self, id: u32) -> (u32, u32) {
        self.features.range(id)
    }

    pub fn all_features(&self) -> &[TextFeatureValue] {
        self.features.all()
    }

    /// Replace a style. The caller validates the ID, the font and whether
    /// editing styles are allowed.
    pub fn set(&mut self, id: u32, style: &DynamicTextStyle) {
        let count = self.slots.len();
        let index = id as usize;
        self.uniforms[index] = style.uniform;
        self.features.set(id, &style.features);

        let mut editing = [None; 2];
        if self.editing {
            for (slot, decoration) in [(SELECTION, &style.selection), (CURSOR, &style.cursor)] {
                let Some(decoration) = decoration else {
                    continue;
                };
                self.editing_uniforms[2 * index + slot] = decoration.uniform;
                if let Some(text_uniform) = decoration.text_uniform {
                    self.uniforms[count + 2 * index + slot] = text_uniform;
                }
                editing[slot] = Some((decoration.padding, decoration.text_uniform.is_some()));
            }
        }

        self.slots[index] = DynamicStyleSlot {
            font: style.font,
            alignment: style.alignment,
            padding: style.padding,
            editing,
        };
    }

    /// Style `id` with uniform indices in the layer-wide index spaces
    pub fn resolve(&self, id: u32, uniform_count: u32, editing_uniform_count: u32) -> ResolvedStyle {
        let count = self.count();
        let slot = &self.slots[id as usize];
        let editing = |index: usize| {
            slot.editing[index].map(|(padding, text_uniform)| {
                let offset = 2 * id + index as u32;
                ResolvedEditingStyle {
                    uniform: editing_uniform_count + offset,
                    text_uniform: text_uniform.then_some(uniform_count + count + offset),
                    padding,
                }
            })
        };
        ResolvedStyle {
            uniform: uniform_count + id,
            font: slot.font,
            alignment: slot.alignment,
            padding: slot.padding,
            features: SmallVec::from_slice(self.features.features(id)),
            selection: editing(SELECTION),
            cursor: editing(CURSOR),
        }
    }
}

//! Text layer
//!
//! A [`TextLayer`] owns text data attached to UI nodes. Each data is one
//! shaped text or a single glyph, stored as a run in the layer-wide glyph
//! array. Editable text additionally keeps its bytes as a run in the text
//! array together with a cursor and selection, and can be changed in place
//! with [`TextLayer::update_text`] and [`TextLayer::edit_text`].
//!
//! Nothing is drawn until [`TextLayer::update`] lays out the requested
//! data into vertex and index buffers.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use quire_core::{Color, KeyEvent, NodeId, Padding, Range2D, Vec2};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::align::{aligned_origin, RunBounds};
use crate::dynamic::{DynamicStyles, DynamicTextStyle};
use crate::edit::{self, EditPlan, TextEdit};
use crate::font::FontHandle;
use crate::quad::{
    cursor_x, write_editing_quad, write_glyph_quad, write_quad_indices, GlyphData, QuadTransform,
    TextEditingVertex, TextVertex,
};
use crate::run_store::RunStore;
use crate::shaper::{FeatureRange, Script, ShapeDirection, ShapedGlyphs, TextFeatureValue};
use crate::shared::{TextLayerShared, TextLayerSharedFlags};
use crate::style::{
    Alignment, ResolvedStyle, TextLayerEditingStyleUniform, TextLayerStyleUniform,
};
use crate::{Result, TextError};

new_key_type! {
    /// Handle of a text data in a [`TextLayer`]
    pub struct DataHandle;
}

bitflags! {
    /// Text data behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextDataFlags: u8 {
        /// Keep the text bytes, cursor and selection so the text can be
        /// edited
        const EDITABLE = 1 << 0;
    }
}

bitflags! {
    /// Text layer behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TextLayerFlags: u8 {
        /// Data can be translated, rotated and scaled. Per-data padding
        /// isn't available then.
        const TRANSFORMABLE = 1 << 0;
    }
}

bitflags! {
    /// Pending work of a layer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayerStates: u8 {
        /// Vertex and index buffers are stale
        const NEEDS_DATA_UPDATE = 1 << 0;
        /// Removed or replaced runs wait to be compacted away
        const NEEDS_DATA_CLEAN = 1 << 1;
        /// Dynamic style uniforms changed
        const NEEDS_COMMON_DATA_UPDATE = 1 << 2;
    }
}

/// Layer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextLayerConfig {
    pub dynamic_style_count: u32,
    pub flags: TextLayerFlags,
}

impl TextLayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dynamic_style_count(mut self, count: u32) -> Self {
        self.dynamic_style_count = count;
        self
    }

    pub fn with_flags(mut self, flags: TextLayerFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Translation, rotation and scale of a data on a transformable layer
///
/// Applied around the aligned text origin. Rotation is in radians,
/// clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transformation {
    pub translation: Vec2,
    pub rotation: f32,
    pub scale: f32,
}

impl Transformation {
    pub const IDENTITY: Transformation = Transformation {
        translation: Vec2::ZERO,
        rotation: 0.0,
        scale: 1.0,
    };

    pub fn new(translation: Vec2, rotation: f32, scale: f32) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Shaping and placement properties of a text
///
/// Unset font and alignment come from the style. Editable text keeps its
/// properties and reuses them every time it's edited.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextProperties {
    pub font: Option<FontHandle>,
    pub alignment: Option<Alignment>,
    pub script: Option<Script>,
    pub language: Option<String>,
    pub direction: ShapeDirection,
    /// Features applied on top of the style features. Not supported for
    /// editable text.
    pub features: Vec<FeatureRange>,
}

impl TextProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, font: FontHandle) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_direction(mut self, direction: ShapeDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_features(mut self, features: &[FeatureRange]) -> Self {
        self.features = features.to_vec();
        self
    }
}

/// Geometry of the nodes data are attached to, indexed by [`NodeId`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeGeometry<'a> {
    pub offsets: &'a [Vec2],
    pub sizes: &'a [Vec2],
    pub opacities: &'a [f32],
    pub enabled: &'a [bool],
}

impl<'a> NodeGeometry<'a> {
    pub fn new(offsets: &'a [Vec2], sizes: &'a [Vec2], opacities: &'a [f32], enabled: &'a [bool]) -> Self {
        Self {
            offsets,
            sizes,
            opacities,
            enabled,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    fn validate(&self) -> Result<()> {
        let len = self.len();
        if self.sizes.len() != len || self.opacities.len() != len || self.enabled.len() != len {
            return Err(TextError::InvalidArgument("node geometry slices differ in length"));
        }
        Ok(())
    }
}

/// Placement metrics of a shaped run
#[derive(Debug, Clone, Copy, PartialEq)]
struct RunLayout {
    font: FontHandle,
    cache_font_id: u32,
    /// Font units to UI units
    scale: f32,
    /// Font units
    ascent: f32,
    descent: f32,
    width: f32,
    /// Requested direction, or the one detected by the shaper
    direction: ShapeDirection,
}

impl RunLayout {
    fn bounds(&self) -> RunBounds {
        RunBounds {
            width: self.width * self.scale,
            ascent: self.ascent * self.scale,
            descent: self.descent * self.scale,
        }
    }
}

/// Output of shaping a text or placing a glyph, not yet stored
struct Shaped {
    glyphs: Vec<GlyphData>,
    layout: RunLayout,
}

#[derive(Debug, Clone)]
struct TextData {
    style: u32,
    flags: TextDataFlags,
    node: Option<NodeId>,
    color: Color,
    padding: Padding,
    transformation: Transformation,
    alignment: Option<Alignment>,
    glyph_run: Option<u32>,
    text_run: Option<u32>,
    layout: Option<RunLayout>,
    cursor: u32,
    selection: u32,
    /// Present for editable text only
    properties: Option<TextProperties>,
}

impl TextData {
    fn new(style: u32, flags: TextDataFlags, node: Option<NodeId>) -> Self {
        Self {
            style,
            flags,
            node,
            color: Color::WHITE,
            padding: Padding::ZERO,
            transformation: Transformation::IDENTITY,
            alignment: None,
            glyph_run: None,
            text_run: None,
            layout: None,
            cursor: 0,
            selection: 0,
            properties: None,
        }
    }

    /// Direction cursor movement and decorations follow. Unspecified falls
    /// back to what the shaper detected.
    fn direction(&self) -> ShapeDirection {
        let requested = self
            .properties
            .as_ref()
            .map_or(ShapeDirection::Unspecified, |properties| properties.direction);
        match (requested, self.layout) {
            (ShapeDirection::Unspecified, Some(layout)) => layout.direction,
            (requested, _) => requested,
        }
    }
}

fn check_editable_properties(properties: &TextProperties) -> Result<()> {
    if !properties.features.is_empty() {
        return Err(TextError::NotImplemented(
            "font features in text properties aren't supported for editable text",
        ));
    }
    if properties.direction.is_vertical() {
        return Err(TextError::NotImplemented(
            "vertical shape directions aren't supported for editable text",
        ));
    }
    Ok(())
}

/// Text layer
pub struct TextLayer {
    shared: Rc<RefCell<TextLayerShared>>,
    config: TextLayerConfig,
    data: SlotMap<DataHandle, TextData>,
    glyphs: RunStore<GlyphData>,
    texts: RunStore<u8>,
    dynamic: DynamicStyles,
    state: LayerStates,
    /// Shared state generation the buffers were last updated for
    shared_generation: u64,

    vertices: Vec<TextVertex>,
    indices: Vec<u32>,
    editing_vertices: Vec<TextEditingVertex>,
    editing_indices: Vec<u32>,
    inverted_run_scales: Vec<f32>,
    draw_offsets: Vec<(u32, u32)>,
}

impl std::fmt::Debug for TextLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextLayer")
            .field("config", &self.config)
            .field("data_count", &self.data.len())
            .field("state", &self.state)
            .finish()
    }
}

impl TextLayer {
    pub fn new(shared: Rc<RefCell<TextLayerShared>>, config: TextLayerConfig) -> Self {
        let (editing, shared_generation) = {
            let shared = shared.borrow();
            (shared.config().has_editing_styles(), shared.generation())
        };
        Self {
            shared,
            config,
            data: SlotMap::with_key(),
            glyphs: RunStore::new(),
            texts: RunStore::new(),
            dynamic: DynamicStyles::new(config.dynamic_style_count, editing),
            state: LayerStates::empty(),
            shared_generation,
            vertices: Vec::new(),
            indices: Vec::new(),
            editing_vertices: Vec::new(),
            editing_indices: Vec::new(),
            inverted_run_scales: Vec::new(),
            draw_offsets: Vec::new(),
        }
    }

    pub fn shared(&self) -> &Rc<RefCell<TextLayerShared>> {
        &self.shared
    }

    pub fn config(&self) -> &TextLayerConfig {
        &self.config
    }

    /// Pending work, including stale runs and shared style changes
    pub fn state(&self) -> LayerStates {
        let mut state = self.state;
        if self.glyphs.has_unused() || self.texts.has_unused() {
            state |= LayerStates::NEEDS_DATA_CLEAN;
        }
        if self.shared.borrow().generation() != self.shared_generation {
            state |= LayerStates::NEEDS_DATA_UPDATE;
        }
        state
    }

    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    pub fn is_handle_valid(&self, handle: DataHandle) -> bool {
        self.data.contains_key(handle)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Creation and removal
    // ─────────────────────────────────────────────────────────────────────

    /// Shape `text` and attach it to `node`
    ///
    /// With [`TextDataFlags::EDITABLE`] the text bytes are kept, the cursor
    /// is placed at the end and `properties` may not contain features or a
    /// vertical direction. Editable text needs the shared state to have
    /// editing styles.
    pub fn create(
        &mut self,
        style: u32,
        text: impl AsRef<[u8]>,
        properties: &TextProperties,
        flags: TextDataFlags,
        node: Option<NodeId>,
    ) -> Result<DataHandle> {
        let text = text.as_ref();
        self.check_style(style)?;
        let editable = flags.contains(TextDataFlags::EDITABLE);
        if editable {
            if !self.shared.borrow().config().has_editing_styles() {
                return Err(TextError::NotImplemented(
                    "editable text without editing styles in the shared state",
                ));
            }
            check_editable_properties(properties)?;
        }
        let shaped = self.shape_text(style, text, properties)?;

        let handle = self.data.insert(TextData::new(style, flags, node));
        self.store_shaped(handle, shaped);
        let data = &mut self.data[handle];
        data.alignment = properties.alignment;
        if editable {
            data.properties = Some(properties.clone());
            data.cursor = text.len() as u32;
            data.selection = data.cursor;
            self.store_text(handle, text);
        }
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(handle)
    }

    /// Place a single glyph from the glyph cache and attach it to `node`
    ///
    /// The glyph sits on the baseline with its cache rectangle as the
    /// bounding box. Fonts without an instance can be used here.
    pub fn create_glyph(
        &mut self,
        style: u32,
        glyph_id: u32,
        properties: &TextProperties,
        node: Option<NodeId>,
    ) -> Result<DataHandle> {
        self.check_style(style)?;
        let shaped = self.place_glyph(style, glyph_id, properties)?;

        let handle = self.data.insert(TextData::new(style, TextDataFlags::empty(), node));
        self.store_shaped(handle, shaped);
        self.data[handle].alignment = properties.alignment;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(handle)
    }

    /// Remove a data. Its runs are dropped on the next update.
    pub fn remove(&mut self, handle: DataHandle) -> Result<()> {
        let data = self.data.remove(handle).ok_or(TextError::InvalidHandle(handle))?;
        if let Some(run) = data.glyph_run {
            self.glyphs.mark_unused(run);
        }
        if let Some(run) = data.text_run {
            self.texts.mark_unused(run);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the text of a data, keeping its style and flags
    pub fn set_text(
        &mut self,
        handle: DataHandle,
        text: impl AsRef<[u8]>,
        properties: &TextProperties,
    ) -> Result<()> {
        let text = text.as_ref();
        let data = self.get(handle)?;
        let editable = data.flags.contains(TextDataFlags::EDITABLE);
        if editable {
            check_editable_properties(properties)?;
        }
        let shaped = self.shape_text(data.style, text, properties)?;

        self.store_shaped(handle, shaped);
        let data = &mut self.data[handle];
        data.alignment = properties.alignment;
        if editable {
            data.properties = Some(properties.clone());
            data.cursor = text.len() as u32;
            data.selection = data.cursor;
            self.store_text(handle, text);
        }
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    /// Replace a non-editable data with a single glyph
    pub fn set_glyph(
        &mut self,
        handle: DataHandle,
        glyph_id: u32,
        properties: &TextProperties,
    ) -> Result<()> {
        let data = self.get(handle)?;
        if data.flags.contains(TextDataFlags::EDITABLE) {
            return Err(TextError::NotImplemented(
                "editable text can't be replaced with a single glyph",
            ));
        }
        let shaped = self.place_glyph(data.style, glyph_id, properties)?;

        self.store_shaped(handle, shaped);
        self.data[handle].alignment = properties.alignment;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    /// Set the text of `to` to the text of the editable data `from`
    ///
    /// `to` is shaped with its own properties if it's editable, with the
    /// properties of `from` otherwise. Both can be the same data.
    pub fn copy_text(&mut self, from: DataHandle, to: DataHandle) -> Result<()> {
        let source = self.editable(from)?;
        let target = self.get(to)?;
        let text = self.text_of(source);
        let properties = target
            .properties
            .as_ref()
            .or(source.properties.as_ref())
            .ok_or(TextError::InvalidArgument("source text data is not editable"))?;
        let shaped = self.shape_text(target.style, text, properties)?;
        let length = text.len() as u32;
        let source_run = source.text_run;
        let target_editable = target.properties.is_some();

        self.store_shaped(to, shaped);
        if target_editable {
            // Copy before releasing the old run, the two may be the same
            let copied = source_run.map(|run| self.texts.push_from_run(to, run));
            let data = &mut self.data[to];
            if let Some(old) = std::mem::replace(&mut data.text_run, copied) {
                self.texts.mark_unused(old);
            }
            data.cursor = length;
            data.selection = length;
        }
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────

    /// Cursor and selection of an editable text, in bytes
    pub fn cursor(&self, handle: DataHandle) -> Result<(u32, u32)> {
        let data = self.editable(handle)?;
        Ok((data.cursor, data.selection))
    }

    /// Set cursor and selection of an editable text
    ///
    /// Pass the same value twice for no selection.
    pub fn set_cursor(&mut self, handle: DataHandle, cursor: u32, selection: u32) -> Result<()> {
        let data = self.editable(handle)?;
        let length = self.text_of(data).len() as u32;
        if cursor > length {
            return Err(TextError::out_of_range("cursor", cursor, length));
        }
        if selection > length {
            return Err(TextError::out_of_range("selection", selection, length));
        }
        if (data.cursor, data.selection) == (cursor, selection) {
            return Ok(());
        }

        let data = &mut self.data[handle];
        data.cursor = cursor;
        data.selection = selection;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    /// Move the cursor of an editable text, clearing the selection
    pub fn set_cursor_position(&mut self, handle: DataHandle, position: u32) -> Result<()> {
        self.set_cursor(handle, position, position)
    }

    /// Bytes of an editable text
    pub fn text(&self, handle: DataHandle) -> Result<&[u8]> {
        let data = self.editable(handle)?;
        Ok(self.text_of(data))
    }

    /// Properties an editable text is shaped with
    pub fn text_properties(&self, handle: DataHandle) -> Result<&TextProperties> {
        self.editable(handle)?
            .properties
            .as_ref()
            .ok_or(TextError::InvalidArgument("text data is not editable"))
    }

    /// Remove and insert bytes of an editable text and set the cursor
    ///
    /// `remove_size` bytes at `remove_offset` are removed first, then
    /// `insert` is placed at `insert_offset` of the shortened text. Cursor
    /// and selection are relative to the final text. The text is reshaped
    /// only if its bytes change.
    #[allow(clippy::too_many_arguments)]
    pub fn update_text(
        &mut self,
        handle: DataHandle,
        remove_offset: u32,
        remove_size: u32,
        insert_offset: u32,
        insert: impl AsRef<[u8]>,
        cursor: u32,
        selection: u32,
    ) -> Result<()> {
        let insert = insert.as_ref();
        let data = self.editable(handle)?;
        let length = self.text_of(data).len() as u64;
        let remove_end = remove_offset as u64 + remove_size as u64;
        if remove_end > length {
            return Err(TextError::out_of_range("remove end", remove_end, length));
        }
        let removed_length = length - remove_size as u64;
        if insert_offset as u64 > removed_length {
            return Err(TextError::out_of_range("insert offset", insert_offset, removed_length));
        }
        let final_length = removed_length + insert.len() as u64;
        if cursor as u64 > final_length {
            return Err(TextError::out_of_range("cursor", cursor, final_length));
        }
        if selection as u64 > final_length {
            return Err(TextError::out_of_range("selection", selection, final_length));
        }

        self.apply_edit(
            handle,
            EditPlan {
                remove_offset,
                remove_size,
                insert_offset,
                insert: !insert.is_empty(),
                cursor,
                selection,
                force_update: false,
            },
            insert,
        )
    }

    /// Apply an editing operation at the cursor
    ///
    /// `insert` has to be empty for operations other than the insertions.
    /// Left and right follow the visual direction of the text.
    pub fn edit_text(&mut self, handle: DataHandle, edit: TextEdit, insert: impl AsRef<[u8]>) -> Result<()> {
        let insert = insert.as_ref();
        let data = self.editable(handle)?;
        if !edit.accepts_text() && !insert.is_empty() {
            return Err(TextError::InvalidArgument("edit operation doesn't accept text to insert"));
        }

        let Some(plan) = edit::plan_edit(
            edit,
            self.text_of(data),
            data.cursor,
            data.selection,
            data.direction(),
            insert.len() as u32,
        ) else {
            return Ok(());
        };
        self.apply_edit(handle, plan, insert)
    }

    /// Apply the editing operation a key press maps to, returning `false`
    /// if the key doesn't edit text
    pub fn handle_key(&mut self, handle: DataHandle, event: &KeyEvent) -> Result<bool> {
        self.editable(handle)?;
        let Some(edit) = TextEdit::from_key(event) else {
            return Ok(false);
        };
        self.edit_text(handle, edit, b"")?;
        Ok(true)
    }

    /// Insert typed text at the cursor, replacing the selection
    pub fn handle_text_input(&mut self, handle: DataHandle, text: impl AsRef<[u8]>) -> Result<()> {
        self.edit_text(handle, TextEdit::InsertBeforeCursor, text)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Per-data properties
    // ─────────────────────────────────────────────────────────────────────

    pub fn style(&self, handle: DataHandle) -> Result<u32> {
        Ok(self.get(handle)?.style)
    }

    /// Change the style. Font and features of the new style are used the
    /// next time the text is shaped.
    pub fn set_style(&mut self, handle: DataHandle, style: u32) -> Result<()> {
        self.get(handle)?;
        self.check_style(style)?;
        self.data[handle].style = style;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    pub fn flags(&self, handle: DataHandle) -> Result<TextDataFlags> {
        Ok(self.get(handle)?.flags)
    }

    pub fn node(&self, handle: DataHandle) -> Result<Option<NodeId>> {
        Ok(self.get(handle)?.node)
    }

    pub fn set_node(&mut self, handle: DataHandle, node: Option<NodeId>) -> Result<()> {
        self.get_mut(handle)?.node = node;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    pub fn color(&self, handle: DataHandle) -> Result<Color> {
        Ok(self.get(handle)?.color)
    }

    pub fn set_color(&mut self, handle: DataHandle, color: Color) -> Result<()> {
        self.get_mut(handle)?.color = color;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    pub fn padding(&self, handle: DataHandle) -> Result<Padding> {
        Ok(self.get(handle)?.padding)
    }

    /// Shrink the node area the text is aligned in, on top of the style
    /// padding. Not available on transformable layers.
    pub fn set_padding(&mut self, handle: DataHandle, padding: Padding) -> Result<()> {
        if self.config.flags.contains(TextLayerFlags::TRANSFORMABLE) {
            return Err(TextError::NotImplemented("padding isn't available on transformable layers"));
        }
        self.get_mut(handle)?.padding = padding;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    pub fn transformation(&self, handle: DataHandle) -> Result<Transformation> {
        Ok(self.get(handle)?.transformation)
    }

    /// Only available on layers created with
    /// [`TextLayerFlags::TRANSFORMABLE`]
    pub fn set_transformation(&mut self, handle: DataHandle, transformation: Transformation) -> Result<()> {
        if !self.config.flags.contains(TextLayerFlags::TRANSFORMABLE) {
            return Err(TextError::NotImplemented("layer isn't transformable"));
        }
        self.get_mut(handle)?.transformation = transformation;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    /// Number of glyphs the data is drawn with
    pub fn glyph_count(&self, handle: DataHandle) -> Result<u32> {
        let data = self.get(handle)?;
        Ok(data.glyph_run.map_or(0, |run| self.glyphs.run(run).count))
    }

    /// Size of the text bounding box in UI units, from the advances and
    /// the font ascent and descent
    pub fn size(&self, handle: DataHandle) -> Result<Vec2> {
        let data = self.get(handle)?;
        Ok(data.layout.map_or(Vec2::ZERO, |layout| layout.bounds().size()))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dynamic styles
    // ─────────────────────────────────────────────────────────────────────

    pub fn dynamic_style_count(&self) -> u32 {
        self.dynamic.count()
    }

    /// Replace dynamic style `id`, used by data with style
    /// `style_count + id`
    pub fn set_dynamic_style(&mut self, id: u32, style: &DynamicTextStyle) -> Result<()> {
        if id >= self.dynamic.count() {
            return Err(TextError::out_of_range("dynamic style", id, self.dynamic.count()));
        }
        if let Some(font) = style.font {
            self.shared.borrow().font_metrics(font)?;
        }
        if !self.dynamic.has_editing() && (style.cursor.is_some() || style.selection.is_some()) {
            return Err(TextError::InvalidArgument(
                "cursor and selection styles need editing styles in the shared state",
            ));
        }

        self.dynamic.set(id, style);
        self.state |= LayerStates::NEEDS_COMMON_DATA_UPDATE | LayerStates::NEEDS_DATA_UPDATE;
        Ok(())
    }

    /// Uniforms of dynamic styles followed by the uniforms of text under
    /// their decorations, to be placed after the shared uniforms
    pub fn dynamic_style_uniforms(&self) -> &[TextLayerStyleUniform] {
        self.dynamic.uniforms()
    }

    /// Decoration uniforms of dynamic styles, to be placed after the shared
    /// editing uniforms
    pub fn dynamic_editing_style_uniforms(&self) -> &[TextLayerEditingStyleUniform] {
        self.dynamic.editing_uniforms()
    }

    pub fn dynamic_style_features(&self, id: u32) -> Result<&[TextFeatureValue]> {
        if id >= self.dynamic.count() {
            return Err(TextError::out_of_range("dynamic style", id, self.dynamic.count()));
        }
        Ok(self.dynamic.features(id))
    }

    /// Offset and count of a dynamic style's features in the array shared by
    /// all dynamic styles
    pub fn dynamic_style_feature_range(&self, id: u32) -> Result<(u32, u32)> {
        if id >= self.dynamic.count() {
            return Err(TextError::out_of_range("dynamic style", id, self.dynamic.count()));
        }
        Ok(self.dynamic.feature_range(id))
    }

    pub fn dynamic_style_feature_storage(&self) -> &[TextFeatureValue] {
        self.dynamic.all_features()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Update
    // ─────────────────────────────────────────────────────────────────────

    /// Lay out `handles` into the vertex and index buffers
    ///
    /// Pending run removals are compacted first. Draw offsets get one
    /// `(index_offset, editing_index_offset)` pair per handle plus a final
    /// pair with the buffer ends.
    pub fn update(&mut self, handles: &[DataHandle], nodes: &NodeGeometry<'_>) -> Result<()> {
        let shared = Rc::clone(&self.shared);
        let shared = shared.borrow();
        shared.check_style_data()?;
        nodes.validate()?;
        for &handle in handles {
            let data = self.get(handle)?;
            if let Some(node) = data.node {
                if node.index() >= nodes.len() {
                    return Err(TextError::out_of_range("node", node.0, nodes.len() as u32));
                }
            }
        }

        if shared.generation() != self.shared_generation {
            tracing::debug!(
                "Shared text styles changed (generation {} -> {}), relayouting",
                self.shared_generation,
                shared.generation()
            );
            self.shared_generation = shared.generation();
        }

        if self.glyphs.has_unused() || self.texts.has_unused() {
            let data = &mut self.data;
            self.glyphs.compact(|handle, run| {
                if let Some(data) = data.get_mut(handle) {
                    data.glyph_run = Some(run);
                }
            });
            self.texts.compact(|handle, run| {
                if let Some(data) = data.get_mut(handle) {
                    data.text_run = Some(run);
                }
            });
        }

        self.vertices.clear();
        self.indices.clear();
        self.editing_vertices.clear();
        self.editing_indices.clear();
        self.inverted_run_scales.clear();
        self.draw_offsets.clear();

        let distance_field = shared.config().flags.contains(TextLayerSharedFlags::DISTANCE_FIELD);
        let transformable = self.config.flags.contains(TextLayerFlags::TRANSFORMABLE);
        let cache = shared.glyph_cache();
        let cache_size = cache.size();
        let texture_scale = Vec2::new(1.0 / cache_size.x, 1.0 / cache_size.y);

        for &handle in handles {
            self.draw_offsets
                .push((self.indices.len() as u32, self.editing_indices.len() as u32));

            let data = &self.data[handle];
            let (Some(node), Some(layout)) = (data.node, data.layout) else {
                continue;
            };
            let editable = data.properties.is_some();
            if data.glyph_run.is_none() && !editable {
                continue;
            }

            let node = node.index();
            let style_id = if nodes.enabled[node] {
                data.style
            } else {
                shared.transition_style(data.style)
            };
            let Some(style) = self.resolve_style(&shared, style_id) else {
                tracing::warn!("Style {} of a disabled node is out of range, skipping", style_id);
                continue;
            };

            let padding = if transformable {
                style.padding
            } else {
                style.padding + data.padding
            };
            let direction = data.direction();
            let rtl = direction == ShapeDirection::RightToLeft;
            let bounds = layout.bounds();
            let origin = aligned_origin(
                data.alignment.unwrap_or(style.alignment),
                direction,
                nodes.offsets[node] + padding.top_left(),
                nodes.sizes[node] - padding.size(),
                bounds,
            );
            let transform = if transformable {
                let transformation = data.transformation;
                QuadTransform {
                    origin,
                    translation: transformation.translation,
                    rotation: transformation.rotation,
                    scale: transformation.scale,
                }
            } else {
                QuadTransform::identity(origin)
            };
            let opacity = nodes.opacities[node];
            let color = data.color.scaled(opacity).to_array();

            let glyphs: &[GlyphData] = data.glyph_run.map_or(&[], |run| self.glyphs.items(run));
            let (selection_begin, selection_end) =
                (data.cursor.min(data.selection), data.cursor.max(data.selection));
            let selection_uniform = if editable && selection_begin != selection_end {
                style.selection.and_then(|selection| selection.text_uniform)
            } else {
                None
            };

            let base_vertex = self.vertices.len() as u32;
            for glyph in glyphs {
                let cached = cache.glyph(layout.cache_font_id, glyph.id).unwrap_or_else(|| {
                    tracing::warn!(
                        "Glyph {} of cache font {} not in the glyph cache, drawing the invalid glyph",
                        glyph.id,
                        layout.cache_font_id
                    );
                    cache.invalid_glyph()
                });
                let rectangle = Range2D::from_size(
                    origin + (glyph.position + cached.offset) * layout.scale,
                    cached.rectangle.size() * layout.scale,
                );
                let texture = Range2D::new(
                    cached.rectangle.min.mul_componentwise(texture_scale),
                    cached.rectangle.max.mul_componentwise(texture_scale),
                );
                let uniform = match selection_uniform {
                    Some(uniform) if (selection_begin..selection_end).contains(&glyph.cluster) => uniform,
                    _ => style.uniform,
                };
                write_glyph_quad(
                    &mut self.vertices,
                    rectangle,
                    texture,
                    cached.layer,
                    color,
                    uniform,
                    &transform,
                );
            }
            write_quad_indices(&mut self.indices, base_vertex, glyphs.len() as u32);
            if distance_field {
                let inverted_scale = 1.0 / (layout.scale * transform.scale);
                self.inverted_run_scales
                    .resize(self.vertices.len(), inverted_scale);
            }

            if !editable {
                continue;
            }
            let top = origin.y - bounds.ascent;
            let bottom = origin.y - bounds.descent;
            let x_at = |position: u32| origin.x + cursor_x(glyphs, position, rtl) * layout.scale;
            let mut decorations: SmallVec<[(Range2D, u32); 2]> = SmallVec::new();
            if selection_begin != selection_end {
                if let Some(selection) = style.selection {
                    let (a, b) = (x_at(selection_begin), x_at(selection_end));
                    let rectangle = Range2D::new(Vec2::new(a.min(b), top), Vec2::new(a.max(b), bottom));
                    let padding = if rtl { selection.padding.mirrored() } else { selection.padding };
                    decorations.push((rectangle.padded(padding), selection.uniform));
                }
            }
            if let Some(cursor) = style.cursor {
                let x = x_at(data.cursor);
                let rectangle = Range2D::new(Vec2::new(x, top), Vec2::new(x, bottom));
                let padding = if rtl { cursor.padding.mirrored() } else { cursor.padding };
                decorations.push((rectangle.padded(padding), cursor.uniform));
            }

            let base_vertex = self.editing_vertices.len() as u32;
            for &(rectangle, uniform) in &decorations {
                write_editing_quad(&mut self.editing_vertices, rectangle, opacity, uniform, &transform);
            }
            write_quad_indices(&mut self.editing_indices, base_vertex, decorations.len() as u32);
        }
        self.draw_offsets
            .push((self.indices.len() as u32, self.editing_indices.len() as u32));

        tracing::trace!(
            "Text layer update: {} data, {} glyph quads, {} editing quads",
            handles.len(),
            self.vertices.len() / 4,
            self.editing_vertices.len() / 4
        );
        self.state = LayerStates::empty();
        Ok(())
    }

    pub fn vertices(&self) -> &[TextVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn editing_vertices(&self) -> &[TextEditingVertex] {
        &self.editing_vertices
    }

    pub fn editing_indices(&self) -> &[u32] {
        &self.editing_indices
    }

    /// One value per vertex, filled only if the shared state uses
    /// [`TextLayerSharedFlags::DISTANCE_FIELD`]
    pub fn inverted_run_scales(&self) -> &[f32] {
        &self.inverted_run_scales
    }

    /// `(index_offset, editing_index_offset)` where each data passed to the
    /// last [`Self::update`] starts, in the same order, followed by one more
    /// pair with the end of both index buffers
    ///
    /// Data `i` is drawn by the index ranges between pairs `i` and `i + 1`,
    /// so the list is one longer than the data list.
    pub fn draw_offsets(&self) -> &[(u32, u32)] {
        &self.draw_offsets
    }

    /// Glyphs in the glyph array, including ones of removed data that
    /// weren't compacted yet
    pub fn glyph_storage_len(&self) -> usize {
        self.glyphs.item_count()
    }

    /// Bytes in the text array, including ones of removed data that weren't
    /// compacted yet
    pub fn text_storage_len(&self) -> usize {
        self.texts.item_count()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn get(&self, handle: DataHandle) -> Result<&TextData> {
        self.data.get(handle).ok_or(TextError::InvalidHandle(handle))
    }

    fn get_mut(&mut self, handle: DataHandle) -> Result<&mut TextData> {
        self.data.get_mut(handle).ok_or(TextError::InvalidHandle(handle))
    }

    fn editable(&self, handle: DataHandle) -> Result<&TextData> {
        let data = self.get(handle)?;
        if data.properties.is_none() {
            return Err(TextError::InvalidArgument("text data is not editable"));
        }
        Ok(data)
    }

    fn text_of(&self, data: &TextData) -> &[u8] {
        data.text_run.map_or(&[], |run| self.texts.items(run))
    }

    fn check_style(&self, style: u32) -> Result<()> {
        let count = self.shared.borrow().config().style_count + self.dynamic.count();
        if style >= count {
            return Err(TextError::out_of_range("style", style, count));
        }
        Ok(())
    }

    /// Static or dynamic style, `None` if out of range or if static styles
    /// weren't set yet
    fn resolve_style(&self, shared: &TextLayerShared, style: u32) -> Option<ResolvedStyle> {
        let config = shared.config();
        if style < config.style_count {
            return shared.resolve_style(style);
        }
        let id = style - config.style_count;
        (id < self.dynamic.count())
            .then(|| self.dynamic.resolve(id, config.uniform_count, config.editing_uniform_count))
    }

    fn resolve_font(&self, shared: &TextLayerShared, style: u32, properties: &TextProperties) -> Result<(ResolvedStyle, FontHandle)> {
        let resolved = self.resolve_style(shared, style).ok_or(TextError::NoStyleData)?;
        let font = properties
            .font
            .or(resolved.font)
            .ok_or(TextError::InvalidArgument("no font in the style or text properties"))?;
        Ok((resolved, font))
    }

    fn shape_text(&self, style: u32, text: &[u8], properties: &TextProperties) -> Result<Shaped> {
        let mut shared = self.shared.borrow_mut();
        let (resolved, font) = self.resolve_font(&shared, style, properties)?;
        let metrics = shared.font_metrics(font)?;
        let shaper = shared.shaper(font)?;
        let mut layout = RunLayout {
            font,
            cache_font_id: metrics.cache_font_id,
            scale: metrics.scale,
            ascent: metrics.ascent,
            descent: metrics.descent,
            width: 0.0,
            direction: properties.direction,
        };
        if text.is_empty() {
            return Ok(Shaped {
                glyphs: Vec::new(),
                layout,
            });
        }

        if let Some(script) = properties.script {
            if !shaper.set_script(script) {
                tracing::debug!("Shaper doesn't support script {:?}", script);
            }
        }
        if let Some(language) = &properties.language {
            if !shaper.set_language(language) {
                tracing::debug!("Shaper doesn't support language {}", language);
            }
        }
        if properties.direction != ShapeDirection::Unspecified {
            shaper.set_direction(properties.direction);
        }
        let features: SmallVec<[FeatureRange; 8]> = resolved
            .features
            .iter()
            .map(|feature| feature.to_range())
            .chain(properties.features.iter().copied())
            .collect();
        let shaped = ShapedGlyphs::collect(shaper, text, &features);

        let mut pen = Vec2::ZERO;
        let mut glyphs = Vec::with_capacity(shaped.len());
        for i in 0..shaped.len() {
            let offset = shaped.offsets[i];
            glyphs.push(GlyphData {
                id: shaped.ids[i],
                // Font metrics are Y up
                position: Vec2::new(pen.x + offset.x, -(pen.y + offset.y)),
                advance: shaped.advances[i].x,
                cluster: shaped.clusters[i],
            });
            pen += shaped.advances[i];
        }
        layout.width = pen.x;
        if properties.direction == ShapeDirection::Unspecified {
            layout.direction = shaped.direction;
        }
        Ok(Shaped { glyphs, layout })
    }

    fn place_glyph(&self, style: u32, glyph_id: u32, properties: &TextProperties) -> Result<Shaped> {
        let shared = self.shared.borrow();
        let (_, font) = self.resolve_font(&shared, style, properties)?;
        let metrics = shared.font_metrics(font)?;
        let cache = shared.glyph_cache();
        let glyph_count = cache.font_glyph_count(metrics.cache_font_id);
        if glyph_id >= glyph_count {
            return Err(TextError::out_of_range("glyph", glyph_id, glyph_count));
        }

        let cached = cache
            .glyph(metrics.cache_font_id, glyph_id)
            .unwrap_or_else(|| cache.invalid_glyph());
        let size = cached.rectangle.size();
        Ok(Shaped {
            glyphs: vec![GlyphData {
                id: glyph_id,
                // Puts the rectangle bottom on the baseline
                position: Vec2::new(0.0, -size.y) - cached.offset,
                advance: size.x,
                cluster: 0,
            }],
            layout: RunLayout {
                font,
                cache_font_id: metrics.cache_font_id,
                scale: metrics.scale,
                ascent: size.y,
                descent: 0.0,
                width: size.x,
                direction: properties.direction,
            },
        })
    }

    fn store_shaped(&mut self, handle: DataHandle, shaped: Shaped) {
        let data = &mut self.data[handle];
        data.glyph_run = match (data.glyph_run, shaped.glyphs.is_empty()) {
            (Some(run), false) => Some(self.glyphs.replace(run, &shaped.glyphs)),
            (Some(run), true) => {
                self.glyphs.mark_unused(run);
                None
            }
            (None, false) => Some(self.glyphs.push(handle, &shaped.glyphs)),
            (None, true) => None,
        };
        data.layout = Some(shaped.layout);
    }

    fn store_text(&mut self, handle: DataHandle, text: &[u8]) {
        let data = &mut self.data[handle];
        data.text_run = match (data.text_run, text.is_empty()) {
            (Some(run), false) => Some(self.texts.replace(run, text)),
            (Some(run), true) => {
                self.texts.mark_unused(run);
                None
            }
            (None, false) => Some(self.texts.push(handle, text)),
            (None, true) => None,
        };
    }

    /// Apply a validated edit
    fn apply_edit(&mut self, handle: DataHandle, plan: EditPlan, insert: &[u8]) -> Result<()> {
        let changes_text = plan.remove_size != 0 || (plan.insert && !insert.is_empty());
        if changes_text {
            let data = &self.data[handle];
            let text = edit::splice(self.text_of(data), &plan, insert);
            let properties = data
                .properties
                .as_ref()
                .ok_or(TextError::InvalidArgument("text data is not editable"))?;
            let shaped = self.shape_text(data.style, &text, properties)?;
            self.store_shaped(handle, shaped);
            self.store_text(handle, &text);
        }

        let data = &mut self.data[handle];
        let moved = (data.cursor, data.selection) != (plan.cursor, plan.selection);
        data.cursor = plan.cursor;
        data.selection = plan.selection;
        if changes_text || moved || plan.force_update {
            self.state |= LayerStates::NEEDS_DATA_UPDATE;
        }
        Ok(())
    }
}

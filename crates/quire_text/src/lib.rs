//! Text layout and in-place editing layer for the Quire UI toolkit
//!
//! This crate provides:
//! - Shaper, font and glyph cache capabilities (with a HarfBuzz-backed
//!   implementation via rustybuzz)
//! - A shared style table and per-layer dynamic styles
//! - Run-based glyph and text storage with lazy compaction
//! - A UTF-8 aware cursor/selection editing engine
//! - Quad generation for glyphs and editing decorations, ready for GPU upload
//!
//! # Example
//!
//! ```ignore
//! let shared = TextLayerShared::new(glyph_cache, TextLayerSharedConfig::new(1, 1));
//! let shared = Rc::new(RefCell::new(shared));
//! let font = shared.borrow_mut().add_font(Box::new(font), 0, 16.0)?;
//! shared.borrow_mut().set_styles(
//!     &[TextLayerStyleUniform::default()],
//!     &[TextStyle::new(0, Some(font), Alignment::MiddleCenter)],
//!     &[],
//! )?;
//!
//! let mut layer = TextLayer::new(shared, TextLayerConfig::default());
//! let data = layer.create(0, "hello", &TextProperties::default(),
//!     TextDataFlags::EDITABLE, Some(NodeId(0)))?;
//! layer.edit_text(data, TextEdit::MoveCursorLineEnd, "")?;
//! layer.update(&[data], &nodes)?;
//! ```

mod align;
pub mod dynamic;
pub mod edit;
mod features;
pub mod font;
pub mod glyph_cache;
pub mod harfbuzz;
pub mod layer;
pub mod quad;
mod run_store;
pub mod shaper;
pub mod shared;
pub mod style;
pub mod utf8;

pub use dynamic::{DynamicEditingStyle, DynamicTextStyle};
pub use edit::TextEdit;
pub use font::{Font, FontHandle};
pub use glyph_cache::{AtlasGlyphCache, CachedGlyph, GlyphCache};
pub use harfbuzz::{RustybuzzFont, RustybuzzShaper};
pub use layer::{
    DataHandle, LayerStates, NodeGeometry, TextDataFlags, TextLayer, TextLayerConfig,
    TextLayerFlags, TextProperties, Transformation,
};
pub use quad::{TextEditingVertex, TextVertex};
pub use shaper::{Feature, FeatureRange, Script, ShapeDirection, Shaper, TextFeatureValue};
pub use shared::{TextLayerShared, TextLayerSharedConfig, TextLayerSharedFlags};
pub use style::{
    Alignment, HorizontalAlignment, TextEditingStyle, TextLayerEditingStyleUniform,
    TextLayerStyleUniform, TextStyle, VerticalAlignment,
};

use thiserror::Error;

/// Text layer errors
///
/// Every operation that returns an error leaves the layer and the shared
/// state unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextError {
    #[error("Invalid data handle {0:?}")]
    InvalidHandle(DataHandle),

    #[error("{what} {value} out of range for {bound} {what}s")]
    OutOfRange {
        what: &'static str,
        value: u64,
        bound: u64,
    },

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("No style data was set")]
    NoStyleData,

    #[error("No editing style data was set")]
    NoEditingStyleData,

    #[error("Invalid font data")]
    InvalidFontData,
}

impl TextError {
    pub(crate) fn out_of_range(what: &'static str, value: impl Into<u64>, bound: impl Into<u64>) -> Self {
        TextError::OutOfRange {
            what,
            value: value.into(),
            bound: bound.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TextError>;

//! Text and editing styles
//!
//! Styles describe how a piece of text is shaped and placed: which font it
//! uses, how it's aligned inside its node and which uniform (color and
//! other per-style GPU data) it's drawn with. Editing styles describe the
//! cursor and selection decorations of editable text.

use bytemuck::{Pod, Zeroable};
use quire_core::Padding;
use smallvec::SmallVec;

use crate::font::FontHandle;
use crate::shaper::{ShapeDirection, TextFeatureValue};

/// Horizontal alignment component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
    /// Left for left-to-right text, right for right-to-left text
    Begin,
    /// Right for left-to-right text, left for right-to-left text
    End,
}

impl HorizontalAlignment {
    /// Fraction of the width the origin is placed at, with `Begin` and
    /// `End` resolved for given direction
    pub fn factor(self, direction: ShapeDirection) -> f32 {
        let rtl = direction == ShapeDirection::RightToLeft;
        match self {
            HorizontalAlignment::Left => 0.0,
            HorizontalAlignment::Center => 0.5,
            HorizontalAlignment::Right => 1.0,
            HorizontalAlignment::Begin if rtl => 1.0,
            HorizontalAlignment::Begin => 0.0,
            HorizontalAlignment::End if rtl => 0.0,
            HorizontalAlignment::End => 1.0,
        }
    }
}

/// Vertical alignment component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    /// Baseline in the vertical center of the node
    Line,
    /// Descent at the bottom edge of the node
    Bottom,
    /// Ascent-to-descent box in the vertical center of the node
    Middle,
    /// Ascent at the top edge of the node
    Top,
}

/// Text alignment inside a node
///
/// The `*Integral` variants round the offset inside the node and the
/// placement of the text bounding box to whole units, which keeps centered
/// text crisp. The node offset itself is never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    LineLeft,
    LineCenter,
    LineRight,
    LineBegin,
    LineEnd,
    BottomLeft,
    BottomCenter,
    BottomRight,
    BottomBegin,
    BottomEnd,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    MiddleBegin,
    MiddleEnd,
    TopLeft,
    TopCenter,
    TopRight,
    TopBegin,
    TopEnd,
    LineCenterIntegral,
    BottomCenterIntegral,
    MiddleLeftIntegral,
    MiddleCenterIntegral,
    MiddleRightIntegral,
    MiddleBeginIntegral,
    MiddleEndIntegral,
    TopCenterIntegral,
}

impl Alignment {
    pub fn horizontal(self) -> HorizontalAlignment {
        use Alignment::*;
        match self {
            LineLeft | BottomLeft | MiddleLeft | TopLeft | MiddleLeftIntegral => {
                HorizontalAlignment::Left
            }
            LineCenter | BottomCenter | MiddleCenter | TopCenter | LineCenterIntegral
            | BottomCenterIntegral | MiddleCenterIntegral | TopCenterIntegral => {
                HorizontalAlignment::Center
            }
            LineRight | BottomRight | MiddleRight | TopRight | MiddleRightIntegral => {
                HorizontalAlignment::Right
            }
            LineBegin | BottomBegin | MiddleBegin | TopBegin | MiddleBeginIntegral => {
                HorizontalAlignment::Begin
            }
            LineEnd | BottomEnd | MiddleEnd | TopEnd | MiddleEndIntegral => {
                HorizontalAlignment::End
            }
        }
    }

    pub fn vertical(self) -> VerticalAlignment {
        use Alignment::*;
        match self {
            LineLeft | LineCenter | LineRight | LineBegin | LineEnd | LineCenterIntegral => {
                VerticalAlignment::Line
            }
            BottomLeft | BottomCenter | BottomRight | BottomBegin | BottomEnd
            | BottomCenterIntegral => VerticalAlignment::Bottom,
            MiddleLeft | MiddleCenter | MiddleRight | MiddleBegin | MiddleEnd
            | MiddleLeftIntegral | MiddleCenterIntegral | MiddleRightIntegral
            | MiddleBeginIntegral | MiddleEndIntegral => VerticalAlignment::Middle,
            TopLeft | TopCenter | TopRight | TopBegin | TopEnd | TopCenterIntegral => {
                VerticalAlignment::Top
            }
        }
    }

    pub fn is_integral(self) -> bool {
        use Alignment::*;
        matches!(
            self,
            LineCenterIntegral
                | BottomCenterIntegral
                | MiddleLeftIntegral
                | MiddleCenterIntegral
                | MiddleRightIntegral
                | MiddleBeginIntegral
                | MiddleEndIntegral
                | TopCenterIntegral
        )
    }
}

/// Per-style uniform data, uploaded as-is
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextLayerStyleUniform {
    /// Text color (RGBA, 0.0-1.0), multiplied with the data color
    pub color: [f32; 4],
}

impl Default for TextLayerStyleUniform {
    fn default() -> Self {
        Self { color: [1.0; 4] }
    }
}

impl TextLayerStyleUniform {
    pub fn with_color(color: quire_core::Color) -> Self {
        Self {
            color: color.to_array(),
        }
    }
}

/// Per-editing-style uniform data, uploaded as-is
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextLayerEditingStyleUniform {
    /// Decoration background color (RGBA, 0.0-1.0)
    pub background_color: [f32; 4],
    /// Corner radius of the decoration rectangle
    pub corner_radius: f32,
    /// Keeps the struct 16-byte sized for uniform buffer arrays
    pub reserved: [f32; 3],
}

impl Default for TextLayerEditingStyleUniform {
    fn default() -> Self {
        Self {
            background_color: [1.0; 4],
            corner_radius: 0.0,
            reserved: [0.0; 3],
        }
    }
}

impl TextLayerEditingStyleUniform {
    pub fn new(background_color: quire_core::Color, corner_radius: f32) -> Self {
        Self {
            background_color: background_color.to_array(),
            corner_radius,
            reserved: [0.0; 3],
        }
    }
}

/// A static text style
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextStyle {
    /// Index into the style uniform array
    pub uniform: u32,
    /// Font used unless text properties override it
    pub font: Option<FontHandle>,
    /// Alignment used unless text properties override it
    pub alignment: Alignment,
    /// First feature in the shared feature list
    pub feature_offset: u32,
    /// Number of features applied when shaping
    pub feature_count: u32,
    /// Editing style for the cursor of editable text
    pub cursor_style: Option<u32>,
    /// Editing style for the selection of editable text
    pub selection_style: Option<u32>,
    /// Shrinks the node area the text is aligned in
    pub padding: Padding,
}

impl TextStyle {
    pub fn new(uniform: u32, font: Option<FontHandle>, alignment: Alignment) -> Self {
        Self {
            uniform,
            font,
            alignment,
            feature_offset: 0,
            feature_count: 0,
            cursor_style: None,
            selection_style: None,
            padding: Padding::ZERO,
        }
    }

    pub fn with_features(mut self, offset: u32, count: u32) -> Self {
        self.feature_offset = offset;
        self.feature_count = count;
        self
    }

    pub fn with_cursor_style(mut self, style: u32) -> Self {
        self.cursor_style = Some(style);
        self
    }

    pub fn with_selection_style(mut self, style: u32) -> Self {
        self.selection_style = Some(style);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }
}

/// A cursor or selection decoration style
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextEditingStyle {
    /// Index into the editing style uniform array
    pub uniform: u32,
    /// Style uniform used for text covered by the decoration, `None` keeps
    /// the text style's own uniform
    pub text_uniform: Option<u32>,
    /// Grows the decoration rectangle outwards. Left and right are relative
    /// to the text direction, so `left` is at the text begin.
    pub padding: Padding,
}

impl TextEditingStyle {
    pub fn new(uniform: u32) -> Self {
        Self {
            uniform,
            text_uniform: None,
            padding: Padding::ZERO,
        }
    }

    pub fn with_text_uniform(mut self, uniform: u32) -> Self {
        self.text_uniform = Some(uniform);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }
}

/// An editing style with its uniforms in the layer-wide index spaces
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResolvedEditingStyle {
    pub uniform: u32,
    pub text_uniform: Option<u32>,
    pub padding: Padding,
}

impl From<&TextEditingStyle> for ResolvedEditingStyle {
    fn from(style: &TextEditingStyle) -> Self {
        Self {
            uniform: style.uniform,
            text_uniform: style.text_uniform,
            padding: style.padding,
        }
    }
}

/// A static or dynamic style with everything needed for shaping and
/// layout, uniforms in the layer-wide index spaces
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedStyle {
    pub uniform: u32,
    pub font: Option<FontHandle>,
    pub alignment: Alignment,
    pub padding: Padding,
    pub features: SmallVec<[TextFeatureValue; 4]>,
    pub selection: Option<ResolvedEditingStyle>,
    pub cursor: Option<ResolvedEditingStyle>,
}

//! Placement of shaped text inside its node

use quire_core::Vec2;

use crate::shaper::ShapeDirection;
use crate::style::{Alignment, VerticalAlignment};

/// Bounding box of a shaped run, in pixels
///
/// The box spans from the pen origin horizontally by `width` and vertically
/// from `ascent` above the baseline to `descent` below it (negative).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RunBounds {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl RunBounds {
    pub fn height(&self) -> f32 {
        self.ascent - self.descent
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height())
    }
}

/// Position of the pen origin (start of the baseline) for text of given
/// bounds aligned inside a node area
///
/// `node_offset` and `node_size` describe the area after padding was
/// applied. For integral alignments the offset inside the node and the
/// bounding box placement are rounded separately, `node_offset` is kept
/// as-is.
pub(crate) fn aligned_origin(
    alignment: Alignment,
    direction: ShapeDirection,
    node_offset: Vec2,
    node_size: Vec2,
    bounds: RunBounds,
) -> Vec2 {
    let factor_x = alignment.horizontal().factor(direction);
    let (factor_y, block_y) = match alignment.vertical() {
        VerticalAlignment::Top => (0.0, bounds.ascent),
        VerticalAlignment::Middle => (0.5, bounds.ascent - bounds.height() * 0.5),
        VerticalAlignment::Bottom => (1.0, bounds.descent),
        VerticalAlignment::Line => (0.5, 0.0),
    };

    let mut in_node = Vec2::new(node_size.x * factor_x, node_size.y * factor_y);
    let mut block = Vec2::new(-bounds.width * factor_x, block_y);
    if alignment.is_integral() {
        in_node = in_node.round();
        block = block.round();
    }

    node_offset + in_node + block
}

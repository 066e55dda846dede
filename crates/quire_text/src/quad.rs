//! Vertex output for glyphs and editing decorations
//!
//! All vertex structures use `#[repr(C)]` and implement `bytemuck::Pod` so
//! the output buffers can be copied to the GPU as-is. Every quad is four
//! vertices in the order top-left, top-right, bottom-left, bottom-right,
//! drawn as two triangles.

use bytemuck::{Pod, Zeroable};
use quire_core::{Range2D, Vec2};

/// Glyph vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    /// Position in UI units, Y down
    pub position: [f32; 2],
    /// Normalized position in the glyph cache (u, v, layer)
    pub texture_coordinates: [f32; 3],
    /// Data color multiplied by node opacity (premultiplied RGBA)
    pub color: [f32; 4],
    /// Index into the layer-wide style uniform array
    pub style_uniform: u32,
}

/// Cursor or selection decoration vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TextEditingVertex {
    /// Position in UI units, Y down
    pub position: [f32; 2],
    /// Distance from the quad center, for rounded corners
    pub center_distance: [f32; 2],
    /// Node opacity
    pub opacity: f32,
    /// Index into the layer-wide editing style uniform array
    pub style_uniform: u32,
}

/// Indices of two triangles covering the quad starting at `base_vertex`
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// A shaped glyph as stored in the glyph runs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct GlyphData {
    /// Font-local glyph ID
    pub id: u32,
    /// Pen position relative to the run origin, in font units, Y down
    pub position: Vec2,
    /// Horizontal advance in font units
    pub advance: f32,
    /// First byte of the cluster this glyph belongs to
    pub cluster: u32,
}

/// Translation, rotation and scale around an origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct QuadTransform {
    pub origin: Vec2,
    pub translation: Vec2,
    /// Radians, clockwise
    pub rotation: f32,
    pub scale: f32,
}

impl QuadTransform {
    pub fn identity(origin: Vec2) -> Self {
        Self {
            origin,
            translation: Vec2::ZERO,
            rotation: 0.0,
            scale: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.translation == Vec2::ZERO && self.rotation == 0.0 && self.scale == 1.0
    }

    pub fn apply(&self, point: Vec2) -> Vec2 {
        if self.is_identity() {
            return point;
        }
        self.origin + (point - self.origin).rotated(self.rotation) * self.scale + self.translation
    }
}

/// Append a glyph quad covering `rectangle` and sampling `texture`
pub(crate) fn write_glyph_quad(
    vertices: &mut Vec<TextVertex>,
    rectangle: Range2D,
    texture: Range2D,
    layer: u32,
    color: [f32; 4],
    style_uniform: u32,
    transform: &QuadTransform,
) {
    let layer = layer as f32;
    for (corner, uv) in rectangle.corners().into_iter().zip(texture.corners()) {
        vertices.push(TextVertex {
            position: transform.apply(corner).to_array(),
            texture_coordinates: [uv.x, uv.y, layer],
            color,
            style_uniform,
        });
    }
}

/// Append a decoration quad covering `rectangle`
pub(crate) fn write_editing_quad(
    vertices: &mut Vec<TextEditingVertex>,
    rectangle: Range2D,
    opacity: f32,
    style_uniform: u32,
    transform: &QuadTransform,
) {
    let center = rectangle.center();
    for corner in rectangle.corners() {
        vertices.push(TextEditingVertex {
            position: transform.apply(corner).to_array(),
            center_distance: ((corner - center) * transform.scale).to_array(),
            opacity,
            style_uniform,
        });
    }
}

/// Append indices for `quad_count` quads whose vertices start at
/// `base_vertex`
pub(crate) fn write_quad_indices(indices: &mut Vec<u32>, base_vertex: u32, quad_count: u32) {
    indices.reserve(quad_count as usize * QUAD_INDICES.len());
    for quad in 0..quad_count {
        let base = base_vertex + quad * 4;
        indices.extend(QUAD_INDICES.iter().map(|index| base + index));
    }
}

/// Horizontal offset of the cursor placed before byte `position`, relative
/// to the run origin, in font units
///
/// Glyphs are in visual order. For left-to-right text it's the left edge
/// of the first glyph at or after `position`, for right-to-left text the
/// right edge of the visually last one. Past the end of the text it's the
/// end of the run in the text direction.
pub(crate) fn cursor_x(glyphs: &[GlyphData], position: u32, rtl: bool) -> f32 {
    let mut pen = 0.0;
    if rtl {
        let mut edge = None;
        for glyph in glyphs {
            pen += glyph.advance;
            if glyph.cluster >= position {
                edge = Some(pen);
            }
        }
        edge.unwrap_or(0.0)
    } else {
        for glyph in glyphs {
            if glyph.cluster >= position {
                return pen;
            }
            pen += glyph.advance;
        }
        pen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyphs(clusters: &[u32]) -> Vec<GlyphData> {
        clusters
            .iter()
            .map(|&cluster| GlyphData {
                cluster,
                advance: 2.0,
                ..GlyphData::default()
            })
            .collect()
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<TextVertex>(), 40);
        assert_eq!(std::mem::size_of::<TextEditingVertex>(), 24);
    }

    #[test]
    fn test_indices() {
        let mut indices = Vec::new();
        write_quad_indices(&mut indices, 8, 2);
        assert_eq!(indices, [8, 9, 10, 10, 9, 11, 12, 13, 14, 14, 13, 15]);
    }

    #[test]
    fn test_glyph_quad() {
        let mut vertices = Vec::new();
        write_glyph_quad(
            &mut vertices,
            Range2D::new(Vec2::new(10.0, 20.0), Vec2::new(14.0, 26.0)),
            Range2D::new(Vec2::new(0.25, 0.5), Vec2::new(0.5, 1.0)),
            3,
            [1.0; 4],
            7,
            &QuadTransform::identity(Vec2::ZERO),
        );
        let positions: Vec<_> = vertices.iter().map(|v| v.position).collect();
        assert_eq!(positions, [[10.0, 20.0], [14.0, 20.0], [10.0, 26.0], [14.0, 26.0]]);
        assert_eq!(vertices[1].texture_coordinates, [0.5, 0.5, 3.0]);
        assert_eq!(vertices[2].texture_coordinates, [0.25, 1.0, 3.0]);
        assert!(vertices.iter().all(|v| v.style_uniform == 7));
    }

    #[test]
    fn test_transform_around_origin() {
        let transform = QuadTransform {
            origin: Vec2::new(10.0, 10.0),
            translation: Vec2::new(1.0, 0.0),
            rotation: 0.0,
            scale: 2.0,
        };
        assert_eq!(transform.apply(Vec2::new(12.0, 9.0)), Vec2::new(15.0, 8.0));
        assert_eq!(transform.apply(Vec2::new(10.0, 10.0)), Vec2::new(11.0, 10.0));
    }

    #[test]
    fn test_editing_quad_center_distance() {
        let mut vertices = Vec::new();
        write_editing_quad(
            &mut vertices,
            Range2D::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 2.0)),
            0.5,
            1,
            &QuadTransform::identity(Vec2::ZERO),
        );
        assert_eq!(vertices[0].center_distance, [-2.0, -1.0]);
        assert_eq!(vertices[3].center_distance, [2.0, 1.0]);
        assert_eq!(vertices[3].opacity, 0.5);
    }

    #[test]
    fn test_cursor_left_to_right() {
        let glyphs = glyphs(&[0, 1, 3]);
        assert_eq!(cursor_x(&glyphs, 0, false), 0.0);
        assert_eq!(cursor_x(&glyphs, 1, false), 2.0);
        assert_eq!(cursor_x(&glyphs, 3, false), 4.0);
        assert_eq!(cursor_x(&glyphs, 4, false), 6.0);
    }

    #[test]
    fn test_cursor_right_to_left() {
        let glyphs = glyphs(&[2, 1, 0]);
        assert_eq!(cursor_x(&glyphs, 0, true), 6.0);
        assert_eq!(cursor_x(&glyphs, 1, true), 4.0);
        assert_eq!(cursor_x(&glyphs, 2, true), 2.0);
        assert_eq!(cursor_x(&glyphs, 3, true), 0.0);
    }
}

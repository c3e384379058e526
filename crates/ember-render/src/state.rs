//! Draw state: topology, blending, texture handles

use ember_core::Transform2D;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive topology of a vertex stream.
///
/// The strip and fan variants exist so backends can be described fully, but
/// the slot-allocated particle path rejects them: overlapping windows have
/// no fixed-size, non-overlapping vertex groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    Triangles,
    Quads,
    LineStrip,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveTopology {
    /// Vertices per independent primitive, or None for the overlapping
    /// strip/fan topologies.
    pub fn vertices_per_group(self) -> Option<usize> {
        match self {
            Self::Points => Some(1),
            Self::Lines => Some(2),
            Self::Triangles => Some(3),
            Self::Quads => Some(4),
            Self::LineStrip | Self::TriangleStrip | Self::TriangleFan => None,
        }
    }
}

/// How a draw call blends into the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    Alpha,
    Additive,
    Multiply,
}

/// Opaque handle to a texture owned by the asset layer.
///
/// Ember never touches pixel data; the backend resolves the handle.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureId(pub u32);

impl TextureId {
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureId({})", self.0)
    }
}

/// Texel-space sub-rectangle of a texture
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl TextureRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// States accompanying one draw call
#[derive(Clone, Copy, Debug)]
pub struct RenderStates {
    pub blend_mode: BlendMode,
    pub texture: Option<TextureId>,
    pub transform: Transform2D,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::Alpha,
            texture: None,
            transform: Transform2D::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_sizes() {
        assert_eq!(PrimitiveTopology::Points.vertices_per_group(), Some(1));
        assert_eq!(PrimitiveTopology::Lines.vertices_per_group(), Some(2));
        assert_eq!(PrimitiveTopology::Triangles.vertices_per_group(), Some(3));
        assert_eq!(PrimitiveTopology::Quads.vertices_per_group(), Some(4));
        assert_eq!(PrimitiveTopology::LineStrip.vertices_per_group(), None);
        assert_eq!(PrimitiveTopology::TriangleStrip.vertices_per_group(), None);
        assert_eq!(PrimitiveTopology::TriangleFan.vertices_per_group(), None);
    }

    #[test]
    fn texture_id_round_trip() {
        let id = TextureId::from_raw(42);
        assert_eq!(id.raw(), 42);
    }
}

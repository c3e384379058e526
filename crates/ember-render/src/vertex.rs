//! Renderable vertex layout

use bytemuck::{Pod, Zeroable};
use ember_core::{Color, Vec2};

/// One renderable vertex: 2D position, RGBA8 color, texel-space UV.
/// 20 bytes with no padding, so a vertex buffer uploads as-is.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [u8; 4],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    /// Fully transparent vertex at the origin; the vacant-slot filler.
    pub const TRANSPARENT: Self = Self {
        position: [0.0; 2],
        color: [0; 4],
        tex_coords: [0.0; 2],
    };

    pub fn new(position: Vec2, color: Color, tex_coords: Vec2) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
            tex_coords: tex_coords.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        assert_eq!(std::mem::align_of::<Vertex>(), 4);
    }

    #[test]
    fn transparent_is_zeroed() {
        let bytes = bytemuck::bytes_of(&Vertex::TRANSPARENT);
        assert!(bytes.iter().all(|b| *b == 0));
    }
}

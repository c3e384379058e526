//! Spawn parameter bundle

use ember_core::{Color, Vec2};
use ember_render::TextureRect;

/// Everything one freshly spawned particle needs.
///
/// The emitter samples a new bundle from its config ranges for every spawn;
/// a `SpawnInfo` always holds concrete per-particle values.
#[derive(Clone, Debug)]
pub struct SpawnInfo {
    /// Spawn position relative to the emitter
    pub offset: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub color: Color,
    /// When set, RGB interpolates from `color` to this over the lifetime
    pub color_end: Option<Color>,
    /// Normalized starting alpha
    pub alpha: f32,
    /// Alpha change per second
    pub alpha_fade: f32,
    /// Expire when alpha reaches zero instead of waiting out the TTL
    pub alpha_expires: bool,
    /// Lifetime in seconds
    pub ttl: f32,

    // Quad-family fields; point particles ignore them.
    pub tex_rect: TextureRect,
    /// Pivot inside the texture rect, texels
    pub origin: Vec2,
    pub scale: Vec2,
    pub scale_velocity: Vec2,
    /// Starting rotation, degrees
    pub rotation: f32,
    /// Rotation change, degrees per second
    pub rotation_rate: f32,
}

impl Default for SpawnInfo {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            color: Color::WHITE,
            color_end: None,
            alpha: 1.0,
            alpha_fade: 0.0,
            alpha_expires: false,
            ttl: 1.0,
            tex_rect: TextureRect::default(),
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            scale_velocity: Vec2::ZERO,
            rotation: 0.0,
            rotation_rate: 0.0,
        }
    }
}

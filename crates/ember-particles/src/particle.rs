//! Particle state machines: point sprites and textured quads
//!
//! A particle rents one vertex group from its emitter's shared buffer and
//! repaints it every update. `update` returns true once the particle has
//! expired; the emitter then calls `release`, frees the slot, and shelves
//! the instance in the cache.

use crate::cache::ParticleTag;
use crate::curves::lerp_color;
use crate::spawn::SpawnInfo;
use ember_core::{trig, Color, Vec2};
use ember_render::{TextureRect, Vertex};

/// Per-particle behavior, object-safe so emitters can hold `Box<dyn
/// Particle>` and retired instances can be shelved by tag and reused.
///
/// Lifecycle: Uninitialized -> (`initialize`) Alive -> (`release`)
/// Released. A particle holds a valid group index only while Alive.
pub trait Particle {
    /// Stable tag keying the instance cache
    fn tag(&self) -> ParticleTag;

    /// Adopt spawn state and the reserved vertex group
    fn initialize(&mut self, origin: Vec2, info: &SpawnInfo, group: usize);

    /// One simulation step painting the vertex group. Returns true once the
    /// particle has expired: TTL ran out, or alpha hit zero on particles
    /// configured to expire by alpha.
    fn update(&mut self, dt: f32, group: &mut [Vertex]) -> bool;

    /// Blank the vertex group to fully transparent and drop the slot
    fn release(&mut self, group: &mut [Vertex]);

    /// The rented group index; None while not Alive
    fn group(&self) -> Option<usize>;
}

/// State shared by both particle families
#[derive(Clone, Debug)]
struct ParticleCore {
    ttl: f32,
    initial_ttl: f32,
    position: Vec2,
    velocity: Vec2,
    acceleration: Vec2,
    color: Color,
    color_end: Option<Color>,
    alpha: f32,
    alpha_fade: f32,
    alpha_expires: bool,
    group: Option<usize>,
}

impl ParticleCore {
    fn idle() -> Self {
        Self {
            ttl: 0.0,
            initial_ttl: 0.0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            color: Color::WHITE,
            color_end: None,
            alpha: 0.0,
            alpha_fade: 0.0,
            alpha_expires: false,
            group: None,
        }
    }

    fn begin(&mut self, origin: Vec2, info: &SpawnInfo, group: usize) {
        self.ttl = info.ttl;
        self.initial_ttl = info.ttl;
        self.position = origin + info.offset;
        self.velocity = info.velocity;
        self.acceleration = info.acceleration;
        self.color = info.color;
        self.color_end = info.color_end;
        self.alpha = info.alpha;
        self.alpha_fade = info.alpha_fade;
        self.alpha_expires = info.alpha_expires;
        self.group = Some(group);
    }

    /// Advance the shared state, reporting expiry.
    ///
    /// Expiry is evaluated before this step's integration: the TTL check
    /// uses the decremented value (a particle with ttl exactly 0 survives
    /// one more step), while the alpha check sees the value painted last
    /// frame, so a fresh particle always paints at least once.
    fn advance(&mut self, dt: f32) -> bool {
        self.ttl -= dt;
        if self.ttl < 0.0 {
            return true;
        }
        if self.alpha_expires && self.alpha <= 0.0 {
            return true;
        }
        self.velocity += self.acceleration * dt;
        self.position += self.velocity * dt;
        self.alpha += self.alpha_fade * dt;
        false
    }

    /// Current RGBA with the alpha byte clamped into range and the
    /// color-over-lifetime ramp applied when configured
    fn current_color(&self) -> Color {
        let base = match self.color_end {
            Some(end) => lerp_color(self.color, end, self.age_ratio()),
            None => self.color,
        };
        base.with_alpha(Color::alpha_byte(self.alpha))
    }

    /// Normalized age in [0, 1]
    fn age_ratio(&self) -> f32 {
        if self.initial_ttl <= 0.0 {
            1.0
        } else {
            (1.0 - self.ttl / self.initial_ttl).clamp(0.0, 1.0)
        }
    }

    fn end(&mut self) {
        self.group = None;
    }
}

/// Single-vertex particle: a colored point sprite
#[derive(Clone, Debug)]
pub struct PointParticle {
    core: ParticleCore,
}

impl PointParticle {
    pub fn new() -> Self {
        Self {
            core: ParticleCore::idle(),
        }
    }
}

impl Default for PointParticle {
    fn default() -> Self {
        Self::new()
    }
}

impl Particle for PointParticle {
    fn tag(&self) -> ParticleTag {
        ParticleTag::Point
    }

    fn initialize(&mut self, origin: Vec2, info: &SpawnInfo, group: usize) {
        self.core.begin(origin, info, group);
    }

    fn update(&mut self, dt: f32, group: &mut [Vertex]) -> bool {
        if self.core.advance(dt) {
            return true;
        }
        group[0] = Vertex {
            position: self.core.position.to_array(),
            color: self.core.current_color().to_array(),
            tex_coords: [0.0; 2],
        };
        false
    }

    fn release(&mut self, group: &mut [Vertex]) {
        for vertex in group.iter_mut() {
            *vertex = Vertex::TRANSPARENT;
        }
        self.core.end();
    }

    fn group(&self) -> Option<usize> {
        self.core.group
    }
}

/// Four-vertex textured quad with rotation and scale baked into the vertex
/// positions each frame
#[derive(Clone, Debug)]
pub struct QuadParticle {
    core: ParticleCore,
    tex_rect: TextureRect,
    origin: Vec2,
    scale: Vec2,
    scale_velocity: Vec2,
    rotation: f32,
    rotation_rate: f32,
}

impl QuadParticle {
    pub fn new() -> Self {
        Self {
            core: ParticleCore::idle(),
            tex_rect: TextureRect::default(),
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            scale_velocity: Vec2::ZERO,
            rotation: 0.0,
            rotation_rate: 0.0,
        }
    }

    fn paint(&self, group: &mut [Vertex]) {
        // Table lookup, not libm: this runs per particle per frame.
        let (sin, cos) = trig::sin_cos_deg(self.rotation);
        let rect = self.tex_rect;
        let width = rect.width * self.scale.x;
        let height = rect.height * self.scale.y;
        let pivot = Vec2::new(self.origin.x * self.scale.x, self.origin.y * self.scale.y);
        let color = self.core.current_color().to_array();

        let corners = [
            Vec2::new(-pivot.x, -pivot.y),
            Vec2::new(width - pivot.x, -pivot.y),
            Vec2::new(width - pivot.x, height - pivot.y),
            Vec2::new(-pivot.x, height - pivot.y),
        ];
        let uvs = [
            [rect.left, rect.top],
            [rect.left + rect.width, rect.top],
            [rect.left + rect.width, rect.top + rect.height],
            [rect.left, rect.top + rect.height],
        ];

        for (vertex, (corner, uv)) in group.iter_mut().zip(corners.iter().zip(uvs)) {
            let rotated = Vec2::new(
                corner.x * cos - corner.y * sin,
                corner.x * sin + corner.y * cos,
            );
            *vertex = Vertex {
                position: (self.core.position + rotated).to_array(),
                color,
                tex_coords: uv,
            };
        }
    }
}

impl Default for QuadParticle {
    fn default() -> Self {
        Self::new()
    }
}

impl Particle for QuadParticle {
    fn tag(&self) -> ParticleTag {
        ParticleTag::Quad
    }

    fn initialize(&mut self, origin: Vec2, info: &SpawnInfo, group: usize) {
        self.core.begin(origin, info, group);
        self.tex_rect = info.tex_rect;
        self.origin = info.origin;
        self.scale = info.scale;
        self.scale_velocity = info.scale_velocity;
        self.rotation = info.rotation;
        self.rotation_rate = info.rotation_rate;
    }

    fn update(&mut self, dt: f32, group: &mut [Vertex]) -> bool {
        if self.core.advance(dt) {
            return true;
        }
        self.rotation += self.rotation_rate * dt;
        self.scale += self.scale_velocity * dt;
        self.paint(group);
        false
    }

    fn release(&mut self, group: &mut [Vertex]) {
        for vertex in group.iter_mut() {
            *vertex = Vertex::TRANSPARENT;
        }
        self.core.end();
    }

    fn group(&self) -> Option<usize> {
        self.core.group
    }
}

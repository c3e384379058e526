//! Emitter configuration and the spawn/update state machine

use crate::cache::{ParticleCache, ParticleTag};
use crate::particle::{Particle, PointParticle, QuadParticle};
use crate::rand::ParticleRng;
use crate::spawn::SpawnInfo;
use crate::vertex_buffer::{BufferId, BufferTable, VertexBuffer};
use ember_core::{Color, Vec2};
use ember_render::{BlendMode, PrimitiveTopology, TextureId, TextureRect};

/// Which particle family an emitter spawns
#[derive(Clone, Debug)]
pub enum ParticleKind {
    /// Single-vertex point sprites, untextured
    Point,
    /// Textured quads cut from `rect` of `texture`
    Quad {
        texture: TextureId,
        rect: TextureRect,
        /// Pivot inside the rect, texels
        origin: Vec2,
        scale: Vec2,
        scale_velocity: Vec2,
        rotation_rate_min: f32,
        rotation_rate_max: f32,
    },
}

impl ParticleKind {
    pub fn topology(&self) -> PrimitiveTopology {
        match self {
            Self::Point => PrimitiveTopology::Points,
            Self::Quad { .. } => PrimitiveTopology::Quads,
        }
    }

    pub fn texture(&self) -> Option<TextureId> {
        match self {
            Self::Point => None,
            Self::Quad { texture, .. } => Some(*texture),
        }
    }

    pub(crate) fn tag(&self) -> ParticleTag {
        match self {
            Self::Point => ParticleTag::Point,
            Self::Quad { .. } => ParticleTag::Quad,
        }
    }

    pub(crate) fn new_particle(&self) -> Box<dyn Particle> {
        match self {
            Self::Point => Box::new(PointParticle::new()),
            Self::Quad { .. } => Box::new(QuadParticle::new()),
        }
    }
}

/// Tunable emitter parameters.
///
/// `depth` and the fields feeding the material key (particle kind, blend
/// mode) are fixed once the emitter is registered; everything else only
/// shapes future spawns.
#[derive(Clone, Debug)]
pub struct EmitterConfig {
    /// Draw-order bucket; lower depths draw first (behind)
    pub depth: i32,
    pub blend_mode: BlendMode,
    pub kind: ParticleKind,
    /// Seconds between spawn batches while triggered
    pub spawn_rate: f32,
    pub particles_per_spawn: u32,
    /// Keep spawning while triggered; a non-looping emitter fires one batch
    pub looping: bool,
    pub ttl_min: f32,
    pub ttl_max: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    /// Spawn velocity direction, degrees
    pub direction_deg: f32,
    /// Full spread angle around `direction_deg`, degrees
    pub spread_deg: f32,
    pub acceleration: Vec2,
    pub color: Color,
    pub color_end: Option<Color>,
    pub alpha: f32,
    /// Alpha change per second
    pub alpha_fade: f32,
    /// Expire particles when alpha reaches zero instead of on TTL
    pub alpha_expires: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            depth: 0,
            blend_mode: BlendMode::Alpha,
            kind: ParticleKind::Point,
            spawn_rate: 0.1,
            particles_per_spawn: 1,
            looping: true,
            ttl_min: 1.0,
            ttl_max: 2.0,
            speed_min: 20.0,
            speed_max: 60.0,
            direction_deg: -90.0,
            spread_deg: 15.0,
            acceleration: Vec2::ZERO,
            color: Color::WHITE,
            color_end: None,
            alpha: 1.0,
            alpha_fade: 0.0,
            alpha_expires: false,
        }
    }
}

impl EmitterConfig {
    /// Parse an EmitterConfig from a TOML component table.
    /// Unknown fields are ignored; malformed values fall back to defaults.
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();

        if let Some(v) = table.get("depth") {
            config.depth = v.as_integer().unwrap_or(0) as i32;
        }
        if let Some(v) = table.get("blend_mode") {
            config.blend_mode = match v.as_str().unwrap_or("alpha") {
                "additive" => BlendMode::Additive,
                "multiply" => BlendMode::Multiply,
                _ => BlendMode::Alpha,
            };
        }
        if let Some(v) = table.get("spawn_rate") {
            config.spawn_rate = toml_f32(v, config.spawn_rate);
        }
        if let Some(v) = table.get("particles_per_spawn") {
            config.particles_per_spawn = v.as_integer().unwrap_or(1).max(0) as u32;
        }
        if let Some(v) = table.get("looping") {
            config.looping = v.as_bool().unwrap_or(true);
        }
        if let Some(v) = table.get("ttl_min") {
            config.ttl_min = toml_f32(v, config.ttl_min);
        }
        if let Some(v) = table.get("ttl_max") {
            config.ttl_max = toml_f32(v, config.ttl_max);
        }
        if let Some(v) = table.get("speed_min") {
            config.speed_min = toml_f32(v, config.speed_min);
        }
        if let Some(v) = table.get("speed_max") {
            config.speed_max = toml_f32(v, config.speed_max);
        }
        if let Some(v) = table.get("direction") {
            config.direction_deg = toml_f32(v, config.direction_deg);
        }
        if let Some(v) = table.get("spread") {
            config.spread_deg = toml_f32(v, config.spread_deg);
        }
        if let Some(v) = table.get("acceleration") {
            config.acceleration = toml_vec2(v, config.acceleration);
        }
        if let Some(v) = table.get("color") {
            config.color = toml_color(v, config.color);
        }
        if let Some(v) = table.get("color_end") {
            config.color_end = Some(toml_color(v, Color::WHITE));
        }
        if let Some(v) = table.get("alpha") {
            config.alpha = toml_f32(v, config.alpha);
        }
        if let Some(v) = table.get("alpha_fade") {
            config.alpha_fade = toml_f32(v, config.alpha_fade);
        }
        if let Some(v) = table.get("alpha_expires") {
            config.alpha_expires = v.as_bool().unwrap_or(false);
        }

        // Particle kind
        let kind_str = table.get("kind").and_then(|v| v.as_str()).unwrap_or("point");
        if kind_str == "quad" {
            let texture = table
                .get("texture")
                .and_then(|v| v.as_integer())
                .unwrap_or(0) as u32;
            let rect = table
                .get("rect")
                .map(|v| toml_rect(v, TextureRect::default()))
                .unwrap_or_default();
            let origin = table
                .get("origin")
                .map(|v| toml_vec2(v, Vec2::ZERO))
                .unwrap_or(Vec2::ZERO);
            let scale = table
                .get("scale")
                .map(|v| toml_vec2(v, Vec2::ONE))
                .unwrap_or(Vec2::ONE);
            let scale_velocity = table
                .get("scale_velocity")
                .map(|v| toml_vec2(v, Vec2::ZERO))
                .unwrap_or(Vec2::ZERO);
            let rotation_rate_min = table
                .get("rotation_rate_min")
                .map(|v| toml_f32(v, 0.0))
                .unwrap_or(0.0);
            let rotation_rate_max = table
                .get("rotation_rate_max")
                .map(|v| toml_f32(v, 0.0))
                .unwrap_or(0.0);
            config.kind = ParticleKind::Quad {
                texture: TextureId::from_raw(texture),
                rect,
                origin,
                scale,
                scale_velocity,
                rotation_rate_min,
                rotation_rate_max,
            };
        }

        config
    }
}

/// A particle source.
///
/// Owns its live particles and a slot assignment into one shared vertex
/// buffer; the host picks the buffer from the emitter's
/// (depth, topology, blend, texture) key at registration.
pub struct Emitter {
    config: EmitterConfig,
    position: Vec2,
    rotation: f32,
    triggered: bool,
    spawn_timer: f32,
    particles: Vec<Box<dyn Particle>>,
    buffer: Option<BufferId>,
}

impl Emitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self {
            config,
            position: Vec2::ZERO,
            rotation: 0.0,
            triggered: false,
            spawn_timer: 0.0,
            particles: Vec::new(),
            buffer: None,
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn depth(&self) -> i32 {
        self.config.depth
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    /// The shared buffer this emitter paints into; None while unregistered
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    pub fn is_attached(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    /// Arm or disarm spawning. Arming resets the spawn timer so the first
    /// batch fires on the next update tick; for the no-delay one-shot path
    /// on a registered emitter, trigger through the host instead.
    pub fn set_triggered(&mut self, triggered: bool) {
        if triggered && !self.triggered {
            self.spawn_timer = 0.0;
        }
        self.triggered = triggered;
    }

    pub fn trigger(&mut self) {
        self.set_triggered(true);
    }

    pub(crate) fn attach(&mut self, buffer: BufferId) {
        self.buffer = Some(buffer);
    }

    pub(crate) fn detach(&mut self) {
        self.buffer = None;
    }

    /// One simulation step, driven by the host each frame.
    ///
    /// Panics when the emitter is not registered with a host: spawning
    /// without a buffer has nowhere to reserve slots from, and continuing
    /// silently would corrupt the slot bookkeeping the moment the emitter
    /// is registered later.
    pub fn update_internal(
        &mut self,
        dt: f32,
        buffers: &mut BufferTable,
        cache: &mut ParticleCache,
        rng: &mut ParticleRng,
    ) {
        let buffer_id = self
            .buffer
            .expect("emitter updated while not registered with a ParticleHost");
        // Acquire the buffer view once for the whole pass; reserve() may
        // grow the arena, so nothing outside this frame holds a view.
        let buffer = buffers
            .get_mut(buffer_id)
            .expect("emitter's vertex buffer missing from the host table");

        if self.triggered {
            self.spawn_timer -= dt;
            if self.spawn_timer <= 0.0 {
                self.spawn_timer += self.config.spawn_rate;
                if self.spawn_timer < 0.0 {
                    // Never bank more than one batch of debt.
                    self.spawn_timer = 0.0;
                }
                self.spawn_particles(buffer, cache, rng);
                if !self.config.looping {
                    self.triggered = false;
                }
            }
        }

        // Reverse iteration keeps swap_remove sound: the element swapped
        // into place was already visited this frame. Particle order carries
        // no meaning, only slot occupancy does.
        for i in (0..self.particles.len()).rev() {
            let particle = &mut self.particles[i];
            let group = particle
                .group()
                .expect("live particle without a vertex group");
            let expired = particle.update(dt, buffer.group_mut(group));
            if expired {
                let mut particle = self.particles.swap_remove(i);
                particle.release(buffer.group_mut(group));
                buffer.free(group);
                cache.store(particle);
            }
        }
    }

    /// Spawn one batch: instances come from the cache first and are only
    /// heap-allocated on a miss, with identical initialization either way.
    pub(crate) fn spawn_particles(
        &mut self,
        buffer: &mut VertexBuffer,
        cache: &mut ParticleCache,
        rng: &mut ParticleRng,
    ) {
        let tag = self.config.kind.tag();
        for _ in 0..self.config.particles_per_spawn {
            let mut particle = cache
                .take(tag)
                .unwrap_or_else(|| self.config.kind.new_particle());
            let group = buffer.reserve();
            let info = self.sample_spawn_info(rng);
            particle.initialize(self.position, &info, group);
            self.particles.push(particle);
        }
    }

    fn sample_spawn_info(&self, rng: &mut ParticleRng) -> SpawnInfo {
        let config = &self.config;
        let angle = rng.angle_deg(config.direction_deg + self.rotation, config.spread_deg);
        let speed = rng.range(config.speed_min, config.speed_max);
        let mut info = SpawnInfo {
            velocity: Vec2::from_angle_deg(angle) * speed,
            acceleration: config.acceleration,
            color: config.color,
            color_end: config.color_end,
            alpha: config.alpha,
            alpha_fade: config.alpha_fade,
            alpha_expires: config.alpha_expires,
            ttl: rng.range(config.ttl_min, config.ttl_max),
            ..SpawnInfo::default()
        };
        if let ParticleKind::Quad {
            rect,
            origin,
            scale,
            scale_velocity,
            rotation_rate_min,
            rotation_rate_max,
            ..
        } = &config.kind
        {
            info.tex_rect = *rect;
            info.origin = *origin;
            info.scale = *scale;
            info.scale_velocity = *scale_velocity;
            info.rotation = self.rotation;
            info.rotation_rate = rng.range(*rotation_rate_min, *rotation_rate_max);
        }
        info
    }

    /// Release every live particle: vertices blanked, slots freed,
    /// instances shelved. The host calls this before the buffer can go away.
    pub(crate) fn cleanup(&mut self, buffer: &mut VertexBuffer, cache: &mut ParticleCache) {
        for mut particle in self.particles.drain(..) {
            if let Some(group) = particle.group() {
                particle.release(buffer.group_mut(group));
                buffer.free(group);
            }
            cache.store(particle);
        }
    }
}

// -- TOML helpers (handle integer/float coercion) --

fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

fn toml_vec2(v: &toml::Value, default: Vec2) -> Vec2 {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 2 {
            return Vec2::new(toml_f32(&arr[0], default.x), toml_f32(&arr[1], default.y));
        }
    }
    default
}

fn toml_color(v: &toml::Value, default: Color) -> Color {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 4 {
            let channel = |value: &toml::Value, fallback: u8| {
                value
                    .as_integer()
                    .map(|i| i.clamp(0, 255) as u8)
                    .unwrap_or(fallback)
            };
            return Color::new(
                channel(&arr[0], default.r),
                channel(&arr[1], default.g),
                channel(&arr[2], default.b),
                channel(&arr[3], default.a),
            );
        }
    }
    default
}

fn toml_rect(v: &toml::Value, default: TextureRect) -> TextureRect {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 4 {
            return TextureRect::new(
                toml_f32(&arr[0], default.left),
                toml_f32(&arr[1], default.top),
                toml_f32(&arr[2], default.width),
                toml_f32(&arr[3], default.height),
            );
        }
    }
    default
}

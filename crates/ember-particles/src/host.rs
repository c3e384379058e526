//! The scene-graph bridge: owns emitters, buffers, cache, and draw order
//!
//! Emitters that agree on (depth, topology, blend mode, texture) paint into
//! one shared `VertexBuffer`; each depth layer draws its buffers with one
//! call apiece, layers in ascending depth order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::cache::ParticleCache;
use crate::composition::EmitterComposition;
use crate::emitter::Emitter;
use crate::rand::ParticleRng;
use crate::vertex_buffer::{BufferId, BufferTable, VertexBuffer};
use ember_core::{EmberError, Result, Vec2};
use ember_render::{BlendMode, DrawTarget, PrimitiveTopology, RenderStates, SceneNode, TextureId};

/// Handle to an emitter registered with a host
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct EmitterId(pub u64);

impl fmt::Debug for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmitterId({})", self.0)
    }
}

/// Handle to a composition registered with a host
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CompositionId(pub u64);

impl fmt::Debug for CompositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositionId({})", self.0)
    }
}

/// Batching key: emitters agreeing on all four fields share one buffer
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
struct BufferKey {
    depth: i32,
    topology: PrimitiveTopology,
    blend_mode: BlendMode,
    texture: Option<TextureId>,
}

struct RegisteredEmitter {
    emitter: Emitter,
    composition: Option<CompositionId>,
}

struct CompositionState {
    /// Child ids with their composition-local offsets
    children: Vec<(EmitterId, Vec2)>,
    position: Vec2,
    rotation: f32,
}

/// Owns every emitter and every shared vertex buffer, drives the per-frame
/// update, and issues one draw call per buffer in ascending depth order.
///
/// Within one depth layer there is at most one buffer per distinct
/// (topology, blend mode, texture) triple.
pub struct ParticleHost {
    emitters: HashMap<EmitterId, RegisteredEmitter>,
    compositions: HashMap<CompositionId, CompositionState>,
    buffers: BufferTable,
    buffer_keys: HashMap<BufferKey, BufferId>,
    /// Depth -> buffers at that depth, in registration order.
    /// BTreeMap iteration gives the ascending draw order for free.
    depth_layers: BTreeMap<i32, Vec<BufferId>>,
    cache: ParticleCache,
    rng: ParticleRng,
    next_id: u64,
}

impl ParticleHost {
    pub fn new() -> Self {
        Self::with_seed(0xDEAD_BEEF)
    }

    /// A host with a chosen spawn-randomization seed, for deterministic runs
    pub fn with_seed(seed: u32) -> Self {
        Self {
            emitters: HashMap::new(),
            compositions: HashMap::new(),
            buffers: BufferTable::new(),
            buffer_keys: HashMap::new(),
            depth_layers: BTreeMap::new(),
            cache: ParticleCache::new(),
            rng: ParticleRng::new(seed),
            next_id: 1,
        }
    }

    fn key_for(emitter: &Emitter) -> BufferKey {
        let config = emitter.config();
        BufferKey {
            depth: config.depth,
            topology: config.kind.topology(),
            blend_mode: config.blend_mode,
            texture: config.kind.texture(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register an emitter: finds or lazily creates the shared buffer for
    /// its (depth, topology, blend, texture) key and attaches the emitter
    /// to it.
    pub fn add_emitter(&mut self, emitter: Emitter) -> Result<EmitterId> {
        self.register(emitter, None)
    }

    fn register(
        &mut self,
        mut emitter: Emitter,
        composition: Option<CompositionId>,
    ) -> Result<EmitterId> {
        let key = Self::key_for(&emitter);
        let buffer_id = match self.buffer_keys.get(&key) {
            Some(&id) => id,
            None => {
                let buffer = VertexBuffer::new(key.topology, key.blend_mode, key.texture)?;
                let id = self.buffers.insert(buffer);
                self.depth_layers.entry(key.depth).or_default().push(id);
                println!(
                    "[particles] new vertex buffer at depth {} ({:?}, {:?})",
                    key.depth, key.topology, key.blend_mode
                );
                self.buffer_keys.insert(key, id);
                id
            }
        };
        self.buffers
            .get_mut(buffer_id)
            .expect("buffer table out of sync with key map")
            .add_emitter_ref();
        emitter.attach(buffer_id);

        let id = EmitterId(self.allocate_id());
        self.emitters.insert(
            id,
            RegisteredEmitter {
                emitter,
                composition,
            },
        );
        Ok(id)
    }

    /// Register a composition: each child is registered individually (the
    /// composition itself holds no buffer slot and no particles).
    pub fn add_composition(&mut self, composition: EmitterComposition) -> Result<CompositionId> {
        let id = CompositionId(self.allocate_id());
        let (children, position, rotation) = composition.into_parts();
        let mut registered = Vec::with_capacity(children.len());
        for child in children {
            let emitter_id = self.register(child.emitter, Some(id))?;
            registered.push((emitter_id, child.offset));
        }
        self.compositions.insert(
            id,
            CompositionState {
                children: registered,
                position,
                rotation,
            },
        );
        Ok(id)
    }

    /// Unregister an emitter.
    ///
    /// Its live particles are released (slots freed, vertices blanked,
    /// instances shelved) BEFORE the buffer reference count drops; a buffer
    /// left with no emitters is destroyed and leaves its depth layer.
    pub fn remove(&mut self, id: EmitterId) -> Result<()> {
        let mut slot = self
            .emitters
            .remove(&id)
            .ok_or(EmberError::EmitterNotFound(id.0))?;
        if let Some(composition_id) = slot.composition {
            if let Some(state) = self.compositions.get_mut(&composition_id) {
                state.children.retain(|(child, _)| *child != id);
            }
        }
        self.release_emitter(&mut slot.emitter);
        Ok(())
    }

    /// Unregister a composition and every one of its children
    pub fn remove_composition(&mut self, id: CompositionId) -> Result<()> {
        let state = self
            .compositions
            .remove(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?;
        for (emitter_id, _) in state.children {
            let mut slot = self
                .emitters
                .remove(&emitter_id)
                .expect("composition child missing from emitter table");
            self.release_emitter(&mut slot.emitter);
        }
        Ok(())
    }

    /// Cleanup-then-unref teardown shared by every removal path. Releasing
    /// slots after the buffer is gone would dangle, so the order is fixed.
    fn release_emitter(&mut self, emitter: &mut Emitter) {
        let Some(buffer_id) = emitter.buffer() else {
            return;
        };
        let buffer = self
            .buffers
            .get_mut(buffer_id)
            .expect("buffer table out of sync with emitter");
        emitter.cleanup(buffer, &mut self.cache);
        let remaining = buffer.release_emitter_ref();
        emitter.detach();

        if remaining == 0 {
            let key = Self::key_for(emitter);
            self.buffers.remove(buffer_id);
            self.buffer_keys.remove(&key);
            if let Some(layer) = self.depth_layers.get_mut(&key.depth) {
                layer.retain(|id| *id != buffer_id);
                if layer.is_empty() {
                    self.depth_layers.remove(&key.depth);
                }
            }
            println!("[particles] destroyed vertex buffer at depth {}", key.depth);
        }
    }

    /// Advance every registered emitter by `dt` seconds. Composition
    /// membership is irrelevant here: children are driven like any other
    /// emitter.
    pub fn update(&mut self, dt: f32) {
        for slot in self.emitters.values_mut() {
            slot.emitter
                .update_internal(dt, &mut self.buffers, &mut self.cache, &mut self.rng);
        }
    }

    /// Draw every buffer: depth layers ascending (lower depth is behind),
    /// buffers within a layer in registration order, one call each
    pub fn draw(&self, target: &mut dyn DrawTarget, states: &RenderStates) {
        for layer in self.depth_layers.values() {
            for buffer_id in layer {
                if let Some(buffer) = self.buffers.get(*buffer_id) {
                    buffer.draw(target, states);
                }
            }
        }
    }

    // -- Gameplay-facing emitter control --

    /// Fire an emitter. A non-looping emitter spawns its batch immediately,
    /// with no frame delay; a looping one arms its timer so spawning starts
    /// on the next update tick.
    pub fn trigger(&mut self, id: EmitterId) -> Result<()> {
        let slot = self
            .emitters
            .get_mut(&id)
            .ok_or(EmberError::EmitterNotFound(id.0))?;
        if slot.emitter.config().looping {
            slot.emitter.set_triggered(true);
        } else {
            let buffer_id = slot
                .emitter
                .buffer()
                .expect("registered emitter without a buffer");
            let buffer = self
                .buffers
                .get_mut(buffer_id)
                .expect("buffer table out of sync with emitter");
            slot.emitter
                .spawn_particles(buffer, &mut self.cache, &mut self.rng);
        }
        Ok(())
    }

    pub fn set_triggered(&mut self, id: EmitterId, triggered: bool) -> Result<()> {
        self.emitter_mut(id)?.set_triggered(triggered);
        Ok(())
    }

    pub fn triggered(&self, id: EmitterId) -> Result<bool> {
        Ok(self.emitter(id)?.triggered())
    }

    pub fn emitter(&self, id: EmitterId) -> Result<&Emitter> {
        self.emitters
            .get(&id)
            .map(|slot| &slot.emitter)
            .ok_or(EmberError::EmitterNotFound(id.0))
    }

    pub fn emitter_mut(&mut self, id: EmitterId) -> Result<&mut Emitter> {
        self.emitters
            .get_mut(&id)
            .map(|slot| &mut slot.emitter)
            .ok_or(EmberError::EmitterNotFound(id.0))
    }

    // -- Gameplay-facing composition control --

    /// Child ids of a composition, in insertion order
    pub fn composition_children(&self, id: CompositionId) -> Result<Vec<EmitterId>> {
        let state = self
            .compositions
            .get(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?;
        Ok(state.children.iter().map(|(child, _)| *child).collect())
    }

    pub fn composition_position(&self, id: CompositionId) -> Result<Vec2> {
        Ok(self
            .compositions
            .get(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?
            .position)
    }

    /// Reassigns every child's absolute position from its local offset
    pub fn set_composition_position(&mut self, id: CompositionId, position: Vec2) -> Result<()> {
        let state = self
            .compositions
            .get_mut(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?;
        state.position = position;
        for (child, offset) in &state.children {
            if let Some(slot) = self.emitters.get_mut(child) {
                slot.emitter.set_position(position + *offset);
            }
        }
        Ok(())
    }

    pub fn composition_rotation(&self, id: CompositionId) -> Result<f32> {
        Ok(self
            .compositions
            .get(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?
            .rotation)
    }

    pub fn set_composition_rotation(&mut self, id: CompositionId, degrees: f32) -> Result<()> {
        let state = self
            .compositions
            .get_mut(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?;
        state.rotation = degrees;
        for (child, _) in &state.children {
            if let Some(slot) = self.emitters.get_mut(child) {
                slot.emitter.set_rotation(degrees);
            }
        }
        Ok(())
    }

    /// AND of all children's triggered state
    pub fn composition_triggered(&self, id: CompositionId) -> Result<bool> {
        let state = self
            .compositions
            .get(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?;
        Ok(state
            .children
            .iter()
            .all(|(child, _)| self.emitters[child].emitter.triggered()))
    }

    pub fn set_composition_triggered(&mut self, id: CompositionId, triggered: bool) -> Result<()> {
        let children = self.composition_children(id)?;
        for child in children {
            self.set_triggered(child, triggered)?;
        }
        Ok(())
    }

    /// Fire every child; non-looping children spawn immediately
    pub fn trigger_composition(&mut self, id: CompositionId) -> Result<()> {
        let children = self.composition_children(id)?;
        for child in children {
            self.trigger(child)?;
        }
        Ok(())
    }

    /// Add a child to a registered composition. The child adopts the
    /// composition transform and is registered immediately.
    pub fn composition_add(
        &mut self,
        id: CompositionId,
        mut emitter: Emitter,
        offset: Vec2,
    ) -> Result<EmitterId> {
        let state = self
            .compositions
            .get(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?;
        emitter.set_position(state.position + offset);
        emitter.set_rotation(state.rotation);

        let emitter_id = self.register(emitter, Some(id))?;
        self.compositions
            .get_mut(&id)
            .expect("composition vanished during child registration")
            .children
            .push((emitter_id, offset));
        Ok(emitter_id)
    }

    /// Remove a child from a composition and unregister it. It is an error
    /// if the emitter is not one of the composition's children.
    pub fn composition_remove(&mut self, id: CompositionId, emitter: EmitterId) -> Result<()> {
        let state = self
            .compositions
            .get_mut(&id)
            .ok_or(EmberError::CompositionNotFound(id.0))?;
        let index = state
            .children
            .iter()
            .position(|(child, _)| *child == emitter)
            .ok_or(EmberError::NotACompositionMember {
                emitter: emitter.0,
                composition: id.0,
            })?;
        state.children.remove(index);

        let mut slot = self
            .emitters
            .remove(&emitter)
            .expect("composition child missing from emitter table");
        self.release_emitter(&mut slot.emitter);
        Ok(())
    }

    // -- Introspection --

    /// Registered emitters, composition children included
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Buffers currently active in one depth layer
    pub fn buffers_at_depth(&self, depth: i32) -> usize {
        self.depth_layers.get(&depth).map_or(0, |layer| layer.len())
    }

    /// Emitters sharing the given buffer
    pub fn buffer_emitter_refs(&self, id: BufferId) -> Option<usize> {
        self.buffers.get(id).map(|buffer| buffer.emitter_refs())
    }

    /// Live particles across all emitters
    pub fn total_live(&self) -> usize {
        self.emitters
            .values()
            .map(|slot| slot.emitter.live_count())
            .sum()
    }

    pub fn cache(&self) -> &ParticleCache {
        &self.cache
    }
}

impl Default for ParticleHost {
    fn default() -> Self {
        Self::new()
    }
}

/// The host's own transform and color never affect emitted particles; only
/// each emitter's position and rotation do. The `SceneNode` transform
/// accessors therefore keep their no-op defaults.
impl SceneNode for ParticleHost {
    fn update(&mut self, dt: f32) {
        ParticleHost::update(self, dt);
    }

    fn draw(&self, target: &mut dyn DrawTarget, states: &RenderStates) {
        ParticleHost::draw(self, target, states);
    }
}

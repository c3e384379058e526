//! Growable vertex arena with free-list slot allocation
//!
//! Particles never own vertices. Each one rents a fixed-size group (1-4
//! vertices depending on topology) and repaints it by index every frame.
//! Freed groups go onto a stack and are handed out again before the buffer
//! grows, so steady-state churn touches no allocator at all.

use std::collections::HashMap;
use std::fmt;

use ember_core::{EmberError, Result};
use ember_render::{BlendMode, DrawTarget, PrimitiveTopology, RenderStates, TextureId, Vertex};

/// Groups added per growth step. Batch growth amortizes the copy: one
/// reallocation banks `GROWTH_GROUPS - 1` future reservations.
pub const GROWTH_GROUPS: usize = 16;

/// A contiguous vertex arena shared by every emitter with the same
/// (depth, topology, blend mode, texture) key.
///
/// Invariants: the vertex length is always a multiple of the group size,
/// and a group index is never both free and in use. Freeing a group twice
/// violates the second invariant and corrupts the allocator; callers own
/// that contract.
pub struct VertexBuffer {
    vertices: Vec<Vertex>,
    free: Vec<usize>,
    group_size: usize,
    topology: PrimitiveTopology,
    blend_mode: BlendMode,
    texture: Option<TextureId>,
    emitter_refs: usize,
}

impl VertexBuffer {
    /// Fails for strip/fan topologies: slot allocation needs fixed-size,
    /// non-overlapping vertex groups.
    pub fn new(
        topology: PrimitiveTopology,
        blend_mode: BlendMode,
        texture: Option<TextureId>,
    ) -> Result<Self> {
        let group_size = topology
            .vertices_per_group()
            .ok_or_else(|| EmberError::UnsupportedTopology(format!("{topology:?}")))?;
        Ok(Self {
            vertices: Vec::new(),
            free: Vec::new(),
            group_size,
            topology,
            blend_mode,
            texture,
            emitter_refs: 0,
        })
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Current vertex count (reserved and vacant groups alike)
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.vertices.len() / self.group_size
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Emitters currently sharing this buffer
    pub fn emitter_refs(&self) -> usize {
        self.emitter_refs
    }

    pub(crate) fn add_emitter_ref(&mut self) {
        self.emitter_refs += 1;
    }

    /// Drops one emitter reference, returning the remaining count
    pub(crate) fn release_emitter_ref(&mut self) -> usize {
        debug_assert!(self.emitter_refs > 0);
        self.emitter_refs -= 1;
        self.emitter_refs
    }

    /// Reserve one vertex group and return its index.
    ///
    /// Pops the free stack when possible; otherwise grows the arena by
    /// `GROWTH_GROUPS` groups, zero-initializes the new vertices to fully
    /// transparent, banks all but the first new group on the free stack,
    /// and returns the first. Existing vertex data survives the growth, but
    /// any slice previously taken via `group_mut` must be re-acquired.
    pub fn reserve(&mut self) -> usize {
        if let Some(group) = self.free.pop() {
            return group;
        }
        let first = self.group_count();
        let new_len = self.vertices.len() + self.group_size * GROWTH_GROUPS;
        self.vertices.resize(new_len, Vertex::TRANSPARENT);
        // Descending push order so the stack hands indices back ascending.
        self.free.extend((first + 1..first + GROWTH_GROUPS).rev());
        first
    }

    /// Return a group to the free stack
    pub fn free(&mut self, group: usize) {
        debug_assert!(group < self.group_count());
        self.free.push(group);
    }

    /// The vertices of one group, for in-place painting
    pub fn group_mut(&mut self, group: usize) -> &mut [Vertex] {
        let start = group * self.group_size;
        &mut self.vertices[start..start + self.group_size]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Exactly one draw call over the buffer's full current length, using
    /// the stored topology/blend/texture with the caller's transform
    /// composed in.
    pub fn draw(&self, target: &mut dyn DrawTarget, states: &RenderStates) {
        let states = RenderStates {
            blend_mode: self.blend_mode,
            texture: self.texture,
            transform: states.transform,
        };
        target.draw(&self.vertices, self.topology, &states);
    }
}

/// Handle to a buffer in a host's table
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BufferId(pub u64);

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

/// Host-owned table of shared vertex buffers.
///
/// Emitters keep a `BufferId`, never a reference: growth reallocates the
/// vertex storage, so every view is re-acquired from the table at the point
/// of use.
#[derive(Default)]
pub struct BufferTable {
    buffers: HashMap<BufferId, VertexBuffer>,
    next: u64,
}

impl BufferTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, buffer: VertexBuffer) -> BufferId {
        let id = BufferId(self.next);
        self.next += 1;
        self.buffers.insert(id, buffer);
        id
    }

    pub fn get(&self, id: BufferId) -> Option<&VertexBuffer> {
        self.buffers.get(&id)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut VertexBuffer> {
        self.buffers.get_mut(&id)
    }

    pub fn remove(&mut self, id: BufferId) -> Option<VertexBuffer> {
        self.buffers.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_render::DrawRecorder;

    fn point_buffer() -> VertexBuffer {
        VertexBuffer::new(PrimitiveTopology::Points, BlendMode::Alpha, None).unwrap()
    }

    #[test]
    fn rejects_strip_and_fan_topologies() {
        for topology in [
            PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleStrip,
            PrimitiveTopology::TriangleFan,
        ] {
            let result = VertexBuffer::new(topology, BlendMode::Alpha, None);
            assert!(matches!(result, Err(EmberError::UnsupportedTopology(_))));
        }
    }

    #[test]
    fn reserve_returns_unique_groups() {
        let mut buffer = point_buffer();
        let mut taken = Vec::new();
        // More than one growth step's worth.
        for _ in 0..(GROWTH_GROUPS * 2 + 3) {
            let group = buffer.reserve();
            assert!(!taken.contains(&group), "group {group} handed out twice");
            taken.push(group);
        }
        assert_eq!(buffer.len() % buffer.group_size(), 0);
    }

    #[test]
    fn free_then_reserve_round_trips() {
        let mut buffer = point_buffer();
        let reserved: Vec<usize> = (0..GROWTH_GROUPS).map(|_| buffer.reserve()).collect();
        assert_eq!(buffer.free_count(), 0);

        for group in &reserved {
            buffer.free(*group);
        }
        assert_eq!(buffer.free_count(), GROWTH_GROUPS);

        // The next reserve must come from the stack, not growth.
        let len_before = buffer.len();
        buffer.reserve();
        assert_eq!(buffer.len(), len_before);
        assert_eq!(buffer.free_count(), GROWTH_GROUPS - 1);
    }

    #[test]
    fn growth_preserves_written_data() {
        let mut buffer =
            VertexBuffer::new(PrimitiveTopology::Quads, BlendMode::Additive, None).unwrap();
        let group = buffer.reserve();
        let marker = Vertex {
            position: [12.5, -3.0],
            color: [9, 8, 7, 6],
            tex_coords: [0.25, 0.75],
        };
        buffer.group_mut(group)[2] = marker;

        // Exhaust the banked groups to force a reallocation.
        for _ in 0..GROWTH_GROUPS {
            buffer.reserve();
        }
        assert!(buffer.group_count() > GROWTH_GROUPS);
        assert_eq!(buffer.group_mut(group)[2], marker);
    }

    #[test]
    fn new_groups_start_transparent() {
        let mut buffer = point_buffer();
        buffer.reserve();
        assert!(buffer.vertices().iter().all(|v| *v == Vertex::TRANSPARENT));
    }

    #[test]
    fn draw_uses_stored_material() {
        let mut buffer = VertexBuffer::new(
            PrimitiveTopology::Points,
            BlendMode::Additive,
            Some(TextureId(3)),
        )
        .unwrap();
        buffer.reserve();

        let mut recorder = DrawRecorder::new();
        buffer.draw(&mut recorder, &RenderStates::default());

        let commands = recorder.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].topology, PrimitiveTopology::Points);
        assert_eq!(commands[0].states.blend_mode, BlendMode::Additive);
        assert_eq!(commands[0].states.texture, Some(TextureId(3)));
        assert_eq!(commands[0].vertices.len(), buffer.len());
    }

    #[test]
    fn buffer_table_round_trip() {
        let mut table = BufferTable::new();
        let id = table.insert(point_buffer());
        assert!(table.get(id).is_some());
        assert_eq!(table.len(), 1);
        assert!(table.remove(id).is_some());
        assert!(table.is_empty());
    }
}

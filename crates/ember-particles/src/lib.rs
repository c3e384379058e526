//! Ember Particles - pooled, depth-batched particle simulation
//!
//! The pipeline per frame:
//! - `ParticleHost::update` drives every registered emitter
//! - emitters spawn into free-listed vertex-group slots and repaint live
//!   particles in place; expired particles are swap-removed and their
//!   instances shelved for reuse
//! - `ParticleHost::draw` issues one draw call per shared vertex buffer,
//!   depth layers in ascending order
//!
//! Emitters that agree on (depth, topology, blend mode, texture) share one
//! buffer, so a depth layer costs as many draw calls as it has distinct
//! materials, not as many as it has emitters.

pub mod cache;
pub mod composition;
pub mod curves;
pub mod emitter;
pub mod host;
pub mod particle;
pub mod rand;
pub mod spawn;
pub mod vertex_buffer;

pub use cache::{ParticleCache, ParticleTag};
pub use composition::EmitterComposition;
pub use emitter::{Emitter, EmitterConfig, ParticleKind};
pub use host::{CompositionId, EmitterId, ParticleHost};
pub use particle::{Particle, PointParticle, QuadParticle};
pub use spawn::SpawnInfo;
pub use vertex_buffer::{BufferId, BufferTable, VertexBuffer, GROWTH_GROUPS};

//! Ember Render - the draw contract between Ember and its rendering backend
//!
//! Ember does not rasterize anything itself; it hands vertex streams to an
//! immediate-mode 2D backend through the `DrawTarget` trait. This crate
//! defines that seam:
//! - `Vertex` - the uploadable vertex layout
//! - `PrimitiveTopology` / `BlendMode` / `TextureId` - draw state
//! - `DrawTarget` - the backend trait, plus `DrawRecorder` for headless runs
//! - `SceneNode` - the scene-graph contract drawable nodes implement

mod node;
mod state;
mod target;
mod vertex;

pub use node::SceneNode;
pub use state::{BlendMode, PrimitiveTopology, RenderStates, TextureId, TextureRect};
pub use target::{DrawCommand, DrawRecorder, DrawTarget};
pub use vertex::Vertex;

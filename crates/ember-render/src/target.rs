//! Draw sink and recording target

use crate::state::{PrimitiveTopology, RenderStates};
use crate::vertex::Vertex;

/// Immediate-mode draw sink provided by the rendering backend.
///
/// One call draws one vertex stream with one set of states; batching above
/// this seam is the caller's job.
pub trait DrawTarget {
    fn draw(&mut self, vertices: &[Vertex], topology: PrimitiveTopology, states: &RenderStates);
}

/// One recorded draw call
#[derive(Clone, Debug)]
pub struct DrawCommand {
    pub vertices: Vec<Vertex>,
    pub topology: PrimitiveTopology,
    pub states: RenderStates,
}

/// A target that records draw calls instead of rasterizing.
///
/// Used by tests and headless runs to inspect exactly what would reach the
/// backend, in order.
#[derive(Default)]
pub struct DrawRecorder {
    commands: Vec<DrawCommand>,
}

impl DrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawTarget for DrawRecorder {
    fn draw(&mut self, vertices: &[Vertex], topology: PrimitiveTopology, states: &RenderStates) {
        self.commands.push(DrawCommand {
            vertices: vertices.to_vec(),
            topology,
            states: *states,
        });
    }
}

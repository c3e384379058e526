//! Scene-graph node contract

use crate::state::RenderStates;
use crate::target::DrawTarget;
use ember_core::{Color, Vec2};

/// A node the scene graph updates and draws once per frame.
///
/// The transform and color accessors have no-op defaults. Nodes whose
/// visual output is not driven by their own transform (the particle host,
/// which positions geometry through its emitters instead) leave them
/// unimplemented.
pub trait SceneNode {
    /// Advance the node by `dt` seconds
    fn update(&mut self, dt: f32);

    /// Draw the node into `target` with the inherited `states`
    fn draw(&self, target: &mut dyn DrawTarget, states: &RenderStates);

    fn position(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn set_position(&mut self, _position: Vec2) {}

    fn rotation(&self) -> f32 {
        0.0
    }

    fn set_rotation(&mut self, _degrees: f32) {}

    fn scale(&self) -> Vec2 {
        Vec2::ONE
    }

    fn set_scale(&mut self, _scale: Vec2) {}

    fn color(&self) -> Color {
        Color::WHITE
    }

    fn set_color(&mut self, _color: Color) {}
}

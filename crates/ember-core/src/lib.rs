//! Ember Core - Foundational types for the Ember engine
//!
//! This crate provides the types every other Ember crate depends on:
//! - `Vec2`, `Color`, `Transform2D` - 2D spatial and color types
//! - `trig` - degree-indexed sine/cosine lookup for hot-path rotation
//! - Error types and Result alias

mod error;
pub mod trig;
mod types;

pub use error::{EmberError, Result};
pub use types::{Color, Transform2D, Vec2};

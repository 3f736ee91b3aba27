//! Scene State: a fixed set of objects whose world transforms follow a
//! shared rotation accumulator.
//!
//! # Invariants
//! - The accumulator always lies in `[0, 2π)`.
//! - Every `update` recomputes each world matrix from its recipe; nothing is
//!   accumulated in the matrices themselves.
//! - Objects keep declaration order for their whole lifetime.

pub mod scene;

pub use scene::{SceneObject, SceneState, wrap_angle};

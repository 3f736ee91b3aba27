//! Shared types for the cube scene: transform primitives and configuration.
//!
//! # Invariants
//! - A `TransformRecipe` is a fixed, ordered list of primitives; it is
//!   recomposed from scratch every frame, never patched incrementally.
//! - `SceneConfig::default()` carries the compile-time constants of the scene.

pub mod config;
pub mod types;

pub use config::{
    CameraConfig, ConfigError, LightConfig, OverlayConfig, ScenePreset, SceneConfig,
    WindowConfig,
};
pub use types::{ObjectId, Primitive, Spin, TransformRecipe};

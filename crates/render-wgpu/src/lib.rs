//! wgpu backend for the cube scene.
//!
//! Draws a textured, lit cube mesh once per scene object and blends the
//! text overlay on top. Frames are driven through [`WgpuFrame`], which
//! implements [`cubescene_render::RenderBackend`].
//!
//! # Invariants
//! - The renderer never mutates scene state.
//! - Object constants are uploaded into their own slot before the draw that
//!   reads them.

mod gpu;
mod mesh;
mod scope;
pub mod shaders;
mod texture;

pub use gpu::{RendererOptions, WgpuFrame, WgpuRenderer, overlay_viewport, slot_stride};
pub use mesh::{Vertex, cube_mesh};
pub use shaders::ShaderSource;
pub use texture::TextureImage;

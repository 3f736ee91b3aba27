//! Rendering Adapter: renderer-agnostic frame composition.
//!
//! # Invariants
//! - The renderer never mutates scene state.
//! - Per frame, pipeline state is bound once; only the per-object constants
//!   change between object draws.
//! - Objects are drawn in declaration order, each preceded by exactly one
//!   upload of its own constants.
//! - A keyed-mutex timeout is always inspected; the overlay is skipped for
//!   that frame instead of drawing an unlocked surface.

mod camera;
mod error;
mod font;
mod frame;
mod handoff;
mod overlay;
mod renderer;

pub use camera::Camera;
pub use error::RenderError;
pub use font::OverlayFont;
pub use frame::{FrameComposer, FrameReport, OverlayStatus};
pub use handoff::{CONSUMER_KEY, KeyedGuard, KeyedMutex, OverlayHandoff, PRODUCER_KEY};
pub use overlay::OverlayImage;
pub use renderer::{
    DrawCommand, FrameConstants, ObjectConstants, RecordingBackend, RenderBackend,
};

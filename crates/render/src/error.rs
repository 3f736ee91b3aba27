use std::path::PathBuf;
use std::time::Duration;

/// Errors from rendering and overlay synchronization.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation { resource: String, reason: String },
    #[error("shader {label} failed to compile: {message}")]
    Compilation { label: String, message: String },
    #[error("timed out after {timeout:?} waiting for keyed mutex key {key}")]
    SyncTimeout { key: u64, timeout: Duration },
    #[error("failed to read shader source {path}: {source}")]
    ShaderSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("object slot {slot} out of range (capacity {capacity})")]
    ObjectSlotOutOfRange { slot: usize, capacity: usize },
    #[error("{0} called outside of a frame")]
    NoActiveFrame(&'static str),
    #[error("draw_object called before bind_scene_pipeline")]
    PipelineNotBound,
}

impl RenderError {
    pub fn resource(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ResourceCreation {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that only affect the current frame.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SyncTimeout { .. })
    }
}

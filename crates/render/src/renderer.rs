use crate::error::RenderError;
use crate::overlay::OverlayImage;
use bytemuck::{Pod, Zeroable};
use cubescene_common::LightConfig;
use glam::Mat4;

/// Per-object constants, stored transposed for the shader's row-vector
/// `position × matrix` convention.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub wvp: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
}

impl ObjectConstants {
    pub fn new(world: Mat4, wvp: Mat4) -> Self {
        Self {
            wvp: wvp.transpose().to_cols_array_2d(),
            world: world.transpose().to_cols_array_2d(),
        }
    }

    /// The untransposed world-view-projection matrix.
    pub fn wvp_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.wvp).transpose()
    }

    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.world).transpose()
    }
}

/// Per-frame light constants.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    /// Normalized direction towards the light; `w` is padding.
    pub light_dir: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
}

impl From<&LightConfig> for FrameConstants {
    fn from(light: &LightConfig) -> Self {
        let dir = light.direction.normalize_or_zero();
        Self {
            light_dir: [dir.x, dir.y, dir.z, 0.0],
            ambient: light.ambient,
            diffuse: light.diffuse,
        }
    }
}

/// GPU-facing operations the frame composer drives.
///
/// A frame is `begin_frame`, state setup, object uploads/draws, an optional
/// overlay, then `end_frame`. Implementations may defer the actual GPU work
/// until `end_frame`.
pub trait RenderBackend {
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), RenderError>;

    fn set_frame_constants(&mut self, constants: &FrameConstants) -> Result<(), RenderError>;

    /// Bind shaders, input layout, texture, sampler, raster and blend state
    /// for the object draws.
    fn bind_scene_pipeline(&mut self) -> Result<(), RenderError>;

    /// Write one object's constants into its slot.
    fn upload_object(&mut self, slot: usize, constants: &ObjectConstants) -> Result<(), RenderError>;

    /// One indexed draw of the shared cube mesh using `slot`'s constants.
    fn draw_object(&mut self, slot: usize) -> Result<(), RenderError>;

    /// Blend `image` over the frame. Switches to the overlay's own blend and
    /// cull state for this draw only.
    fn draw_overlay(&mut self, image: &OverlayImage) -> Result<(), RenderError>;

    fn end_frame(&mut self) -> Result<(), RenderError>;
}

/// One call recorded by `RecordingBackend`.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    BeginFrame { clear_color: [f32; 4] },
    SetFrameConstants(FrameConstants),
    BindScenePipeline,
    UploadObject { slot: usize, wvp: Mat4 },
    DrawObject { slot: usize },
    DrawOverlay { width: u32, height: u32 },
    EndFrame,
}

/// Headless backend that records every call.
///
/// Used by tests and the CLI to inspect draw sequencing without a GPU.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<DrawCommand>,
    capacity: Option<usize>,
    in_frame: bool,
    pipeline_bound: bool,
    frames: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject object slots at or beyond `capacity`, like a fixed-size
    /// constant buffer would.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    fn push(&mut self, call: &'static str, command: DrawCommand) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::NoActiveFrame(call));
        }
        self.commands.push(command);
        Ok(())
    }

    fn check_slot(&self, slot: usize) -> Result<(), RenderError> {
        match self.capacity {
            Some(capacity) if slot >= capacity => {
                Err(RenderError::ObjectSlotOutOfRange { slot, capacity })
            }
            _ => Ok(()),
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), RenderError> {
        self.in_frame = true;
        self.pipeline_bound = false;
        self.commands.push(DrawCommand::BeginFrame { clear_color });
        Ok(())
    }

    fn set_frame_constants(&mut self, constants: &FrameConstants) -> Result<(), RenderError> {
        self.push("set_frame_constants", DrawCommand::SetFrameConstants(*constants))
    }

    fn bind_scene_pipeline(&mut self) -> Result<(), RenderError> {
        self.push("bind_scene_pipeline", DrawCommand::BindScenePipeline)?;
        self.pipeline_bound = true;
        Ok(())
    }

    fn upload_object(&mut self, slot: usize, constants: &ObjectConstants) -> Result<(), RenderError> {
        self.check_slot(slot)?;
        self.push(
            "upload_object",
            DrawCommand::UploadObject {
                slot,
                wvp: constants.wvp_matrix(),
            },
        )
    }

    fn draw_object(&mut self, slot: usize) -> Result<(), RenderError> {
        self.check_slot(slot)?;
        if self.in_frame && !self.pipeline_bound {
            return Err(RenderError::PipelineNotBound);
        }
        self.push("draw_object", DrawCommand::DrawObject { slot })
    }

    fn draw_overlay(&mut self, image: &OverlayImage) -> Result<(), RenderError> {
        self.push(
            "draw_overlay",
            DrawCommand::DrawOverlay {
                width: image.width(),
                height: image.height(),
            },
        )
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.push("end_frame", DrawCommand::EndFrame)?;
        self.in_frame = false;
        self.pipeline_bound = false;
        self.frames += 1;
        Ok(())
    }
}

impl std::fmt::Display for RecordingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for command in &self.commands {
            match command {
                DrawCommand::BeginFrame { clear_color: c } => writeln!(
                    f,
                    "begin_frame clear=({:.2}, {:.2}, {:.2}, {:.2})",
                    c[0], c[1], c[2], c[3]
                )?,
                DrawCommand::SetFrameConstants(k) => writeln!(
                    f,
                    "  frame_constants light=({:.2}, {:.2}, {:.2})",
                    k.light_dir[0], k.light_dir[1], k.light_dir[2]
                )?,
                DrawCommand::BindScenePipeline => writeln!(f, "  bind_scene_pipeline")?,
                DrawCommand::UploadObject { slot, wvp } => {
                    let t = wvp.w_axis;
                    writeln!(
                        f,
                        "  upload slot={slot} wvp.w=({:.3}, {:.3}, {:.3}, {:.3})",
                        t.x, t.y, t.z, t.w
                    )?
                }
                DrawCommand::DrawObject { slot } => writeln!(f, "  draw slot={slot}")?,
                DrawCommand::DrawOverlay { width, height } => {
                    writeln!(f, "  overlay {width}x{height}")?
                }
                DrawCommand::EndFrame => writeln!(f, "end_frame")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn object_constants_store_transpose() {
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let k = ObjectConstants::new(world, world);
        // The translation sits in the last row of the stored (transposed) matrix,
        // which is the last element of each stored column.
        assert_eq!(k.world[0][3], 1.0);
        assert_eq!(k.world[1][3], 2.0);
        assert_eq!(k.world[2][3], 3.0);
        assert_eq!(k.world_matrix(), world);
        assert_eq!(k.wvp_matrix(), world);
    }

    #[test]
    fn transpose_reverses_product() {
        let a = Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0));
        let b = Mat4::from_rotation_y(0.8);
        let c = Mat4::perspective_lh(1.2, 4.0 / 3.0, 1.0, 1000.0);
        let lhs = (a * b * c).transpose();
        let rhs = c.transpose() * b.transpose() * a.transpose();
        assert!(lhs.abs_diff_eq(rhs, 1e-5));
    }

    #[test]
    fn constants_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 128);
        assert_eq!(std::mem::size_of::<FrameConstants>(), 48);
    }

    #[test]
    fn frame_constants_normalize_direction() {
        let k = FrameConstants::from(&LightConfig::default());
        let dir = Vec3::new(k.light_dir[0], k.light_dir[1], k.light_dir[2]);
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert_eq!(k.light_dir[3], 0.0);
    }

    #[test]
    fn recording_rejects_calls_outside_frame() {
        let mut backend = RecordingBackend::new();
        let err = backend.draw_object(0).unwrap_err();
        assert!(matches!(err, RenderError::NoActiveFrame("draw_object")));
    }

    #[test]
    fn recording_enforces_capacity() {
        let mut backend = RecordingBackend::with_capacity(1);
        backend.begin_frame([0.0; 4]).unwrap();
        let k = ObjectConstants::new(Mat4::IDENTITY, Mat4::IDENTITY);
        assert!(backend.upload_object(0, &k).is_ok());
        let err = backend.upload_object(1, &k).unwrap_err();
        assert!(matches!(
            err,
            RenderError::ObjectSlotOutOfRange { slot: 1, capacity: 1 }
        ));
    }

    #[test]
    fn recording_requires_bound_pipeline() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame([0.0; 4]).unwrap();
        assert!(matches!(
            backend.draw_object(0).unwrap_err(),
            RenderError::PipelineNotBound
        ));
        backend.bind_scene_pipeline().unwrap();
        assert!(backend.draw_object(0).is_ok());
        backend.end_frame().unwrap();

        // Binding does not carry over into the next frame.
        backend.begin_frame([0.0; 4]).unwrap();
        assert!(backend.draw_object(0).is_err());
    }

    #[test]
    fn recording_display_lists_commands() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame([0.0, 0.0, 0.0, 1.0]).unwrap();
        backend.bind_scene_pipeline().unwrap();
        backend.draw_object(0).unwrap();
        backend.end_frame().unwrap();
        let text = backend.to_string();
        assert!(text.contains("begin_frame"));
        assert!(text.contains("draw slot=0"));
        assert!(text.ends_with("end_frame\n"));
        assert_eq!(backend.frames(), 1);
    }
}

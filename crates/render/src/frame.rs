use crate::camera::Camera;
use crate::error::RenderError;
use crate::font::OverlayFont;
use crate::handoff::OverlayHandoff;
use crate::overlay::OverlayImage;
use crate::renderer::{FrameConstants, ObjectConstants, RenderBackend};
use cubescene_common::SceneConfig;
use cubescene_scene::SceneState;

/// What happened to the overlay in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayStatus {
    /// No overlay was requested.
    Disabled,
    Drawn,
    /// A keyed-mutex acquire timed out; the overlay was left out.
    Skipped { key: u64 },
}

/// Summary of one composed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub objects_drawn: usize,
    pub overlay: OverlayStatus,
}

/// Drives a `RenderBackend` through one frame of the scene.
#[derive(Debug, Clone)]
pub struct FrameComposer {
    camera: Camera,
    frame_constants: FrameConstants,
    clear_color: [f32; 4],
    text_color: [u8; 4],
    font: OverlayFont,
}

impl FrameComposer {
    pub fn new(config: &SceneConfig) -> Result<Self, RenderError> {
        Ok(Self {
            camera: Camera::from_config(&config.camera, config.aspect_ratio()),
            frame_constants: FrameConstants::from(&config.light),
            clear_color: config.clear_color,
            text_color: config.overlay.text_color,
            font: OverlayFont::embedded(config.overlay.font_size)?,
        })
    }

    /// Margin between the overlay image edge and its text.
    pub fn text_padding(&self) -> u32 {
        (self.font.px() / 4.0).round() as u32
    }

    /// An overlay image sized for `text` drawn by this composer.
    pub fn overlay_image_for(&self, text: &str) -> OverlayImage {
        OverlayImage::for_text(&self.font, text, self.text_padding())
    }

    pub fn font(&self) -> &OverlayFont {
        &self.font
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Compose and submit one frame.
    ///
    /// Objects are drawn in declaration order, each after exactly one upload
    /// of its own constants. When `overlay` is given, `text` is rasterized by
    /// the producer side of the hand-off and drawn by the consumer side; a
    /// timeout on either side drops the overlay for this frame only.
    pub fn draw_frame<B: RenderBackend>(
        &self,
        backend: &mut B,
        scene: &SceneState,
        overlay: Option<(&OverlayHandoff, &str)>,
    ) -> Result<FrameReport, RenderError> {
        backend.begin_frame(self.clear_color)?;
        backend.set_frame_constants(&self.frame_constants)?;
        backend.bind_scene_pipeline()?;

        for (slot, object) in scene.objects().iter().enumerate() {
            let world = object.world();
            let constants = ObjectConstants::new(world, self.camera.compose(world));
            backend.upload_object(slot, &constants)?;
            backend.draw_object(slot)?;
        }

        let overlay = match overlay {
            None => OverlayStatus::Disabled,
            Some((handoff, text)) => self.overlay_pass(backend, handoff, text)?,
        };

        backend.end_frame()?;

        Ok(FrameReport {
            objects_drawn: scene.object_count(),
            overlay,
        })
    }

    fn overlay_pass<B: RenderBackend>(
        &self,
        backend: &mut B,
        handoff: &OverlayHandoff,
        text: &str,
    ) -> Result<OverlayStatus, RenderError> {
        let pad = self.text_padding() as i32;
        let produced = handoff.produce(|image| {
            image.clear();
            image.draw_text(&self.font, pad, pad, text, self.text_color);
        });
        if let Err(RenderError::SyncTimeout { key, timeout }) = produced {
            tracing::warn!(key, ?timeout, "overlay producer timed out, skipping overlay");
            return Ok(OverlayStatus::Skipped { key });
        }
        produced?;

        match handoff.consume(|image| backend.draw_overlay(image)) {
            Ok(drawn) => {
                drawn?;
                Ok(OverlayStatus::Drawn)
            }
            Err(RenderError::SyncTimeout { key, timeout }) => {
                tracing::warn!(key, ?timeout, "overlay consumer timed out, skipping overlay");
                Ok(OverlayStatus::Skipped { key })
            }
            Err(e) => Err(e),
        }
    }
}

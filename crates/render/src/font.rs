//! Overlay font: glyph rasterization through `fontdue`.

use crate::error::RenderError;
use fontdue::{Font, FontSettings, Metrics};
use std::sync::Arc;

/// DejaVu Sans Mono, embedded so the overlay works without system fonts.
static EMBEDDED_FONT: &[u8] = include_bytes!("../fonts/DejaVuSansMono.ttf");

/// A TrueType/OpenType font at a fixed pixel size.
///
/// Cheap to clone; the parsed font is shared.
#[derive(Clone)]
pub struct OverlayFont {
    font: Arc<Font>,
    px: f32,
}

impl std::fmt::Debug for OverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayFont").field("px", &self.px).finish()
    }
}

impl OverlayFont {
    /// The built-in font at `px` pixels.
    pub fn embedded(px: f32) -> Result<Self, RenderError> {
        Self::from_bytes(EMBEDDED_FONT, px)
    }

    /// Parse raw TTF/OTF bytes.
    pub fn from_bytes(bytes: &[u8], px: f32) -> Result<Self, RenderError> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| RenderError::resource("overlay font", e))?;
        tracing::debug!(px, glyphs = font.glyph_count(), "overlay font loaded");
        Ok(Self {
            font: Arc::new(font),
            px: px.max(1.0),
        })
    }

    pub fn px(&self) -> f32 {
        self.px
    }

    /// Whether the font has a real glyph for `c`.
    pub fn has_glyph(&self, c: char) -> bool {
        self.font.lookup_glyph_index(c) != 0
    }

    /// Coverage bitmap for `c`, one byte per pixel, `metrics.width` per row.
    pub fn rasterize(&self, c: char) -> (Metrics, Vec<u8>) {
        self.font.rasterize(c, self.px)
    }

    /// Distance from the top of a line to its baseline.
    pub fn ascent(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.px)
            .map_or(self.px, |m| m.ascent)
    }

    /// Baseline-to-baseline distance.
    pub fn line_height(&self) -> f32 {
        self.font
            .horizontal_line_metrics(self.px)
            .map_or(self.px * 1.2, |m| m.new_line_size)
    }

    /// Pixel size of a single line of `text`.
    pub fn text_extent(&self, text: &str) -> (u32, u32) {
        if text.is_empty() {
            return (0, 0);
        }
        let width: f32 = text
            .chars()
            .map(|c| self.font.metrics(c, self.px).advance_width)
            .sum();
        (width.ceil() as u32, self.line_height().ceil() as u32)
    }
}

//! CPU-side overlay surface.

use crate::font::OverlayFont;

/// RGBA8 image shared between the text producer and the frame's overlay pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl OverlayImage {
    /// A fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    /// Image large enough for one line of `text` plus `padding` on each side.
    pub fn for_text(font: &OverlayFont, text: &str, padding: u32) -> Self {
        let (w, h) = font.text_extent(text);
        Self::new(w + padding * 2, h + padding * 2)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA8 bytes, `width * 4` per row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Source-over blend of `color` at `coverage` (0..=255) into one pixel.
    fn blend(&mut self, x: i32, y: i32, color: [u8; 4], coverage: u8) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let src_a = coverage as f32 / 255.0 * color[3] as f32 / 255.0;
        if src_a <= 0.0 {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        let dst = &mut self.pixels[i..i + 4];
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        for c in 0..3 {
            let s = color[c] as f32 * src_a;
            let d = dst[c] as f32 * dst_a * (1.0 - src_a);
            dst[c] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (out_a * 255.0).round() as u8;
    }

    /// Rasterize `text` with the top-left of its first line at `(x, y)`.
    /// Output is clipped to the image.
    pub fn draw_text(&mut self, font: &OverlayFont, x: i32, y: i32, text: &str, color: [u8; 4]) {
        let ascent = font.ascent();
        let mut baseline = y as f32 + ascent;
        let mut pen_x = x as f32;

        for c in text.chars() {
            if c == '\n' {
                pen_x = x as f32;
                baseline += font.line_height();
                continue;
            }
            let (metrics, coverage) = font.rasterize(c);
            // fontdue's ymin is the bitmap bottom relative to the baseline, y up.
            let left = pen_x.round() as i32 + metrics.xmin;
            let top = (baseline - (metrics.ymin + metrics.height as i32) as f32).round() as i32;
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let a = coverage[row * metrics.width + col];
                    if a > 0 {
                        self.blend(left + col as i32, top + row as i32, color, a);
                    }
                }
            }
            pen_x += metrics.advance_width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn font() -> OverlayFont {
        OverlayFont::embedded(16.0).unwrap()
    }

    fn ink(img: &OverlayImage) -> usize {
        img.pixels().chunks_exact(4).filter(|p| p[3] > 0).count()
    }

    #[test]
    fn new_image_is_transparent() {
        let img = OverlayImage::new(4, 3);
        assert_eq!(img.pixels().len(), 48);
        assert!(img.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn lowercase_and_symbols_render_distinctly() {
        let font = font();
        let mut f = OverlayImage::new(24, 24);
        let mut hash = OverlayImage::new(24, 24);
        f.draw_text(&font, 0, 0, "f", WHITE);
        hash.draw_text(&font, 0, 0, "#", WHITE);
        assert!(ink(&f) > 0);
        assert!(ink(&hash) > 0);
        assert_ne!(f, hash);
    }

    #[test]
    fn glyphs_take_the_text_color() {
        // Large enough that stems have fully covered pixels.
        let font = OverlayFont::embedded(48.0).unwrap();
        let mut img = OverlayImage::new(48, 64);
        img.draw_text(&font, 0, 0, "H", [10, 200, 30, 255]);
        let solid = img
            .pixels()
            .chunks_exact(4)
            .find(|p| p[3] == 255)
            .expect("fully covered pixel");
        assert_eq!(&solid[..3], &[10, 200, 30]);
    }

    #[test]
    fn text_stays_inside_its_extent() {
        let font = font();
        let text = "FPS: 60";
        let mut img = OverlayImage::for_text(&font, text, 4);
        img.draw_text(&font, 4, 4, text, WHITE);
        assert!(ink(&img) > 0);
        for y in 0..img.height() {
            assert_eq!(img.pixel(0, y).map(|p| p[3]), Some(0));
            assert_eq!(img.pixel(img.width() - 1, y).map(|p| p[3]), Some(0));
        }
    }

    #[test]
    fn text_is_clipped_to_bounds() {
        let mut img = OverlayImage::new(8, 4);
        img.draw_text(&font(), -3, -5, "FPS: 60", WHITE);
        img.draw_text(&font(), 6, 2, "FPS: 60", WHITE);
        assert_eq!(img.pixels().len(), 8 * 4 * 4);
    }

    #[test]
    fn fill_and_clear() {
        let mut img = OverlayImage::new(3, 3);
        img.fill([1, 2, 3, 4]);
        assert_eq!(img.pixel(2, 2), Some([1, 2, 3, 4]));
        img.clear();
        assert!(img.pixels().iter().all(|&b| b == 0));
    }
}

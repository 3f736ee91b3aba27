use crate::scope::validated;
use cubescene_render::RenderError;
use std::path::Path;

/// CPU-side RGBA8 texture data for the cube faces.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Two-tone checkerboard with `cells` squares per side.
    pub fn checkerboard(size: u32, cells: u32) -> Self {
        let size = size.max(1);
        let cell = (size / cells.max(1)).max(1);
        let light = [235, 235, 235, 255];
        let dark = [60, 90, 160, 255];
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let texel = if ((x / cell) + (y / cell)) % 2 == 0 {
                    light
                } else {
                    dark
                };
                rgba.extend_from_slice(&texel);
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    /// Decode a PNG or JPEG file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .map_err(|e| RenderError::resource(format!("texture {}", path.display()), e))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        tracing::debug!("loaded texture {} ({width}x{height})", path.display());
        Ok(Self {
            width,
            height,
            rgba: decoded.into_raw(),
        })
    }
}

impl TextureImage {
    /// Reject sizes the device cannot create before touching wgpu.
    pub fn check_limits(&self, max_dimension: u32) -> Result<(), RenderError> {
        let (w, h) = (self.width, self.height);
        if w == 0 || h == 0 || w > max_dimension || h > max_dimension {
            return Err(RenderError::resource(
                "face texture",
                format!("{w}x{h} is outside 1..={max_dimension}"),
            ));
        }
        let expected = w as usize * h as usize * 4;
        if self.rgba.len() != expected {
            return Err(RenderError::resource(
                "face texture",
                format!("{} bytes of RGBA for {w}x{h}, expected {expected}", self.rgba.len()),
            ));
        }
        Ok(())
    }
}

impl Default for TextureImage {
    fn default() -> Self {
        Self::checkerboard(256, 8)
    }
}

/// Upload `image` as a sampled 2D texture.
pub(crate) fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &TextureImage,
) -> Result<wgpu::Texture, RenderError> {
    use wgpu::util::DeviceExt;

    image.check_limits(device.limits().max_texture_dimension_2d)?;
    validated(
        device,
        || {
            device.create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width: image.width,
                        height: image.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8UnormSrgb,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                &image.rgba,
            )
        },
        |err| RenderError::resource(label, err),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates() {
        let tex = TextureImage::checkerboard(4, 2);
        assert_eq!(tex.rgba.len(), 4 * 4 * 4);
        let at = |x: usize, y: usize| &tex.rgba[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(at(0, 0), at(1, 1));
        assert_ne!(at(0, 0), at(2, 0));
        assert_eq!(at(0, 0), at(2, 2));
    }

    #[test]
    fn missing_texture_is_resource_error() {
        let err = TextureImage::load("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, RenderError::ResourceCreation { .. }));
    }

    #[test]
    fn default_texture_is_square() {
        let tex = TextureImage::default();
        assert_eq!((tex.width, tex.height), (256, 256));
    }

    #[test]
    fn oversized_texture_is_rejected_before_upload() {
        let tex = TextureImage::checkerboard(64, 2);
        assert!(tex.check_limits(64).is_ok());

        let err = tex.check_limits(32).unwrap_err();
        assert!(matches!(err, RenderError::ResourceCreation { .. }));

        let wide = TextureImage {
            width: 9000,
            height: 1,
            rgba: vec![0; 9000 * 4],
        };
        assert!(wide.check_limits(8192).is_err());
    }

    #[test]
    fn empty_or_short_texture_is_rejected() {
        let empty = TextureImage {
            width: 0,
            height: 4,
            rgba: Vec::new(),
        };
        assert!(empty.check_limits(8192).is_err());

        let short = TextureImage {
            width: 2,
            height: 2,
            rgba: vec![0; 12],
        };
        assert!(short.check_limits(8192).is_err());
    }
}

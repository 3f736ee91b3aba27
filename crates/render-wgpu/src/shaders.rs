use crate::scope::validated;
use cubescene_render::RenderError;
use std::borrow::Cow;
use std::path::PathBuf;

/// WGSL for the lit, textured cubes.
///
/// Object matrices arrive transposed and are applied as `position × matrix`.
pub const SCENE_SHADER: &str = r#"
struct FrameConstants {
    light_dir: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
};

struct ObjectConstants {
    wvp: mat4x4<f32>,
    world: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> per_frame: FrameConstants;
@group(0) @binding(1)
var face_texture: texture_2d<f32>;
@group(0) @binding(2)
var face_sampler: sampler;

@group(1) @binding(0)
var<uniform> per_object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 1.0) * per_object.wvp;
    out.normal = (vec4<f32>(in.normal, 0.0) * per_object.world).xyz;
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(in.normal);
    let albedo = textureSample(face_texture, face_sampler, in.uv);
    let lit = saturate(dot(per_frame.light_dir.xyz, normal) * per_frame.diffuse.rgb * albedo.rgb);
    let color = albedo.rgb * per_frame.ambient.rgb + lit;
    return vec4<f32>(color, albedo.a);
}
"#;

/// WGSL for the overlay: one oversized triangle, each fragment loading the
/// overlay texel under it. The viewport starts at the target origin, so
/// fragment coordinates are texel coordinates and the image is never scaled.
pub const OVERLAY_SHADER: &str = r#"
@group(0) @binding(0)
var overlay_texture: texture_2d<f32>;

@vertex
fn vs_overlay(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32((index << 1u) & 2u);
    let y = f32(index & 2u);
    return vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
}

@fragment
fn fs_overlay(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let size = vec2<i32>(textureDimensions(overlay_texture));
    let texel = min(vec2<i32>(floor(frag.xy)), size - vec2<i32>(1, 1));
    return textureLoad(overlay_texture, texel, 0);
}
"#;

/// Entry points a scene shader must define.
pub const SCENE_ENTRY_POINTS: [&str; 2] = ["vs_main", "fs_main"];

/// Where the scene shader comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShaderSource {
    #[default]
    Builtin,
    /// WGSL file read at startup. Must match the built-in shader's bindings.
    File(PathBuf),
}

impl ShaderSource {
    /// Read the WGSL text and check it names the required entry points.
    pub fn load(&self) -> Result<Cow<'static, str>, RenderError> {
        let (label, text) = match self {
            Self::Builtin => ("builtin".to_string(), Cow::Borrowed(SCENE_SHADER)),
            Self::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| {
                    RenderError::ShaderSource {
                        path: path.clone(),
                        source,
                    }
                })?;
                (path.display().to_string(), Cow::Owned(text))
            }
        };
        check_entry_points(&label, &text, &SCENE_ENTRY_POINTS)?;
        Ok(text)
    }
}

/// Cheap pre-check run before handing source to the GPU compiler.
pub fn check_entry_points(label: &str, source: &str, entry_points: &[&str]) -> Result<(), RenderError> {
    for name in entry_points {
        if !source.contains(&format!("fn {name}(")) {
            return Err(RenderError::Compilation {
                label: label.to_string(),
                message: format!("missing entry point `{name}`"),
            });
        }
    }
    Ok(())
}

/// Compile WGSL, turning validation failures into `RenderError::Compilation`.
pub(crate) fn compile(
    device: &wgpu::Device,
    label: &str,
    source: Cow<'_, str>,
) -> Result<wgpu::ShaderModule, RenderError> {
    validated(
        device,
        || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source),
            })
        },
        |err| RenderError::Compilation {
            label: label.to_string(),
            message: err.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shaders_define_entry_points() {
        assert!(check_entry_points("scene", SCENE_SHADER, &SCENE_ENTRY_POINTS).is_ok());
        assert!(check_entry_points("overlay", OVERLAY_SHADER, &["vs_overlay", "fs_overlay"]).is_ok());
    }

    #[test]
    fn missing_entry_point_is_compilation_error() {
        let err = check_entry_points("x", "fn vs_main() {}", &SCENE_ENTRY_POINTS).unwrap_err();
        match err {
            RenderError::Compilation { message, .. } => assert!(message.contains("fs_main")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_source_error() {
        let err = ShaderSource::File("/no/such/effects.wgsl".into())
            .load()
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderSource { .. }));
    }

    #[test]
    fn overlay_shader_maps_pixels_to_texels() {
        assert!(OVERLAY_SHADER.contains("textureLoad"));
        assert!(!OVERLAY_SHADER.contains("textureSample"));
    }

    #[test]
    fn builtin_source_loads() {
        let text = ShaderSource::Builtin.load().unwrap();
        assert!(text.contains("per_object"));
    }
}

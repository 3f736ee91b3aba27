use crate::mesh::{Vertex, cube_mesh};
use crate::scope::validated;
use crate::shaders::{self, ShaderSource};
use crate::texture::{TextureImage, upload_texture};
use cubescene_render::{
    FrameConstants, ObjectConstants, OverlayImage, RenderBackend, RenderError,
};
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Distance between per-object constant slots in the dynamic uniform buffer.
pub fn slot_stride(min_alignment: u32) -> u64 {
    let size = std::mem::size_of::<ObjectConstants>() as u64;
    let align = u64::from(min_alignment.max(1));
    size.div_ceil(align) * align
}

/// Startup parameters for `WgpuRenderer`.
#[derive(Debug, Clone)]
pub struct RendererOptions {
    pub surface_format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Number of per-object constant slots.
    pub max_objects: usize,
    pub texture: TextureImage,
    pub shader: ShaderSource,
}

struct OverlayTarget {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// wgpu renderer for the cube scene.
///
/// Owns every GPU resource the scene needs. Frames are driven through
/// `WgpuFrame`, which implements `RenderBackend`.
pub struct WgpuRenderer {
    scene_pipeline: wgpu::RenderPipeline,
    overlay_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    slot_stride: u64,
    max_objects: usize,
    cube_vertex_buffer: wgpu::Buffer,
    cube_index_buffer: wgpu::Buffer,
    cube_index_count: u32,
    overlay_layout: wgpu::BindGroupLayout,
    overlay: Option<OverlayTarget>,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    size: (u32, u32),
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        options: RendererOptions,
    ) -> Result<Self, RenderError> {
        let max_objects = options.max_objects.max(1);
        let slot_stride = slot_stride(device.limits().min_uniform_buffer_offset_alignment);
        let object_size = NonZeroU64::new(std::mem::size_of::<ObjectConstants>() as u64);

        // Per-frame constants, texture and sampler
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_constants"),
            contents: bytemuck::bytes_of(&FrameConstants {
                light_dir: [0.0, 0.0, -1.0, 0.0],
                ambient: [1.0; 4],
                diffuse: [0.0; 4],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let face_texture = upload_texture(device, queue, "face_texture", &options.texture)?;
        let face_view = face_texture.create_view(&Default::default());
        let face_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("face_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                sampler_entry(2),
            ],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&face_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&face_sampler),
                },
            ],
        });

        // Per-object constants: one slot per object, selected by dynamic offset
        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object_constants"),
            size: slot_stride * max_objects as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: object_size,
                },
                count: None,
            }],
        });

        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout: &object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &object_buffer,
                    offset: 0,
                    size: object_size,
                }),
            }],
        });

        // Scene pipeline
        let scene_source = options.shader.load()?;
        let scene_shader = shaders::compile(device, "scene_shader", scene_source)?;

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        // A custom shader whose bindings disagree with the layout fails here.
        let scene_desc = wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&scene_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: options.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        };
        let scene_pipeline = validated(
            device,
            || device.create_render_pipeline(&scene_desc),
            |err| pipeline_error("scene_pipeline", err),
        )?;

        // Overlay pipeline: alpha blended, no culling, depth ignored
        let overlay_shader =
            shaders::compile(device, "overlay_shader", shaders::OVERLAY_SHADER.into())?;

        let overlay_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay_bind_group_layout"),
            entries: &[texture_entry(0)],
        });

        let overlay_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("overlay_pipeline_layout"),
                bind_group_layouts: &[&overlay_layout],
                push_constant_ranges: &[],
            });

        let overlay_desc = wgpu::RenderPipelineDescriptor {
            label: Some("overlay_pipeline"),
            layout: Some(&overlay_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &overlay_shader,
                entry_point: Some("vs_overlay"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &overlay_shader,
                entry_point: Some("fs_overlay"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: options.surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        };
        let overlay_pipeline = validated(
            device,
            || device.create_render_pipeline(&overlay_desc),
            |err| pipeline_error("overlay_pipeline", err),
        )?;

        // Cube mesh
        let (cube_verts, cube_indices) = cube_mesh();
        let cube_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube_vertex_buffer"),
            contents: bytemuck::cast_slice(&cube_verts),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let cube_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube_index_buffer"),
            contents: bytemuck::cast_slice(&cube_indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let cube_index_count = cube_indices.len() as u32;

        let depth_texture = Self::create_depth_texture(device, options.width, options.height);

        tracing::debug!(max_objects, slot_stride, "renderer resources created");

        Ok(Self {
            scene_pipeline,
            overlay_pipeline,
            frame_buffer,
            frame_bind_group,
            object_buffer,
            object_bind_group,
            slot_stride,
            max_objects,
            cube_vertex_buffer,
            cube_index_buffer,
            cube_index_count,
            overlay_layout,
            overlay: None,
            depth_texture,
            surface_format: options.surface_format,
            size: (options.width.max(1), options.height.max(1)),
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
        self.size = (width.max(1), height.max(1));
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    /// Start recording a frame into `target`.
    pub fn frame<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        target: &'a wgpu::TextureView,
    ) -> WgpuFrame<'a> {
        WgpuFrame {
            renderer: self,
            device,
            queue,
            target,
            clear: None,
            pipeline_bound: false,
            passes: Vec::new(),
        }
    }

    fn check_slot(&self, slot: usize) -> Result<(), RenderError> {
        if slot >= self.max_objects {
            return Err(RenderError::ObjectSlotOutOfRange {
                slot,
                capacity: self.max_objects,
            });
        }
        Ok(())
    }

    /// Make sure the overlay texture matches `image`, then copy it in.
    fn upload_overlay(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, image: &OverlayImage) {
        let (width, height) = (image.width(), image.height());
        let stale = self
            .overlay
            .as_ref()
            .is_none_or(|o| o.width != width || o.height != height);
        if stale {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("overlay_texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&Default::default());
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("overlay_bind_group"),
                layout: &self.overlay_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                }],
            });
            tracing::debug!(width, height, "overlay texture (re)created");
            self.overlay = Some(OverlayTarget {
                texture,
                bind_group,
                width,
                height,
            });
        }

        if let Some(overlay) = &self.overlay {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &overlay.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                image.pixels(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

fn pipeline_error(label: &str, err: wgpu::Error) -> RenderError {
    RenderError::Compilation {
        label: label.to_string(),
        message: err.to_string(),
    }
}

/// Top-left rectangle the overlay covers on a `target`-sized surface.
///
/// The overlay shader maps one pixel to one texel, so a target smaller than
/// the image crops the text instead of scaling it.
pub fn overlay_viewport(image: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (image.0.min(target.0).max(1), image.1.min(target.1).max(1))
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

enum PassCommand {
    Object { slot: usize },
    Overlay { width: u32, height: u32 },
}

/// One frame in flight.
///
/// Constant and texture uploads go to the queue immediately; draws are
/// recorded and encoded into a single render pass by `end_frame`.
pub struct WgpuFrame<'a> {
    renderer: &'a mut WgpuRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    target: &'a wgpu::TextureView,
    clear: Option<wgpu::Color>,
    pipeline_bound: bool,
    passes: Vec<PassCommand>,
}

impl WgpuFrame<'_> {
    fn active(&self, call: &'static str) -> Result<(), RenderError> {
        if self.clear.is_none() {
            return Err(RenderError::NoActiveFrame(call));
        }
        Ok(())
    }
}

impl RenderBackend for WgpuFrame<'_> {
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), RenderError> {
        let [r, g, b, a] = clear_color.map(f64::from);
        self.clear = Some(wgpu::Color { r, g, b, a });
        self.pipeline_bound = false;
        self.passes.clear();
        Ok(())
    }

    fn set_frame_constants(&mut self, constants: &FrameConstants) -> Result<(), RenderError> {
        self.active("set_frame_constants")?;
        self.queue
            .write_buffer(&self.renderer.frame_buffer, 0, bytemuck::bytes_of(constants));
        Ok(())
    }

    fn bind_scene_pipeline(&mut self) -> Result<(), RenderError> {
        self.active("bind_scene_pipeline")?;
        self.pipeline_bound = true;
        Ok(())
    }

    fn upload_object(&mut self, slot: usize, constants: &ObjectConstants) -> Result<(), RenderError> {
        self.active("upload_object")?;
        self.renderer.check_slot(slot)?;
        let offset = slot as u64 * self.renderer.slot_stride;
        self.queue.write_buffer(
            &self.renderer.object_buffer,
            offset,
            bytemuck::bytes_of(constants),
        );
        Ok(())
    }

    fn draw_object(&mut self, slot: usize) -> Result<(), RenderError> {
        self.active("draw_object")?;
        self.renderer.check_slot(slot)?;
        if !self.pipeline_bound {
            return Err(RenderError::PipelineNotBound);
        }
        self.passes.push(PassCommand::Object { slot });
        Ok(())
    }

    fn draw_overlay(&mut self, image: &OverlayImage) -> Result<(), RenderError> {
        self.active("draw_overlay")?;
        self.renderer.upload_overlay(self.device, self.queue, image);
        self.passes.push(PassCommand::Overlay {
            width: image.width(),
            height: image.height(),
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let Some(clear) = self.clear.take() else {
            return Err(RenderError::NoActiveFrame("end_frame"));
        };
        let r = &*self.renderer;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &r.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            // Scene state is bound once; only the object offset changes per draw.
            if self.pipeline_bound {
                pass.set_pipeline(&r.scene_pipeline);
                pass.set_bind_group(0, &r.frame_bind_group, &[]);
                pass.set_vertex_buffer(0, r.cube_vertex_buffer.slice(..));
                pass.set_index_buffer(r.cube_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            }

            for command in &self.passes {
                match *command {
                    PassCommand::Object { slot } => {
                        let offset = (slot as u64 * r.slot_stride) as u32;
                        pass.set_bind_group(1, &r.object_bind_group, &[offset]);
                        pass.draw_indexed(0..r.cube_index_count, 0, 0..1);
                    }
                    PassCommand::Overlay { width, height } => {
                        let Some(overlay) = &r.overlay else { continue };
                        let (w, h) = overlay_viewport((width, height), r.size);
                        pass.set_viewport(0.0, 0.0, w as f32, h as f32, 0.0, 1.0);
                        pass.set_pipeline(&r.overlay_pipeline);
                        pass.set_bind_group(0, &overlay.bind_group, &[]);
                        pass.draw(0..3, 0..1);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.passes.clear();
        self.pipeline_bound = false;
        Ok(())
    }
}

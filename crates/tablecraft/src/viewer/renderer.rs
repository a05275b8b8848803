//! # Renderer — Drawing the Composed Scene
//!
//! One forward pass over the [`Scene`]'s nodes:
//!
//! ```text
//! render(scene, camera, lights)
//!   │
//!   ├─ 1. Acquire frame ─── SurfaceError goes back to the caller
//!   ├─ 2. Depth check ─── recreate depth texture if resized
//!   ├─ 3. Prepare ─── only when scene.revision changed
//!   │     upload new meshes, drop unused ones
//!   │     upload the surface texture when its revision changed
//!   │     material bind group + model slot per node
//!   ├─ 4. Camera + lights ─── write uniforms
//!   └─ 5. Render pass
//!         bind groups 0+1 once, 2+3 per node, draw_indexed
//!         top nodes are skipped until the scene is positioned
//! ```
//!
//! GPU meshes are cached by the address of their `Arc<Mesh>`. The cache
//! holds a clone of the `Arc`, so an address cannot be reused while its
//! entry is alive.
//!
//! ## Comparison
//!
//! - **Bevy**: extracts into a render world and batches by pipeline and
//!   material with sort keys.
//! - **Our approach**: a table has a handful of nodes, so it rebuilds the
//!   per-node bind groups whenever the scene changes and does no batching.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::gpu::GpuContext;
use super::lighting::{CameraUniform, LightUniform, MaterialUniform, ModelUniform};
use super::orbit::OrbitCamera;
use crate::capability::RenderingCapabilityProfile;
use crate::geometry::{Mesh, MeshVertex};
use crate::math::{Mat4, Vec3};
use crate::scene::{Material, NodeRole, Scene};
use crate::texture::SurfaceImage;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        // position: vec3<f32>
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        // normal: vec3<f32>
        wgpu::VertexAttribute {
            offset: 12,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        // uv: vec2<f32>
        wgpu::VertexAttribute {
            offset: 24,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
    ],
};

struct GpuMesh {
    _source: Arc<Mesh>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct UploadedSurface {
    revision: u64,
    view: wgpu::TextureView,
}

struct PreparedNode {
    mesh_key: usize,
    material_bind_group: wgpu::BindGroup,
    model_offset: u32,
    is_top: bool,
}

pub struct MeshRenderer {
    pipeline: wgpu::RenderPipeline,

    material_bind_group_layout: wgpu::BindGroupLayout,
    model_bind_group_layout: wgpu::BindGroupLayout,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,

    sampler: wgpu::Sampler,
    white_texture: wgpu::TextureView,
    surface_texture: Option<UploadedSurface>,

    depth_texture: wgpu::TextureView,
    depth_size: (u32, u32),

    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_buffer_capacity: usize,

    meshes: HashMap<usize, GpuMesh>,
    prepared: Vec<PreparedNode>,
    prepared_revision: Option<u64>,
}

impl MeshRenderer {
    pub fn new(gpu: &GpuContext, capability: &RenderingCapabilityProfile) -> Self {
        let device = &gpu.device;

        // ── Shader ──────────────────────────────────────────────────────
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("table shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // ── Bind group layouts ──────────────────────────────────────────
        let camera_bind_group_layout = uniform_layout(device, "camera layout", wgpu::ShaderStages::VERTEX_FRAGMENT);
        let light_bind_group_layout = uniform_layout(device, "light layout", wgpu::ShaderStages::FRAGMENT);

        let material_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material layout"),
            entries: &[
                // MaterialUniform
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
                // base_texture
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                // base_sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let model_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
                },
                count: None,
            }],
        });

        // ── Pipeline ────────────────────────────────────────────────────
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("table pipeline layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &light_bind_group_layout,
                &material_bind_group_layout,
                &model_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("table pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[VERTEX_LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ── Per-frame uniforms ──────────────────────────────────────────
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera buffer"),
            contents: bytemuck::bytes_of(&CameraUniform::new(Mat4::IDENTITY, Vec3::ZERO)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = whole_buffer_bind_group(device, "camera bind group", &camera_bind_group_layout, &camera_buffer);

        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("light buffer"),
            contents: bytemuck::bytes_of(&<LightUniform as bytemuck::Zeroable>::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_bind_group = whole_buffer_bind_group(device, "light bind group", &light_bind_group_layout, &light_buffer);

        // ── Sampler and default texture ─────────────────────────────────
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("surface sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: capability.anisotropy.clamp(1, 16),
            ..Default::default()
        });

        let white = device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some("white 1x1"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
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
            &[255u8, 255, 255, 255],
        );
        let white_texture = white.create_view(&wgpu::TextureViewDescriptor::default());

        // ── Depth and model buffers ─────────────────────────────────────
        let (w, h) = gpu.surface_size();
        let depth_texture = create_depth_texture(device, w, h);

        let initial_capacity = 16;
        let (model_buffer, model_bind_group) = create_model_buffer(device, &model_bind_group_layout, initial_capacity);

        Self {
            pipeline,
            material_bind_group_layout,
            model_bind_group_layout,
            camera_buffer,
            camera_bind_group,
            light_buffer,
            light_bind_group,
            sampler,
            white_texture,
            surface_texture: None,
            depth_texture,
            depth_size: (w, h),
            model_buffer,
            model_bind_group,
            model_buffer_capacity: initial_capacity,
            meshes: HashMap::new(),
            prepared: Vec::new(),
            prepared_revision: None,
        }
    }

    /// Draw one frame of `scene`.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &Scene,
        camera: &OrbitCamera,
        lights: &LightUniform,
        clear: [f64; 4],
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = gpu.surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let (sw, sh) = gpu.surface_size();
        self.resize_depth_if_needed(&gpu.device, sw, sh);

        if self.prepared_revision != Some(scene.revision) {
            self.prepare(gpu, scene);
        }

        let aspect = sw as f32 / sh.max(1) as f32;
        let camera_uniform = CameraUniform::new(camera.view_proj(aspect), camera.eye());
        gpu.queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniform));
        gpu.queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(lights));

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("table frame encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("table render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(to_wgpu_color(clear)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_bind_group(1, &self.light_bind_group, &[]);

            for node in &self.prepared {
                if node.is_top && !scene.positioned {
                    continue;
                }
                let Some(mesh) = self.meshes.get(&node.mesh_key) else {
                    continue;
                };
                pass.set_bind_group(2, &node.material_bind_group, &[]);
                pass.set_bind_group(3, &self.model_bind_group, &[node.model_offset]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Present a frame that is only a solid color. Used by the error screen.
    pub fn clear_only(gpu: &GpuContext, color: [f64; 4]) -> Result<(), wgpu::SurfaceError> {
        let frame = gpu.surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("clear encoder"),
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(to_wgpu_color(color)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn resize_depth_if_needed(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if (width, height) != self.depth_size && width > 0 && height > 0 {
            self.depth_texture = create_depth_texture(device, width, height);
            self.depth_size = (width, height);
        }
    }

    /// Ensure the dynamic model buffer can hold `count` entries. Returns the
    /// aligned stride in bytes.
    fn ensure_model_capacity(&mut self, device: &wgpu::Device, count: usize) -> u32 {
        let align = device.limits().min_uniform_buffer_offset_alignment as usize;
        let stride = align_up(std::mem::size_of::<ModelUniform>(), align);

        if count > self.model_buffer_capacity {
            let new_cap = count.next_power_of_two();
            let (buffer, bind_group) = create_model_buffer(device, &self.model_bind_group_layout, new_cap);
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            self.model_buffer_capacity = new_cap;
        }

        stride as u32
    }

    fn prepare(&mut self, gpu: &GpuContext, scene: &Scene) {
        let nodes: Vec<_> = scene.nodes.iter().filter(|n| !n.mesh.is_empty()).collect();

        // Meshes
        let mut live = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            let key = mesh_key(&node.mesh);
            let entry = self
                .meshes
                .remove(&key)
                .unwrap_or_else(|| upload_mesh(&gpu.device, &node.mesh));
            live.insert(key, entry);
        }
        self.meshes = live;

        // Surface texture
        if let Some((image, revision)) = nodes
            .iter()
            .find_map(|n| n.material.texture.as_ref().map(|t| (t, n.material.texture_revision)))
        {
            if self.surface_texture.as_ref().map(|s| s.revision) != Some(revision) {
                self.surface_texture = Some(UploadedSurface {
                    revision,
                    view: upload_surface(gpu, image),
                });
            }
        }

        // Model uniforms
        let stride = self.ensure_model_capacity(&gpu.device, nodes.len().max(1));
        let mut model_data = vec![0u8; stride as usize * nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            let offset = i * stride as usize;
            let uniform = ModelUniform::new(node.transform);
            let bytes = bytemuck::bytes_of(&uniform);
            model_data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        if !model_data.is_empty() {
            gpu.queue.write_buffer(&self.model_buffer, 0, &model_data);
        }

        // Materials
        self.prepared = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| PreparedNode {
                mesh_key: mesh_key(&node.mesh),
                material_bind_group: self.material_bind_group(&gpu.device, &node.material),
                model_offset: i as u32 * stride,
                is_top: node.role == NodeRole::Top,
            })
            .collect();
        self.prepared_revision = Some(scene.revision);
        log::debug!("Prepared scene revision {} ({} nodes)", scene.revision, self.prepared.len());
    }

    fn material_bind_group(&self, device: &wgpu::Device, material: &Material) -> wgpu::BindGroup {
        let uniform = MaterialUniform {
            base_color: material.base_color.to_array(),
            metallic: material.metallic,
            roughness: material.roughness.clamp(0.04, 1.0),
            _pad: [0.0; 2],
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("material buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let texture = match (&material.texture, &self.surface_texture) {
            (Some(_), Some(surface)) if surface.revision == material.texture_revision => &surface.view,
            _ => &self.white_texture,
        };
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material bind group"),
            layout: &self.material_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

fn mesh_key(mesh: &Arc<Mesh>) -> usize {
    Arc::as_ptr(mesh) as usize
}

fn upload_mesh(device: &wgpu::Device, mesh: &Arc<Mesh>) -> GpuMesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh vertices"),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh indices"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuMesh {
        _source: Arc::clone(mesh),
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
    }
}

/// Upload every mip level of `image` in one call.
fn upload_surface(gpu: &GpuContext, image: &SurfaceImage) -> wgpu::TextureView {
    let data: Vec<u8> = image.levels.iter().flat_map(|l| l.pixels.iter().copied()).collect();
    let texture = gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some("surface texture"),
            size: wgpu::Extent3d {
                width: image.width().max(1),
                height: image.height().max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: image.mip_count().max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &data,
    );
    log::debug!("Uploaded surface texture {}x{} ({} mips)", image.width(), image.height(), image.mip_count());
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn uniform_layout(device: &wgpu::Device, label: &str, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn whole_buffer_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth texture"),
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
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_model_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let align = device.limits().min_uniform_buffer_offset_alignment as usize;
    let stride = align_up(std::mem::size_of::<ModelUniform>(), align);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("model buffer"),
        size: (stride * capacity) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("model bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align.max(1)) * align.max(1)
}

fn to_wgpu_color([r, g, b, a]: [f64; 4]) -> wgpu::Color {
    wgpu::Color { r, g, b, a }
}

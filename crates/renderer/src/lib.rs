//! Renderer: wgpu surface + depth, lit meshes for every scene object, egui on top.
//! wgpu = 23.x, winit = 0.30.x

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use bytemuck::{Pod, Zeroable};
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, Sampler, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexState, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

use asset::texture::TextureData;
use corelib::camera::Camera;
use viewer::scene::{ObjectId, Scene};

pub mod egui_pass;
pub mod gpu_mesh;
pub mod lighting;

pub use egui_pass::EguiFrame;
pub use lighting::SceneLighting;

use gpu_mesh::{GpuObject, GpuVertex, PartBindings, PartUniform};
use lighting::hex_to_linear;

/// Frame-wide UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline
    pipeline: RenderPipeline,
    part_bgl: BindGroupLayout,
    sampler: Sampler,
    // Keeps the fallback texture alive for `white_view`.
    _white_tex: wgpu::Texture,
    white_view: TextureView,

    // Frame globals
    globals_buf: Buffer,
    globals_bg: BindGroup,
    lighting: SceneLighting,

    // Uploaded scene objects
    objects: HashMap<ObjectId, GpuObject>,

    egui: egui_wgpu::Renderer,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("No suitable GPU adapter for backends {backends:?}"))?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Viewer Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        // Configure surface
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mesh WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // ==== Bind group layouts ====
        let globals_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Globals BGL"),
            entries: &[uniform_entry::<GlobalsUniform>(
                0,
                ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            )],
        });
        let part_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Part BGL"),
            entries: &[
                uniform_entry::<PartUniform>(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals UBO"),
            contents: bytemuck::bytes_of(&GlobalsUniform::zeroed()),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let globals_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals BG"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buf.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Base Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white_tex = gpu_mesh::upload_texture(&device, &queue, &TextureData::white(), "White");
        let white_view = white_tex.create_view(&TextureViewDescriptor::default());

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&globals_bgl, &part_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Scanned anatomy rarely has consistent winding; draw both sides.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let egui = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        log::info!("GPU ready: {}x{}, surface format {:?}", width, height, surface_format);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            part_bgl,
            sampler,
            _white_tex: white_tex,
            white_view,
            globals_buf,
            globals_bg,
            lighting: SceneLighting::default(),
            objects: HashMap::new(),
            egui,
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Free released objects and upload new ones.
    fn sync_scene(&mut self, scene: &mut Scene) {
        for id in scene.drain_released() {
            if let Some(obj) = self.objects.remove(&id) {
                obj.destroy();
                log::debug!("Released GPU resources of {:?}", id);
            }
        }
        let bindings = PartBindings {
            layout: &self.part_bgl,
            sampler: &self.sampler,
            fallback_view: &self.white_view,
        };
        for obj in scene.iter() {
            if !self.objects.contains_key(&obj.id) {
                let gpu = GpuObject::upload(&self.device, &self.queue, &bindings, obj);
                log::debug!("Uploaded {:?} ('{}') to GPU", obj.id, obj.name);
                self.objects.insert(obj.id, gpu);
            }
        }
    }

    /// Render one frame: sync scene, draw objects, then the UI overlay.
    pub fn render(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        ui: Option<&EguiFrame>,
    ) -> Result<(), SurfaceError> {
        self.sync_scene(scene);

        // --- update uniforms
        let cam = camera.with_aspect(self.width as f32 / self.height as f32);
        let sun = self.lighting.sun_direction();
        let [sr, sg, sb] = hex_to_linear(self.lighting.sun_color);
        let [kr, kg, kb] = hex_to_linear(self.lighting.sky);
        let [gr, gg, gb] = hex_to_linear(self.lighting.ground);
        let globals = GlobalsUniform {
            view_proj: cam.proj_view().to_cols_array_2d(),
            light_dir: [sun.x, sun.y, sun.z, 0.0],
            light_color: [sr, sg, sb, self.lighting.sun_intensity],
            sky_color: [kr, kg, kb, self.lighting.hemisphere_intensity],
            ground_color: [gr, gg, gb, 1.0],
        };
        self.queue
            .write_buffer(&self.globals_buf, 0, bytemuck::bytes_of(&globals));
        for obj in scene.iter() {
            if let Some(gpu) = self.objects.get(&obj.id) {
                gpu.update_uniforms(&self.queue, obj);
            }
        }

        // --- frame & pass
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.lighting.clear_color()),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.globals_bg, &[]);
            for obj in scene.iter().filter(|o| o.opacity > 0.0) {
                if let Some(gpu) = self.objects.get(&obj.id) {
                    gpu.draw(&mut rpass);
                }
            }
        }

        let extra = match ui {
            Some(ui) => egui_pass::paint(
                &mut self.egui,
                &self.device,
                &self.queue,
                &mut encoder,
                &view,
                [self.width, self.height],
                ui,
            ),
            None => Vec::new(),
        };

        self.queue
            .submit(extra.into_iter().chain(Some(encoder.finish())));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

fn uniform_entry<T>(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

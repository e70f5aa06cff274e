//! GPU-side copies of scene objects: one vertex/index buffer pair, one
//! uniform buffer and one bind group per material part.

use bytemuck::{Pod, Zeroable};
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, BufferUsages, Device, Queue, RenderPass, Sampler,
    TextureView, VertexBufferLayout, VertexStepMode, util::DeviceExt,
};

use asset::{MeshData, texture::TextureData};
use viewer::scene::{RenderPart, SceneObject};

/// Vertex: position + normal + uv.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuVertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl GpuVertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };

    fn from_mesh(mesh: &MeshData) -> Vec<GpuVertex> {
        mesh.vertices
            .iter()
            .map(|v| GpuVertex {
                pos: v.position,
                normal: v.normal,
                uv: v.uv,
            })
            .collect()
    }
}

/// Per-part UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PartUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    base_color: [f32; 4],
}

struct GpuPart {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
    uniform_buf: Buffer,
    bind_group: BindGroup,
    texture: Option<wgpu::Texture>,
    diffuse: [f32; 3],
    material_opacity: f32,
}

pub struct GpuObject {
    parts: Vec<GpuPart>,
}

/// Shared resources every part bind group needs.
pub struct PartBindings<'a> {
    pub layout: &'a BindGroupLayout,
    pub sampler: &'a Sampler,
    pub fallback_view: &'a TextureView,
}

impl GpuObject {
    pub fn upload(
        device: &Device,
        queue: &Queue,
        bindings: &PartBindings<'_>,
        obj: &SceneObject,
    ) -> Self {
        let parts = obj
            .parts
            .iter()
            .filter(|p| p.mesh.is_valid())
            .map(|p| upload_part(device, queue, bindings, p, &obj.name))
            .collect();
        Self { parts }
    }

    /// Write transform, color and fade for this frame.
    pub fn update_uniforms(&self, queue: &Queue, obj: &SceneObject) {
        let model = obj.transform.matrix().to_cols_array_2d();
        let normal_matrix = obj.transform.normal_matrix().to_cols_array_2d();
        for part in &self.parts {
            let [r, g, b] = part.diffuse;
            let uniform = PartUniform {
                model,
                normal_matrix,
                base_color: [r, g, b, part.material_opacity * obj.opacity],
            };
            queue.write_buffer(&part.uniform_buf, 0, bytemuck::bytes_of(&uniform));
        }
    }

    pub fn draw(&self, rpass: &mut RenderPass<'_>) {
        for part in &self.parts {
            rpass.set_bind_group(1, &part.bind_group, &[]);
            rpass.set_vertex_buffer(0, part.vertex_buf.slice(..));
            rpass.set_index_buffer(part.index_buf.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..part.index_count, 0, 0..1);
        }
    }

    /// Free GPU memory now instead of waiting for the last reference to drop.
    pub fn destroy(self) {
        for part in self.parts {
            part.vertex_buf.destroy();
            part.index_buf.destroy();
            part.uniform_buf.destroy();
            if let Some(tex) = part.texture {
                tex.destroy();
            }
        }
    }
}

fn upload_part(
    device: &Device,
    queue: &Queue,
    bindings: &PartBindings<'_>,
    part: &RenderPart,
    object_name: &str,
) -> GpuPart {
    let vertices = GpuVertex::from_mesh(&part.mesh);
    let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{object_name} VB")),
        contents: bytemuck::cast_slice(&vertices),
        usage: BufferUsages::VERTEX,
    });
    let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{object_name} IB")),
        contents: bytemuck::cast_slice(&part.mesh.indices),
        usage: BufferUsages::INDEX,
    });
    let uniform_buf = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{object_name} part UBO")),
        size: std::mem::size_of::<PartUniform>() as u64,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let texture = part
        .material
        .texture
        .as_deref()
        .filter(|t| t.is_valid())
        .map(|t| upload_texture(device, queue, t, &part.material.name));
    let own_view = texture
        .as_ref()
        .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()));
    let view = own_view.as_ref().unwrap_or(bindings.fallback_view);

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{object_name} part BG")),
        layout: bindings.layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(bindings.sampler),
            },
        ],
    });

    GpuPart {
        vertex_buf,
        index_buf,
        index_count: part.mesh.indices.len() as u32,
        uniform_buf,
        bind_group,
        texture,
        diffuse: part.material.diffuse_linear(),
        material_opacity: part.material.opacity,
    }
}

/// Upload RGBA8 pixels as an sRGB texture.
pub fn upload_texture(
    device: &Device,
    queue: &Queue,
    data: &TextureData,
    label: &str,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(data.bytes_per_pixel() * data.width),
            rows_per_image: Some(data.height),
        },
        size,
    );
    texture
}

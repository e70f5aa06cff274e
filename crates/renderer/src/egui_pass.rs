//! egui overlay drawn on top of the 3D pass.

/// Tessellated UI for one frame.
pub struct EguiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Update textures and buffers, then draw with `LoadOp::Load` to keep the scene.
/// Returns extra command buffers that must be submitted before `encoder`.
pub(crate) fn paint(
    renderer: &mut egui_wgpu::Renderer,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    size_in_pixels: [u32; 2],
    frame: &EguiFrame,
) -> Vec<wgpu::CommandBuffer> {
    for (id, image_delta) in &frame.textures_delta.set {
        renderer.update_texture(device, queue, *id, image_delta);
    }

    let screen = egui_wgpu::ScreenDescriptor {
        size_in_pixels,
        pixels_per_point: frame.pixels_per_point,
    };
    let extra = renderer.update_buffers(device, queue, encoder, &frame.primitives, &screen);

    {
        let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("egui Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        renderer.render(&mut rpass.forget_lifetime(), &frame.primitives, &screen);
    }

    for id in &frame.textures_delta.free {
        renderer.free_texture(id);
    }
    extra
}

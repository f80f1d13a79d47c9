use fnv::FnvHashMap;
use wgpu::util::DeviceExt;
use web_sys as web;

use cube_core::{
    Camera, Dimensions, Mesh, MeshId, RenderBackend, Scene, Side, TextureData, WidgetError,
    Wrapping,
};

mod helpers;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct MeshUniforms {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
    uv_scale: [f32; 2],
    use_map: f32,
    _pad: f32,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    side: Side,
    // keep the texture alive for as long as the bind group references it
    _texture: Option<wgpu::Texture>,
}

/// WebGPU renderer bound to the widget canvas.
pub struct GpuRenderer {
    canvas: web::HtmlCanvasElement,
    pixel_ratio: f64,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: (wgpu::Texture, wgpu::TextureView),
    bind_group_layout: wgpu::BindGroupLayout,
    front_pipeline: wgpu::RenderPipeline,
    back_pipeline: wgpu::RenderPipeline,
    white_view: wgpu::TextureView,
    _white: wgpu::Texture,
    meshes: FnvHashMap<MeshId, GpuMesh>,
}

impl GpuRenderer {
    pub async fn new(
        canvas: &web::HtmlCanvasElement,
        dims: Dimensions,
        pixel_ratio: f64,
    ) -> anyhow::Result<Self> {
        let (width, height) = crate::dom::size_canvas(canvas, dims, pixel_ratio);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    // Use default limits on web to avoid passing unknown fields to older WebGPU impls
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth = helpers::create_depth_texture(&device, width, height);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(cube_core::MESH_WGSL.into()),
        });
        let bind_group_layout = helpers::create_mesh_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let front_pipeline =
            helpers::make_mesh_pipeline(&device, &pipeline_layout, &shader, format, Side::Front);
        let back_pipeline =
            helpers::make_mesh_pipeline(&device, &pipeline_layout, &shader, format, Side::Back);
        let (white, white_view) =
            helpers::upload_texture(&device, &queue, "white_tex", &TextureData::white());

        log::info!("[gpu] surface {}x{} format={:?}", width, height, format);
        Ok(Self {
            canvas: canvas.clone(),
            pixel_ratio,
            surface,
            device,
            queue,
            config,
            depth,
            bind_group_layout,
            front_pipeline,
            back_pipeline,
            white_view,
            _white: white,
            meshes: FnvHashMap::default(),
        })
    }

    fn reconfigure(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = helpers::create_depth_texture(&self.device, width, height);
    }
}

impl RenderBackend for GpuRenderer {
    fn create_mesh(&mut self, mesh: &Mesh) -> cube_core::Result<()> {
        let (vertices, indices) = mesh.geometry.build();
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vb"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_ib"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh_uniforms"),
            size: std::mem::size_of::<MeshUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (texture, view, wrap) = match &mesh.material.map {
            Some(map) => {
                let (tex, view) =
                    helpers::upload_texture(&self.device, &self.queue, "map_tex", &map.texture);
                (Some(tex), Some(view), map.wrap)
            }
            None => (None, None, Wrapping::ClampToEdge),
        };
        let sampler = helpers::create_sampler(&self.device, wrap);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mesh_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        view.as_ref().unwrap_or(&self.white_view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        self.meshes.insert(
            mesh.id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: indices.len() as u32,
                uniform_buffer,
                bind_group,
                side: mesh.material.side,
                _texture: texture,
            },
        );
        log::debug!("[gpu] uploaded {:?} {:?}", mesh.kind, mesh.id);
        Ok(())
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> cube_core::Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure(self.config.width, self.config.height);
                return Err(WidgetError::Render("surface lost; reconfigured".into()));
            }
            Err(e) => return Err(WidgetError::Render(format!("{:?}", e))),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let view_proj = camera.view_projection();
        for mesh in scene.meshes() {
            if let Some(gpu) = self.meshes.get(&mesh.id) {
                let u = MeshUniforms {
                    mvp: (view_proj * mesh.model_matrix()).to_cols_array_2d(),
                    color: mesh.material.color.to_linear_rgba(),
                    uv_scale: mesh.material.uv_scale(),
                    use_map: if mesh.material.map.is_some() { 1.0 } else { 0.0 },
                    _pad: 0.0,
                };
                self.queue
                    .write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&u));
            }
        }

        let [r, g, b, a] = scene.background.to_linear_rgba();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.1,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for mesh in scene.meshes() {
                let Some(gpu) = self.meshes.get(&mesh.id) else {
                    continue;
                };
                rpass.set_pipeline(match gpu.side {
                    Side::Front => &self.front_pipeline,
                    Side::Back => &self.back_pipeline,
                });
                rpass.set_bind_group(0, &gpu.bind_group, &[]);
                rpass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                rpass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                rpass.draw_indexed(0..gpu.index_count, 0, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn set_size(&mut self, dimensions: Dimensions) {
        let (w, h) = crate::dom::size_canvas(&self.canvas, dimensions, self.pixel_ratio);
        if w != self.config.width || h != self.config.height {
            self.reconfigure(w, h);
        }
    }
}

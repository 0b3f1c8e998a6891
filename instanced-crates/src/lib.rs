//! Renders a 32x32 grid of bobbing crates with one instanced draw call and
//! resolves mouse clicks to individual crates through an offscreen
//! instance-ID target.

mod blit;
mod grid;
mod picker;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use cgmath::{Point3, Vector3};
use framework::{CameraUniform, Display, DrawModel, UniformBinding};
use winit::dpi::PhysicalPosition;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use blit::BlitPipeline;
use grid::{CrateGrid, CRATE_COUNT};
use picker::Picker;

/// How fast the camera orbits the grid, in radians per second.
const ORBIT_RATE: f32 = 0.2;

/// The offscreen render targets: what the scene pass draws into.
///
/// The color buffer is blitted to the surface afterwards; the ID buffer
/// holds `instance_index + 1` per pixel (0 = background) and is only ever
/// read by the picker.
struct OffscreenTargets {
    color: framework::Texture,
    id: framework::Texture,
    depth: framework::Texture,
}

impl OffscreenTargets {
    const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
    const ID_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Uint;

    fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        Self {
            color: framework::Texture::create_render_target(
                device,
                config,
                Self::COLOR_FORMAT,
                "OffscreenTargets::color",
            ),
            id: framework::Texture::create_render_target(
                device,
                config,
                Self::ID_FORMAT,
                "OffscreenTargets::id",
            ),
            depth: framework::Texture::create_depth_texture(
                device,
                config,
                "OffscreenTargets::depth",
            ),
        }
    }

    fn size(&self) -> wgpu::Extent3d {
        self.id.size
    }
}

pub struct InstancedCrates {
    offscreen: OffscreenTargets,
    crate_model: framework::Model,
    scene_pipeline: wgpu::RenderPipeline,
    grid: CrateGrid,
    instance_buffer: wgpu::Buffer,
    camera: framework::Camera,
    projection: framework::Projection,
    uniforms: CameraUniform,
    uniform_binding: UniformBinding,
    blit: BlitPipeline,
    picker: Picker,
    cursor: Option<PhysicalPosition<f64>>,
    time: f32,
}

impl framework::Demo for InstancedCrates {
    fn init(display: &Display) -> Result<Self> {
        let device = &display.device;

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let res_dir = Path::new(env!("OUT_DIR")).join("res");
        let crate_model = framework::Model::load(
            device,
            &display.queue,
            &texture_layout,
            res_dir.join("crate.obj"),
        )?;

        let grid = CrateGrid::generate(&mut rand::thread_rng());
        log::info!("Generated {} crates", grid.crates().len());
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: CrateGrid::BUFFER_SIZE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera = framework::Camera::new(
            (5.0, 0.0, 2.0),
            (0.0, 0.0, 0.5),
            Vector3::unit_z(),
        );
        let projection = framework::Projection::new(
            display.config.width,
            display.config.height,
            cgmath::Deg(45.0),
            0.1,
            1000.0,
        );
        let mut uniforms = CameraUniform::new(device);
        uniforms.update_view_proj(&camera, &projection);
        uniforms.update_buffer(&display.queue);
        let uniform_binding = UniformBinding::new(device, &uniforms);

        let offscreen = OffscreenTargets::new(device, &display.config);

        let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));
        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_layout"),
            bind_group_layouts: &[&texture_layout, &uniform_binding.layout],
            push_constant_ranges: &[],
        });
        let scene_pipeline = framework::RenderPipelineBuilder::new()
            .layout(&scene_layout)
            .vertex_shader(&shader, "vs_main")
            .fragment_shader(&shader, "fs_main")
            .color_solid(OffscreenTargets::COLOR_FORMAT)
            .color_solid(OffscreenTargets::ID_FORMAT)
            .depth_format(framework::Texture::DEPTH_FORMAT)
            .vertex_buffer::<framework::ModelVertex>()
            .vertex_buffer_desc(grid::INSTANCE_LAYOUT)
            .build(device)?;

        let blit = BlitPipeline::new(device, display.config.format, &offscreen.color)?;
        let picker = Picker::new(device, &offscreen.id.view)?;

        Ok(Self {
            offscreen,
            crate_model,
            scene_pipeline,
            grid,
            instance_buffer,
            camera,
            projection,
            uniforms,
            uniform_binding,
            blit,
            picker,
            cursor: None,
            time: 0.0,
        })
    }

    fn process_mouse_moved(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = Some(position);
    }

    fn process_mouse_button(&mut self, display: &Display, button: MouseButton, pressed: bool) {
        if button != MouseButton::Left || !pressed {
            return;
        }
        let Some(position) = self.cursor else {
            return;
        };

        let picked = self
            .picker
            .pick_at(
                &display.device,
                &display.queue,
                position,
                self.offscreen.size(),
            )
            .unwrap_or_else(|e| panic!("Pick readback failed: {e}"));

        match picked {
            Some(index) => log::info!("Clicked crate {index}"),
            None => log::info!("Clicked background"),
        }
    }

    fn process_keyboard(&mut self, _key: KeyCode, _pressed: bool) {}

    fn resize(&mut self, display: &Display) {
        self.projection
            .resize(display.config.width, display.config.height);
        self.offscreen = OffscreenTargets::new(&display.device, &display.config);
        self.blit.rebind(&display.device, &self.offscreen.color);
        self.picker.rebind(&display.device, &self.offscreen.id.view);
    }

    fn update(&mut self, display: &Display, dt: Duration) {
        self.time += dt.as_secs_f32();

        let angle = self.time * ORBIT_RATE;
        self.camera.position = Point3::new(angle.cos() * 5.0, angle.sin() * 5.0, 2.0);
        self.uniforms.update_view_proj(&self.camera, &self.projection);
        self.uniforms.update_buffer(&display.queue);

        let positions = self.grid.positions(self.time);
        display
            .queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&positions));
    }

    fn render(&mut self, display: &mut Display) {
        let frame = match display.surface().get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Reconfiguring brings the surface back; skip this frame.
                let (width, height) = (display.config.width, display.config.height);
                display.resize(width, height);
                return;
            }
            Err(e) => panic!("{}", e),
        };
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = display.device.create_command_encoder(&Default::default());

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.offscreen.color.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                    // The ID target clears to 0, the reserved background value.
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.offscreen.id.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.offscreen.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_pipeline(&self.scene_pipeline);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            pass.draw_model_instanced(
                &self.crate_model,
                0..CRATE_COUNT,
                &self.uniform_binding.bind_group,
            );
        }

        self.blit.process(&mut encoder, &view);

        display.queue.submit([encoder.finish()]);
        frame.present();
    }
}

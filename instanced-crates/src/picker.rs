use anyhow::*;
use winit::dpi::PhysicalPosition;

/// Resolves mouse clicks against the offscreen instance-ID target.
///
/// A one-workgroup compute dispatch fetches the clicked texel and writes it
/// to a tiny storage buffer, which is then copied out and mapped. The
/// readback blocks until the GPU has caught up, which is fine for an
/// operation that only runs on user clicks.
pub struct Picker {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    click_buffer: wgpu::Buffer,
    result_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,
}

impl Picker {
    pub fn new(device: &wgpu::Device, id_target: &wgpu::TextureView) -> Result<Self> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Picker::layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Uint,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let click_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Picker::click_buffer"),
            size: 8,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let result_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Picker::result_buffer"),
            size: 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Picker::staging_buffer"),
            size: 4,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::include_wgsl!("picker.wgsl"));
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Picker::pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Picker::pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "pick",
        });

        let bind_group = Self::bind(
            device,
            &layout,
            id_target,
            &click_buffer,
            &result_buffer,
        );

        Ok(Self {
            pipeline,
            layout,
            bind_group,
            click_buffer,
            result_buffer,
            staging_buffer,
        })
    }

    /// Points the picker at a new ID target, after a resize recreated it.
    pub fn rebind(&mut self, device: &wgpu::Device, id_target: &wgpu::TextureView) {
        self.bind_group = Self::bind(
            device,
            &self.layout,
            id_target,
            &self.click_buffer,
            &self.result_buffer,
        );
    }

    fn bind(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        id_target: &wgpu::TextureView,
        click_buffer: &wgpu::Buffer,
        result_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Picker::bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(id_target),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: click_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: result_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Fetches the instance ID under `position` and resolves it to a crate
    /// index. Returns `None` for background pixels and clicks outside the
    /// target.
    pub fn pick_at(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        position: PhysicalPosition<f64>,
        size: wgpu::Extent3d,
    ) -> Result<Option<u32>> {
        let Some((x, y)) = texel_at(position, size) else {
            return Ok(None);
        };
        queue.write_buffer(&self.click_buffer, 0, bytemuck::cast_slice(&[x, y]));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Picker::encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Picker::pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&self.result_buffer, 0, &self.staging_buffer, 0, 4);
        queue.submit([encoder.finish()]);

        // The map callback only fires once the device is polled, so block
        // here until the GPU has flushed the work above.
        let slice = self.staging_buffer.slice(..);
        let (tx, rx) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| tx.send(result).unwrap());
        device.poll(wgpu::Maintain::Wait);
        rx.recv()??;

        let raw = {
            let view = slice.get_mapped_range();
            let words: &[u32] = bytemuck::cast_slice(&view);
            words[0]
        };
        self.staging_buffer.unmap();

        Ok(resolve_hit(raw))
    }
}

/// Maps a cursor position to a texel of the ID target.
///
/// winit reports cursor positions in physical pixels with a top-left
/// origin, which is also the coordinate space of wgpu render targets, so
/// the conversion is a truncation plus a bounds check. (Display scaling is
/// already folded into the physical position; bottom-up GL-style targets
/// would additionally need a y-flip.)
pub fn texel_at(position: PhysicalPosition<f64>, size: wgpu::Extent3d) -> Option<(u32, u32)> {
    if position.x < 0.0 || position.y < 0.0 {
        return None;
    }
    let (x, y) = (position.x as u32, position.y as u32);
    if x >= size.width || y >= size.height {
        return None;
    }
    Some((x, y))
}

/// 0 is reserved for "no crate"; everything else is the index shifted by one.
pub fn resolve_hit(raw: u32) -> Option<u32> {
    if raw == 0 {
        None
    } else {
        Some(raw - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: u32, height: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    #[test]
    fn texels_truncate_to_the_containing_pixel() {
        let test_data = [
            ((0.0, 0.0), Some((0, 0))),
            ((12.7, 400.2), Some((12, 400))),
            ((799.9, 599.9), Some((799, 599))),
        ];

        for ((x, y), expected) in test_data {
            assert_eq!(texel_at(PhysicalPosition::new(x, y), size(800, 600)), expected);
        }
    }

    #[test]
    fn clicks_outside_the_target_are_rejected() {
        let test_data = [
            (-1.0, 10.0),
            (10.0, -0.5),
            (800.0, 10.0),
            (10.0, 600.0),
        ];

        for (x, y) in test_data {
            assert_eq!(texel_at(PhysicalPosition::new(x, y), size(800, 600)), None);
        }
    }

    #[test]
    fn zero_resolves_to_background() {
        assert_eq!(resolve_hit(0), None);
    }

    #[test]
    fn hits_are_shifted_down_by_one() {
        assert_eq!(resolve_hit(1), Some(0));
        assert_eq!(resolve_hit(1024), Some(1023));
    }
}

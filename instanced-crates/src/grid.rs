use rand::Rng;
use std::mem;

/// Crates per side of the grid.
pub const GRID_DIM: u32 = 32;
/// Total number of crates.
pub const CRATE_COUNT: u32 = GRID_DIM * GRID_DIM;
/// Distance between neighboring lattice points.
const SPACING: f32 = 1.5;
/// Maximum random offset of a crate from its lattice point, per axis.
const JITTER: f32 = 0.2;
/// Peak of the bobbing animation.
const AMPLITUDE: f32 = 0.2;

/// One crate in the grid. The resting position and animation coefficients
/// are fixed at startup; only the derived z-offset varies with time.
#[derive(Debug, Clone, Copy)]
pub struct CrateInstance {
    x: f32,
    y: f32,
    phase_rate: f32,
    phase_offset: f32,
}

impl CrateInstance {
    pub fn z_offset(&self, time: f32) -> f32 {
        AMPLITUDE * (self.phase_rate * time + self.phase_offset).sin()
    }

    pub fn position(&self, time: f32) -> [f32; 3] {
        [self.x, self.y, self.z_offset(time)]
    }
}

/// The per-instance data as it goes into the vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub position: [f32; 3],
}

pub const INSTANCE_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &wgpu::vertex_attr_array![3 => Float32x3],
};

pub struct CrateGrid {
    crates: Vec<CrateInstance>,
}

impl CrateGrid {
    /// Size in bytes of the instance buffer the grid writes into.
    pub const BUFFER_SIZE: wgpu::BufferAddress =
        (CRATE_COUNT as usize * mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress;

    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let crates = (0..CRATE_COUNT)
            .map(|i| {
                let col = (i % GRID_DIM) as f32;
                let row = (i / GRID_DIM) as f32;
                let half = (GRID_DIM / 2) as f32;
                CrateInstance {
                    x: (col - half) * SPACING + rng.gen_range(-JITTER..JITTER),
                    y: (row - half) * SPACING + rng.gen_range(-JITTER..JITTER),
                    phase_rate: rng.gen_range(0.7..0.8),
                    phase_offset: rng.gen_range(0.0..6.3),
                }
            })
            .collect();

        Self { crates }
    }

    /// The full instance position array for the given point in time,
    /// rewritten from scratch each frame.
    pub fn positions(&self, time: f32) -> Vec<InstanceRaw> {
        self.crates
            .iter()
            .map(|c| InstanceRaw {
                position: c.position(time),
            })
            .collect()
    }

    pub fn crates(&self) -> &[CrateInstance] {
        &self.crates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid() -> CrateGrid {
        CrateGrid::generate(&mut StdRng::seed_from_u64(0xC0FFEE))
    }

    #[test]
    fn generates_the_full_grid() {
        assert_eq!(grid().crates().len(), 1024);
    }

    #[test]
    fn resting_positions_stay_near_their_lattice_point() {
        let grid = grid();
        for (i, c) in grid.crates().iter().enumerate() {
            let lattice_x = (i as u32 % GRID_DIM) as f32 * SPACING - 16.0 * SPACING;
            let lattice_y = (i as u32 / GRID_DIM) as f32 * SPACING - 16.0 * SPACING;
            assert!(
                (c.x - lattice_x).abs() <= JITTER,
                "crate {} strayed in x: {} vs {}",
                i,
                c.x,
                lattice_x
            );
            assert!(
                (c.y - lattice_y).abs() <= JITTER,
                "crate {} strayed in y: {} vs {}",
                i,
                c.y,
                lattice_y
            );
        }
    }

    #[test]
    fn animation_coefficients_are_in_range() {
        for c in grid().crates() {
            assert!((0.7..0.8).contains(&c.phase_rate));
            assert!((0.0..6.3).contains(&c.phase_offset));
        }
    }

    #[test]
    fn z_offset_follows_the_sinusoid() {
        let grid = grid();
        for t in [0.0, 0.5, 17.3] {
            for c in grid.crates() {
                let expected = AMPLITUDE * (c.phase_rate * t + c.phase_offset).sin();
                assert_eq!(c.z_offset(t), expected);
                assert!(c.z_offset(t).abs() <= AMPLITUDE);
            }
        }
    }

    #[test]
    fn instance_buffer_is_tightly_packed() {
        assert_eq!(mem::size_of::<InstanceRaw>(), 12);
        assert_eq!(CrateGrid::BUFFER_SIZE, 12 * 1024);

        let positions = grid().positions(1.0);
        let bytes: &[u8] = bytemuck::cast_slice(&positions);
        assert_eq!(bytes.len() as wgpu::BufferAddress, CrateGrid::BUFFER_SIZE);
    }
}

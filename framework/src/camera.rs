use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A look-at camera. The demos reposition it directly each frame, so there
/// is no controller here.
#[derive(Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, T: Into<Point3<f32>>>(
        position: V,
        target: T,
        up: Vector3<f32>,
    ) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up,
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ndc_z(proj: &Projection, view_z: f32) -> f32 {
        let clip = proj.calc_matrix() * Vector4::new(0.0, 0.0, view_z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn depth_range_is_zero_to_one() {
        // wgpu clip space puts the near plane at z = 0 and the far plane at
        // z = 1, unlike OpenGL's [-1, 1].
        let proj = Projection::new(800, 600, Deg(45.0), 0.1, 1000.0);
        assert!(ndc_z(&proj, -0.1).abs() < 1e-5);
        assert!((ndc_z(&proj, -1000.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut proj = Projection::new(800, 600, Deg(45.0), 0.1, 1000.0);
        proj.resize(400, 400);
        assert_eq!(proj.aspect, 1.0);
    }

    #[test]
    fn camera_looks_down_its_axis() {
        let camera = Camera::new((0.0, -5.0, 0.0), (0.0, 0.0, 0.0), Vector3::unit_z());
        let view = camera.calc_matrix();
        // The target should land on the view-space -z axis.
        let p = view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(p.x.abs() < 1e-5);
        assert!(p.y.abs() < 1e-5);
        assert!((p.z + 5.0).abs() < 1e-5);
    }
}

//! Orbit camera, projection, and the uniform block the vertex shader reads.

use iced::mouse;
use nalgebra::{Matrix4, Point3, Vector3};

const MOUSE_SENSITIVITY: f32 = 0.5;
const ZOOM_SENSITIVITY: f32 = 0.25;
const MIN_DISTANCE: f32 = 2.5;
const MAX_DISTANCE: f32 = 8.0;

/// Distance of the eye from the puzzle before any zooming.
pub(crate) const DEFAULT_DISTANCE: f32 = 3.0;

/// nalgebra builds OpenGL style clip space with depth in `[-1, 1]`; wgpu expects `[0, 1]`.
#[rustfmt::skip]
pub(crate) const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

#[derive(Debug, Clone)]
pub(crate) struct Camera {
    pub(crate) eye: Point3<f32>,
    pub(crate) target: Point3<f32>,
    pub(crate) up: Vector3<f32>,
}

impl Camera {
    pub(crate) fn build_view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye, &self.target, &self.up)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, DEFAULT_DISTANCE),
            target: Point3::origin(),
            up: Vector3::y(),
        }
    }
}

/// Turns right-drags into an orbit around the origin and wheel steps into zoom.
#[derive(Debug, Clone)]
pub(crate) struct CameraController {
    pub(crate) distance: f32,
    /// Degrees about the vertical axis.
    pub(crate) yaw: f32,
    /// Degrees above the horizontal plane.
    pub(crate) pitch: f32,
    dragging: bool,
}

impl CameraController {
    pub(crate) fn new(distance: f32) -> Self {
        Self {
            distance,
            yaw: 0.0,
            pitch: 0.0,
            dragging: false,
        }
    }

    pub(crate) fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub(crate) fn update_camera(&self, camera: &mut Camera) {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();

        camera.eye = Point3::new(
            self.distance * pitch.cos() * yaw.sin(),
            self.distance * pitch.sin(),
            self.distance * pitch.cos() * yaw.cos(),
        );
        camera.target = Point3::origin();
        camera.up = Vector3::y();
    }

    pub(crate) fn process_mouse_press(&mut self, button: mouse::Button) {
        if button == mouse::Button::Right {
            self.dragging = true;
        }
    }

    pub(crate) fn process_mouse_release(&mut self, button: mouse::Button) {
        if button == mouse::Button::Right {
            self.dragging = false;
        }
    }

    /// Orbits by a cursor movement in logical pixels. Ignored unless dragging.
    pub(crate) fn process_mouse_motion(&mut self, delta_x: f32, delta_y: f32) {
        if !self.dragging {
            return;
        }
        self.yaw -= delta_x * MOUSE_SENSITIVITY;
        self.pitch = (self.pitch + delta_y * MOUSE_SENSITIVITY).clamp(-89.0, 89.0);
    }

    pub(crate) fn process_scroll(&mut self, delta: f32) {
        self.distance = (self.distance - delta * ZOOM_SENSITIVITY).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Projection {
    pub(crate) aspect: f32,
    /// Vertical field of view in radians.
    pub(crate) fovy: f32,
    pub(crate) znear: f32,
    pub(crate) zfar: f32,
}

impl Projection {
    pub(crate) fn build_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * Matrix4::new_perspective(self.aspect, self.fovy, self.znear, self.zfar)
    }
}

impl Default for Projection {
    /// A frustum one unit tall at a distance of two.
    fn default() -> Self {
        Self {
            aspect: 4.0 / 3.0,
            fovy: 2.0 * 0.5f32.atan(),
            znear: 1.0,
            zfar: 12.0,
        }
    }
}

/// Model transform for a puzzle spun by `view_angle` degrees: half size, turned about the
/// vertical axis and a quarter as fast about the horizontal one.
pub(crate) fn model_matrix(view_angle: f32) -> Matrix4<f32> {
    let yaw = Matrix4::new_rotation(Vector3::y() * view_angle.to_radians());
    let tilt = Matrix4::new_rotation(Vector3::x() * (view_angle * 0.25).to_radians());
    yaw * tilt * Matrix4::new_scaling(0.5)
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct CameraUniform {
    pub(crate) view_proj: [[f32; 4]; 4],
    pub(crate) model: [[f32; 4]; 4],
}

impl CameraUniform {
    pub(crate) fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
            model: Matrix4::identity().into(),
        }
    }

    pub(crate) fn update(&mut self, camera: &Camera, projection: &Projection, model: &Matrix4<f32>) {
        self.view_proj = (projection.build_projection_matrix() * camera.build_view_matrix()).into();
        self.model = (*model).into();
    }
}

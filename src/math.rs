//! Small transform toolkit for the puzzle model.
//!
//! Matrices are nalgebra column-vector matrices. The model talks about transforms in
//! "first this, then that" order, which [`then`] turns into the right matrix product.

use nalgebra::{Matrix4, Vector3};

/// Scale of the 16.16 fixed-point encoding used by the world buffers.
pub(crate) const FIXED_ONE: f32 = 65536.0;

const TWO_PI: f32 = std::f32::consts::PI * 2.0;

/// Encodes a float as 16.16 fixed point, truncating toward zero.
pub(crate) fn to_fixed(value: f32) -> i32 {
    (value * FIXED_ONE) as i32
}

/// Decodes a buffer value; the shader does the same division.
#[cfg(test)]
pub(crate) fn from_fixed(value: i32) -> f32 {
    value as f32 / FIXED_ONE
}

/// Brings an angle in radians into `[0, 2π)`.
pub(crate) fn normalize_angle(mut angle: f32) -> f32 {
    while angle >= TWO_PI {
        angle -= TWO_PI;
    }
    while angle < 0.0 {
        angle += TWO_PI;
    }
    angle
}

/// Rotation about X: `(y, z) -> (y cos - z sin, y sin + z cos)`.
#[rustfmt::skip]
pub(crate) fn rotation_x(angle: f32) -> Matrix4<f32> {
    let (sin, cos) = angle.sin_cos();
    Matrix4::new(
        1.0, 0.0,  0.0, 0.0,
        0.0, cos, -sin, 0.0,
        0.0, sin,  cos, 0.0,
        0.0, 0.0,  0.0, 1.0,
    )
}

/// Rotation about Y: `(x, z) -> (x cos - z sin, x sin + z cos)`.
#[rustfmt::skip]
pub(crate) fn rotation_y(angle: f32) -> Matrix4<f32> {
    let (sin, cos) = angle.sin_cos();
    Matrix4::new(
        cos, 0.0, -sin, 0.0,
        0.0, 1.0,  0.0, 0.0,
        sin, 0.0,  cos, 0.0,
        0.0, 0.0,  0.0, 1.0,
    )
}

/// Rotation about Z: `(x, y) -> (x cos - y sin, x sin + y cos)`.
#[rustfmt::skip]
pub(crate) fn rotation_z(angle: f32) -> Matrix4<f32> {
    let (sin, cos) = angle.sin_cos();
    Matrix4::new(
        cos, -sin, 0.0, 0.0,
        sin,  cos, 0.0, 0.0,
        0.0,  0.0, 1.0, 0.0,
        0.0,  0.0, 0.0, 1.0,
    )
}

/// The transform that applies `first` and then `second`.
pub(crate) fn then(first: &Matrix4<f32>, second: &Matrix4<f32>) -> Matrix4<f32> {
    second * first
}

/// Applies an affine transform to a point.
pub(crate) fn transform_point(transform: &Matrix4<f32>, point: &Vector3<f32>) -> Vector3<f32> {
    (transform * point.push(1.0)).xyz()
}

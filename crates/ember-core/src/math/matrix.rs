// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the 4x4 matrix type used for world, view and projection transforms.

use super::{Vec3, Vec4, EPSILON};
use std::ops::Mul;

/// A 4x4 column-major matrix.
///
/// Vectors are treated as columns and transformed with `matrix * vector`, so
/// `a * b` applies `b` first. Translation lives in `cols[3]`.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// A 4x4 matrix with all elements set to 0.
    pub const ZERO: Self = Self {
        cols: [Vec4::ZERO; 4],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix as a `Vec4`.
    #[inline]
    pub fn row(&self, index: usize) -> Vec4 {
        Vec4::new(
            self.cols[0].get(index),
            self.cols[1].get(index),
            self.cols[2].get(index),
            self.cols[3].get(index),
        )
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::new(v.x, v.y, v.z, 1.0))
    }

    /// Creates a matrix rotating `angle` radians around the X axis.
    pub fn from_rotation_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_cols(
            Vec4::X,
            Vec4::new(0.0, c, s, 0.0),
            Vec4::new(0.0, -s, c, 0.0),
            Vec4::W,
        )
    }

    /// Creates a matrix rotating `angle` radians around the Y axis.
    pub fn from_rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_cols(
            Vec4::new(c, 0.0, -s, 0.0),
            Vec4::Y,
            Vec4::new(s, 0.0, c, 0.0),
            Vec4::W,
        )
    }

    /// Creates a matrix rotating `angle` radians around the Z axis.
    pub fn from_rotation_z(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_cols(
            Vec4::new(c, s, 0.0, 0.0),
            Vec4::new(-s, c, 0.0, 0.0),
            Vec4::Z,
            Vec4::W,
        )
    }

    /// Creates a matrix rotating `angle` radians around an arbitrary `axis`.
    ///
    /// The axis does not need to be normalized.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let Vec3 { x, y, z } = axis.normalize();
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Self::from_cols(
            Vec4::new(t * x * x + c, t * x * y + s * z, t * x * z - s * y, 0.0),
            Vec4::new(t * x * y - s * z, t * y * y + c, t * y * z + s * x, 0.0),
            Vec4::new(t * x * z + s * y, t * y * z - s * x, t * z * z + c, 0.0),
            Vec4::W,
        )
    }

    /// Creates a left-handed view matrix looking from `eye` towards `target`.
    ///
    /// # Returns
    ///
    /// `None` if `eye` and `target` coincide or `up` is parallel to the view direction.
    pub fn look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let f = Vec3::difference(eye, target).normalize();
        let s = up.cross(f).normalize();
        if f.length_squared() < EPSILON || s.length_squared() < EPSILON {
            return None;
        }
        let u = f.cross(s);

        Some(Self::from_cols(
            Vec4::new(s.x, u.x, f.x, 0.0),
            Vec4::new(s.y, u.y, f.y, 0.0),
            Vec4::new(s.z, u.z, f.z, 0.0),
            Vec4::new(-s.dot(eye), -u.dot(eye), -f.dot(eye), 1.0),
        ))
    }

    /// Creates a left-handed perspective projection with a `[0, 1]` depth range.
    pub fn perspective_lh(fov_y: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        let y_scale = 1.0 / (0.5 * fov_y).tan();
        let x_scale = y_scale / aspect_ratio;
        let q = z_far / (z_far - z_near);
        Self::from_cols(
            Vec4::new(x_scale, 0.0, 0.0, 0.0),
            Vec4::new(0.0, y_scale, 0.0, 0.0),
            Vec4::new(0.0, 0.0, q, 1.0),
            Vec4::new(0.0, 0.0, -z_near * q, 0.0),
        )
    }

    /// Returns the transpose of the matrix.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.row(0), self.row(1), self.row(2), self.row(3))
    }

    /// Returns the elements as a flat column-major array.
    #[inline]
    pub fn to_cols_array(&self) -> [f32; 16] {
        bytemuck::cast(*self)
    }

    /// Computes the determinant of the matrix.
    pub fn determinant(&self) -> f32 {
        let m = self.to_cols_array();
        let cof = cofactors(&m);
        m[0] * cof[0] + m[1] * cof[4] + m[2] * cof[8] + m[3] * cof[12]
    }

    /// Computes the inverse of the matrix with the cofactor method.
    ///
    /// Returns `None` if the matrix is not invertible.
    ///
    /// # Examples
    ///
    /// ```
    /// use ember_core::math::{Mat4, Vec3};
    /// let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    /// let inv = m.inverse().unwrap();
    /// assert_eq!(inv.transform_point(Vec3::new(1.0, 2.0, 3.0)), Vec3::ZERO);
    /// assert!(Mat4::ZERO.inverse().is_none());
    /// ```
    pub fn inverse(&self) -> Option<Self> {
        let m = self.to_cols_array();
        let cof = cofactors(&m);
        let det = m[0] * cof[0] + m[1] * cof[4] + m[2] * cof[8] + m[3] * cof[12];
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let mut out = [0.0f32; 16];
        for (dst, c) in out.iter_mut().zip(cof.iter()) {
            *dst = c * inv_det;
        }
        Some(bytemuck::cast(out))
    }

    /// Transforms a point, applying the perspective divide when `w` is not 1.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        let v = *self * Vec4::from_point(point);
        if v.w.abs() > EPSILON && (v.w - 1.0).abs() > EPSILON {
            v.truncate() / v.w
        } else {
            v.truncate()
        }
    }

    /// Transforms a direction. Translation is ignored.
    #[inline]
    pub fn transform_vector(&self, direction: Vec3) -> Vec3 {
        (*self * Vec4::from_direction(direction)).truncate()
    }
}

/// Computes the adjugate of a flat 4x4 matrix.
///
/// The layout of the result matches the layout of the input, which makes it valid
/// for both row- and column-major storage.
fn cofactors(m: &[f32; 16]) -> [f32; 16] {
    let mut inv = [0.0f32; 16];
    inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
        + m[9] * m[7] * m[14]
        + m[13] * m[6] * m[11]
        - m[13] * m[7] * m[10];
    inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
        - m[8] * m[7] * m[14]
        - m[12] * m[6] * m[11]
        + m[12] * m[7] * m[10];
    inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
        + m[8] * m[7] * m[13]
        + m[12] * m[5] * m[11]
        - m[12] * m[7] * m[9];
    inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
        - m[8] * m[6] * m[13]
        - m[12] * m[5] * m[10]
        + m[12] * m[6] * m[9];
    inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
        - m[9] * m[3] * m[14]
        - m[13] * m[2] * m[11]
        + m[13] * m[3] * m[10];
    inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
        + m[8] * m[3] * m[14]
        + m[12] * m[2] * m[11]
        - m[12] * m[3] * m[10];
    inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
        - m[8] * m[3] * m[13]
        - m[12] * m[1] * m[11]
        + m[12] * m[3] * m[9];
    inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
        + m[8] * m[2] * m[13]
        + m[12] * m[1] * m[10]
        - m[12] * m[2] * m[9];
    inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
        + m[5] * m[3] * m[14]
        + m[13] * m[2] * m[7]
        - m[13] * m[3] * m[6];
    inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
        - m[4] * m[3] * m[14]
        - m[12] * m[2] * m[7]
        + m[12] * m[3] * m[6];
    inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
        + m[4] * m[3] * m[13]
        + m[12] * m[1] * m[7]
        - m[12] * m[3] * m[5];
    inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
        - m[4] * m[2] * m[13]
        - m[12] * m[1] * m[6]
        + m[12] * m[2] * m[5];
    inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
        - m[5] * m[3] * m[10]
        - m[9] * m[2] * m[7]
        + m[9] * m[3] * m[6];
    inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
        + m[4] * m[3] * m[10]
        + m[8] * m[2] * m[7]
        - m[8] * m[3] * m[6];
    inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
        - m[4] * m[3] * m[9]
        - m[8] * m[1] * m[7]
        + m[8] * m[3] * m[5];
    inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
        + m[4] * m[2] * m[9]
        + m[8] * m[1] * m[6]
        - m[8] * m[2] * m[5];
    inv
}

// --- Operators Overloading ---

impl Default for Mat4 {
    /// Returns the 4x4 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat4) -> Self {
        Self::from_cols(
            self * rhs.cols[0],
            self * rhs.cols[1],
            self * rhs.cols[2],
            self * rhs.cols[3],
        )
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    #[inline]
    fn mul(self, rhs: Vec4) -> Vec4 {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, FRAC_PI_2, PI};
    use approx::assert_relative_eq;

    fn vec3_approx_eq(a: Vec3, b: Vec3) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
    }

    fn mat4_approx_eq(a: Mat4, b: Mat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| approx_eq(*x, *y))
    }

    #[test]
    fn test_identity() {
        assert_eq!(Mat4::default(), Mat4::IDENTITY);
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(mat4_approx_eq(m * Mat4::IDENTITY, m));
        assert!(mat4_approx_eq(Mat4::IDENTITY * m, m));
    }

    #[test]
    fn test_translation() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let p = m.transform_point(Vec3::ONE);
        assert!(vec3_approx_eq(p, Vec3::new(2.0, 3.0, 4.0)));
        // Directions ignore translation.
        assert!(vec3_approx_eq(m.transform_vector(Vec3::X), Vec3::X));
    }

    #[test]
    fn test_rotations() {
        let rx = Mat4::from_rotation_x(FRAC_PI_2);
        assert!(vec3_approx_eq(rx.transform_point(Vec3::Y), Vec3::Z));

        let ry = Mat4::from_rotation_y(FRAC_PI_2);
        assert!(vec3_approx_eq(ry.transform_point(Vec3::X), -Vec3::Z));

        let rz = Mat4::from_rotation_z(FRAC_PI_2);
        assert!(vec3_approx_eq(rz.transform_point(Vec3::X), Vec3::Y));
    }

    #[test]
    fn test_axis_angle_matches_principal_rotations() {
        let angle = PI / 3.0;
        assert!(mat4_approx_eq(
            Mat4::from_axis_angle(Vec3::X, angle),
            Mat4::from_rotation_x(angle)
        ));
        assert!(mat4_approx_eq(
            Mat4::from_axis_angle(Vec3::new(0.0, 2.0, 0.0), angle),
            Mat4::from_rotation_y(angle)
        ));
        assert!(mat4_approx_eq(
            Mat4::from_axis_angle(Vec3::Z, angle),
            Mat4::from_rotation_z(angle)
        ));
    }

    #[test]
    fn test_transpose() {
        let m = Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0));
        let t = m.transpose();
        assert_eq!(t.row(3), Vec4::W);
        assert_eq!(t.cols[0].w, 5.0);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn test_determinant() {
        assert_relative_eq!(Mat4::IDENTITY.determinant(), 1.0);
        let scaled = Mat4::from_cols(
            Vec4::new(2.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 3.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 4.0, 0.0),
            Vec4::W,
        );
        assert_relative_eq!(scaled.determinant(), 24.0);
        assert_relative_eq!(Mat4::from_rotation_y(1.0).determinant(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_inverse() {
        let m = Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0))
            * Mat4::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7);
        let inv = m.inverse().expect("matrix should be invertible");
        assert!(mat4_approx_eq(m * inv, Mat4::IDENTITY));
        assert!(mat4_approx_eq(inv * m, Mat4::IDENTITY));
    }

    #[test]
    fn test_inverse_singular() {
        let flat = Mat4::from_cols(Vec4::X, Vec4::X, Vec4::Z, Vec4::W);
        assert!(flat.inverse().is_none());
    }

    #[test]
    fn test_look_at_lh() {
        let eye = Vec3::new(0.0, 0.0, -10.0);
        let view = Mat4::look_at_lh(eye, Vec3::ZERO, Vec3::Y).unwrap();
        assert!(vec3_approx_eq(view.transform_point(eye), Vec3::ZERO));
        assert!(vec3_approx_eq(
            view.transform_point(Vec3::ZERO),
            Vec3::new(0.0, 0.0, 10.0)
        ));
        assert!(Mat4::look_at_lh(eye, eye, Vec3::Y).is_none());
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective_lh(FRAC_PI_2, 1.0, 1.0, 100.0);
        let near = proj.transform_point(Vec3::new(0.0, 0.0, 1.0));
        let far = proj.transform_point(Vec3::new(0.0, 0.0, 100.0));
        assert!(approx_eq(near.z, 0.0));
        assert!(approx_eq(far.z, 1.0));
    }
}

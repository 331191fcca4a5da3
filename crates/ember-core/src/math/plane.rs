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

//! Defines the `Plane` type used for frustum clipping and point classification.

use super::{Vec3, EPSILON};

/// The side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halfspace {
    /// In front of the plane (same side as the normal).
    Front,
    /// Behind the plane.
    Back,
    /// On the plane, within [`EPSILON`].
    Planar,
}

/// An infinite plane stored as a unit normal, a point on the plane and the
/// signed distance term `d` of `n·p + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    /// The unit normal of the plane.
    pub normal: Vec3,
    /// A point lying on the plane.
    pub point: Vec3,
    /// The `d` term of the plane equation.
    pub distance: f32,
}

impl Plane {
    /// Creates a plane from a normal and a point on it.
    pub fn from_normal_point(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            point,
            distance: -normal.dot(point),
        }
    }

    /// Creates a plane from a normal and its `d` term.
    pub fn from_normal_distance(normal: Vec3, distance: f32) -> Self {
        Self {
            normal,
            point: normal * -distance,
            distance,
        }
    }

    /// Creates the plane passing through three points.
    ///
    /// The normal follows the winding `v0 -> v1 -> v2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ember_core::math::{Plane, Vec3};
    /// let p = Plane::from_points(Vec3::ZERO, Vec3::X, Vec3::Y);
    /// assert_eq!(p.normal, Vec3::Z);
    /// assert_eq!(p.distance, 0.0);
    /// ```
    pub fn from_points(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize();
        Self::from_normal_point(normal, v0)
    }

    /// Returns the signed distance from `point` to the plane.
    #[inline]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Classifies `point` relative to the plane.
    pub fn classify(&self, point: Vec3) -> Halfspace {
        let d = self.distance_to(point);
        if d > EPSILON {
            Halfspace::Front
        } else if d < -EPSILON {
            Halfspace::Back
        } else {
            Halfspace::Planar
        }
    }

    /// Returns the plane with its normal scaled to unit length.
    ///
    /// Used for planes extracted from matrices, whose normals are not unit length.
    pub fn normalized(self) -> Self {
        let len = self.normal.length();
        if len < EPSILON {
            return self;
        }
        Self::from_normal_distance(self.normal / len, self.distance / len)
    }
}

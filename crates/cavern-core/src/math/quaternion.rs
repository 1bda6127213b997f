// Copyright 2025 the cavern authors
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

//! Defines the `Quaternion` type for 3D rotations.
//!
//! Tracked poses arrive from the HMD runtime as a rotation quaternion plus
//! a position vector; this type exists mainly to carry that rotation into a
//! [`Mat4`](super::Mat4).

use super::{Vec3, EPSILON};

/// A quaternion representing a 3D rotation, stored as `(x, y, z, w)` with
/// `w` the scalar part.
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Quaternion {
    /// The x component of the vector part.
    pub x: f32,
    /// The y component of the vector part.
    pub y: f32,
    /// The z component of the vector part.
    pub z: f32,
    /// The scalar part.
    pub w: f32,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a quaternion from its raw components.
    #[inline]
    pub const fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a quaternion rotating by `angle` radians around `axis`.
    ///
    /// # Arguments
    ///
    /// * `axis`: The axis of rotation. Must be a unit vector.
    /// * `angle`: The angle of rotation in radians.
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: c,
        }
    }

    /// Returns the squared length of the quaternion.
    #[inline]
    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// Returns the length of the quaternion.
    #[inline]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns the normalized quaternion.
    ///
    /// Degenerate (near-zero) quaternions normalize to the identity.
    #[inline]
    pub fn normalize(&self) -> Self {
        let len_sq = self.length_squared();
        if len_sq <= EPSILON * EPSILON {
            Self::IDENTITY
        } else {
            let inv = 1.0 / len_sq.sqrt();
            Self {
                x: self.x * inv,
                y: self.y * inv,
                z: self.z * inv,
                w: self.w * inv,
            }
        }
    }
}

impl Default for Quaternion {
    /// Returns the identity rotation.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn test_identity_is_unit() {
        assert!(approx_eq(Quaternion::IDENTITY.length(), 1.0));
    }

    #[test]
    fn test_normalize_degenerate_returns_identity() {
        let q = Quaternion::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert_eq!(
            q.normalize(),
            Quaternion::IDENTITY,
            "zero quaternion should normalize to the identity rotation"
        );
    }

    #[test]
    fn test_from_axis_angle_is_unit() {
        let q = Quaternion::from_axis_angle(Vec3::Y, 1.3);
        assert!(
            approx_eq(q.length(), 1.0),
            "axis-angle construction from a unit axis should be unit length"
        );
    }
}

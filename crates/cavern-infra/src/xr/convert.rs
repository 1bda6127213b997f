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

//! Conversions between OpenXR wire types and the crate's math types.

use cavern_core::math::{Mat4, Quaternion, Vec3, Vec4, EPSILON};
use openxr as xr;

/// Builds a rigid transform from a runtime pose. The orientation is
/// normalized first; runtimes hand back slightly denormalized
/// quaternions under load.
pub fn pose_to_mat4(pose: xr::Posef) -> Mat4 {
    let rotation = Quaternion::from_xyzw(
        pose.orientation.x,
        pose.orientation.y,
        pose.orientation.z,
        pose.orientation.w,
    )
    .normalize();
    let translation = Vec3::new(pose.position.x, pose.position.y, pose.position.z);
    Mat4::from_rotation_translation(rotation, translation)
}

/// Asymmetric OpenGL projection from the runtime's per-eye field of view.
///
/// Clip z spans -1..1. A degenerate fov (all angles zero, as reported
/// before the first tracked frame) falls back to a symmetric 90 degree
/// frustum so early frames stay renderable.
pub fn fov_projection(fov: xr::Fovf, near: f32, far: f32) -> Mat4 {
    let (tan_left, tan_right, tan_up, tan_down) = {
        let l = fov.angle_left.tan();
        let r = fov.angle_right.tan();
        let u = fov.angle_up.tan();
        let d = fov.angle_down.tan();
        if (r - l).abs() <= EPSILON || (u - d).abs() <= EPSILON {
            (-1.0, 1.0, 1.0, -1.0)
        } else {
            (l, r, u, d)
        }
    };

    let width = tan_right - tan_left;
    let height = tan_up - tan_down;
    let depth = far - near;

    Mat4::from_cols(
        Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
        Vec4::new(
            (tan_right + tan_left) / width,
            (tan_up + tan_down) / height,
            -(far + near) / depth,
            -1.0,
        ),
        Vec4::new(0.0, 0.0, -2.0 * far * near / depth, 0.0),
    )
}

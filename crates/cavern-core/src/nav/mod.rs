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

//! The navigation matrix and its legacy composition rules.
//!
//! Navigation moves the *world*, not the viewer: translating "forward"
//! multiplies a negated translation onto the matrix, and the resolver later
//! maps tracked poses through the inverse. The composition sides are part
//! of the compatibility contract:
//!
//! - `translate`/`rotate`/`scale` pre-multiply (`N ← M · N`),
//! - the `world_*` variants post-multiply (`N ← N · M`),
//! - rotation angles are negated, translations negated, scales reciprocal.
//!
//! `scale` and `world_scale` really do differ only in the multiplication
//! side; the legacy API shipped that asymmetry and applications depend on
//! the composed results, so it is preserved as-is.

use crate::math::{Mat4, Vec3, DEG_TO_RAD};
use crate::sync::SharedSnapshot;
use std::sync::{Arc, Mutex};

/// The navigation matrix with its single-slot backup.
///
/// Mutators are called from the application thread; the render thread only
/// ever reads the published snapshot via [`Navigation::matrix_snapshot`].
/// Every mutation publishes the complete new matrix, so readers never see
/// intermediate states.
#[derive(Debug)]
pub struct Navigation {
    state: Mutex<NavState>,
    published: SharedSnapshot<Mat4>,
}

#[derive(Debug)]
struct NavState {
    matrix: Mat4,
    backup: Mat4,
}

impl Navigation {
    /// Creates a navigation state at the identity, with an identity backup.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NavState {
                matrix: Mat4::IDENTITY,
                backup: Mat4::IDENTITY,
            }),
            published: SharedSnapshot::new(Mat4::IDENTITY),
        }
    }

    /// Translates the navigated world by `(x, y, z)`.
    ///
    /// Composes `T(-x, -y, -z)` onto the left of the matrix.
    pub fn translate(&self, x: f32, y: f32, z: f32) {
        self.apply(|m| Mat4::from_translation(Vec3::new(-x, -y, -z)) * m);
    }

    /// Rotates the navigated world by `angle_deg` degrees about `axis`.
    ///
    /// `axis` is one of `x`/`y`/`z` (case-insensitive); any other character
    /// is a silent no-op. The angle is negated before building the rotation.
    pub fn rotate(&self, angle_deg: f32, axis: char) {
        if let Some(rotation) = rotation_about(angle_deg, axis) {
            self.apply(|m| rotation * m);
        }
    }

    /// Scales the navigated world by `(x, y, z)`.
    ///
    /// Composes the reciprocal scale onto the left of the matrix.
    pub fn scale(&self, x: f32, y: f32, z: f32) {
        self.apply(|m| Mat4::from_scale(Vec3::new(1.0 / x, 1.0 / y, 1.0 / z)) * m);
    }

    /// Like [`translate`](Self::translate), but composed onto the right of
    /// the matrix (applied in world space, before the existing navigation).
    pub fn world_translate(&self, x: f32, y: f32, z: f32) {
        self.apply(|m| m * Mat4::from_translation(Vec3::new(-x, -y, -z)));
    }

    /// Like [`rotate`](Self::rotate), but composed onto the right of the
    /// matrix. Unknown axis characters are a silent no-op.
    pub fn world_rotate(&self, angle_deg: f32, axis: char) {
        if let Some(rotation) = rotation_about(angle_deg, axis) {
            self.apply(|m| m * rotation);
        }
    }

    /// Like [`scale`](Self::scale), but composed onto the right of the
    /// matrix. The side difference against `scale` is a legacy quirk that
    /// is deliberately kept.
    pub fn world_scale(&self, x: f32, y: f32, z: f32) {
        self.apply(|m| m * Mat4::from_scale(Vec3::new(1.0 / x, 1.0 / y, 1.0 / z)));
    }

    /// Resets the navigation matrix to the identity.
    pub fn load_identity(&self) {
        self.apply(|_| Mat4::IDENTITY);
    }

    /// Replaces the navigation matrix with `m` (column-major).
    pub fn load_matrix(&self, m: [[f32; 4]; 4]) {
        let loaded = Mat4::from_cols_array_2d(m);
        self.apply(|_| loaded);
    }

    /// Returns the current navigation matrix (column-major).
    pub fn get_matrix(&self) -> [[f32; 4]; 4] {
        self.lock_state().matrix.to_cols_array_2d()
    }

    /// Multiplies `m` onto the left of the matrix: `N ← m · N`.
    ///
    /// `m` is column-major, the same convention as
    /// [`load_matrix`](Self::load_matrix).
    pub fn mult_matrix(&self, m: [[f32; 4]; 4]) {
        let factor = Mat4::from_cols_array_2d(m);
        self.apply(|n| factor * n);
    }

    /// Multiplies `m` onto the right of the matrix: `N ← N · m`.
    pub fn pre_mult_matrix(&self, m: [[f32; 4]; 4]) {
        let factor = Mat4::from_cols_array_2d(m);
        self.apply(|n| n * factor);
    }

    /// Copies the current matrix into the backup slot, overwriting any
    /// previous backup.
    pub fn store(&self) {
        let mut state = self.lock_state();
        state.backup = state.matrix;
    }

    /// Replaces the current matrix with the backup slot's contents.
    ///
    /// Without a prior [`store`](Self::store) this loads the identity the
    /// slot starts with. Restoring twice yields the same matrix twice; the
    /// slot is not consumed.
    pub fn restore(&self) {
        let mut state = self.lock_state();
        state.matrix = state.backup;
        let matrix = state.matrix;
        drop(state);
        self.published.publish(matrix);
    }

    /// Returns the latest published matrix snapshot.
    ///
    /// This is the render thread's read path; it never takes the mutator
    /// lock for longer than the snapshot swap.
    pub fn matrix_snapshot(&self) -> Arc<Mat4> {
        self.published.load()
    }

    fn apply(&self, f: impl FnOnce(Mat4) -> Mat4) {
        let mut state = self.lock_state();
        state.matrix = f(state.matrix);
        let matrix = state.matrix;
        drop(state);
        self.published.publish(matrix);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, NavState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the legacy rotation factor for `rotate`/`world_rotate`:
/// negated angle, axis by (case-insensitive) character, `None` for
/// anything that is not `x`, `y` or `z`.
fn rotation_about(angle_deg: f32, axis: char) -> Option<Mat4> {
    let rad = -angle_deg * DEG_TO_RAD;
    match axis.to_ascii_lowercase() {
        'x' => Some(Mat4::from_rotation_x(rad)),
        'y' => Some(Mat4::from_rotation_y(rad)),
        'z' => Some(Mat4::from_rotation_z(rad)),
        _ => None,
    }
}

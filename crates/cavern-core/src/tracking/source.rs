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

//! The pose-source seam to the HMD runtime.

use crate::error::TrackingError;
use crate::input::ControllerState;
use crate::math::Mat4;

/// Upper bound on the per-frame device array. Slots beyond this are
/// ignored by the resolver.
pub const MAX_TRACKED_DEVICES: usize = 16;

/// Classification of a tracked device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// The head-mounted display.
    Hmd,
    /// A tracked hand controller.
    Controller,
}

/// Which hand a controller is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    /// The left-hand controller.
    Left,
    /// The right-hand controller (the wand).
    Right,
}

/// One slot of the per-frame tracked-device array.
#[derive(Debug, Clone, Copy)]
pub struct TrackedDevice {
    /// What kind of device this slot is.
    pub class: DeviceClass,
    /// Hand assignment for controllers; `None` for the HMD.
    pub role: Option<Hand>,
    /// The device's rig-space pose in meters, or `None` when the device
    /// did not report a valid pose this frame.
    pub pose: Option<Mat4>,
}

/// One frame of tracking input from the runtime.
#[derive(Debug, Clone, Default)]
pub struct RawTrackingFrame {
    /// The tracked-device array for this frame.
    pub devices: Vec<TrackedDevice>,
    /// The right-hand controller's input state, when the runtime
    /// delivered one this frame.
    pub controller: Option<ControllerState>,
}

/// Identity of the attached headset, captured once at session init.
#[derive(Debug, Clone, Default)]
pub struct HmdProfile {
    /// Runtime/driver name.
    pub driver: String,
    /// Headset model string (used for device-family classification).
    pub model: String,
    /// Serial or runtime-specific identifier.
    pub serial: String,
    /// Panel refresh rate in Hz, if the runtime reports one.
    pub display_frequency: f32,
}

/// A blocking source of tracked poses.
///
/// Implementations are owned by the render thread; `wait_poses` blocks on
/// the runtime's frame cadence, which is what paces the render loop (the
/// layer itself never sleeps).
pub trait PoseSource {
    /// Identity of the attached headset.
    fn hmd_profile(&self) -> &HmdProfile;

    /// Blocks until the next frame's poses are available and returns them.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Transient`] for a single-frame hiccup (the caller
    /// keeps last-known-good state), [`TrackingError::SessionEnded`] when
    /// the runtime wants to shut down.
    fn wait_poses(&mut self) -> Result<RawTrackingFrame, TrackingError>;
}

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

//! The wand and keyboard input model.
//!
//! Wand buttons are logical (numbered 1 to 4) and map onto physical
//! controller inputs per device family; the mapping functions are pure so
//! the truth tables are testable without hardware. Keyboard state is a
//! plain key table over the legacy numeric keycodes, and mouse buttons
//! stand in for the wand while no controller has ever been tracked.

pub mod buttons;
pub mod device;
pub mod keys;

pub use buttons::{ButtonMonitor, MouseButtons};
pub use device::{button_id, button_mask, wand_button_state, wand_joystick, DeviceFamily};
pub use keys::KeySet;

/// Input state of the wand controller as delivered by the runtime:
/// press/touch bitmasks over the canonical button ids plus five 2D axis
/// pairs.
///
/// Axis 0 is the touchpad/thumbstick, axis 1's x component is the analog
/// trigger; the remaining pairs exist for completeness of the wire shape.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    /// One bit per canonical button id (see [`device::button_id`]).
    pub pressed: u64,
    /// One bit per canonical button id, set while the input is touched.
    pub touched: u64,
    /// Five (x, y) axis pairs.
    pub axes: [[f32; 2]; 5],
}

impl ControllerState {
    /// Whether the button with canonical id `id` is currently pressed.
    #[inline]
    pub fn is_pressed(&self, id: u32) -> bool {
        self.pressed & device::button_mask(id) != 0
    }

    /// Whether the input with canonical id `id` is currently touched.
    #[inline]
    pub fn is_touched(&self, id: u32) -> bool {
        self.touched & device::button_mask(id) != 0
    }
}

/// One frame's worth of window and controller input, published by the
/// render thread for the application thread to query.
///
/// `controller` keeps the last state ever received: once a controller has
/// been seen the field stays `Some` even if the device disappears, matching
/// the tracking layer's last-known-good behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    /// Current keyboard state over legacy numeric keycodes.
    pub keys: KeySet,
    /// Current mouse-button state (the wand fallback source).
    pub mouse: MouseButtons,
    /// Last known wand controller state, if any was ever delivered.
    pub controller: Option<ControllerState>,
}

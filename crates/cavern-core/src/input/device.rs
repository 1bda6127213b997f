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

//! Device families and the logical-button truth tables.
//!
//! The supported controller generations differ in which physical input
//! backs each logical wand button. Classification happens once at session
//! init from the headset's identity strings; everything downstream is a
//! pure function of the family tag.

use super::ControllerState;

/// Canonical button ids shared with the runtime's press/touch bitmasks
/// (SteamVR layout).
pub mod button_id {
    /// Application menu button.
    pub const MENU: u32 = 1;
    /// Grip / squeeze.
    pub const GRIP: u32 = 2;
    /// The A face button.
    pub const A: u32 = 7;
    /// Touchpad or thumbstick click (axis 0).
    pub const AXIS0: u32 = 32;
    /// Analog trigger (axis 1).
    pub const AXIS1: u32 = 33;
}

/// Returns the bitmask for a canonical button id.
#[inline]
pub const fn button_mask(id: u32) -> u64 {
    1u64 << id
}

/// The controller generations the layer distinguishes.
///
/// Only inputs that differ between families are special-cased; everything
/// else goes through the common SteamVR-layout masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    /// HTC Vive wand: touchpad, grip as the primary button.
    ViveWand,
    /// Oculus Touch: thumbstick, A as the primary button, and a grip
    /// correction applied to the tracked pose.
    OculusTouch,
    /// Windows Mixed Reality motion controller.
    MixedReality,
}

impl DeviceFamily {
    /// Classifies a headset by its identity strings.
    ///
    /// Model strings containing "Oculus" win, then serials containing
    /// "WindowsHolographic"; everything else is treated as a Vive-class
    /// device, which is also the fallback for unknown hardware.
    pub fn classify(model: &str, serial: &str) -> Self {
        if model.contains("Oculus") {
            DeviceFamily::OculusTouch
        } else if serial.contains("WindowsHolographic") {
            DeviceFamily::MixedReality
        } else {
            DeviceFamily::ViveWand
        }
    }
}

/// Current state of a logical wand button (1 to 4) for a device family.
///
/// Returns `None` for buttons with no physical mapping (button 4 and any
/// out-of-range number); callers report those as "unknown" rather than
/// released.
pub fn wand_button_state(
    family: DeviceFamily,
    button: u8,
    state: &ControllerState,
) -> Option<bool> {
    match button {
        1 => {
            let id = if family == DeviceFamily::OculusTouch {
                button_id::A
            } else {
                button_id::GRIP
            };
            Some(state.is_pressed(id))
        }
        2 => Some(state.axes[1][0] > 0.5),
        3 => Some(state.is_pressed(button_id::MENU)),
        _ => None,
    }
}

/// Current joystick value for a device family.
///
/// Oculus Touch reads the thumbstick directly. Touchpad devices only
/// report while the pad is touched but not clicked, so resting a thumb
/// steers without clicking and a click is reserved for button use.
pub fn wand_joystick(family: DeviceFamily, state: &ControllerState) -> (f32, f32) {
    match family {
        DeviceFamily::OculusTouch => (state.axes[0][0], state.axes[0][1]),
        DeviceFamily::ViveWand | DeviceFamily::MixedReality => {
            if !state.is_pressed(button_id::AXIS0) && state.is_touched(button_id::AXIS0) {
                (state.axes[0][0], state.axes[0][1])
            } else {
                (0.0, 0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(pressed: &[u32], touched: &[u32], axes: [[f32; 2]; 5]) -> ControllerState {
        ControllerState {
            pressed: pressed.iter().fold(0, |m, id| m | button_mask(*id)),
            touched: touched.iter().fold(0, |m, id| m | button_mask(*id)),
            axes,
        }
    }

    #[test]
    fn test_classify_by_identity_strings() {
        assert_eq!(
            DeviceFamily::classify("Oculus Rift CV1", "ABC123"),
            DeviceFamily::OculusTouch
        );
        assert_eq!(
            DeviceFamily::classify("Acer HMD", "WindowsHolographic/1234"),
            DeviceFamily::MixedReality
        );
        assert_eq!(
            DeviceFamily::classify("Vive MV", "LHR-123"),
            DeviceFamily::ViveWand
        );
        assert_eq!(
            DeviceFamily::classify("", ""),
            DeviceFamily::ViveWand,
            "unknown hardware falls back to the Vive mapping"
        );
    }

    #[test]
    fn test_button_one_differs_per_family() {
        let grip = state_with(&[button_id::GRIP], &[], [[0.0; 2]; 5]);
        assert_eq!(
            wand_button_state(DeviceFamily::ViveWand, 1, &grip),
            Some(true)
        );
        assert_eq!(
            wand_button_state(DeviceFamily::OculusTouch, 1, &grip),
            Some(false),
            "the Oculus mapping uses A, not grip"
        );

        let a = state_with(&[button_id::A], &[], [[0.0; 2]; 5]);
        assert_eq!(wand_button_state(DeviceFamily::OculusTouch, 1, &a), Some(true));
        assert_eq!(wand_button_state(DeviceFamily::ViveWand, 1, &a), Some(false));
    }

    #[test]
    fn test_button_two_is_the_trigger_threshold() {
        let mut axes = [[0.0f32; 2]; 5];
        axes[1][0] = 0.6;
        let pulled = state_with(&[], &[], axes);
        assert_eq!(
            wand_button_state(DeviceFamily::ViveWand, 2, &pulled),
            Some(true)
        );

        axes[1][0] = 0.5;
        let resting = state_with(&[], &[], axes);
        assert_eq!(
            wand_button_state(DeviceFamily::ViveWand, 2, &resting),
            Some(false),
            "the trigger threshold is strictly greater than 0.5"
        );
    }

    #[test]
    fn test_button_three_is_menu_for_every_family() {
        let menu = state_with(&[button_id::MENU], &[], [[0.0; 2]; 5]);
        for family in [
            DeviceFamily::ViveWand,
            DeviceFamily::OculusTouch,
            DeviceFamily::MixedReality,
        ] {
            assert_eq!(wand_button_state(family, 3, &menu), Some(true));
        }
    }

    #[test]
    fn test_button_four_is_unmapped() {
        let state = state_with(&[button_id::A, button_id::GRIP], &[], [[0.0; 2]; 5]);
        assert_eq!(wand_button_state(DeviceFamily::ViveWand, 4, &state), None);
        assert_eq!(wand_button_state(DeviceFamily::ViveWand, 0, &state), None);
        assert_eq!(wand_button_state(DeviceFamily::ViveWand, 9, &state), None);
    }

    #[test]
    fn test_joystick_oculus_reads_thumbstick_directly() {
        let mut axes = [[0.0f32; 2]; 5];
        axes[0] = [0.25, -0.75];
        let state = state_with(&[], &[], axes);
        assert_eq!(
            wand_joystick(DeviceFamily::OculusTouch, &state),
            (0.25, -0.75)
        );
    }

    #[test]
    fn test_joystick_touchpad_requires_touch_without_click() {
        let mut axes = [[0.0f32; 2]; 5];
        axes[0] = [0.5, 0.5];

        let untouched = state_with(&[], &[], axes);
        assert_eq!(wand_joystick(DeviceFamily::ViveWand, &untouched), (0.0, 0.0));

        let touched = state_with(&[], &[button_id::AXIS0], axes);
        assert_eq!(wand_joystick(DeviceFamily::ViveWand, &touched), (0.5, 0.5));

        let clicked = state_with(&[button_id::AXIS0], &[button_id::AXIS0], axes);
        assert_eq!(
            wand_joystick(DeviceFamily::ViveWand, &clicked),
            (0.0, 0.0),
            "a clicked touchpad reports no joystick deflection"
        );
    }
}

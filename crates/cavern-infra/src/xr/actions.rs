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

//! The controller action set and its per-profile bindings.
//!
//! One action set covers the wand surface: grip pose, menu, primary
//! button, squeeze, trigger, and the 2D stick/trackpad with its click and
//! touch. Bindings are suggested for the Vive wand, Oculus Touch and
//! Windows Mixed Reality profiles; the runtime picks whichever matches
//! the hardware. Action state is folded into the canonical button-mask
//! layout the input layer expects.

use cavern_core::error::TrackingError;
use cavern_core::input::{button_id, button_mask, ControllerState};
use cavern_core::tracking::{DeviceClass, Hand, TrackedDevice};
use openxr as xr;

use super::convert::pose_to_mat4;
use super::{init_error, path};

/// Trigger and squeeze readings above this count as pressed.
const PRESS_THRESHOLD: f32 = 0.5;

pub struct WandActions {
    action_set: xr::ActionSet,
    grip_pose: xr::Action<xr::Posef>,
    menu: xr::Action<bool>,
    primary: xr::Action<bool>,
    squeeze: xr::Action<f32>,
    trigger: xr::Action<f32>,
    stick: xr::Action<xr::Vector2f>,
    stick_click: xr::Action<bool>,
    stick_touch: xr::Action<bool>,
    hand_paths: [xr::Path; 2],
    grip_spaces: [xr::Space; 2],
}

impl WandActions {
    /// Creates the action set, suggests bindings for the supported
    /// interaction profiles and attaches the set to the session.
    pub fn new(
        instance: &xr::Instance,
        session: &xr::Session<xr::OpenGL>,
    ) -> Result<Self, TrackingError> {
        let left_path = path(instance, "/user/hand/left")?;
        let right_path = path(instance, "/user/hand/right")?;
        let subaction_paths = [left_path, right_path];

        let action_set = instance
            .create_action_set("wand", "Wand", 0)
            .map_err(|e| init_error("create action set", e))?;

        let grip_pose = action_set
            .create_action::<xr::Posef>("grip_pose", "Grip Pose", &subaction_paths)
            .map_err(|e| init_error("create grip pose action", e))?;
        let menu = action_set
            .create_action::<bool>("menu", "Menu Button", &subaction_paths)
            .map_err(|e| init_error("create menu action", e))?;
        let primary = action_set
            .create_action::<bool>("primary", "Primary Button", &subaction_paths)
            .map_err(|e| init_error("create primary action", e))?;
        let squeeze = action_set
            .create_action::<f32>("squeeze", "Squeeze", &subaction_paths)
            .map_err(|e| init_error("create squeeze action", e))?;
        let trigger = action_set
            .create_action::<f32>("trigger", "Trigger", &subaction_paths)
            .map_err(|e| init_error("create trigger action", e))?;
        let stick = action_set
            .create_action::<xr::Vector2f>("stick", "Stick", &subaction_paths)
            .map_err(|e| init_error("create stick action", e))?;
        let stick_click = action_set
            .create_action::<bool>("stick_click", "Stick Click", &subaction_paths)
            .map_err(|e| init_error("create stick click action", e))?;
        let stick_touch = action_set
            .create_action::<bool>("stick_touch", "Stick Touch", &subaction_paths)
            .map_err(|e| init_error("create stick touch action", e))?;

        // Action spaces may be created before the set is attached.
        let grip_spaces = [
            grip_pose
                .create_space(session.clone(), left_path, xr::Posef::IDENTITY)
                .map_err(|e| init_error("create left grip space", e))?,
            grip_pose
                .create_space(session.clone(), right_path, xr::Posef::IDENTITY)
                .map_err(|e| init_error("create right grip space", e))?,
        ];

        let actions = Self {
            action_set,
            grip_pose,
            menu,
            primary,
            squeeze,
            trigger,
            stick,
            stick_click,
            stick_touch,
            hand_paths: subaction_paths,
            grip_spaces,
        };

        actions.suggest_vive(instance)?;
        actions.suggest_oculus(instance)?;
        actions.suggest_wmr(instance)?;

        session
            .attach_action_sets(&[&actions.action_set])
            .map_err(|e| init_error("attach action set", e))?;

        Ok(actions)
    }

    fn suggest_vive(&self, instance: &xr::Instance) -> Result<(), TrackingError> {
        let profile = path(instance, "/interaction_profiles/htc/vive_controller")?;
        let mut bindings = Vec::new();
        for hand in ["left", "right"] {
            bindings.push(xr::Binding::new(
                &self.grip_pose,
                path(instance, &format!("/user/hand/{hand}/input/grip/pose"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.menu,
                path(instance, &format!("/user/hand/{hand}/input/menu/click"))?,
            ));
            // squeeze/click is boolean; the runtime converts it for the
            // float action.
            bindings.push(xr::Binding::new(
                &self.squeeze,
                path(instance, &format!("/user/hand/{hand}/input/squeeze/click"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.trigger,
                path(instance, &format!("/user/hand/{hand}/input/trigger/value"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick,
                path(instance, &format!("/user/hand/{hand}/input/trackpad"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick_click,
                path(instance, &format!("/user/hand/{hand}/input/trackpad/click"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick_touch,
                path(instance, &format!("/user/hand/{hand}/input/trackpad/touch"))?,
            ));
        }
        instance
            .suggest_interaction_profile_bindings(profile, &bindings)
            .map_err(|e| init_error("suggest vive bindings", e))
    }

    fn suggest_oculus(&self, instance: &xr::Instance) -> Result<(), TrackingError> {
        let profile = path(instance, "/interaction_profiles/oculus/touch_controller")?;
        let mut bindings = Vec::new();
        for hand in ["left", "right"] {
            bindings.push(xr::Binding::new(
                &self.grip_pose,
                path(instance, &format!("/user/hand/{hand}/input/grip/pose"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.squeeze,
                path(instance, &format!("/user/hand/{hand}/input/squeeze/value"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.trigger,
                path(instance, &format!("/user/hand/{hand}/input/trigger/value"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick,
                path(instance, &format!("/user/hand/{hand}/input/thumbstick"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick_click,
                path(instance, &format!("/user/hand/{hand}/input/thumbstick/click"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick_touch,
                path(instance, &format!("/user/hand/{hand}/input/thumbstick/touch"))?,
            ));
        }
        // A/X as the primary button, B/Y standing in for the legacy menu
        // slot (Touch reserves the real menu button for the system).
        bindings.push(xr::Binding::new(
            &self.primary,
            path(instance, "/user/hand/right/input/a/click")?,
        ));
        bindings.push(xr::Binding::new(
            &self.primary,
            path(instance, "/user/hand/left/input/x/click")?,
        ));
        bindings.push(xr::Binding::new(
            &self.menu,
            path(instance, "/user/hand/right/input/b/click")?,
        ));
        bindings.push(xr::Binding::new(
            &self.menu,
            path(instance, "/user/hand/left/input/y/click")?,
        ));
        instance
            .suggest_interaction_profile_bindings(profile, &bindings)
            .map_err(|e| init_error("suggest oculus bindings", e))
    }

    fn suggest_wmr(&self, instance: &xr::Instance) -> Result<(), TrackingError> {
        let profile = path(instance, "/interaction_profiles/microsoft/motion_controller")?;
        let mut bindings = Vec::new();
        for hand in ["left", "right"] {
            bindings.push(xr::Binding::new(
                &self.grip_pose,
                path(instance, &format!("/user/hand/{hand}/input/grip/pose"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.menu,
                path(instance, &format!("/user/hand/{hand}/input/menu/click"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.squeeze,
                path(instance, &format!("/user/hand/{hand}/input/squeeze/click"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.trigger,
                path(instance, &format!("/user/hand/{hand}/input/trigger/value"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick,
                path(instance, &format!("/user/hand/{hand}/input/trackpad"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick_click,
                path(instance, &format!("/user/hand/{hand}/input/trackpad/click"))?,
            ));
            bindings.push(xr::Binding::new(
                &self.stick_touch,
                path(instance, &format!("/user/hand/{hand}/input/trackpad/touch"))?,
            ));
        }
        instance
            .suggest_interaction_profile_bindings(profile, &bindings)
            .map_err(|e| init_error("suggest wmr bindings", e))
    }

    /// Synchronizes action state for this frame.
    pub fn sync(&self, session: &xr::Session<xr::OpenGL>) -> xr::Result<()> {
        session.sync_actions(&[(&self.action_set).into()])
    }

    /// Locates both controllers in the reference space.
    pub fn controller_devices(
        &self,
        reference_space: &xr::Space,
        time: xr::Time,
    ) -> Vec<TrackedDevice> {
        let mut devices = Vec::with_capacity(2);
        for (index, hand) in [Hand::Left, Hand::Right].into_iter().enumerate() {
            let pose = self.grip_spaces[index]
                .locate(reference_space, time)
                .ok()
                .filter(|location| {
                    location
                        .location_flags
                        .contains(xr::SpaceLocationFlags::POSITION_VALID)
                        && location
                            .location_flags
                            .contains(xr::SpaceLocationFlags::ORIENTATION_VALID)
                })
                .map(|location| pose_to_mat4(location.pose));
            devices.push(TrackedDevice {
                class: DeviceClass::Controller,
                role: Some(hand),
                pose,
            });
        }
        devices
    }

    /// Reads the right-hand action state into the canonical mask layout.
    /// Returns `None` while no bound controller is active.
    pub fn controller_state(&self, session: &xr::Session<xr::OpenGL>) -> Option<ControllerState> {
        let right = self.hand_paths[1];
        let mut state = ControllerState::default();
        let mut any_active = false;

        if let Ok(menu) = self.menu.state(session, right) {
            any_active |= menu.is_active;
            if menu.is_active && menu.current_state {
                state.pressed |= button_mask(button_id::MENU);
            }
        }
        if let Ok(primary) = self.primary.state(session, right) {
            any_active |= primary.is_active;
            if primary.is_active && primary.current_state {
                state.pressed |= button_mask(button_id::A);
            }
        }
        if let Ok(squeeze) = self.squeeze.state(session, right) {
            any_active |= squeeze.is_active;
            if squeeze.is_active && squeeze.current_state > PRESS_THRESHOLD {
                state.pressed |= button_mask(button_id::GRIP);
            }
        }
        if let Ok(click) = self.stick_click.state(session, right) {
            any_active |= click.is_active;
            if click.is_active && click.current_state {
                state.pressed |= button_mask(button_id::AXIS0);
            }
        }
        if let Ok(touch) = self.stick_touch.state(session, right) {
            any_active |= touch.is_active;
            if touch.is_active && touch.current_state {
                state.touched |= button_mask(button_id::AXIS0);
            }
        }
        if let Ok(stick) = self.stick.state(session, right) {
            any_active |= stick.is_active;
            if stick.is_active {
                state.axes[0] = [stick.current_state.x, stick.current_state.y];
            }
        }
        if let Ok(trigger) = self.trigger.state(session, right) {
            any_active |= trigger.is_active;
            if trigger.is_active {
                state.axes[1][0] = trigger.current_state;
            }
        }

        any_active.then_some(state)
    }
}

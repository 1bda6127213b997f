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

//! The session context and the legacy-shaped call surface.
//!
//! [`CaveSystem`] replaces the legacy library's global state with one
//! owned context: configure it, register callbacks, call `init`, then
//! drive the frame loop from the application thread while the render
//! thread runs the headset. Every query answers from the render thread's
//! latest published snapshot, so none of them block.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use cavern_core::input::{wand_button_state, wand_joystick, ButtonMonitor, DeviceFamily};
use cavern_core::math::Vec3;
use cavern_core::session::SessionShared;
use cavern_core::tracking::{BodyPose, ResolvedTracking, SpacePose};
use cavern_infra::callback::{CallbackSlots, FrameTick, RenderApi, RenderArgs};
use cavern_infra::thread::{self, RenderSettings, RenderThreadHandle, SessionFactory};
use cavern_infra::xr::{connect_openxr, SessionDesc};

use crate::config::CaveConfig;
use crate::ids::{CaveId, CaveKey};

/// A configured VR session: the application-thread handle to the shared
/// state and the render thread.
///
/// Dropping the system stops the render thread and joins it; [`exit`]
/// (or its legacy-named alias [`halt`]) does the same eagerly.
///
/// [`exit`]: CaveSystem::exit
/// [`halt`]: CaveSystem::halt
pub struct CaveSystem {
    shared: Arc<SessionShared>,
    slots: Arc<CallbackSlots>,
    config: CaveConfig,
    family: DeviceFamily,
    buttons: ButtonMonitor,
    thread: Option<RenderThreadHandle>,
}

impl CaveSystem {
    /// Builds the session state without starting anything: shared
    /// snapshots at their defaults, the monotonic clock running, sync
    /// flags cleared.
    ///
    /// # Errors
    ///
    /// Rejects configurations no projection can be built from: clip
    /// planes that are not `0 < near < far` or a zero-height mirror
    /// window.
    pub fn configure(config: CaveConfig) -> Result<Self> {
        anyhow::ensure!(
            config.near > 0.0 && config.near < config.far,
            "clip planes must satisfy 0 < near < far (got {} and {})",
            config.near,
            config.far
        );
        anyhow::ensure!(
            config.window_height > 0,
            "the mirror window needs a non-zero height"
        );
        Ok(Self {
            shared: Arc::new(SessionShared::new()),
            slots: Arc::new(CallbackSlots::new()),
            config,
            // Refined from the headset identity during `init`.
            family: DeviceFamily::ViveWand,
            buttons: ButtonMonitor::new(),
            thread: None,
        })
    }

    /// Starts the render thread and blocks until it is ready: headset
    /// session up, window and GL context created, first snapshots
    /// published.
    ///
    /// A failure to reach the headset is fatal and terminates the
    /// process, matching the legacy startup contract; `init` itself only
    /// errors when called twice.
    pub fn init(&mut self) -> Result<()> {
        anyhow::ensure!(self.thread.is_none(), "init may only be called once");

        let desc = SessionDesc {
            app_name: self.config.app_name.clone(),
            window_title: self.config.window_title.clone(),
            window_height: self.config.window_height,
        };
        let settings = RenderSettings {
            near: self.config.near,
            far: self.config.far,
            mirror_eye: self.config.mirror_eye,
        };
        let factory: SessionFactory = Box::new(move || connect_openxr(&desc));
        let handle = thread::spawn(self.shared.clone(), self.slots.clone(), settings, factory);
        while !self.shared.is_ready() {
            std::thread::sleep(Duration::from_millis(1));
        }

        // The render thread stored the headset identity before marking
        // itself ready.
        if let Some(profile) = self.shared.hmd_profile() {
            self.family = DeviceFamily::classify(&profile.model, &profile.serial);
        }
        self.thread = Some(handle);
        self.shared.mark_initted();
        Ok(())
    }

    /// Registers the one-shot GL setup callback. It runs on the render
    /// thread with the live GL context; drawing waits until it has run.
    pub fn init_application(&self, f: impl FnMut(&RenderApi) + Send + 'static) {
        self.slots.set_init(Box::new(f));
    }

    /// Registers the per-eye draw callback.
    pub fn display(&self, f: impl FnMut(&RenderApi, &RenderArgs) + Send + 'static) {
        self.slots.set_draw(Box::new(f));
    }

    /// Registers the once-per-frame callback, dispatched between pose
    /// resolution and drawing. No GL access.
    pub fn frame_function(&self, f: impl FnMut(FrameTick) + Send + 'static) {
        self.slots.set_frame(Box::new(f));
    }

    /// Registers the teardown callback, dispatched once while the render
    /// thread drains.
    pub fn stop_application(&self, f: impl FnMut() + Send + 'static) {
        self.slots.set_stop(Box::new(f));
    }

    /// Writes the position of a tracked body into `position`.
    ///
    /// Answers `Head`, `HeadNav`, `Wand` and `WandNav`; any other id
    /// leaves `position` untouched. Wand ids answer from the head until a
    /// controller has been tracked once.
    pub fn get_position(&self, id: CaveId, position: &mut [f32; 3]) {
        let tracking = self.shared.tracking();
        let pose = match id {
            CaveId::Head => tracking.head.world,
            CaveId::HeadNav => tracking.head.nav,
            CaveId::Wand => wand_or_head(&tracking).world,
            CaveId::WandNav => wand_or_head(&tracking).nav,
            _ => return,
        };
        write_vec3(position, pose.position);
    }

    /// Writes a body's basis vector into `vector`.
    ///
    /// Answers the {head, wand} x {front, up, right} ids in world and
    /// navigated space. The back/left/down ids exist but have never been
    /// wired to data; they and the non-vector ids leave `vector`
    /// untouched. Wand ids fall back to the head like
    /// [`get_position`](Self::get_position).
    pub fn get_vector(&self, id: CaveId, vector: &mut [f32; 3]) {
        use CaveId::*;
        let pick: fn(&SpacePose) -> Vec3 = match id {
            HeadFront | WandFront | HeadFrontNav | WandFrontNav => |p| p.front,
            HeadUp | WandUp | HeadUpNav | WandUpNav => |p| p.up,
            HeadRight | WandRight | HeadRightNav | WandRightNav => |p| p.right,
            _ => return,
        };
        let wand = matches!(
            id,
            WandFront | WandUp | WandRight | WandFrontNav | WandUpNav | WandRightNav
        );
        let nav = matches!(
            id,
            HeadFrontNav | HeadUpNav | HeadRightNav | WandFrontNav | WandUpNav | WandRightNav
        );

        let tracking = self.shared.tracking();
        let body = if wand {
            wand_or_head(&tracking)
        } else {
            &tracking.head
        };
        let pose = if nav { &body.nav } else { &body.world };
        write_vec3(vector, pick(pose));
    }

    /// Writes a body's orientation as YXZ Euler angles in degrees.
    ///
    /// Answers `Head` and `HeadNav` only; the wand and eye orientation
    /// ids are recognized but unanswered, matching the legacy surface.
    pub fn get_orientation(&self, id: CaveId, angles: &mut [f32; 3]) {
        let tracking = self.shared.tracking();
        let euler = match id {
            CaveId::Head => tracking.head.world.euler,
            CaveId::HeadNav => tracking.head.nav.euler,
            _ => return,
        };
        write_vec3(angles, euler);
    }

    /// One-shot change query for a logical wand button (1 to 4): +1 on
    /// the transition to pressed, -1 on the transition to released, 0
    /// otherwise.
    ///
    /// Until a controller has been tracked once, the mouse buttons stand
    /// in (left, middle, right, back for buttons 1 to 4). Unmapped
    /// buttons never report a change.
    pub fn button_change(&mut self, button: u8) -> i32 {
        let state = self.wand_button(button);
        self.buttons.edge(button, state)
    }

    /// Level query for a logical wand button: pressed right now.
    ///
    /// Unknown and unmapped buttons read as released. Does not disturb
    /// the edge cache of [`button_change`](Self::button_change).
    pub fn button_pressed(&self, button: u8) -> bool {
        self.wand_button(button).unwrap_or(false)
    }

    fn wand_button(&self, button: u8) -> Option<bool> {
        let input = self.shared.input();
        if self.shared.tracking().wand_tracked {
            let controller = input.controller.as_ref()?;
            wand_button_state(self.family, button, controller)
        } else {
            input.mouse.wand_fallback(button)
        }
    }

    /// Current keyboard state of `key` (the keyboard as a device).
    pub fn get_button(&self, key: CaveKey) -> bool {
        self.shared.input().keys.is_down(key.code())
    }

    /// The wand's (x, y) joystick deflection, each in [-1, 1].
    ///
    /// Thumbstick families read the stick directly; touchpad families
    /// report only while the pad is touched but not clicked. (0, 0)
    /// without a controller.
    pub fn joystick(&self) -> (f32, f32) {
        match self.shared.input().controller.as_ref() {
            Some(state) => wand_joystick(self.family, state),
            None => (0.0, 0.0),
        }
    }

    /// Moves the navigated world by (x, y, z): the nav matrix picks up an
    /// inverse translation on the left.
    pub fn nav_translate(&self, x: f32, y: f32, z: f32) {
        self.shared.nav.translate(x, y, z);
    }

    /// Rotates the navigated world by `angle_deg` degrees about the axis
    /// named by `axis` (`'x'`, `'y'` or `'z'`; anything else is a no-op).
    pub fn nav_rot(&self, angle_deg: f32, axis: char) {
        self.shared.nav.rotate(angle_deg, axis);
    }

    /// Scales the navigated world; the nav matrix picks up the inverse
    /// scale on the left.
    pub fn nav_scale(&self, x: f32, y: f32, z: f32) {
        self.shared.nav.scale(x, y, z);
    }

    /// Like [`nav_translate`](Self::nav_translate) but composing on the
    /// world side (right-multiplied).
    pub fn nav_world_translate(&self, x: f32, y: f32, z: f32) {
        self.shared.nav.world_translate(x, y, z);
    }

    /// Like [`nav_rot`](Self::nav_rot) but composing on the world side.
    pub fn nav_world_rot(&self, angle_deg: f32, axis: char) {
        self.shared.nav.world_rotate(angle_deg, axis);
    }

    /// Right-multiplies a forward scale; the asymmetry against
    /// [`nav_scale`](Self::nav_scale) is the legacy behavior.
    pub fn nav_world_scale(&self, x: f32, y: f32, z: f32) {
        self.shared.nav.world_scale(x, y, z);
    }

    /// Resets the nav matrix to the identity.
    pub fn nav_load_identity(&self) {
        self.shared.nav.load_identity();
    }

    /// Replaces the nav matrix with `m` (column-major).
    pub fn nav_load_matrix(&self, m: [[f32; 4]; 4]) {
        self.shared.nav.load_matrix(m);
    }

    /// Returns the current nav matrix (column-major).
    pub fn nav_get_matrix(&self) -> [[f32; 4]; 4] {
        self.shared.nav.get_matrix()
    }

    /// Left-multiplies `m` (column-major) onto the nav matrix.
    pub fn nav_mult_matrix(&self, m: [[f32; 4]; 4]) {
        self.shared.nav.mult_matrix(m);
    }

    /// Right-multiplies `m` (column-major) onto the nav matrix.
    pub fn nav_pre_mult_matrix(&self, m: [[f32; 4]; 4]) {
        self.shared.nav.pre_mult_matrix(m);
    }

    /// Saves the nav matrix to the one-deep backup slot.
    pub fn nav_store(&self) {
        self.shared.nav.store();
    }

    /// Restores the nav matrix from the backup slot.
    pub fn nav_restore(&self) {
        self.shared.nav.restore();
    }

    /// Seconds since [`configure`](Self::configure).
    pub fn get_time(&self) -> f32 {
        self.shared.time_secs()
    }

    /// Number of frames the render loop has started.
    pub fn get_frame_number(&self) -> i64 {
        self.shared.frame_number()
    }

    /// The render target geometry as (origin x, origin y, width, height).
    ///
    /// The origin is always (0, 0); the extent is the per-eye render
    /// size, (0, 0) until `init` has completed.
    pub fn get_window_geometry(&self) -> (i32, i32, i32, i32) {
        let (w, h) = self.shared.render_extent();
        (0, 0, w as i32, h as i32)
    }

    /// True once [`init`](Self::init) has completed.
    pub fn initted(&self) -> bool {
        self.shared.is_initted()
    }

    /// True once a quit has been requested: Escape, window close, or the
    /// drain after [`exit`](Self::exit).
    pub fn quit(&self) -> bool {
        self.shared.quit_requested()
    }

    /// Stops the render thread and joins it. Idempotent; also runs on
    /// drop.
    pub fn exit(&mut self) {
        if let Some(mut handle) = self.thread.take() {
            self.shared.request_stop();
            handle.join();
        }
    }

    /// Legacy-named alias for [`exit`](Self::exit).
    pub fn halt(&mut self) {
        self.exit();
    }
}

impl Drop for CaveSystem {
    fn drop(&mut self) {
        self.exit();
    }
}

/// The wand's pose, or the head's while no controller has ever been
/// tracked.
fn wand_or_head(tracking: &ResolvedTracking) -> &BodyPose {
    if tracking.wand_tracked {
        &tracking.wand
    } else {
        &tracking.head
    }
}

fn write_vec3(out: &mut [f32; 3], v: Vec3) {
    out[0] = v.x;
    out[1] = v.y;
    out[2] = v.z;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavern_core::input::{button_id, button_mask, ControllerState, InputSnapshot};

    fn system() -> CaveSystem {
        CaveSystem::configure(CaveConfig::default()).expect("default config is valid")
    }

    fn tracked_state() -> ResolvedTracking {
        let mut state = ResolvedTracking::default();
        state.head.world.position = Vec3::new(1.0, 2.0, 3.0);
        state.head.world.front = Vec3::new(0.0, 0.0, -1.0);
        state.head.world.up = Vec3::Y;
        state.head.world.right = Vec3::X;
        state.head.world.euler = Vec3::new(10.0, 20.0, 30.0);
        state.head.nav.position = Vec3::new(-1.0, -2.0, -3.0);
        state.head.nav.euler = Vec3::new(-10.0, -20.0, -30.0);
        state
    }

    fn with_wand(mut state: ResolvedTracking) -> ResolvedTracking {
        state.wand.world.position = Vec3::new(4.0, 5.0, 6.0);
        state.wand.world.front = Vec3::new(1.0, 0.0, 0.0);
        state.wand.world.up = Vec3::Y;
        state.wand.world.right = Vec3::new(0.0, 0.0, 1.0);
        state.wand.nav.position = Vec3::new(7.0, 8.0, 9.0);
        state.wand_tracked = true;
        state
    }

    #[test]
    fn test_configure_rejects_unusable_clip_planes() {
        let mut config = CaveConfig::default();
        config.near = 0.0;
        assert!(CaveSystem::configure(config).is_err(), "zero near plane");

        let mut config = CaveConfig::default();
        config.near = 10.0;
        config.far = 1.0;
        assert!(CaveSystem::configure(config).is_err(), "inverted planes");

        let mut config = CaveConfig::default();
        config.window_height = 0;
        assert!(CaveSystem::configure(config).is_err(), "flat window");
    }

    #[test]
    fn test_unhandled_ids_leave_the_output_untouched() {
        let sys = system();
        sys.shared.publish_tracking(tracked_state());

        let mut out = [9.0f32; 3];
        sys.get_position(CaveId::LeftEye, &mut out);
        assert_eq!(out, [9.0; 3], "eye ids are recognized but unanswered");

        sys.get_vector(CaveId::HeadBack, &mut out);
        assert_eq!(out, [9.0; 3], "back/left/down vectors were never wired");
        sys.get_vector(CaveId::WandDownNav, &mut out);
        assert_eq!(out, [9.0; 3]);
        sys.get_vector(CaveId::Head, &mut out);
        assert_eq!(out, [9.0; 3], "a position id is not a vector id");

        sys.get_orientation(CaveId::Wand, &mut out);
        assert_eq!(out, [9.0; 3], "wand orientation is unanswered");
    }

    #[test]
    fn test_positions_answer_in_both_spaces() {
        let sys = system();
        sys.shared.publish_tracking(tracked_state());

        let mut out = [0.0f32; 3];
        sys.get_position(CaveId::Head, &mut out);
        assert_eq!(out, [1.0, 2.0, 3.0]);
        sys.get_position(CaveId::HeadNav, &mut out);
        assert_eq!(out, [-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_wand_queries_fall_back_to_the_head_until_tracked() {
        let sys = system();
        sys.shared.publish_tracking(tracked_state());

        let mut out = [0.0f32; 3];
        sys.get_position(CaveId::Wand, &mut out);
        assert_eq!(out, [1.0, 2.0, 3.0], "untracked wand answers as the head");
        sys.get_vector(CaveId::WandFront, &mut out);
        assert_eq!(out, [0.0, 0.0, -1.0]);

        sys.shared.publish_tracking(with_wand(tracked_state()));
        sys.get_position(CaveId::Wand, &mut out);
        assert_eq!(out, [4.0, 5.0, 6.0], "a tracked wand answers for itself");
        sys.get_position(CaveId::WandNav, &mut out);
        assert_eq!(out, [7.0, 8.0, 9.0]);
        sys.get_vector(CaveId::WandFront, &mut out);
        assert_eq!(out, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_vector_queries_pick_the_right_basis_column() {
        let sys = system();
        sys.shared.publish_tracking(tracked_state());

        let mut out = [0.0f32; 3];
        sys.get_vector(CaveId::HeadUp, &mut out);
        assert_eq!(out, [0.0, 1.0, 0.0]);
        sys.get_vector(CaveId::HeadRight, &mut out);
        assert_eq!(out, [1.0, 0.0, 0.0]);
        sys.get_vector(CaveId::HeadFront, &mut out);
        assert_eq!(out, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_orientation_answers_head_ids() {
        let sys = system();
        sys.shared.publish_tracking(tracked_state());

        let mut out = [0.0f32; 3];
        sys.get_orientation(CaveId::Head, &mut out);
        assert_eq!(out, [10.0, 20.0, 30.0]);
        sys.get_orientation(CaveId::HeadNav, &mut out);
        assert_eq!(out, [-10.0, -20.0, -30.0]);
    }

    #[test]
    fn test_button_change_uses_the_mouse_until_a_wand_appears() {
        let mut sys = system();

        let mut input = InputSnapshot::default();
        input.mouse.left = true;
        sys.shared.publish_input(input.clone());

        assert_eq!(sys.button_change(1), 1, "first press edge");
        assert_eq!(sys.button_change(1), 0, "held is not a change");
        assert!(sys.button_pressed(1));

        input.mouse.left = false;
        input.mouse.back = true;
        sys.shared.publish_input(input);
        assert_eq!(sys.button_change(1), -1, "release edge");
        assert_eq!(
            sys.button_change(4),
            1,
            "button 4 maps to the back mouse button"
        );
    }

    #[test]
    fn test_button_change_reads_the_controller_once_tracked() {
        let mut sys = system();
        sys.shared.publish_tracking(with_wand(tracked_state()));

        let controller = ControllerState {
            pressed: button_mask(button_id::GRIP),
            touched: 0,
            axes: [[0.0; 2]; 5],
        };
        sys.shared.publish_input(InputSnapshot {
            controller: Some(controller),
            ..InputSnapshot::default()
        });

        // Default classification is the Vive family, whose button 1 is
        // the grip.
        assert_eq!(sys.button_change(1), 1);
        assert_eq!(sys.button_change(1), 0);
        assert!(sys.button_pressed(1));
        assert!(!sys.button_pressed(2), "trigger axis at rest");
    }

    #[test]
    fn test_joystick_reads_zero_without_a_controller() {
        let sys = system();
        assert_eq!(sys.joystick(), (0.0, 0.0));
    }

    #[test]
    fn test_nav_calls_reach_the_shared_matrix() {
        let sys = system();
        sys.nav_translate(1.0, 2.0, 3.0);
        let m = sys.nav_get_matrix();
        assert_eq!(m[3], [-1.0, -2.0, -3.0, 1.0], "inverse translation column");

        sys.nav_store();
        sys.nav_load_identity();
        assert_eq!(sys.nav_get_matrix()[3], [0.0, 0.0, 0.0, 1.0]);
        sys.nav_restore();
        assert_eq!(sys.nav_get_matrix()[3], [-1.0, -2.0, -3.0, 1.0]);
    }

    #[test]
    fn test_keyboard_polling_answers_from_the_snapshot() {
        let sys = system();
        let mut input = InputSnapshot::default();
        input.keys.set(CaveKey::Space.code(), true);
        sys.shared.publish_input(input);

        assert!(sys.get_button(CaveKey::Space));
        assert!(!sys.get_button(CaveKey::A));
    }

    #[test]
    fn test_window_geometry_mirrors_the_render_extent() {
        let sys = system();
        assert_eq!(sys.get_window_geometry(), (0, 0, 0, 0), "before init");

        sys.shared.set_render_extent((1512, 1680));
        assert_eq!(sys.get_window_geometry(), (0, 0, 1512, 1680));
    }

    #[test]
    fn test_sync_flags_start_cleared() {
        let sys = system();
        assert!(!sys.initted());
        assert!(!sys.quit());
        assert_eq!(sys.get_frame_number(), 0);
    }
}

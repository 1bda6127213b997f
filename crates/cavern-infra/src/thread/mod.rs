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

//! The render thread: session ownership, the frame loop, teardown.
//!
//! The loop runs entirely on one spawned thread. The session backends are
//! thread-affine, so they are constructed by a factory closure on the
//! thread itself; only [`SessionShared`] and [`CallbackSlots`] cross the
//! boundary. Each iteration advances the frame counter, blocks on the
//! runtime's frame cadence, publishes tracking and input snapshots, runs
//! the application callbacks and submits both eyes. An unrecoverable
//! error terminates the process, matching the legacy layer's behavior of
//! never returning broken state to the application.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cavern_core::display::{Eye, MirrorSurface, StereoDisplay, WindowPoll};
use cavern_core::error::{TrackingError, VrError};
use cavern_core::input::{ControllerState, DeviceFamily, InputSnapshot};
use cavern_core::math::{Mat4, Vec3};
use cavern_core::session::SessionShared;
use cavern_core::tracking::{PoseResolver, PoseSource, FEET_PER_METER};

use crate::callback::{CallbackSlots, FrameTick, RenderArgs};
use crate::pipeline::FramePipeline;
use crate::platform::keymap::KEY_ESCAPE;

/// Scroll-wheel navigation: distance per vertical tick, in scene units
/// along the current head direction.
const SCROLL_TRANSLATE_STEP: f32 = 0.2;
/// Scroll-wheel navigation: horizontal turn rate in degrees per second.
const SCROLL_TURN_DEGREES: f32 = 90.0;
/// Horizontal scroll deltas at or below this magnitude do not turn.
const SCROLL_TURN_DEAD_ZONE: f32 = 0.2;

/// Everything the render loop owns. Declaration order doubles as drop
/// order: GL resources go before the XR session, the session before the
/// window that owns the GL context.
pub struct VrSession {
    pub pipeline: Box<dyn FramePipeline>,
    pub display: Box<dyn StereoDisplay>,
    pub source: Box<dyn PoseSource>,
    pub mirror: Box<dyn MirrorSurface>,
}

/// Builds the session on the render thread itself. Backends hold
/// thread-affine handles, so construction must not happen on the caller.
pub type SessionFactory = Box<dyn FnOnce() -> Result<VrSession, VrError> + Send>;

/// Render parameters fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    /// Near clip plane in scene units.
    pub near: f32,
    /// Far clip plane in scene units.
    pub far: f32,
    /// Which eye the desktop mirror window shows.
    pub mirror_eye: Eye,
}

/// Observable lifecycle of the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Spawned but not yet running the factory.
    Created,
    /// Building the session (runtime, window, GL, swapchains).
    Initializing,
    /// In the frame loop.
    Running,
    /// Loop exited; stop callback and teardown in progress.
    Draining,
    /// Fully torn down.
    Terminated,
}

/// Lock-free cell the loop publishes its [`Phase`] through.
pub struct PhaseState(AtomicU8);

impl PhaseState {
    fn new() -> Self {
        Self(AtomicU8::new(Phase::Created as u8))
    }

    fn set(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Release);
    }

    pub fn get(&self) -> Phase {
        match self.0.load(Ordering::Acquire) {
            0 => Phase::Created,
            1 => Phase::Initializing,
            2 => Phase::Running,
            3 => Phase::Draining,
            _ => Phase::Terminated,
        }
    }
}

/// Handle to the spawned render thread.
pub struct RenderThreadHandle {
    shared: Arc<SessionShared>,
    thread: Option<JoinHandle<()>>,
    phase: Arc<PhaseState>,
}

impl RenderThreadHandle {
    /// Current lifecycle phase of the loop.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Waits for the thread to finish. Idempotent; the loop must already
    /// have been asked to stop or this blocks until the session ends.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("render thread panicked during teardown");
            }
        }
    }
}

impl Drop for RenderThreadHandle {
    fn drop(&mut self) {
        self.shared.request_stop();
        self.join();
    }
}

/// Spawns the render thread. The factory runs first on the new thread;
/// once it succeeds the loop publishes initial snapshots and marks the
/// session ready.
pub fn spawn(
    shared: Arc<SessionShared>,
    slots: Arc<CallbackSlots>,
    settings: RenderSettings,
    factory: SessionFactory,
) -> RenderThreadHandle {
    let phase = Arc::new(PhaseState::new());
    let loop_shared = shared.clone();
    let loop_phase = phase.clone();
    let thread = std::thread::Builder::new()
        .name("cavern-render".into())
        .spawn(move || run(loop_shared, slots, settings, factory, loop_phase));
    let thread = match thread {
        Ok(handle) => Some(handle),
        Err(err) => {
            log::error!("render thread spawn failed: {err}");
            std::process::exit(1);
        }
    };
    RenderThreadHandle {
        shared,
        thread,
        phase,
    }
}

fn fatal(err: &VrError) -> ! {
    log::error!("render thread cannot continue: {err}");
    std::process::exit(1);
}

fn run(
    shared: Arc<SessionShared>,
    slots: Arc<CallbackSlots>,
    settings: RenderSettings,
    factory: SessionFactory,
    phase: Arc<PhaseState>,
) {
    phase.set(Phase::Initializing);
    let mut session = match factory() {
        Ok(session) => session,
        Err(err) => fatal(&err),
    };

    let profile = session.source.hmd_profile().clone();
    let family = DeviceFamily::classify(&profile.model, &profile.serial);
    log::debug!("controller family: {family:?}");
    shared.set_hmd_profile(profile);

    let mut resolver = PoseResolver::new(family);
    shared.set_render_extent(session.display.render_extent());
    shared.publish_tracking(resolver.current());
    shared.publish_input(InputSnapshot::default());
    shared.mark_ready();
    phase.set(Phase::Running);

    // Last controller state ever delivered; input snapshots keep carrying
    // it across frames where the runtime reports nothing.
    let mut controller: Option<ControllerState> = None;
    let mut prev_time = shared.time_secs();
    let mut last_scroll = 0.0_f32;
    let legacy_scale = Mat4::from_scale(Vec3::new(
        FEET_PER_METER,
        FEET_PER_METER,
        FEET_PER_METER,
    ));

    while shared.should_run() {
        session.pipeline.run_init(&slots);

        let frame = shared.advance_frame();
        let time = shared.time_secs();
        let dt = time - prev_time;
        prev_time = time;

        let nav = *shared.nav.matrix_snapshot();

        let tracked = match session.source.wait_poses() {
            Ok(raw) => {
                resolver.ingest(&raw, &nav);
                if raw.controller.is_some() {
                    controller = raw.controller;
                }
                shared.publish_tracking(resolver.current());
                true
            }
            Err(TrackingError::SessionEnded) => break,
            Err(err) => {
                let err = VrError::from(err);
                if err.is_fatal() {
                    fatal(&err);
                }
                log::debug!("skipping frame {frame}: {err}");
                std::thread::sleep(Duration::from_millis(5));
                false
            }
        };

        if slots.init_satisfied() {
            slots.call_frame(FrameTick { frame, time, dt });
        }

        if tracked {
            let raw_head = resolver.raw_head_pose();
            for eye in Eye::ALL {
                let eye_to_head = session.display.eye_to_head(eye);
                let view = match (raw_head * eye_to_head).inverse() {
                    Some(eye_from_world) => eye_from_world * legacy_scale,
                    None => legacy_scale,
                };
                let args = RenderArgs {
                    eye,
                    projection: session.display.projection(eye, settings.near, settings.far),
                    view,
                    nav,
                    extent: session.display.render_extent(),
                    frame,
                    time,
                };
                let texture = match session.pipeline.render_eye(&args, &slots) {
                    Ok(texture) => texture,
                    Err(err) => fatal(&err.into()),
                };
                if let Err(err) = session.display.submit(eye, texture) {
                    fatal(&err.into());
                }
            }
            if let Err(err) = session.display.finish_frame() {
                fatal(&err.into());
            }

            let window_extent = session.mirror.extent();
            if let Err(err) = session
                .pipeline
                .blit_mirror(settings.mirror_eye, window_extent)
            {
                fatal(&err.into());
            }
            if let Err(err) = session.mirror.swap_buffers() {
                fatal(&err.into());
            }
        }

        let poll = session.mirror.pump();
        apply_window_events(&shared, &poll, time, &mut last_scroll, controller);
    }

    phase.set(Phase::Draining);
    slots.call_stop();
    shared.request_quit();
    drop(session);
    phase.set(Phase::Terminated);
    log::debug!("render thread terminated");
}

/// Folds one window poll into the shared state: close requests, the
/// scroll-wheel navigation gesture, and the input snapshot.
///
/// A close request (window manager or Escape) raises the quit flag for
/// the application's poll loop and clears the run flag; the loop
/// observes that at the top of the next iteration and drains.
fn apply_window_events(
    shared: &SessionShared,
    poll: &WindowPoll,
    time: f32,
    last_scroll: &mut f32,
    controller: Option<ControllerState>,
) {
    if poll.close_requested || poll.keys.is_down(KEY_ESCAPE) {
        shared.request_quit();
        shared.request_stop();
    }

    if let Some((w, h)) = poll.resized {
        log::debug!("mirror window resized to {w}x{h}");
    }

    let (scroll_x, scroll_y) = poll.scroll;
    // Horizontal ticks below the dead zone are touchpad noise.
    let turning = scroll_x.abs() > SCROLL_TURN_DEAD_ZONE;
    if scroll_y != 0.0 || turning {
        let dt = time - *last_scroll;
        *last_scroll = time;
        let front = shared.tracking().head.world.front;
        if scroll_y != 0.0 {
            let step = SCROLL_TRANSLATE_STEP * scroll_y;
            shared
                .nav
                .translate(front.x * step, front.y * step, front.z * step);
        }
        if turning {
            shared.nav.rotate(-scroll_x * SCROLL_TURN_DEGREES * dt, 'y');
        }
    }

    shared.publish_input(InputSnapshot {
        keys: poll.keys,
        mouse: poll.mouse,
        controller,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_cell_round_trips_every_phase() {
        let cell = PhaseState::new();
        assert_eq!(cell.get(), Phase::Created);
        for phase in [
            Phase::Initializing,
            Phase::Running,
            Phase::Draining,
            Phase::Terminated,
        ] {
            cell.set(phase);
            assert_eq!(cell.get(), phase);
        }
    }

    #[test]
    fn test_escape_key_requests_quit_and_stops_the_loop() {
        let shared = SessionShared::new();
        let mut poll = WindowPoll::default();
        poll.keys.set(KEY_ESCAPE, true);
        apply_window_events(&shared, &poll, 1.0, &mut 0.0, None);
        assert!(shared.quit_requested(), "the application poll sees quit");
        assert!(!shared.should_run(), "the loop drains on its next check");
    }

    #[test]
    fn test_window_close_requests_quit_and_stops_the_loop() {
        let shared = SessionShared::new();
        let poll = WindowPoll {
            close_requested: true,
            ..Default::default()
        };
        apply_window_events(&shared, &poll, 1.0, &mut 0.0, None);
        assert!(shared.quit_requested());
        assert!(!shared.should_run());
    }

    #[test]
    fn test_vertical_scroll_walks_along_the_head_direction() {
        let shared = SessionShared::new();
        let poll = WindowPoll {
            scroll: (0.0, 2.0),
            ..Default::default()
        };
        apply_window_events(&shared, &poll, 1.0, &mut 0.0, None);

        // Default head faces -Z; two ticks push navigation 0.4 forward,
        // which the navigation matrix stores negated.
        let nav = *shared.nav.matrix_snapshot();
        let translation = nav.cols[3];
        assert!((translation.x - 0.0).abs() < 1e-5);
        assert!((translation.z - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_horizontal_scroll_turns_and_uses_time_between_scrolls() {
        let shared = SessionShared::new();
        let mut last_scroll = 0.0;
        let poll = WindowPoll {
            scroll: (1.0, 0.0),
            ..Default::default()
        };
        // First event: dt = 0.5s at 90 deg/s asks for a -45 degree turn,
        // which the navigation layer negates into Ry(+45).
        apply_window_events(&shared, &poll, 0.5, &mut last_scroll, None);
        assert_eq!(last_scroll, 0.5);

        let nav = *shared.nav.matrix_snapshot();
        let expected = Mat4::from_rotation_y(cavern_core::math::degrees_to_radians(45.0));
        for col in 0..4 {
            assert!((nav.cols[col].x - expected.cols[col].x).abs() < 1e-4);
            assert!((nav.cols[col].y - expected.cols[col].y).abs() < 1e-4);
            assert!((nav.cols[col].z - expected.cols[col].z).abs() < 1e-4);
        }
    }

    #[test]
    fn test_input_snapshot_carries_last_controller_state() {
        let shared = SessionShared::new();
        let mut state = ControllerState::default();
        state.axes[1][0] = 0.75;
        apply_window_events(&shared, &WindowPoll::default(), 1.0, &mut 0.0, Some(state));
        let snapshot = shared.input();
        assert!(snapshot.controller.is_some());
        assert_eq!(snapshot.controller.unwrap().axes[1][0], 0.75);
    }
}

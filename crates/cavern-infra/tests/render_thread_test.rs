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

//! Integration tests for the render-thread lifecycle.
//!
//! The loop is driven end to end with scripted stand-ins for the four
//! session backends; no VR runtime or GL context is involved. A script
//! usually ends with `SessionEnded`, which winds the loop down the same
//! way a runtime shutdown would.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cavern_core::display::{Eye, MirrorSurface, StereoDisplay, WindowPoll};
use cavern_core::error::{DisplayError, PipelineError, TrackingError, WindowError};
use cavern_core::input::ControllerState;
use cavern_core::math::Mat4;
use cavern_core::session::SessionShared;
use cavern_core::tracking::{
    DeviceClass, Hand, HmdProfile, PoseSource, RawTrackingFrame, TrackedDevice, FEET_PER_METER,
};
use cavern_infra::callback::CallbackSlots;
use cavern_infra::pipeline::FramePipeline;
use cavern_infra::thread::{spawn, Phase, RenderSettings, RenderThreadHandle, SessionFactory, VrSession};
use cavern_infra::RenderArgs;

// --- Test setup: scripted backends ---

#[derive(Default)]
struct Counters {
    init_takes: AtomicUsize,
    eyes_rendered: AtomicUsize,
    frames_finished: AtomicUsize,
    swaps: AtomicUsize,
}

struct ScriptedSource {
    profile: HmdProfile,
    script: VecDeque<Result<RawTrackingFrame, TrackingError>>,
    /// Returned once the script runs out.
    after: fn() -> Result<RawTrackingFrame, TrackingError>,
}

impl PoseSource for ScriptedSource {
    fn hmd_profile(&self) -> &HmdProfile {
        &self.profile
    }

    fn wait_poses(&mut self) -> Result<RawTrackingFrame, TrackingError> {
        // A tiny delay keeps an unbounded script from starving the
        // spawning thread in the open-ended tests.
        std::thread::sleep(Duration::from_micros(200));
        self.script.pop_front().unwrap_or_else(|| (self.after)())
    }
}

struct CountingPipeline {
    counters: Arc<Counters>,
}

impl FramePipeline for CountingPipeline {
    fn run_init(&mut self, slots: &CallbackSlots) {
        // No GL context in these tests, so the registered callback is
        // consumed without running; the latch mechanics are what is
        // under test here.
        if slots.take_init().is_some() {
            self.counters.init_takes.fetch_add(1, Ordering::SeqCst);
            slots.mark_init_done();
        }
    }

    fn render_eye(
        &mut self,
        _args: &RenderArgs,
        _slots: &CallbackSlots,
    ) -> Result<u32, PipelineError> {
        self.counters.eyes_rendered.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }

    fn blit_mirror(&mut self, _eye: Eye, _extent: (u32, u32)) -> Result<(), PipelineError> {
        Ok(())
    }
}

struct StubDisplay {
    counters: Arc<Counters>,
}

impl StereoDisplay for StubDisplay {
    fn render_extent(&self) -> (u32, u32) {
        (64, 64)
    }

    fn projection(&self, _eye: Eye, _near: f32, _far: f32) -> Mat4 {
        Mat4::IDENTITY
    }

    fn eye_to_head(&self, _eye: Eye) -> Mat4 {
        Mat4::IDENTITY
    }

    fn submit(&mut self, _eye: Eye, _color_texture: u32) -> Result<(), DisplayError> {
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<(), DisplayError> {
        self.counters.frames_finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedMirror {
    counters: Arc<Counters>,
    polls: VecDeque<WindowPoll>,
}

impl MirrorSurface for ScriptedMirror {
    fn extent(&self) -> (u32, u32) {
        (64, 64)
    }

    fn swap_buffers(&mut self) -> Result<(), WindowError> {
        self.counters.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn pump(&mut self) -> WindowPoll {
        self.polls.pop_front().unwrap_or_default()
    }
}

fn test_profile() -> HmdProfile {
    HmdProfile {
        driver: "scripted".into(),
        model: "Test HMD".into(),
        serial: "none".into(),
        display_frequency: 90.0,
    }
}

fn empty_frame() -> RawTrackingFrame {
    RawTrackingFrame {
        devices: vec![TrackedDevice {
            class: DeviceClass::Hmd,
            role: None,
            pose: Some(Mat4::IDENTITY),
        }],
        controller: None,
    }
}

fn session_ended() -> Result<RawTrackingFrame, TrackingError> {
    Err(TrackingError::SessionEnded)
}

/// Spawns the loop against scripted backends and returns the handles the
/// assertions need. `shared` comes from the caller so callbacks can
/// capture it before the thread starts.
fn run_scripted(
    shared: Arc<SessionShared>,
    script: Vec<Result<RawTrackingFrame, TrackingError>>,
    after: fn() -> Result<RawTrackingFrame, TrackingError>,
    polls: Vec<WindowPoll>,
    slots: Arc<CallbackSlots>,
) -> (Arc<Counters>, RenderThreadHandle) {
    let counters = Arc::new(Counters::default());

    let factory_counters = counters.clone();
    let factory: SessionFactory = Box::new(move || {
        let counters = factory_counters;
        Ok(VrSession {
            pipeline: Box::new(CountingPipeline {
                counters: counters.clone(),
            }),
            display: Box::new(StubDisplay {
                counters: counters.clone(),
            }),
            source: Box::new(ScriptedSource {
                profile: test_profile(),
                script: script.into(),
                after,
            }),
            mirror: Box::new(ScriptedMirror {
                counters,
                polls: polls.into(),
            }),
        })
    });

    let settings = RenderSettings {
        near: 0.01,
        far: 10000.0,
        mirror_eye: Eye::Right,
    };
    let handle = spawn(shared, slots, settings, factory);
    (counters, handle)
}

// --- Tests ---

#[test]
fn test_loop_initializes_renders_and_drains() {
    let slots = Arc::new(CallbackSlots::new());
    slots.set_init(Box::new(|_| {}));
    let ticks = Arc::new(AtomicUsize::new(0));
    let tick_count = ticks.clone();
    slots.set_frame(Box::new(move |_| {
        tick_count.fetch_add(1, Ordering::SeqCst);
    }));
    let stops = Arc::new(AtomicUsize::new(0));
    let stop_count = stops.clone();
    slots.set_stop(Box::new(move || {
        stop_count.fetch_add(1, Ordering::SeqCst);
    }));

    let shared = Arc::new(SessionShared::new());
    let script = vec![Ok(empty_frame()), Ok(empty_frame()), Ok(empty_frame())];
    let (counters, mut handle) =
        run_scripted(shared.clone(), script, session_ended, Vec::new(), slots.clone());
    handle.join();

    assert_eq!(handle.phase(), Phase::Terminated);
    assert!(shared.is_ready());
    assert!(
        shared.quit_requested(),
        "a runtime shutdown reads as a quit request"
    );
    assert_eq!(
        counters.init_takes.load(Ordering::SeqCst),
        1,
        "init consumed exactly once"
    );
    assert!(slots.init_satisfied());
    assert!(slots.take_init().is_none(), "init slot stays drained");
    assert_eq!(ticks.load(Ordering::SeqCst), 3, "one tick per tracked frame");
    assert_eq!(stops.load(Ordering::SeqCst), 1, "stop ran exactly once");
    assert_eq!(counters.eyes_rendered.load(Ordering::SeqCst), 6);
    assert_eq!(counters.frames_finished.load(Ordering::SeqCst), 3);
    assert_eq!(counters.swaps.load(Ordering::SeqCst), 3);
    // Three tracked frames plus the iteration that saw the shutdown.
    assert_eq!(shared.frame_number(), 4);
}

#[test]
fn test_readiness_precedes_every_callback() {
    let slots = Arc::new(CallbackSlots::new());
    let shared = Arc::new(SessionShared::new());
    let always_ready = Arc::new(AtomicBool::new(true));

    let probe = shared.clone();
    let ready_flag = always_ready.clone();
    slots.set_frame(Box::new(move |_| {
        if !probe.is_ready() {
            ready_flag.store(false, Ordering::SeqCst);
        }
    }));

    let script = vec![Ok(empty_frame()), Ok(empty_frame())];
    let (_counters, mut handle) =
        run_scripted(shared, script, session_ended, Vec::new(), slots);
    handle.join();

    assert!(
        always_ready.load(Ordering::SeqCst),
        "no frame callback before the session was marked ready"
    );
}

#[test]
fn test_transient_frames_advance_counter_but_skip_rendering() {
    let slots = Arc::new(CallbackSlots::new());
    let ticks = Arc::new(AtomicUsize::new(0));
    let tick_count = ticks.clone();
    slots.set_frame(Box::new(move |_| {
        tick_count.fetch_add(1, Ordering::SeqCst);
    }));

    let hiccup = || TrackingError::Transient {
        message: "scripted loss".into(),
    };
    let shared = Arc::new(SessionShared::new());
    let script = vec![Err(hiccup()), Ok(empty_frame()), Err(hiccup())];
    let (counters, mut handle) =
        run_scripted(shared.clone(), script, session_ended, Vec::new(), slots);
    handle.join();

    // Every loop iteration counts a frame and ticks the application,
    // but only the tracked one reached the display.
    assert_eq!(shared.frame_number(), 4);
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert_eq!(counters.frames_finished.load(Ordering::SeqCst), 1);
    assert_eq!(counters.swaps.load(Ordering::SeqCst), 1);
    assert_eq!(counters.eyes_rendered.load(Ordering::SeqCst), 2);
}

#[test]
fn test_escape_key_drains_the_loop_and_raises_quit() {
    let slots = Arc::new(CallbackSlots::new());
    let stops = Arc::new(AtomicUsize::new(0));
    let stop_count = stops.clone();
    slots.set_stop(Box::new(move || {
        stop_count.fetch_add(1, Ordering::SeqCst);
    }));

    let mut poll = WindowPoll::default();
    poll.keys.set(256, true); // Escape
    let shared = Arc::new(SessionShared::new());
    // Open-ended tracking script: only the key press ends the session.
    let (_counters, mut handle) = run_scripted(
        shared.clone(),
        Vec::new(),
        || Ok(empty_frame()),
        vec![poll],
        slots,
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.phase() != Phase::Terminated && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(
        handle.phase(),
        Phase::Terminated,
        "a close request winds the loop down without any application call"
    );
    assert!(shared.quit_requested(), "escape raises the quit flag");
    assert_eq!(stops.load(Ordering::SeqCst), 1, "the stop callback ran");
    handle.join();
}

#[test]
fn test_wand_latch_and_controller_carry_reach_the_snapshots() {
    let slots = Arc::new(CallbackSlots::new());

    let wand_pose = Mat4::from_translation(cavern_core::math::Vec3::new(1.0, 0.0, 0.0));
    let mut controller = ControllerState::default();
    controller.axes[1][0] = 0.9;
    let tracked_frame = RawTrackingFrame {
        devices: vec![
            TrackedDevice {
                class: DeviceClass::Hmd,
                role: None,
                pose: Some(Mat4::IDENTITY),
            },
            TrackedDevice {
                class: DeviceClass::Controller,
                role: Some(Hand::Right),
                pose: Some(wand_pose),
            },
        ],
        controller: Some(controller),
    };

    // One frame with a wand, then two without any controller at all.
    let shared = Arc::new(SessionShared::new());
    let script = vec![Ok(tracked_frame), Ok(empty_frame()), Ok(empty_frame())];
    let (_counters, mut handle) =
        run_scripted(shared.clone(), script, session_ended, Vec::new(), slots);
    handle.join();

    let tracking = shared.tracking();
    assert!(tracking.wand_tracked, "wand tracking latches on");
    let expected_x = 1.0 / FEET_PER_METER;
    assert!(
        (tracking.wand.world.position.x - expected_x).abs() < 1e-5,
        "wand keeps its last known position, in legacy units"
    );

    let input = shared.input();
    let carried = input.controller.expect("controller state carried forward");
    assert_eq!(carried.axes[1][0], 0.9);
}

#[test]
fn test_session_without_init_callback_ticks_from_the_first_frame() {
    let slots = Arc::new(CallbackSlots::new());
    let ticks = Arc::new(AtomicUsize::new(0));
    let tick_count = ticks.clone();
    slots.set_frame(Box::new(move |_| {
        tick_count.fetch_add(1, Ordering::SeqCst);
    }));

    let shared = Arc::new(SessionShared::new());
    let script = vec![Ok(empty_frame())];
    let (counters, mut handle) =
        run_scripted(shared, script, session_ended, Vec::new(), slots);
    handle.join();

    assert_eq!(ticks.load(Ordering::SeqCst), 1);
    assert_eq!(counters.init_takes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stopping_before_any_quit_still_drains_cleanly() {
    let slots = Arc::new(CallbackSlots::new());
    let stops = Arc::new(AtomicUsize::new(0));
    let stop_count = stops.clone();
    slots.set_stop(Box::new(move || {
        stop_count.fetch_add(1, Ordering::SeqCst);
    }));

    let shared = Arc::new(SessionShared::new());
    let (_counters, mut handle) = run_scripted(
        shared.clone(),
        Vec::new(),
        || Ok(empty_frame()),
        Vec::new(),
        slots,
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    while shared.frame_number() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(shared.frame_number() >= 3, "loop was running");

    shared.request_stop();
    handle.join();
    assert_eq!(handle.phase(), Phase::Terminated);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

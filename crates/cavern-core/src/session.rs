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

//! State shared between the application thread and the render thread.
//!
//! [`SessionShared`] is the only channel between the two threads: the
//! render thread publishes tracking and input snapshots into it, the
//! application thread reads them and drives navigation through it. It is
//! always held behind an `Arc`.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::input::InputSnapshot;
use crate::nav::Navigation;
use crate::sync::SharedSnapshot;
use crate::tracking::{HmdProfile, ResolvedTracking};

/// The cross-thread session hub.
pub struct SessionShared {
    /// The navigation matrix, mutated by the application thread and read
    /// by the render thread each frame.
    pub nav: Navigation,
    tracking: SharedSnapshot<ResolvedTracking>,
    input: SharedSnapshot<InputSnapshot>,
    hmd: Mutex<Option<HmdProfile>>,
    render_width: AtomicU32,
    render_height: AtomicU32,
    frame: AtomicI64,
    started: Instant,
    ready: AtomicBool,
    run: AtomicBool,
    initted: AtomicBool,
    quit: AtomicBool,
}

impl SessionShared {
    /// Creates the hub in its pre-startup state: frame zero, clock
    /// starting now, render loop allowed to run.
    pub fn new() -> Self {
        Self {
            nav: Navigation::new(),
            tracking: SharedSnapshot::default(),
            input: SharedSnapshot::default(),
            hmd: Mutex::new(None),
            render_width: AtomicU32::new(0),
            render_height: AtomicU32::new(0),
            frame: AtomicI64::new(0),
            started: Instant::now(),
            ready: AtomicBool::new(false),
            run: AtomicBool::new(true),
            initted: AtomicBool::new(false),
            quit: AtomicBool::new(false),
        }
    }

    /// The most recently published tracking state.
    pub fn tracking(&self) -> Arc<ResolvedTracking> {
        self.tracking.load()
    }

    /// Publishes a new tracking state. Called by the render thread once
    /// per frame.
    pub fn publish_tracking(&self, state: ResolvedTracking) {
        self.tracking.publish(state);
    }

    /// The most recently published input state.
    pub fn input(&self) -> Arc<InputSnapshot> {
        self.input.load()
    }

    /// Publishes a new input state. Called by the render thread once per
    /// frame.
    pub fn publish_input(&self, state: InputSnapshot) {
        self.input.publish(state);
    }

    /// Records the headset identity once the backend knows it.
    pub fn set_hmd_profile(&self, profile: HmdProfile) {
        let mut slot = self.hmd.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(profile);
    }

    /// The headset identity, available once the render thread is ready.
    pub fn hmd_profile(&self) -> Option<HmdProfile> {
        let slot = self.hmd.lock().unwrap_or_else(|p| p.into_inner());
        slot.clone()
    }

    /// Records the per-eye render target size.
    pub fn set_render_extent(&self, extent: (u32, u32)) {
        self.render_width.store(extent.0, Ordering::Release);
        self.render_height.store(extent.1, Ordering::Release);
    }

    /// Per-eye render target size; (0, 0) until the render thread is
    /// ready.
    pub fn render_extent(&self) -> (u32, u32) {
        (
            self.render_width.load(Ordering::Acquire),
            self.render_height.load(Ordering::Acquire),
        )
    }

    /// The number of frames the render loop has started.
    pub fn frame_number(&self) -> i64 {
        self.frame.load(Ordering::Relaxed)
    }

    /// Increments the frame counter and returns the new frame number.
    pub fn advance_frame(&self) -> i64 {
        self.frame.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Seconds elapsed since the session was created.
    pub fn time_secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Marks the render thread as fully initialized. Startup blocks on
    /// this flag.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// True once the render thread has finished initializing and
    /// published its first state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Asks the render loop to wind down after its current iteration.
    pub fn request_stop(&self) {
        self.run.store(false, Ordering::Release);
    }

    /// True while the render loop should keep iterating.
    pub fn should_run(&self) -> bool {
        self.run.load(Ordering::Acquire)
    }

    /// Marks library startup as complete.
    pub fn mark_initted(&self) {
        self.initted.store(true, Ordering::Release);
    }

    /// True once library startup has completed.
    pub fn is_initted(&self) -> bool {
        self.initted.load(Ordering::Acquire)
    }

    /// Records that the user asked to quit (window close or an explicit
    /// exit call). Sticky.
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    /// True once a quit has been requested.
    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }
}

impl Default for SessionShared {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::tracking::ResolvedTracking;

    #[test]
    fn test_new_session_starts_at_frame_zero_and_not_ready() {
        let shared = SessionShared::new();
        assert_eq!(shared.frame_number(), 0);
        assert!(!shared.is_ready());
        assert!(!shared.is_initted());
        assert!(!shared.quit_requested());
        assert!(shared.should_run());
    }

    #[test]
    fn test_advance_frame_counts_up() {
        let shared = SessionShared::new();
        assert_eq!(shared.advance_frame(), 1);
        assert_eq!(shared.advance_frame(), 2);
        assert_eq!(shared.frame_number(), 2);
    }

    #[test]
    fn test_published_tracking_replaces_the_default() {
        let shared = SessionShared::new();
        assert_eq!(
            shared.tracking().head.world.front,
            Vec3::new(0.0, 0.0, -1.0),
            "pre-tracking default faces -Z"
        );

        let mut state = ResolvedTracking::default();
        state.head.world.position = Vec3::new(0.0, 5.5, 0.0);
        shared.publish_tracking(state);
        assert_eq!(shared.tracking().head.world.position, Vec3::new(0.0, 5.5, 0.0));
    }

    #[test]
    fn test_lifecycle_flags_are_sticky() {
        let shared = SessionShared::new();
        shared.mark_ready();
        shared.mark_initted();
        shared.request_quit();
        shared.request_stop();
        assert!(shared.is_ready());
        assert!(shared.is_initted());
        assert!(shared.quit_requested());
        assert!(!shared.should_run());
    }

    #[test]
    fn test_hmd_profile_starts_empty_and_sticks() {
        let shared = SessionShared::new();
        assert!(shared.hmd_profile().is_none());

        shared.set_hmd_profile(crate::tracking::HmdProfile {
            driver: "runtime".into(),
            model: "Headset Pro".into(),
            serial: "123".into(),
            display_frequency: 90.0,
        });
        let profile = shared.hmd_profile().expect("profile was published");
        assert_eq!(profile.model, "Headset Pro");
    }

    #[test]
    fn test_session_clock_moves_forward() {
        let shared = SessionShared::new();
        let t0 = shared.time_secs();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(shared.time_secs() > t0);
    }
}

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

//! Application callback slots and the data handed to them.
//!
//! Applications register typed closures (init, draw, per-frame, stop)
//! from their own thread; the render thread invokes them. The slots are
//! the only place a registration can race a dispatch, so all of them sit
//! behind mutexes and a registration simply takes effect on the next
//! frame.
//!
//! The one-shot init callback is latched: draw and per-frame dispatch
//! stay gated until a registered init has actually run. When no init was
//! ever registered the gate is open from the start.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use cavern_core::display::Eye;
use cavern_core::math::Mat4;

/// GL access handed to init and draw callbacks for the duration of one
/// call. The context lives on the render thread; callbacks borrow it and
/// must not stash it.
pub struct RenderApi<'a> {
    /// The render thread's OpenGL context.
    pub gl: &'a glow::Context,
}

/// Per-eye data for one draw dispatch.
#[derive(Debug, Clone, Copy)]
pub struct RenderArgs {
    /// The eye being rendered.
    pub eye: Eye,
    /// The eye's projection matrix at the configured clip planes.
    pub projection: Mat4,
    /// Eye-from-world view matrix with the legacy scene scale folded in,
    /// so geometry drawn in query units lands where queries said it is.
    pub view: Mat4,
    /// Snapshot of the navigation matrix for this frame.
    pub nav: Mat4,
    /// Render target size in pixels; the viewport is already set to it.
    pub extent: (u32, u32),
    /// The frame number this draw belongs to.
    pub frame: i64,
    /// Seconds since startup.
    pub time: f32,
}

/// Timing data for the per-frame callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTick {
    /// The frame number.
    pub frame: i64,
    /// Seconds since startup.
    pub time: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
}

/// One-shot GL setup callback.
pub type InitFn = Box<dyn FnMut(&RenderApi) + Send>;
/// Per-eye draw callback.
pub type DrawFn = Box<dyn FnMut(&RenderApi, &RenderArgs) + Send>;
/// Once-per-frame callback, dispatched after tracking resolution and
/// before drawing. No GL access.
pub type FrameFn = Box<dyn FnMut(FrameTick) + Send>;
/// Teardown callback, dispatched once while the render thread drains.
pub type StopFn = Box<dyn FnMut() + Send>;

/// The registered application callbacks, shared between the application
/// thread (writers) and the render thread (caller).
#[derive(Default)]
pub struct CallbackSlots {
    init: Mutex<Option<InitFn>>,
    draw: Mutex<Option<DrawFn>>,
    frame: Mutex<Option<FrameFn>>,
    stop: Mutex<Option<StopFn>>,
    init_registered: AtomicBool,
    init_done: AtomicBool,
}

impl CallbackSlots {
    /// Creates empty slots with the init gate open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the one-shot GL init callback and arms the gate. A
    /// registration after startup runs before the next draw.
    pub fn set_init(&self, f: InitFn) {
        *lock(&self.init) = Some(f);
        self.init_done.store(false, Ordering::Release);
        self.init_registered.store(true, Ordering::Release);
    }

    /// Registers the per-eye draw callback, replacing any previous one.
    pub fn set_draw(&self, f: DrawFn) {
        *lock(&self.draw) = Some(f);
    }

    /// Registers the per-frame callback, replacing any previous one.
    pub fn set_frame(&self, f: FrameFn) {
        *lock(&self.frame) = Some(f);
    }

    /// Registers the teardown callback, replacing any previous one.
    pub fn set_stop(&self, f: StopFn) {
        *lock(&self.stop) = Some(f);
    }

    /// Removes and returns the pending init callback, if any. The caller
    /// runs it with its GL context and then reports completion through
    /// [`CallbackSlots::mark_init_done`].
    pub fn take_init(&self) -> Option<InitFn> {
        lock(&self.init).take()
    }

    /// Records that a taken init callback has finished.
    pub fn mark_init_done(&self) {
        self.init_done.store(true, Ordering::Release);
    }

    /// True when drawing may proceed: either no init callback was ever
    /// registered, or the registered one has run.
    pub fn init_satisfied(&self) -> bool {
        !self.init_registered.load(Ordering::Acquire) || self.init_done.load(Ordering::Acquire)
    }

    /// Invokes the draw callback if one is registered. Returns whether a
    /// callback ran.
    pub fn call_draw(&self, api: &RenderApi, args: &RenderArgs) -> bool {
        // A draw never runs ahead of a pending init registration.
        if !self.init_satisfied() {
            return false;
        }
        match lock(&self.draw).as_mut() {
            Some(f) => {
                f(api, args);
                true
            }
            None => false,
        }
    }

    /// Invokes the per-frame callback if one is registered. Returns
    /// whether a callback ran.
    pub fn call_frame(&self, tick: FrameTick) -> bool {
        match lock(&self.frame).as_mut() {
            Some(f) => {
                f(tick);
                true
            }
            None => false,
        }
    }

    /// Takes and invokes the teardown callback. Subsequent calls find the
    /// slot empty, so teardown runs at most once per registration.
    pub fn call_stop(&self) -> bool {
        match lock(&self.stop).take() {
            Some(mut f) => {
                f();
                true
            }
            None => false,
        }
    }

    /// True while a draw callback is registered.
    pub fn has_draw(&self) -> bool {
        lock(&self.draw).is_some()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_gate_is_open_without_an_init_callback() {
        let slots = CallbackSlots::new();
        assert!(slots.init_satisfied());
        assert!(slots.take_init().is_none());
    }

    #[test]
    fn test_registering_init_closes_the_gate_until_it_runs() {
        let slots = CallbackSlots::new();
        slots.set_init(Box::new(|_api| {}));
        assert!(!slots.init_satisfied(), "gate closes on registration");

        let cb = slots.take_init();
        assert!(cb.is_some());
        slots.mark_init_done();
        assert!(slots.init_satisfied());
    }

    #[test]
    fn test_init_can_be_taken_only_once() {
        let slots = CallbackSlots::new();
        slots.set_init(Box::new(|_api| {}));
        assert!(slots.take_init().is_some());
        assert!(slots.take_init().is_none(), "the slot empties on take");
    }

    #[test]
    fn test_frame_callback_receives_the_tick() {
        let slots = CallbackSlots::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_cb = Arc::clone(&seen);
        slots.set_frame(Box::new(move |tick| {
            seen_in_cb.store(tick.frame as usize, Ordering::Relaxed);
        }));

        let ran = slots.call_frame(FrameTick {
            frame: 41,
            time: 1.0,
            dt: 0.016,
        });
        assert!(ran);
        assert_eq!(seen.load(Ordering::Relaxed), 41);
    }

    #[test]
    fn test_stop_runs_at_most_once_per_registration() {
        let slots = CallbackSlots::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_in_cb = Arc::clone(&runs);
        slots.set_stop(Box::new(move || {
            runs_in_cb.fetch_add(1, Ordering::Relaxed);
        }));

        assert!(slots.call_stop());
        assert!(!slots.call_stop(), "the slot empties after the first run");
        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_draw_slot_replacement_keeps_one_callback() {
        let slots = CallbackSlots::new();
        assert!(!slots.has_draw());
        slots.set_draw(Box::new(|_api, _args| {}));
        slots.set_draw(Box::new(|_api, _args| {}));
        assert!(slots.has_draw());
    }

    #[test]
    fn test_reregistering_init_rearms_the_gate() {
        let slots = CallbackSlots::new();
        slots.set_init(Box::new(|_api| {}));
        slots.take_init();
        slots.mark_init_done();
        assert!(slots.init_satisfied());

        slots.set_init(Box::new(|_api| {}));
        assert!(!slots.init_satisfied(), "a late registration runs before the next draw");
    }
}

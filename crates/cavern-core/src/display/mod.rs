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

//! Contracts between the render loop and the display hardware.
//!
//! [`StereoDisplay`] abstracts the headset compositor and [`MirrorSurface`]
//! the desktop companion window. Both are driven from the render thread
//! only; neither trait requires `Send` because the concrete backends hold
//! thread-affine handles (OpenGL contexts, X connections).

use crate::error::{DisplayError, WindowError};
use crate::input::{KeySet, MouseButtons};
use crate::math::Mat4;

/// One of the two stereo views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// The left eye view.
    Left,
    /// The right eye view.
    Right,
}

impl Eye {
    /// Both eyes, in submission order.
    pub const ALL: [Eye; 2] = [Eye::Left, Eye::Right];

    /// The eye's slot in per-eye arrays (left is 0, right is 1).
    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

/// A stereo headset the render loop submits frames to.
///
/// Calls follow a strict per-frame order: `projection` and `eye_to_head`
/// may be read at any time, but each frame must `submit` both eyes and
/// then call `finish_frame` exactly once.
pub trait StereoDisplay {
    /// The per-eye render target size in pixels, as recommended by the
    /// runtime. Both eyes share one extent.
    fn render_extent(&self) -> (u32, u32);

    /// The projection matrix for one eye at the given clip planes.
    fn projection(&self, eye: Eye, near: f32, far: f32) -> Mat4;

    /// The rigid transform from the eye to the head, in meters.
    fn eye_to_head(&self, eye: Eye) -> Mat4;

    /// Hands one eye's finished color texture to the compositor.
    ///
    /// `color_texture` is the raw GL texture name the eye was rendered
    /// into; the display copies or aliases it before returning.
    fn submit(&mut self, eye: Eye, color_texture: u32) -> Result<(), DisplayError>;

    /// Marks the stereo frame complete so the compositor can present it.
    fn finish_frame(&mut self) -> Result<(), DisplayError>;
}

/// Input and lifecycle events drained from the companion window.
///
/// One value is produced per [`MirrorSurface::pump`] call. Deltas
/// (scroll) accumulate between pumps; states (keys, mouse) are complete
/// snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowPoll {
    /// True once the user has asked the window to close.
    pub close_requested: bool,
    /// The new inner size, if the window was resized since the last pump.
    pub resized: Option<(u32, u32)>,
    /// Scroll wheel movement since the last pump, in (x, y) line units.
    pub scroll: (f32, f32),
    /// The keyboard state at pump time.
    pub keys: KeySet,
    /// The mouse button state at pump time.
    pub mouse: MouseButtons,
}

/// The desktop window that mirrors one eye and collects keyboard and
/// mouse input.
pub trait MirrorSurface {
    /// The window's current inner size in pixels.
    fn extent(&self) -> (u32, u32);

    /// Presents the window's back buffer.
    fn swap_buffers(&mut self) -> Result<(), WindowError>;

    /// Processes pending window events and reports the result.
    fn pump(&mut self) -> WindowPoll;
}

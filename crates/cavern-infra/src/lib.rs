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

//! # Cavern Infra
//!
//! Concrete implementations of the external dependencies behind the
//! `cavern-core` contracts: the OpenXR headset backend, the OpenGL
//! per-eye pipeline, the X11 mirror window, and the render thread that
//! drives them all.
//!
//! Everything graphics-related in this crate is thread-affine. The
//! [`thread`] module owns that constraint: backends are constructed on
//! the render thread itself via a `Send` factory and never leave it.

pub mod callback;
pub mod pipeline;
pub mod platform;
pub mod thread;
pub mod xr;

pub use callback::{CallbackSlots, FrameTick, RenderApi, RenderArgs};
pub use thread::{Phase, RenderSettings, RenderThreadHandle, SessionFactory, VrSession};
pub use xr::{connect_openxr, SessionDesc};

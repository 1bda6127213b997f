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

//! # Cavern Core
//!
//! Foundational crate of the cavern workspace: interface contracts and pure
//! logic for a CAVE-style immersive API running on top of a consumer HMD
//! runtime.
//!
//! This crate is deliberately free of graphics and platform dependencies.
//! It defines:
//!
//! - The math primitives (`math`) shared by every layer.
//! - The navigation matrix and its legacy composition rules (`nav`).
//! - The tracking contracts: the [`tracking::PoseSource`] seam the render
//!   thread pulls poses through, and the resolver that turns raw device
//!   poses into the queryable head/wand state (`tracking`).
//! - The wand/keyboard input model: device families, button mapping,
//!   edge detection and the key table (`input`).
//! - The display contracts the render pipeline is built against
//!   (`display`).
//! - The shared session state both threads hold (`session`), built on
//!   publish-by-swap snapshots (`sync`).
//! - The error taxonomy (`error`).

#![warn(missing_docs)]

pub mod display;
pub mod error;
pub mod input;
pub mod math;
pub mod nav;
pub mod session;
pub mod sync;
pub mod tracking;

pub use session::SessionShared;

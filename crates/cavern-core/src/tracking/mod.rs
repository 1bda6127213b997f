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

//! Tracked-pose acquisition and resolution.
//!
//! [`PoseSource`](source::PoseSource) is the seam to the HMD runtime; the
//! [`PoseResolver`](resolver::PoseResolver) turns its raw meter-space
//! device poses into the queryable head and wand state, in legacy units
//! and in both world and navigated space.

pub mod resolver;
pub mod source;

pub use resolver::{BodyPose, PoseResolver, ResolvedTracking, SpacePose};
pub use source::{
    DeviceClass, Hand, HmdProfile, PoseSource, RawTrackingFrame, TrackedDevice,
    MAX_TRACKED_DEVICES,
};

/// Conversion factor between the runtime's meters and the legacy API's
/// distance unit.
///
/// Tracked positions are divided by this before they reach the
/// application, and the draw pass scales the scene up by the same factor,
/// so queried positions and drawn geometry stay consistent.
pub const FEET_PER_METER: f32 = 3.280_840;

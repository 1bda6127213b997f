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

//! Session configuration.
//!
//! There is no configuration-file layer; applications fill a
//! [`CaveConfig`] in code and hand it to
//! [`CaveSystem::configure`](crate::CaveSystem::configure).

use cavern_core::display::Eye;

/// Everything the session needs to know before startup.
#[derive(Debug, Clone)]
pub struct CaveConfig {
    /// Application name reported to the HMD runtime.
    pub app_name: String,
    /// Title of the desktop mirror window.
    pub window_title: String,
    /// Mirror window height in pixels; the width follows the headset's
    /// render aspect.
    pub window_height: u32,
    /// Near clip plane for the eye projections, in scene units.
    pub near: f32,
    /// Far clip plane for the eye projections, in scene units.
    pub far: f32,
    /// Which eye the mirror window shows.
    pub mirror_eye: Eye,
}

impl Default for CaveConfig {
    /// The legacy defaults: clip planes 0.01 to 10000 in scene units, a
    /// 1080-pixel-high mirror of the right eye.
    fn default() -> Self {
        Self {
            app_name: "CAVERN".into(),
            window_title: "CAVERN".into(),
            window_height: 1080,
            near: 0.01,
            far: 10_000.0,
            mirror_eye: Eye::Right,
        }
    }
}

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

//! The public-facing API of cavern: the legacy CAVE-style call surface
//! over an HMD runtime.
//!
//! Applications written against the classic immersive-display API keep
//! their shape: configure, register init/display/frame/stop callbacks,
//! init, then loop on pose queries and navigation calls until quit. Under
//! that surface a render thread drives the headset through OpenXR, draws
//! both eyes through the registered display callback, and mirrors one eye
//! to a desktop window.
//!
//! The one deliberate departure from the legacy shape: there is no global
//! state. [`CaveSystem`] owns the session, and the cluster queries that
//! legacy frame loops call are free functions in [`cluster`] with their
//! single-node answers.

pub mod cluster;
pub mod config;
pub mod ids;
pub mod system;

pub use config::CaveConfig;
pub use ids::{CaveId, CaveKey};
pub use system::CaveSystem;

/// One-stop imports for application `main`s.
pub mod prelude {
    pub use crate::cluster::{
        display_barrier, distrib_master, distrib_num_nodes, master_display, master_wall,
        num_pipes, process_type, unique_index, ProcessType,
    };
    pub use crate::config::CaveConfig;
    pub use crate::ids::{CaveId, CaveKey};
    pub use crate::system::CaveSystem;
    pub use cavern_core::display::Eye;
    pub use cavern_core::math::{Mat4, Vec3};
    pub use cavern_infra::callback::{FrameTick, RenderApi, RenderArgs};
}

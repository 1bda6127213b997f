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

//! Single-node answers for the legacy cluster queries.
//!
//! The legacy API was written for multi-wall, multi-machine installations
//! and applications still call its cluster entry points in their frame
//! loops. An HMD session is always one node, one pipe, one display, so
//! every query has a constant answer and the barrier has nothing to wait
//! for.

/// The process roles the legacy API distinguished between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    /// The application process, the only one that exists here.
    App,
    Display,
    Tracker,
    Network,
    Distrib,
}

/// True when this process drives the master wall. Always true.
pub fn master_wall() -> bool {
    true
}

/// True when this process drives the master display. Always true.
pub fn master_display() -> bool {
    true
}

/// True when this node is the distribution master. Always true.
pub fn distrib_master() -> bool {
    true
}

/// Frame barrier across display nodes. With one node there is nothing to
/// synchronize with.
pub fn display_barrier() {}

/// This node's index among the cluster's nodes.
pub fn unique_index() -> i32 {
    0
}

/// Number of graphics pipes on this node.
pub fn num_pipes() -> i32 {
    1
}

/// Number of nodes in the cluster.
pub fn distrib_num_nodes() -> i32 {
    1
}

/// The calling process's role.
pub fn process_type() -> ProcessType {
    ProcessType::App
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_node_constants() {
        assert!(master_wall());
        assert!(master_display());
        assert!(distrib_master());
        assert_eq!(unique_index(), 0);
        assert_eq!(num_pipes(), 1);
        assert_eq!(distrib_num_nodes(), 1);
        assert_eq!(process_type(), ProcessType::App);
        display_barrier();
    }
}

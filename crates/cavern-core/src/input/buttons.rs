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

//! One-shot button edge detection and the mouse fallback.

/// Mouse-button state used as the wand stand-in while no controller has
/// ever been tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons {
    /// Left mouse button (wand button 1).
    pub left: bool,
    /// Middle mouse button (wand button 2).
    pub middle: bool,
    /// Right mouse button (wand button 3).
    pub right: bool,
    /// Back/extra mouse button (wand button 4).
    pub back: bool,
}

impl MouseButtons {
    /// State of the mouse button standing in for logical wand button
    /// `button` (1 to 4). Out-of-range numbers have no mapping.
    pub fn wand_fallback(&self, button: u8) -> Option<bool> {
        match button {
            1 => Some(self.left),
            2 => Some(self.middle),
            3 => Some(self.right),
            4 => Some(self.back),
            _ => None,
        }
    }
}

/// Per-button edge cache for one-shot change queries.
///
/// Each logical wand button carries a cached tri-state: pressed (1),
/// released (0) or unknown (-1, the initial value and the value of
/// unmapped buttons). A query compares the current state against the
/// cache and reports only transitions.
#[derive(Debug)]
pub struct ButtonMonitor {
    cached: [i8; 4],
}

impl ButtonMonitor {
    /// Creates a monitor with every button in the unknown state.
    pub fn new() -> Self {
        Self { cached: [-1; 4] }
    }

    /// Reports the edge for logical button `button` (1 to 4) given its
    /// current state.
    ///
    /// `state` is `Some(pressed)` from whichever source is active
    /// (controller mapping or mouse fallback) or `None` when unmapped.
    /// Returns `1` on a transition to pressed, `-1` on a transition to
    /// released, `0` when nothing changed. Out-of-range buttons always
    /// return `0`.
    pub fn edge(&mut self, button: u8, state: Option<bool>) -> i32 {
        if !(1..=4).contains(&button) {
            return 0;
        }
        let current: i8 = match state {
            Some(true) => 1,
            Some(false) => 0,
            None => -1,
        };
        let slot = &mut self.cached[(button - 1) as usize];
        if *slot == current {
            return 0;
        }
        *slot = current;
        match current {
            1 => 1,
            0 => -1,
            _ => 0,
        }
    }
}

impl Default for ButtonMonitor {
    fn default() -> Self {
        Self::new()
    }
}

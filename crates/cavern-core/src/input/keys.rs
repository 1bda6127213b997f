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

//! The keyboard state table.
//!
//! Keys are identified by the legacy numeric keycodes (GLFW layout:
//! letters 65..90, digits 48..57, Escape 256, function keys from 290).
//! The table is level-based, not edge-based: a key reads as down for as
//! long as it is held, exactly like polling the legacy window layer.

/// Highest representable keycode (exclusive). The legacy set tops out at
/// 348, so 384 bits cover it with headroom.
const KEY_CAPACITY: usize = 384;

/// A fixed-size bitset over the legacy numeric keycodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySet {
    bits: [u64; KEY_CAPACITY / 64],
}

impl KeySet {
    /// Creates an empty key table (no keys down).
    pub const fn new() -> Self {
        Self {
            bits: [0; KEY_CAPACITY / 64],
        }
    }

    /// Sets or clears the state of `code`. Codes outside the table are
    /// ignored.
    pub fn set(&mut self, code: u16, down: bool) {
        let code = code as usize;
        if code >= KEY_CAPACITY {
            return;
        }
        let (word, bit) = (code / 64, code % 64);
        if down {
            self.bits[word] |= 1 << bit;
        } else {
            self.bits[word] &= !(1 << bit);
        }
    }

    /// Whether `code` is currently down. Codes outside the table read as
    /// up.
    pub fn is_down(&self, code: u16) -> bool {
        let code = code as usize;
        if code >= KEY_CAPACITY {
            return false;
        }
        self.bits[code / 64] & (1 << (code % 64)) != 0
    }
}

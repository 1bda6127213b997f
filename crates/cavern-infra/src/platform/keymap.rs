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

//! X keysym translation to the legacy numeric key codes.
//!
//! Applications poll keys by the numeric codes the old C surface used
//! (printable ASCII for its own range, 256 and up for named keys), so the
//! window layer translates whatever the X server reports into that
//! numbering before it touches the key table.

use x11::keysym;

/// Legacy code for the Escape key.
pub const KEY_ESCAPE: u16 = 256;

/// Translates an X keysym into the legacy key code. Unmapped keysyms
/// return `None` and leave the key table untouched.
pub fn legacy_key_code(sym: u64) -> Option<u16> {
    let sym = sym as u32;

    // Lowercase latin keysyms share the ASCII block; the legacy codes use
    // the uppercase letter.
    if (0x61..=0x7a).contains(&sym) {
        return Some((sym - 0x20) as u16);
    }
    // The rest of printable ASCII maps through unchanged (digits,
    // punctuation, uppercase letters, space).
    if (0x20..=0x60).contains(&sym) {
        return Some(sym as u16);
    }
    // Function row.
    if (keysym::XK_F1..=keysym::XK_F12).contains(&sym) {
        return Some((290 + (sym - keysym::XK_F1)) as u16);
    }
    // Keypad digits.
    if (keysym::XK_KP_0..=keysym::XK_KP_9).contains(&sym) {
        return Some((320 + (sym - keysym::XK_KP_0)) as u16);
    }

    let code = match sym {
        keysym::XK_Escape => 256,
        keysym::XK_Return => 257,
        keysym::XK_Tab => 258,
        keysym::XK_BackSpace => 259,
        keysym::XK_Insert => 260,
        keysym::XK_Delete => 261,
        keysym::XK_Right => 262,
        keysym::XK_Left => 263,
        keysym::XK_Down => 264,
        keysym::XK_Up => 265,
        keysym::XK_Page_Up => 266,
        keysym::XK_Page_Down => 267,
        keysym::XK_Home => 268,
        keysym::XK_End => 269,
        keysym::XK_Caps_Lock => 280,
        keysym::XK_Scroll_Lock => 281,
        keysym::XK_Num_Lock => 282,
        keysym::XK_Print => 283,
        keysym::XK_Pause => 284,
        keysym::XK_KP_Decimal => 330,
        keysym::XK_KP_Divide => 331,
        keysym::XK_KP_Multiply => 332,
        keysym::XK_KP_Subtract => 333,
        keysym::XK_KP_Add => 334,
        keysym::XK_KP_Enter => 335,
        keysym::XK_KP_Equal => 336,
        keysym::XK_Shift_L => 340,
        keysym::XK_Control_L => 341,
        keysym::XK_Alt_L => 342,
        keysym::XK_Super_L => 343,
        keysym::XK_Shift_R => 344,
        keysym::XK_Control_R => 345,
        keysym::XK_Alt_R => 346,
        keysym::XK_Super_R => 347,
        keysym::XK_Menu => 348,
        _ => return None,
    };
    Some(code)
}

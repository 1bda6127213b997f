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

//! Typed ids for the legacy query surface.
//!
//! [`CaveId`] names the pose-query targets and [`CaveKey`] the keyboard
//! table entries. Both carry the full legacy id sets, including ids the
//! query functions recognize but do not answer; passing one of those is a
//! silent no-op, same as the API being emulated.

/// Pose-query target: a tracked body, an eye, or a body's basis vector,
/// each in world space or navigated space.
///
/// Only the head, wand, and the Front/Up/Right vector ids are answered by
/// the query functions. The eye ids and the Back/Left/Down vector ids are
/// part of the legacy id set but were never wired to data; queries leave
/// the output untouched for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaveId {
    Head,
    Wand,
    LeftEye,
    RightEye,
    HeadNav,
    WandNav,
    LeftEyeNav,
    RightEyeNav,
    HeadFront,
    WandFront,
    HeadBack,
    WandBack,
    HeadLeft,
    WandLeft,
    HeadRight,
    WandRight,
    HeadUp,
    WandUp,
    HeadDown,
    WandDown,
    HeadFrontNav,
    WandFrontNav,
    HeadBackNav,
    WandBackNav,
    HeadLeftNav,
    WandLeftNav,
    HeadRightNav,
    WandRightNav,
    HeadUpNav,
    WandUpNav,
    HeadDownNav,
    WandDownNav,
}

/// Keyboard table entry, with the legacy numeric keycode (GLFW layout) as
/// the discriminant.
///
/// The left/right shift discriminants are swapped relative to the GLFW
/// layout; the table ships them as the legacy API did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CaveKey {
    Null = 0,
    A = 65,
    B = 66,
    C = 67,
    D = 68,
    E = 69,
    F = 70,
    G = 71,
    H = 72,
    I = 73,
    J = 74,
    K = 75,
    L = 76,
    M = 77,
    N = 78,
    O = 79,
    P = 80,
    Q = 81,
    R = 82,
    S = 83,
    T = 84,
    U = 85,
    V = 86,
    W = 87,
    X = 88,
    Y = 89,
    Z = 90,
    Zero = 48,
    One = 49,
    Two = 50,
    Three = 51,
    Four = 52,
    Five = 53,
    Six = 54,
    Seven = 55,
    Eight = 56,
    Nine = 57,
    LeftCtrl = 341,
    RightCtrl = 345,
    Escape = 256,
    F1 = 290,
    F2 = 291,
    F3 = 292,
    F4 = 293,
    F5 = 294,
    F6 = 295,
    F7 = 296,
    F8 = 297,
    F9 = 298,
    F10 = 299,
    F11 = 300,
    F12 = 301,
    CapsLock = 280,
    ScrollLock = 281,
    NumLock = 282,
    PrintScreen = 283,
    PageUp = 266,
    PageDown = 267,
    Home = 268,
    End = 269,
    LeftShift = 344,
    LeftAlt = 342,
    RightShift = 340,
    RightAlt = 346,
    Pause = 284,
    Insert = 260,
    Tab = 258,
    Return = 257,
    Space = 32,
    Backspace = 259,
    Delete = 261,
    Semicolon = 59,
    Period = 46,
    Comma = 44,
    Equal = 61,
    Minus = 45,
    Quote = 39,
    AccentGrave = 96,
    Backslash = 92,
    LeftBracket = 91,
    RightBracket = 93,
    LeftArrow = 263,
    RightArrow = 262,
    DownArrow = 264,
    UpArrow = 265,
}

impl CaveKey {
    /// The legacy table folded both control keys into one id with the
    /// left key's code.
    pub const CTRL: CaveKey = CaveKey::LeftCtrl;

    /// The key's numeric code, the index into the key table.
    pub fn code(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes_match_the_legacy_table() {
        assert_eq!(CaveKey::A.code(), 65);
        assert_eq!(CaveKey::Z.code(), 90);
        assert_eq!(CaveKey::Zero.code(), 48);
        assert_eq!(CaveKey::Nine.code(), 57);
        assert_eq!(CaveKey::Escape.code(), 256);
        assert_eq!(CaveKey::F1.code(), 290);
        assert_eq!(CaveKey::F12.code(), 301);
        assert_eq!(CaveKey::Space.code(), 32);
        assert_eq!(CaveKey::UpArrow.code(), 265);
        assert_eq!(CaveKey::CTRL.code(), CaveKey::LeftCtrl.code());
    }

    #[test]
    fn test_shift_codes_keep_the_legacy_swap() {
        // 344 is the right shift in the GLFW layout and 340 the left; the
        // legacy table assigned them crosswise.
        assert_eq!(CaveKey::LeftShift.code(), 344);
        assert_eq!(CaveKey::RightShift.code(), 340);
    }
}

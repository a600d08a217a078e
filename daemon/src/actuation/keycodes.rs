//! Key name to macOS virtual key code table (`kVK_*` values)
//!
//! Kept platform-independent so bindings can be validated anywhere.

use crate::bindings::Key;

const LETTERS: [(char, u16); 26] = [
    ('a', 0x00), ('s', 0x01), ('d', 0x02), ('f', 0x03), ('h', 0x04), ('g', 0x05),
    ('z', 0x06), ('x', 0x07), ('c', 0x08), ('v', 0x09), ('b', 0x0B), ('q', 0x0C),
    ('w', 0x0D), ('e', 0x0E), ('r', 0x0F), ('y', 0x10), ('t', 0x11), ('o', 0x1F),
    ('u', 0x20), ('i', 0x22), ('p', 0x23), ('l', 0x25), ('j', 0x26), ('k', 0x28),
    ('n', 0x2D), ('m', 0x2E),
];

const DIGITS: [u16; 10] = [0x1D, 0x12, 0x13, 0x14, 0x15, 0x17, 0x16, 0x1A, 0x1C, 0x19];

const FUNCTION_KEYS: [u16; 12] = [
    0x7A, 0x78, 0x63, 0x76, 0x60, 0x61, 0x62, 0x64, 0x65, 0x6D, 0x67, 0x6F,
];

/// Virtual key code for a normalized key name
pub fn virtual_keycode(key: &Key) -> Option<u16> {
    let name = key.as_str();

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some(d) = c.to_digit(10) {
            return Some(DIGITS[d as usize]);
        }
        if let Some((_, code)) = LETTERS.iter().find(|(l, _)| *l == c) {
            return Some(*code);
        }
    }

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        return (1..=FUNCTION_KEYS.len())
            .contains(&n)
            .then(|| FUNCTION_KEYS[n - 1]);
    }

    let code = match name {
        "enter" => 0x24,
        "tab" => 0x30,
        "space" => 0x31,
        "backspace" | "delete" => 0x33,
        "escape" => 0x35,
        "cmd" => 0x37,
        "shift" => 0x38,
        "capslock" => 0x39,
        "alt" => 0x3A,
        "ctrl" => 0x3B,
        "fn" => 0x3F,
        "volumeup" => 0x48,
        "volumedown" => 0x49,
        "mute" => 0x4A,
        "home" => 0x73,
        "pageup" => 0x74,
        "forwarddelete" | "del" => 0x75,
        "end" => 0x77,
        "pagedown" => 0x79,
        "left" => 0x7B,
        "right" => 0x7C,
        "down" => 0x7D,
        "up" => 0x7E,
        "-" | "minus" => 0x1B,
        "=" | "equal" => 0x18,
        "[" => 0x21,
        "]" => 0x1E,
        ";" => 0x29,
        "'" => 0x27,
        "," | "comma" => 0x2B,
        "." | "period" => 0x2F,
        "/" | "slash" => 0x2C,
        "\\" => 0x2A,
        "`" => 0x32,
        _ => return None,
    };
    Some(code)
}

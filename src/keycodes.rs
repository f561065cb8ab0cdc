//! Hotkey name -> Windows virtual key code (u16) mapping.
//!
//! VK codes are from the Windows SDK (winuser.h). Names are matched
//! case-insensitively. Letters and top-row digits map to their ASCII
//! uppercase values, as in the SDK.

/// Default capture hotkey.
pub const DEFAULT_HOTKEY: &str = "F12";

/// Named keys that are not letters, digits or function keys.
const NAMED: &[(&str, u16)] = &[
    ("Backspace", 0x08),
    ("Tab", 0x09),
    ("Enter", 0x0D),
    ("Pause", 0x13),
    ("CapsLock", 0x14),
    ("Escape", 0x1B),
    ("Space", 0x20),
    ("PageUp", 0x21),
    ("PageDown", 0x22),
    ("End", 0x23),
    ("Home", 0x24),
    ("Left", 0x25),
    ("Up", 0x26),
    ("Right", 0x27),
    ("Down", 0x28),
    ("PrintScreen", 0x2C),
    ("Insert", 0x2D),
    ("Delete", 0x2E),
    ("NumpadMultiply", 0x6A),
    ("NumpadAdd", 0x6B),
    ("NumpadSubtract", 0x6D),
    ("NumpadDecimal", 0x6E),
    ("NumpadDivide", 0x6F),
    ("NumLock", 0x90),
    ("ScrollLock", 0x91),
    ("Backtick", 0xC0),
];

/// Converts a hotkey name such as `"F12"`, `"K"`, `"Numpad5"` or `"Insert"` to
/// its virtual key code.
///
/// Returns `None` for names with no mapping.
pub fn hotkey_vk(name: &str) -> Option<u16> {
    let name = name.trim();

    // Letters (VK_A = 0x41 .. VK_Z = 0x5A) and top-row digits (0x30 .. 0x39).
    if let [c] = name.as_bytes() {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            return Some(u16::from(c));
        }
    }

    // Function keys (VK_F1 = 0x70 .. VK_F24 = 0x87)
    if let Some(n) = strip_prefix_ci(name, "F").and_then(|n| n.parse::<u16>().ok()) {
        return (1..=24).contains(&n).then(|| 0x6F + n);
    }

    // Numpad digits (VK_NUMPAD0 = 0x60 .. VK_NUMPAD9 = 0x69)
    if let Some(n) = strip_prefix_ci(name, "Numpad").and_then(|n| n.parse::<u16>().ok()) {
        return (n <= 9).then(|| 0x60 + n);
    }

    NAMED
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|&(_, vk)| vk)
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
        .filter(|rest| !rest.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

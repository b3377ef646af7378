use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::ActionError;

pub const VK_BACK: u16 = 0x08;
pub const VK_TAB: u16 = 0x09;
pub const VK_RETURN: u16 = 0x0D;
pub const VK_SHIFT: u16 = 0x10;
pub const VK_CONTROL: u16 = 0x11;
pub const VK_MENU: u16 = 0x12;
pub const VK_CAPITAL: u16 = 0x14;
pub const VK_ESCAPE: u16 = 0x1B;
pub const VK_SPACE: u16 = 0x20;
pub const VK_PRIOR: u16 = 0x21;
pub const VK_NEXT: u16 = 0x22;
pub const VK_END: u16 = 0x23;
pub const VK_HOME: u16 = 0x24;
pub const VK_LEFT: u16 = 0x25;
pub const VK_UP: u16 = 0x26;
pub const VK_RIGHT: u16 = 0x27;
pub const VK_DOWN: u16 = 0x28;
pub const VK_INSERT: u16 = 0x2D;
pub const VK_DELETE: u16 = 0x2E;
pub const VK_F1: u16 = 0x70;

/// Virtual-key code for a named key. Names are lowercase.
pub fn named_key(name: &str) -> Option<u16> {
    let vk = match name {
        "enter" | "return" => VK_RETURN,
        "tab" => VK_TAB,
        "escape" | "esc" => VK_ESCAPE,
        "space" => VK_SPACE,
        "backspace" | "back" => VK_BACK,
        "delete" | "del" => VK_DELETE,
        "insert" | "ins" => VK_INSERT,
        "up" => VK_UP,
        "down" => VK_DOWN,
        "left" => VK_LEFT,
        "right" => VK_RIGHT,
        "home" => VK_HOME,
        "end" => VK_END,
        "pageup" | "pgup" => VK_PRIOR,
        "pagedown" | "pgdn" => VK_NEXT,
        "capslock" => VK_CAPITAL,
        "ctrl" | "control" => VK_CONTROL,
        "alt" => VK_MENU,
        "shift" => VK_SHIFT,
        _ => return function_key(name),
    };
    Some(vk)
}

fn function_key(name: &str) -> Option<u16> {
    let n: u16 = name.strip_prefix('f')?.parse().ok()?;
    if (1..=12).contains(&n) {
        Some(VK_F1 + n - 1)
    } else {
        None
    }
}

fn is_modifier(vk: u16) -> bool {
    matches!(vk, VK_CONTROL | VK_MENU | VK_SHIFT)
}

/// Key combination as authored, e.g. `"enter"`, `"a"` or `"ctrl+shift+s"`.
/// Parsed lazily so a bad string fails the one action that uses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCombo(String);

/// Virtual-key codes to press: modifiers in listed order, then the main key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub modifiers: Vec<u16>,
    pub key: Option<u16>,
}

impl KeyCombo {
    pub fn new(keys: impl Into<String>) -> Self {
        Self(keys.into())
    }

    pub fn resolve(&self) -> Result<ResolvedKeys, ActionError> {
        let bad = || ActionError::BadKey(self.0.clone());
        let combo = self.0.trim().to_lowercase();
        if combo.is_empty() {
            return Err(bad());
        }

        let mut resolved = ResolvedKeys {
            modifiers: Vec::new(),
            key: None,
        };
        for part in combo.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(bad());
            }
            let vk = match named_key(part) {
                Some(vk) => vk,
                None => single_char_key(part).ok_or_else(bad)?,
            };
            if is_modifier(vk) && resolved.key.is_none() && combo.contains('+') {
                resolved.modifiers.push(vk);
            } else if resolved.key.is_none() {
                resolved.key = Some(vk);
            } else {
                return Err(bad());
            }
        }
        Ok(resolved)
    }
}

/// Characters outside the named table use their uppercase character code,
/// which equals the VK code for letters and digits.
fn single_char_key(part: &str) -> Option<u16> {
    let mut chars = part.chars();
    let c = chars.next()?;
    if chars.next().is_some() || !c.is_ascii() {
        return None;
    }
    Some(c.to_ascii_uppercase() as u16)
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyCombo {
    fn from(keys: &str) -> Self {
        Self::new(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(keys: &str) -> Result<ResolvedKeys, ActionError> {
        KeyCombo::new(keys).resolve()
    }

    #[test]
    fn named_keys_are_case_insensitive() {
        assert_eq!(resolve("Enter").unwrap().key, Some(VK_RETURN));
        assert_eq!(resolve(" ESC ").unwrap().key, Some(VK_ESCAPE));
        assert_eq!(resolve("f12").unwrap().key, Some(0x7B));
        assert_eq!(resolve("PgDn").unwrap().key, Some(VK_NEXT));
    }

    #[test]
    fn single_characters_map_to_uppercase_code() {
        assert_eq!(resolve("a").unwrap().key, Some(b'A' as u16));
        assert_eq!(resolve("7").unwrap().key, Some(b'7' as u16));
    }

    #[test]
    fn combo_keeps_modifier_order() {
        let keys = resolve("ctrl+shift+s").unwrap();
        assert_eq!(keys.modifiers, vec![VK_CONTROL, VK_SHIFT]);
        assert_eq!(keys.key, Some(b'S' as u16));

        let keys = resolve("alt + F4").unwrap();
        assert_eq!(keys.modifiers, vec![VK_MENU]);
        assert_eq!(keys.key, Some(0x73));
    }

    #[test]
    fn bare_modifier_is_a_main_key() {
        let keys = resolve("shift").unwrap();
        assert!(keys.modifiers.is_empty());
        assert_eq!(keys.key, Some(VK_SHIFT));
    }

    #[test]
    fn modifier_only_combo_is_allowed() {
        let keys = resolve("ctrl+shift").unwrap();
        assert_eq!(keys.modifiers, vec![VK_CONTROL, VK_SHIFT]);
        assert_eq!(keys.key, None);
    }

    #[test]
    fn malformed_combos_are_rejected() {
        for keys in ["", "   ", "ctrl+", "ctrl++a", "a+b", "f13", "hyper", "é", "ctrl+a+shift"] {
            assert_eq!(
                resolve(keys),
                Err(ActionError::BadKey(keys.to_string())),
                "{:?} should not parse",
                keys
            );
        }
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&KeyCombo::new("ctrl+c")).unwrap();
        assert_eq!(json, "\"ctrl+c\"");
    }
}

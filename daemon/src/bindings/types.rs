//! Binding data types

use serde::{Deserialize, Serialize};

use crate::gesture::GestureType;
use crate::landmarks::Handedness;

/// A single key name, normalized to lowercase with modifier aliases folded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let canonical = match lower.as_str() {
            "control" | "ctl" => "ctrl",
            "option" | "opt" => "alt",
            "command" | "meta" | "super" | "win" => "cmd",
            "return" => "enter",
            "esc" => "escape",
            _ => return Self(lower),
        };
        Self(canonical.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors parsing a key combination
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KeyComboError {
    #[error("key combination is empty")]
    Empty,

    #[error("key combination {0:?} contains an empty key")]
    EmptyKey(String),
}

/// Ordered modifiers followed by a main key, written as `"ctrl+shift+s"`
///
/// Every token but the last is treated as a modifier to hold down; the last
/// token is the key that gets tapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCombo {
    keys: Vec<Key>,
}

impl KeyCombo {
    pub fn parse(text: &str) -> Result<Self, KeyComboError> {
        if text.trim().is_empty() {
            return Err(KeyComboError::Empty);
        }

        let keys = text
            .split('+')
            .map(|token| {
                if token.trim().is_empty() {
                    Err(KeyComboError::EmptyKey(text.to_string()))
                } else {
                    Ok(Key::new(token))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { keys })
    }

    /// Keys held around the main key, in press order
    pub fn modifiers(&self) -> &[Key] {
        &self.keys[..self.keys.len() - 1]
    }

    /// The key that is tapped
    pub fn main_key(&self) -> &Key {
        &self.keys[self.keys.len() - 1]
    }
}

impl TryFrom<String> for KeyCombo {
    type Error = KeyComboError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyCombo> for String {
    fn from(combo: KeyCombo) -> Self {
        combo.to_string()
    }
}

impl std::fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.keys.iter().map(Key::as_str).collect();
        f.write_str(&names.join("+"))
    }
}

/// Which hand a binding accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandConstraint {
    Left,
    Right,
    #[default]
    Any,
}

impl HandConstraint {
    pub fn admits(&self, hand: Handedness) -> bool {
        match self {
            HandConstraint::Any => true,
            HandConstraint::Left => hand == Handedness::Left,
            HandConstraint::Right => hand == Handedness::Right,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Association of a gesture with a key combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybinding {
    pub id: String,
    pub gesture: GestureType,
    pub key_combo: KeyCombo,
    #[serde(default)]
    pub hand: HandConstraint,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

impl Keybinding {
    /// Whether this binding fires for the gesture on the given hand
    pub fn matches(&self, gesture: GestureType, hand: Handedness) -> bool {
        self.enabled && self.gesture == gesture && self.hand.admits(hand)
    }

    /// Human-readable label: the description, or the key combo if blank
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            self.key_combo.to_string()
        } else {
            self.description.clone()
        }
    }
}

/// A named, ordered list of bindings; earlier bindings take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub bindings: Vec<Keybinding>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
        }
    }
}

#[cfg(test)]
pub(crate) fn binding(
    id: &str,
    gesture: GestureType,
    combo: &str,
    hand: HandConstraint,
) -> Keybinding {
    Keybinding {
        id: id.to_string(),
        gesture,
        key_combo: KeyCombo::parse(combo).unwrap(),
        hand,
        enabled: true,
        description: String::new(),
    }
}

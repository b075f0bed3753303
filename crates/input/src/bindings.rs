use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use overdrive_common::CameraMovement;
use serde::{Deserialize, Serialize};

use crate::Action;

/// Keys the viewer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    Left,
    Right,
    Space,
    Escape,
}

impl Key {
    pub const ALL: [Key; 12] = [
        Key::W,
        Key::A,
        Key::S,
        Key::D,
        Key::Q,
        Key::E,
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::Space,
        Key::Escape,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Key::W => "w",
            Key::A => "a",
            Key::S => "s",
            Key::D => "d",
            Key::Q => "q",
            Key::E => "e",
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::Space => "space",
            Key::Escape => "escape",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown key name: {0:?}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let alias = match lower.as_str() {
            "esc" => "escape",
            other => other,
        };
        Key::ALL
            .into_iter()
            .find(|k| k.name() == alias)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Key -> action table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    bindings: BTreeMap<Key, Action>,
}

impl Default for KeyBindings {
    /// WASD moves, Escape quits.
    fn default() -> Self {
        let mut b = Self::empty();
        b.bind(Key::W, Action::Move(CameraMovement::Forward));
        b.bind(Key::S, Action::Move(CameraMovement::Backward));
        b.bind(Key::A, Action::Move(CameraMovement::Left));
        b.bind(Key::D, Action::Move(CameraMovement::Right));
        b.bind(Key::Escape, Action::Quit);
        b
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `key`, returning the action it replaced.
    pub fn bind(&mut self, key: Key, action: Action) -> Option<Action> {
        self.bindings.insert(key, action)
    }

    pub fn unbind(&mut self, key: Key) -> Option<Action> {
        self.bindings.remove(&key)
    }

    pub fn action(&self, key: Key) -> Option<Action> {
        self.bindings.get(&key).copied()
    }

    /// Actions for a set of held keys, each reported once, in action order.
    pub fn actions_for<'a>(&self, held: impl IntoIterator<Item = &'a Key>) -> Vec<Action> {
        let actions: BTreeSet<Action> = held
            .into_iter()
            .filter_map(|k| self.action(*k))
            .collect();
        actions.into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, Action)> + '_ {
        self.bindings.iter().map(|(k, a)| (*k, *a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_wasd_and_escape() {
        let b = KeyBindings::default();
        assert_eq!(b.action(Key::W), Some(Action::Move(CameraMovement::Forward)));
        assert_eq!(b.action(Key::D), Some(Action::Move(CameraMovement::Right)));
        assert_eq!(b.action(Key::Escape), Some(Action::Quit));
        assert_eq!(b.action(Key::Space), None);
    }

    #[test]
    fn rebinding_replaces_previous_action() {
        let mut b = KeyBindings::default();
        let old = b.bind(Key::W, Action::Quit);
        assert_eq!(old, Some(Action::Move(CameraMovement::Forward)));
        b.bind(Key::Up, Action::Move(CameraMovement::Forward));
        assert_eq!(b.action(Key::Up), Some(Action::Move(CameraMovement::Forward)));
        assert_eq!(b.unbind(Key::Up), Some(Action::Move(CameraMovement::Forward)));
    }

    #[test]
    fn held_keys_map_to_unique_actions() {
        let mut b = KeyBindings::default();
        b.bind(Key::Up, Action::Move(CameraMovement::Forward));
        let held = [Key::Up, Key::W, Key::A, Key::Space];
        let actions = b.actions_for(&held);
        assert_eq!(
            actions,
            vec![
                Action::Move(CameraMovement::Forward),
                Action::Move(CameraMovement::Left),
            ]
        );
    }

    #[test]
    fn key_names_parse() {
        assert_eq!("W".parse::<Key>().unwrap(), Key::W);
        assert_eq!("esc".parse::<Key>().unwrap(), Key::Escape);
        assert_eq!(" space ".parse::<Key>().unwrap(), Key::Space);
        assert!("f13".parse::<Key>().is_err());
    }

    #[test]
    fn bindings_load_from_json() {
        let json = r#"{ "bindings": { "Up": { "Move": "Forward" }, "Q": "Quit" } }"#;
        let b: KeyBindings = serde_json::from_str(json).unwrap();
        assert_eq!(b.action(Key::Up), Some(Action::Move(CameraMovement::Forward)));
        assert_eq!(b.action(Key::Q), Some(Action::Quit));
        assert_eq!(b.iter().count(), 2);
    }
}

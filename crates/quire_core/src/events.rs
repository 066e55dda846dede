//! Key event model
//!
//! Routing of key, pointer and focus events is done by the host. This module
//! only describes the key events that reach an editable text, so the text
//! layer can translate them into edit operations. Text input arrives
//! separately as UTF-8.

use bitflags::bitflags;

/// Keys with a meaning for single-line text editing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyCode {
    Left,
    Right,
    Home,
    End,
    Backspace,
    Delete,
    /// Any other key, with the host's platform key code
    Other(u32),
}

bitflags! {
    /// Keyboard modifiers held during a key press
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        /// Cmd on macOS, Win on Windows
        const SUPER   = 0b1000;
    }
}

impl Modifiers {
    /// Modifiers that turn a key into a shortcut instead of an edit
    pub const SHORTCUT: Modifiers = Modifiers::CONTROL.union(Modifiers::ALT).union(Modifiers::SUPER);
}

/// A key press delivered to a focused text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub const fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Key press without any modifiers
    pub const fn plain(key: KeyCode) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// Whether a shortcut modifier is held
    pub fn is_shortcut(&self) -> bool {
        self.modifiers.intersects(Modifiers::SHORTCUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_modifiers() {
        assert!(!KeyEvent::plain(KeyCode::Left).is_shortcut());
        assert!(!KeyEvent::new(KeyCode::Left, Modifiers::SHIFT).is_shortcut());
        assert!(KeyEvent::new(KeyCode::Left, Modifiers::SHIFT | Modifiers::CONTROL).is_shortcut());
        assert!(KeyEvent::new(KeyCode::Other(0x41), Modifiers::SUPER).is_shortcut());
    }
}

#![forbid(unsafe_code)]

//! Events delivered by a host and the effects the modal asks for in return.
//!
//! DOM `key` strings are normalized into [`Key`] so the focus trap and
//! escape handling never compare raw strings.

use bitflags::bitflags;

use crate::host::LoadTicket;

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    /// Build from the four DOM `KeyboardEvent` modifier flags.
    #[must_use]
    pub fn from_dom(shift: bool, alt: bool, ctrl: bool, meta: bool) -> Self {
        let mut mods = Self::empty();
        mods.set(Self::SHIFT, shift);
        mods.set(Self::ALT, alt);
        mods.set(Self::CTRL, ctrl);
        mods.set(Self::SUPER, meta);
        mods
    }
}

bitflags! {
    /// What the host should do with the DOM event after the modal handled it.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventEffects: u8 {
        /// Call `event.preventDefault()`.
        const PREVENT_DEFAULT  = 0b01;
        /// Call `event.stopPropagation()`.
        const STOP_PROPAGATION = 0b10;
    }
}

/// Normalized key identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Tab,
    Escape,
    Enter,
    Char(char),
    /// Any other named key, kept verbatim.
    Named(String),
}

/// Normalize a DOM `KeyboardEvent.key` value.
///
/// Legacy `Esc` (pre-standard Edge/IE) maps to [`Key::Escape`].
#[must_use]
pub fn normalize_dom_key(key: &str) -> Key {
    match key {
        "Tab" => Key::Tab,
        "Escape" | "Esc" => Key::Escape,
        "Enter" => Key::Enter,
        _ => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Key::Char(ch),
                _ => Key::Named(key.to_owned()),
            }
        }
    }
}

/// A keydown routed from the wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyInput {
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key,
            mods: Modifiers::empty(),
        }
    }

    #[must_use]
    pub fn from_dom(key: &str, mods: Modifiers) -> Self {
        Self {
            key: normalize_dom_key(key),
            mods,
        }
    }

    #[must_use]
    pub fn with_mods(mut self, mods: Modifiers) -> Self {
        self.mods = mods;
        self
    }

    #[must_use]
    pub fn shift(&self) -> bool {
        self.mods.contains(Modifiers::SHIFT)
    }
}

/// Everything a host can report back to a modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalEvent {
    TriggerClick,
    BackdropClick,
    CloseButtonClick,
    CustomCloseClick,
    CustomAcceptClick,
    KeyDown(KeyInput),
    /// `animationend` bubbled to the wrapper, carrying `animationName`.
    AnimationEnd {
        name: String,
    },
    MediaLoaded(LoadTicket),
    MediaFailed(LoadTicket),
    /// Completed fragment request. Status `0` means the request never got
    /// a response.
    FragmentResponse {
        ticket: LoadTicket,
        status: u16,
        body: String,
    },
}

impl ModalEvent {
    #[must_use]
    pub fn key(key: Key) -> Self {
        Self::KeyDown(KeyInput::new(key))
    }

    #[must_use]
    pub fn animation_end(name: impl Into<String>) -> Self {
        Self::AnimationEnd { name: name.into() }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TriggerClick => "trigger_click",
            Self::BackdropClick => "backdrop_click",
            Self::CloseButtonClick => "close_button_click",
            Self::CustomCloseClick => "custom_close_click",
            Self::CustomAcceptClick => "custom_accept_click",
            Self::KeyDown(_) => "keydown",
            Self::AnimationEnd { .. } => "animationend",
            Self::MediaLoaded(_) => "media_loaded",
            Self::MediaFailed(_) => "media_failed",
            Self::FragmentResponse { .. } => "fragment_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_named_keys() {
        assert_eq!(normalize_dom_key("Tab"), Key::Tab);
        assert_eq!(normalize_dom_key("Escape"), Key::Escape);
        assert_eq!(normalize_dom_key("Esc"), Key::Escape);
        assert_eq!(normalize_dom_key("Enter"), Key::Enter);
        assert_eq!(normalize_dom_key("a"), Key::Char('a'));
        assert_eq!(normalize_dom_key("é"), Key::Char('é'));
        assert_eq!(
            normalize_dom_key("ArrowDown"),
            Key::Named("ArrowDown".to_owned())
        );
    }

    #[test]
    fn modifiers_from_dom_flags() {
        let mods = Modifiers::from_dom(true, false, true, false);
        assert_eq!(mods, Modifiers::SHIFT | Modifiers::CTRL);
        assert!(KeyInput::from_dom("Tab", mods).shift());
        assert!(!KeyInput::new(Key::Tab).shift());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(ModalEvent::key(Key::Tab).label(), "keydown");
        assert_eq!(ModalEvent::animation_end("fade").label(), "animationend");
        assert_eq!(
            ModalEvent::MediaFailed(LoadTicket::new(1)).label(),
            "media_failed"
        );
    }
}

#![forbid(unsafe_code)]

//! Keyboard focus trap for an open modal.
//!
//! The trap is a snapshot of the focusable elements inside the wrapper,
//! captured once after content has loaded (or failed to load). It only
//! intervenes at the edges of the list; Tab between interior elements is
//! left to the browser.
//!
//! # Invariants
//!
//! 1. **Wrap forward**: Tab with focus on the last element targets the first.
//! 2. **Wrap backward**: Shift+Tab with focus on the first element targets
//!    the last.
//! 3. **Edge-only**: any other focus position yields no target.
//!
//! # Failure Modes
//!
//! - An empty trap never yields a target; focus is free to leave the modal.
//! - A snapshot taken before content arrives is replaced on the next capture.

use crate::event::{Key, KeyInput};

/// Elements that can receive keyboard focus inside loaded content.
pub const FOCUSABLE_SELECTOR: &str = "input, select, textarea, a[href], button, [tabindex], \
     audio[controls], video[controls], [contenteditable]:not([contenteditable=\"false\"])";

/// Ordered focusable elements captured from the wrapper subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTrap<N> {
    nodes: Vec<N>,
}

impl<N> Default for FocusTrap<N> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<N: Clone + PartialEq> FocusTrap<N> {
    #[must_use]
    pub fn new(nodes: Vec<N>) -> Self {
        Self { nodes }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn first(&self) -> Option<&N> {
        self.nodes.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&N> {
        self.nodes.last()
    }

    #[must_use]
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Element to move focus to for a Tab press, if the trap intervenes.
    ///
    /// `active` is the currently focused element.
    #[must_use]
    pub fn wrap_target(&self, active: Option<&N>, backwards: bool) -> Option<N> {
        let (edge, other) = if backwards {
            (self.first()?, self.last()?)
        } else {
            (self.last()?, self.first()?)
        };
        (active == Some(edge)).then(|| other.clone())
    }

    /// [`Self::wrap_target`] for an arbitrary key; non-Tab keys never wrap.
    #[must_use]
    pub fn on_key(&self, input: &KeyInput, active: Option<&N>) -> Option<N> {
        if input.key != Key::Tab {
            return None;
        }
        self.wrap_target(active, input.shift())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Modifiers;

    fn trap() -> FocusTrap<u32> {
        FocusTrap::new(vec![10, 20, 30])
    }

    #[test]
    fn tab_on_last_wraps_to_first() {
        assert_eq!(trap().wrap_target(Some(&30), false), Some(10));
    }

    #[test]
    fn shift_tab_on_first_wraps_to_last() {
        assert_eq!(trap().wrap_target(Some(&10), true), Some(30));
    }

    #[test]
    fn interior_positions_do_not_wrap() {
        let trap = trap();
        assert_eq!(trap.wrap_target(Some(&20), false), None);
        assert_eq!(trap.wrap_target(Some(&20), true), None);
        assert_eq!(trap.wrap_target(Some(&10), false), None);
        assert_eq!(trap.wrap_target(None, false), None);
    }

    #[test]
    fn empty_trap_never_wraps() {
        let trap = FocusTrap::<u32>::default();
        assert!(trap.is_empty());
        assert_eq!(trap.wrap_target(None, false), None);
        assert_eq!(trap.wrap_target(None, true), None);
    }

    #[test]
    fn single_element_wraps_onto_itself() {
        let trap = FocusTrap::new(vec![7]);
        assert_eq!(trap.wrap_target(Some(&7), false), Some(7));
        assert_eq!(trap.wrap_target(Some(&7), true), Some(7));
    }

    #[test]
    fn only_tab_is_trapped() {
        let trap = trap();
        let shift_tab = KeyInput::new(Key::Tab).with_mods(Modifiers::SHIFT);
        assert_eq!(trap.on_key(&shift_tab, Some(&10)), Some(30));
        assert_eq!(trap.on_key(&KeyInput::new(Key::Enter), Some(&30)), None);
    }

    #[test]
    fn selector_lists_contenteditable_exclusion() {
        assert!(FOCUSABLE_SELECTOR.contains("a[href]"));
        assert!(FOCUSABLE_SELECTOR.ends_with(":not([contenteditable=\"false\"])"));
    }
}

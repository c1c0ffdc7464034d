#![forbid(unsafe_code)]

//! Optional callback slots fired at lifecycle milestones.

use std::fmt;

/// Elements of the wrapper subtree handed to `open`, `close` and `load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalElements<N> {
    pub wrapper: N,
    pub backdrop: N,
    pub spinner: N,
    /// Present once content has been attached.
    pub item: Option<N>,
    /// Present when the close button option is enabled.
    pub close_button: Option<N>,
}

pub type Hook = Box<dyn FnMut()>;
pub type ElementsHook<N> = Box<dyn FnMut(&ModalElements<N>)>;
/// Returning `Some(openable)` updates the instance's openable flag before
/// `open()` consults it.
pub type BeforeOpenHook = Box<dyn FnMut() -> Option<bool>>;

/// The eight hook slots, all empty by default.
pub struct ModalHooks<N> {
    init_trigger: Option<Hook>,
    remove_trigger: Option<Hook>,
    before_open: Option<BeforeOpenHook>,
    open: Option<ElementsHook<N>>,
    close: Option<ElementsHook<N>>,
    accept: Option<Hook>,
    remove: Option<Hook>,
    load: Option<ElementsHook<N>>,
}

impl<N> Default for ModalHooks<N> {
    fn default() -> Self {
        Self {
            init_trigger: None,
            remove_trigger: None,
            before_open: None,
            open: None,
            close: None,
            accept: None,
            remove: None,
            load: None,
        }
    }
}

impl<N> fmt::Debug for ModalHooks<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalHooks")
            .field("init_trigger", &self.init_trigger.is_some())
            .field("remove_trigger", &self.remove_trigger.is_some())
            .field("before_open", &self.before_open.is_some())
            .field("open", &self.open.is_some())
            .field("close", &self.close.is_some())
            .field("accept", &self.accept.is_some())
            .field("remove", &self.remove.is_some())
            .field("load", &self.load.is_some())
            .finish()
    }
}

impl<N> ModalHooks<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_init_trigger(mut self, hook: impl FnMut() + 'static) -> Self {
        self.init_trigger = Some(Box::new(hook));
        self
    }

    pub fn on_remove_trigger(mut self, hook: impl FnMut() + 'static) -> Self {
        self.remove_trigger = Some(Box::new(hook));
        self
    }

    pub fn on_before_open(mut self, hook: impl FnMut() -> Option<bool> + 'static) -> Self {
        self.before_open = Some(Box::new(hook));
        self
    }

    /// Wrap the `before_open` slot. `wrap` receives the current hook (a
    /// no-op returning `None` when the slot is empty) and returns the final
    /// verdict.
    pub fn wrap_before_open(
        &mut self,
        mut wrap: impl FnMut(&mut dyn FnMut() -> Option<bool>) -> Option<bool> + 'static,
    ) {
        let mut inner = self.before_open.take();
        self.before_open = Some(Box::new(move || {
            let mut call = || inner.as_mut().and_then(|hook| hook());
            wrap(&mut call)
        }));
    }

    pub fn on_open(mut self, hook: impl FnMut(&ModalElements<N>) + 'static) -> Self {
        self.open = Some(Box::new(hook));
        self
    }

    pub fn on_close(mut self, hook: impl FnMut(&ModalElements<N>) + 'static) -> Self {
        self.close = Some(Box::new(hook));
        self
    }

    pub fn on_accept(mut self, hook: impl FnMut() + 'static) -> Self {
        self.accept = Some(Box::new(hook));
        self
    }

    pub fn on_remove(mut self, hook: impl FnMut() + 'static) -> Self {
        self.remove = Some(Box::new(hook));
        self
    }

    pub fn on_load(mut self, hook: impl FnMut(&ModalElements<N>) + 'static) -> Self {
        self.load = Some(Box::new(hook));
        self
    }

    pub(crate) fn fire_init_trigger(&mut self) {
        if let Some(hook) = self.init_trigger.as_mut() {
            hook();
        }
    }

    pub(crate) fn fire_remove_trigger(&mut self) {
        if let Some(hook) = self.remove_trigger.as_mut() {
            hook();
        }
    }

    pub(crate) fn fire_before_open(&mut self) -> Option<bool> {
        self.before_open.as_mut().and_then(|hook| hook())
    }

    pub(crate) fn fire_open(&mut self, elements: &ModalElements<N>) {
        if let Some(hook) = self.open.as_mut() {
            hook(elements);
        }
    }

    pub(crate) fn fire_close(&mut self, elements: &ModalElements<N>) {
        if let Some(hook) = self.close.as_mut() {
            hook(elements);
        }
    }

    pub(crate) fn fire_accept(&mut self) {
        if let Some(hook) = self.accept.as_mut() {
            hook();
        }
    }

    pub(crate) fn fire_remove(&mut self) {
        if let Some(hook) = self.remove.as_mut() {
            hook();
        }
    }

    pub(crate) fn fire_load(&mut self, elements: &ModalElements<N>) {
        if let Some(hook) = self.load.as_mut() {
            hook(elements);
        }
    }
}

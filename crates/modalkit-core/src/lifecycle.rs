#![forbid(unsafe_code)]

//! The modal lifecycle state machine.
//!
//! State machine: Closed → Opening → Opened → Closing → Closed
//!
//! Without animation `Opening` and `Closing` are skipped: `open()` lands in
//! `Opened` and `close()` removes the wrapper before returning.
//!
//! # Invariants
//!
//! 1. The wrapper subtree exists iff `is_wrapper_created()`.
//! 2. `is_opened()` implies `is_wrapper_created()`.
//! 3. At most one content item is attached to the wrapper.
//! 4. A load completion only mutates the DOM when its ticket is the one
//!    still in flight for the current generation and the modal is opened.
//!    Each ticket completes at most once.
//!
//! # Failure Modes
//!
//! - Media errors, a dialog selector matching nothing and non-200 fragment
//!   responses leave the modal open and empty with focus on the first
//!   focusable element, or the wrapper itself.
//! - If the element focused before `open()` has left the document by the
//!   time of removal, focus is not restored.

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::event::{EventEffects, Key, KeyInput, ModalEvent};
use crate::focus::{FOCUSABLE_SELECTOR, FocusTrap};
use crate::hooks::{ModalElements, ModalHooks};
use crate::host::{DomHost, Listener, LoadTicket};
use crate::loader::{self, FRAGMENT_OK, LoadStart};
use crate::options::ModalOptions;
use crate::source::ModalKind;

/// Visible phase of the wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalPhase {
    /// No wrapper, or the wrapper is about to be removed.
    #[default]
    Closed,
    /// Open animation running.
    Opening,
    /// Fully open.
    Opened,
    /// Close animation running; removal follows its `animationend`.
    Closing,
}

/// A modal instance driving a [`DomHost`].
pub struct Modal<H: DomHost> {
    host: H,
    options: ModalOptions,
    hooks: ModalHooks<H::Node>,
    trigger: Option<H::Node>,
    elements: Option<ModalElements<H::Node>>,
    /// Built media item waiting for its load event.
    pending_item: Option<H::Node>,
    /// Ticket of the load still in flight for the current open.
    awaiting: Option<LoadTicket>,
    focus_snapshot: Option<H::Node>,
    focus_trap: FocusTrap<H::Node>,
    phase: ModalPhase,
    generation: u64,
    is_opened: bool,
    is_accepted: bool,
    is_openable: bool,
    is_trigger_initialized: bool,
}

impl<H: DomHost> std::fmt::Debug for Modal<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modal")
            .field("kind", &self.options.kind())
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("is_opened", &self.is_opened)
            .field("is_accepted", &self.is_accepted)
            .field("is_openable", &self.is_openable)
            .field("is_wrapper_created", &self.elements.is_some())
            .field("is_trigger_initialized", &self.is_trigger_initialized)
            .finish_non_exhaustive()
    }
}

impl<H: DomHost> Modal<H> {
    /// Create a modal over `host`.
    ///
    /// # Errors
    ///
    /// [`crate::ModalError::InvalidOptions`] when the wrapper id is empty.
    pub fn new(host: H, options: ModalOptions) -> Result<Self> {
        if options.wrapper_id.is_empty() {
            return Err(crate::ModalError::invalid("wrapper id must not be empty"));
        }
        debug!(kind = %options.kind(), animated = options.has_animation(), "modal created");
        Ok(Self {
            host,
            options,
            hooks: ModalHooks::default(),
            trigger: None,
            elements: None,
            pending_item: None,
            awaiting: None,
            focus_snapshot: None,
            focus_trap: FocusTrap::default(),
            phase: ModalPhase::Closed,
            generation: 0,
            is_opened: false,
            is_accepted: false,
            is_openable: true,
            is_trigger_initialized: false,
        })
    }

    /// Attach the external element whose click opens the modal.
    #[must_use]
    pub fn with_trigger(mut self, trigger: H::Node) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: ModalHooks<H::Node>) -> Self {
        self.hooks = hooks;
        self
    }

    // ------------------------------------------------------------------
    // Trigger binding
    // ------------------------------------------------------------------

    pub fn init_trigger(&mut self) {
        if self.is_trigger_initialized {
            return;
        }
        let Some(trigger) = self.trigger.as_ref() else {
            warn!("init_trigger called without a trigger element");
            return;
        };
        self.host.listen(trigger, Listener::TriggerClick);
        self.is_trigger_initialized = true;
        debug!("trigger initialized");
        self.hooks.fire_init_trigger();
    }

    pub fn remove_trigger(&mut self) {
        if !self.is_trigger_initialized {
            return;
        }
        if let Some(trigger) = self.trigger.as_ref() {
            self.host.unlisten(trigger, Listener::TriggerClick);
        }
        self.is_trigger_initialized = false;
        debug!("trigger removed");
        self.hooks.fire_remove_trigger();
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn open(&mut self) {
        if self.is_opened {
            trace!("open ignored, already opened");
            return;
        }
        if let Some(openable) = self.hooks.fire_before_open() {
            self.is_openable = openable;
        }
        if !self.is_openable {
            debug!("open vetoed");
            return;
        }
        if self.elements.is_some() {
            debug!("finishing pending removal before reopening");
            self.remove();
        }

        self.focus_snapshot = self.host.active_element();
        self.generation = self.generation.wrapping_add(1);
        let elements = self.create_wrapper();
        self.elements = Some(elements.clone());
        self.is_opened = true;

        let body = self.host.body();
        self.host.add_class(&body, &self.options.classes.is_modal_opened);
        if self.options.has_animation() {
            self.host.add_class(&elements.wrapper, &self.options.classes.is_opening);
            self.phase = ModalPhase::Opening;
        } else {
            self.host.add_class(&elements.wrapper, &self.options.classes.is_opened);
            self.phase = ModalPhase::Opened;
        }
        debug!(kind = %self.options.kind(), generation = self.generation, "modal opened");

        let ticket = LoadTicket::new(self.generation);
        match loader::start(&mut self.host, &self.options, ticket) {
            LoadStart::Ready(item) => self.finish_load(item),
            LoadStart::Pending(item) => {
                self.pending_item = Some(item);
                self.awaiting = Some(ticket);
            }
            LoadStart::Requested => self.awaiting = Some(ticket),
            LoadStart::Unavailable => self.capture_focus(),
        }

        if let Some(elements) = self.elements.clone() {
            self.hooks.fire_open(&elements);
        }
    }

    pub fn close(&mut self) {
        if !self.is_opened {
            trace!("close ignored, not opened");
            return;
        }
        self.close_transition();
        if !self.options.has_animation() {
            self.remove();
        }
    }

    /// Mark the modal accepted. Fires the accept hook at most once.
    pub fn accept(&mut self) {
        if self.is_accepted {
            return;
        }
        self.is_accepted = true;
        debug!("modal accepted");
        self.hooks.fire_accept();
    }

    /// Tear down the wrapper subtree and restore focus.
    pub fn remove(&mut self) {
        if self.elements.is_none() {
            return;
        }
        if self.is_opened {
            self.close_transition();
        }
        let Some(elements) = self.elements.take() else {
            return;
        };
        self.host.unlisten_subtree(&elements.wrapper);
        self.host.detach(&elements.wrapper);
        if let Some(previous) = self.focus_snapshot.take() {
            if self.host.is_connected(&previous) {
                self.host.focus(&previous);
            } else {
                debug!("focus snapshot left the document, not restored");
            }
        }
        self.pending_item = None;
        self.awaiting = None;
        self.focus_trap.clear();
        self.phase = ModalPhase::Closed;
        debug!("modal removed");
        self.hooks.fire_remove();
    }

    /// Update the flag `open()` consults after the before-open hook.
    pub fn set_openable(&mut self, openable: bool) {
        self.is_openable = openable;
    }

    // ------------------------------------------------------------------
    // Event routing
    // ------------------------------------------------------------------

    /// Route a host event and report what the host should do with the
    /// underlying DOM event.
    pub fn handle_event(&mut self, event: ModalEvent) -> EventEffects {
        trace!(event = event.label(), "modal event");
        match event {
            ModalEvent::TriggerClick => {
                if !self.is_trigger_initialized {
                    return EventEffects::empty();
                }
                self.open();
                EventEffects::PREVENT_DEFAULT
            }
            ModalEvent::BackdropClick => {
                if !self.options.close_on_backdrop_click || self.elements.is_none() {
                    return EventEffects::empty();
                }
                self.close();
                EventEffects::STOP_PROPAGATION
            }
            ModalEvent::CloseButtonClick | ModalEvent::CustomCloseClick => {
                if self.elements.is_none() {
                    return EventEffects::empty();
                }
                self.close();
                EventEffects::STOP_PROPAGATION
            }
            ModalEvent::CustomAcceptClick => {
                if self.elements.is_none() {
                    return EventEffects::empty();
                }
                self.accept();
                EventEffects::STOP_PROPAGATION
            }
            ModalEvent::KeyDown(input) => self.on_key_down(&input),
            ModalEvent::AnimationEnd { name } => {
                self.on_animation_end(&name);
                EventEffects::empty()
            }
            ModalEvent::MediaLoaded(ticket) => {
                if self.take_awaiting(ticket) {
                    match self.pending_item.take() {
                        Some(item) => self.finish_load(item),
                        None => warn!(%ticket, "media loaded without a pending item"),
                    }
                }
                EventEffects::empty()
            }
            ModalEvent::MediaFailed(ticket) => {
                if self.take_awaiting(ticket) {
                    warn!(%ticket, kind = %self.options.kind(), "media failed to load");
                    self.pending_item = None;
                    self.capture_focus();
                }
                EventEffects::empty()
            }
            ModalEvent::FragmentResponse {
                ticket,
                status,
                body,
            } => {
                if self.take_awaiting(ticket) {
                    if status == FRAGMENT_OK {
                        let item = loader::fragment_item(&mut self.host, &self.options, &body);
                        self.finish_load(item);
                    } else {
                        warn!(%ticket, status, "fragment request failed");
                        self.capture_focus();
                    }
                }
                EventEffects::empty()
            }
        }
    }

    fn on_key_down(&mut self, input: &KeyInput) -> EventEffects {
        if self.elements.is_none() {
            return EventEffects::empty();
        }
        match input.key {
            Key::Escape if self.options.close_on_esc => {
                self.close();
                EventEffects::STOP_PROPAGATION
            }
            Key::Tab => {
                let active = self.host.active_element();
                match self.focus_trap.on_key(input, active.as_ref()) {
                    Some(target) => {
                        self.host.focus(&target);
                        EventEffects::PREVENT_DEFAULT
                    }
                    None => EventEffects::empty(),
                }
            }
            _ => EventEffects::empty(),
        }
    }

    fn on_animation_end(&mut self, name: &str) {
        let Some(animation) = self.options.animation.as_ref() else {
            return;
        };
        let Some(wrapper) = self.elements.as_ref().map(|e| e.wrapper.clone()) else {
            return;
        };
        let classes = &self.options.classes;
        if !self.is_opened && name == animation.close {
            self.host.add_class(&wrapper, &classes.is_closed);
            self.phase = ModalPhase::Closed;
            self.remove();
        } else if self.is_opened && name == animation.open {
            self.host.remove_class(&wrapper, &classes.is_opening);
            self.host.add_class(&wrapper, &classes.is_opened);
            self.phase = ModalPhase::Opened;
            debug!("open animation finished");
        } else {
            trace!(name, "unrelated animation ignored");
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn create_wrapper(&mut self) -> ModalElements<H::Node> {
        let options = &self.options;
        let classes = &options.classes;
        let host = &mut self.host;

        let wrapper = host.create_element("div");
        host.set_attribute(&wrapper, "id", &options.wrapper_id);
        host.add_class(&wrapper, &classes.modal);
        for class in &options.custom_classes {
            host.add_class(&wrapper, class);
        }
        host.set_attribute(&wrapper, "role", "dialog");
        if let Some(label) = options.item_label.as_deref() {
            host.set_attribute(&wrapper, "aria-label", label);
        }

        let backdrop = host.create_element("div");
        host.add_class(&backdrop, &classes.modal_backdrop);
        let spinner = host.create_element("div");
        host.add_class(&spinner, &classes.modal_spinner);
        host.append_child(&wrapper, &backdrop);
        host.append_child(&wrapper, &spinner);

        let close_button = options.close_button.then(|| {
            let button = host.create_element("button");
            host.set_attribute(&button, "type", "button");
            host.add_class(&button, &classes.modal_close);
            if let Some(label) = options.close_button_label.as_deref() {
                host.set_attribute(&button, "aria-label", label);
            }
            host.append_child(&wrapper, &button);
            host.listen(&button, Listener::CloseButtonClick);
            button
        });

        if options.close_on_backdrop_click {
            host.listen(&backdrop, Listener::BackdropClick);
        }
        host.listen(&wrapper, Listener::WrapperKeyDown);
        if options.has_animation() {
            host.listen(&wrapper, Listener::WrapperAnimationEnd);
        }

        let body = host.body();
        host.append_child(&body, &wrapper);

        ModalElements {
            wrapper,
            backdrop,
            spinner,
            item: None,
            close_button,
        }
    }

    /// Attach a built item and run the shared post-load steps.
    fn finish_load(&mut self, item: H::Node) {
        let Some(elements) = self.elements.as_mut() else {
            return;
        };
        self.host
            .insert_before(&elements.wrapper, &item, elements.close_button.as_ref());
        elements.item = Some(item.clone());
        let wrapper = elements.wrapper.clone();
        self.host.add_class(&wrapper, &self.options.classes.is_loaded);
        self.capture_focus();

        let kind = self.options.kind();
        if matches!(kind, ModalKind::Dialog | ModalKind::Ajax) {
            self.wire_custom_triggers(&item);
        }
        if kind == ModalKind::Dialog {
            loader::hoist_dialog_aria(&mut self.host, &item, &wrapper);
        }
        debug!(%kind, "content loaded");
        if let Some(elements) = self.elements.clone() {
            self.hooks.fire_load(&elements);
        }
    }

    /// Snapshot focusables inside the wrapper and move focus into it.
    fn capture_focus(&mut self) {
        let Some(wrapper) = self.elements.as_ref().map(|e| e.wrapper.clone()) else {
            return;
        };
        let focusables = self.host.query_selector_all(&wrapper, FOCUSABLE_SELECTOR);
        self.focus_trap = FocusTrap::new(focusables);
        match self.focus_trap.first().cloned() {
            Some(first) => self.host.focus(&first),
            None => {
                self.host.set_attribute(&wrapper, "tabindex", "-1");
                self.host.focus(&wrapper);
            }
        }
    }

    fn wire_custom_triggers(&mut self, item: &H::Node) {
        let selectors = [
            (
                self.options.custom_close_trigger_selector.as_deref(),
                Listener::CustomCloseClick,
            ),
            (
                self.options.custom_accept_trigger_selector.as_deref(),
                Listener::CustomAcceptClick,
            ),
        ];
        for (selector, listener) in selectors {
            let Some(selector) = selector else {
                continue;
            };
            for node in self.host.query_selector_all(item, selector) {
                self.host.listen(&node, listener);
            }
        }
    }

    fn close_transition(&mut self) {
        self.is_opened = false;
        let Some(elements) = self.elements.clone() else {
            return;
        };
        let classes = &self.options.classes;
        if self.options.has_animation() {
            self.host.add_class(&elements.wrapper, &classes.is_closing);
            self.host.remove_class(&elements.wrapper, &classes.is_opening);
            self.phase = ModalPhase::Closing;
        } else {
            self.phase = ModalPhase::Closed;
        }
        self.host.remove_class(&elements.wrapper, &classes.is_opened);
        let body = self.host.body();
        self.host.remove_class(&body, &classes.is_modal_opened);
        debug!("modal closed");
        self.hooks.fire_close(&elements);
    }

    /// Consume the in-flight ticket if `ticket` is it and the modal is
    /// still opened. Anything else is a stale or duplicate completion.
    fn take_awaiting(&mut self, ticket: LoadTicket) -> bool {
        if self.awaiting != Some(ticket) || !self.is_opened {
            debug!(
                %ticket,
                current = self.generation,
                opened = self.is_opened,
                "stale load completion discarded"
            );
            return false;
        }
        self.awaiting = None;
        true
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.is_opened
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.is_accepted
    }

    #[must_use]
    pub fn is_wrapper_created(&self) -> bool {
        self.elements.is_some()
    }

    #[must_use]
    pub fn has_animation(&self) -> bool {
        self.options.has_animation()
    }

    #[must_use]
    pub fn is_trigger_initialized(&self) -> bool {
        self.is_trigger_initialized
    }

    #[must_use]
    pub fn is_openable(&self) -> bool {
        self.is_openable
    }

    #[must_use]
    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    /// Generation of the most recent `open()`.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn elements(&self) -> Option<&ModalElements<H::Node>> {
        self.elements.as_ref()
    }

    #[must_use]
    pub fn focus_trap(&self) -> &FocusTrap<H::Node> {
        &self.focus_trap
    }

    #[must_use]
    pub fn options(&self) -> &ModalOptions {
        &self.options
    }

    #[must_use]
    pub fn trigger(&self) -> Option<&H::Node> {
        self.trigger.as_ref()
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access, for delivering completions in tests and for
    /// host bookkeeping between events.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Hook slots, for embedders that wrap callbacks after construction.
    pub fn hooks_mut(&mut self) -> &mut ModalHooks<H::Node> {
        &mut self.hooks
    }
}

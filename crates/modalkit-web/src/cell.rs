#![forbid(unsafe_code)]

//! Re-entrancy-safe ownership of a [`Modal`] shared with page callbacks.
//!
//! Page callbacks run while the modal is mutably borrowed (a `closeCallback`
//! fires in the middle of `close()`), and they are free to call back into
//! the modal. [`ModalCell`] turns such nested calls into queued commands
//! that run, in order, as soon as the outer call finishes.
//!
//! # Invariants
//!
//! 1. Commands are applied in the order they were issued.
//! 2. A nested command never observes a half-finished outer command.
//! 3. [`ModalCell::state`] is always answerable; while the modal is busy it
//!    reports the state as of the last completed command.
//! 4. `SetOpenable` issued from inside the before-open hook is queued like
//!    any other command, but its value also decides the open in progress
//!    unless the hook returns a verdict of its own.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use modalkit_core::{DomHost, EventEffects, Modal, ModalEvent, ModalPhase};
use tracing::trace;

/// Operation issued against a shared modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalCommand {
    InitTrigger,
    RemoveTrigger,
    Open,
    Close,
    Accept,
    Remove,
    SetOpenable(bool),
    Event(ModalEvent),
}

impl ModalCommand {
    fn apply<H: DomHost>(self, modal: &mut Modal<H>) -> EventEffects {
        match self {
            Self::InitTrigger => modal.init_trigger(),
            Self::RemoveTrigger => modal.remove_trigger(),
            Self::Open => modal.open(),
            Self::Close => modal.close(),
            Self::Accept => modal.accept(),
            Self::Remove => modal.remove(),
            Self::SetOpenable(openable) => modal.set_openable(openable),
            Self::Event(event) => return modal.handle_event(event),
        }
        EventEffects::empty()
    }
}

/// Observable flags of a modal, copied out after every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModalState {
    pub phase: ModalPhase,
    pub is_opened: bool,
    pub is_accepted: bool,
    pub is_openable: bool,
    pub is_wrapper_created: bool,
    pub is_trigger_initialized: bool,
    pub has_animation: bool,
}

impl ModalState {
    fn capture<H: DomHost>(modal: &Modal<H>) -> Self {
        Self {
            phase: modal.phase(),
            is_opened: modal.is_opened(),
            is_accepted: modal.is_accepted(),
            is_openable: modal.is_openable(),
            is_wrapper_created: modal.is_wrapper_created(),
            is_trigger_initialized: modal.is_trigger_initialized(),
            has_animation: modal.has_animation(),
        }
    }
}

/// Openable value recorded while the before-open hook runs.
#[derive(Debug, Default)]
struct OpenableLatch {
    armed: Cell<bool>,
    value: Cell<Option<bool>>,
}

/// A modal plus a FIFO of commands issued while it was busy.
pub struct ModalCell<H: DomHost> {
    modal: RefCell<Modal<H>>,
    queue: RefCell<VecDeque<ModalCommand>>,
    last_state: Cell<ModalState>,
    latch: Rc<OpenableLatch>,
}

impl<H: DomHost> std::fmt::Debug for ModalCell<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalCell")
            .field("state", &self.last_state.get())
            .field("queued", &self.queue.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<H: DomHost> ModalCell<H> {
    #[must_use]
    pub fn new(mut modal: Modal<H>) -> Self {
        let latch = Rc::new(OpenableLatch::default());
        let armed = Rc::clone(&latch);
        modal.hooks_mut().wrap_before_open(move |hook| {
            armed.armed.set(true);
            armed.value.set(None);
            let verdict = hook();
            armed.armed.set(false);
            verdict.or(armed.value.take())
        });
        let state = ModalState::capture(&modal);
        Self {
            modal: RefCell::new(modal),
            queue: RefCell::new(VecDeque::new()),
            last_state: Cell::new(state),
            latch,
        }
    }

    /// Apply `command`, or queue it when called from inside another command.
    ///
    /// Returns the effects of `command` itself. A queued command reports no
    /// effects: by the time it runs the DOM event that caused it is gone.
    pub fn run(&self, command: ModalCommand) -> EventEffects {
        let Ok(mut modal) = self.modal.try_borrow_mut() else {
            trace!(?command, "modal busy, command queued");
            if let ModalCommand::SetOpenable(openable) = &command {
                if self.latch.armed.get() {
                    self.latch.value.set(Some(*openable));
                }
            }
            self.queue.borrow_mut().push_back(command);
            return EventEffects::empty();
        };
        let effects = command.apply(&mut modal);
        self.last_state.set(ModalState::capture(&modal));
        loop {
            // Release the queue before applying: the command may enqueue more.
            let next = self.queue.borrow_mut().pop_front();
            let Some(next) = next else { break };
            trace!(command = ?next, "draining queued command");
            next.apply(&mut modal);
            self.last_state.set(ModalState::capture(&modal));
        }
        effects
    }

    /// Shorthand for `run(ModalCommand::Event(event))`.
    pub fn dispatch(&self, event: ModalEvent) -> EventEffects {
        self.run(ModalCommand::Event(event))
    }

    /// Current observable state.
    #[must_use]
    pub fn state(&self) -> ModalState {
        match self.modal.try_borrow() {
            Ok(modal) => ModalState::capture(&modal),
            Err(_) => self.last_state.get(),
        }
    }

    /// Run `f` against the modal unless it is busy.
    pub fn with<R>(&self, f: impl FnOnce(&Modal<H>) -> R) -> Option<R> {
        self.modal.try_borrow().ok().map(|modal| f(&modal))
    }

    /// Number of commands waiting for the current one to finish.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.borrow().len()
    }
}

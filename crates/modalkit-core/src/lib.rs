#![forbid(unsafe_code)]

//! Modal overlay lifecycle for browser pages.
//!
//! `modalkit-core` owns everything that does not depend on a real browser:
//! the open/close/accept/remove state machine, the six content loaders,
//! the focus trap, options and hooks. The page is reached only through the
//! [`DomHost`] trait, so the same state machine drives `web-sys` in a
//! browser and [`headless::MemoryDom`] in tests.
//!
//! # Example
//!
//! ```
//! use modalkit_core::headless::MemoryDom;
//! use modalkit_core::{DomHost, Modal, ModalEvent, ModalOptions};
//!
//! let options = ModalOptions::parse("youtube", "https://youtu.be/abc123")?;
//! let mut modal = Modal::new(MemoryDom::new(), options)?;
//! modal.open();
//! assert!(modal.is_opened());
//!
//! let item = modal.elements().and_then(|e| e.item).expect("embed loads synchronously");
//! let src = modal.host().attribute(&item, "src").unwrap_or_default();
//! assert!(src.contains("abc123"));
//!
//! modal.handle_event(ModalEvent::CloseButtonClick);
//! assert!(!modal.is_wrapper_created());
//! # Ok::<(), modalkit_core::ModalError>(())
//! ```

pub mod error;
pub mod event;
pub mod focus;
pub mod headless;
pub mod hooks;
pub mod host;
pub mod lifecycle;
mod loader;
pub mod options;
pub mod source;

pub use error::{ModalError, Result};
pub use event::{EventEffects, Key, KeyInput, ModalEvent, Modifiers, normalize_dom_key};
pub use focus::{FOCUSABLE_SELECTOR, FocusTrap};
pub use hooks::{ModalElements, ModalHooks};
pub use host::{DomHost, FragmentRequest, Listener, LoadTicket, MediaKind};
pub use lifecycle::{Modal, ModalPhase};
pub use loader::FRAGMENT_OK;
pub use options::{AnimationNames, ClassNames, ModalOptions};
pub use source::{ContentSource, ModalKind};

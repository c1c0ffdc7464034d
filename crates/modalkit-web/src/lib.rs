#![forbid(unsafe_code)]

//! Browser binding for `modalkit`.
//!
//! On `wasm32` this crate exports a `Modal` class to JavaScript
//! ([`JsModal`]) backed by [`WebDom`], a `web-sys` implementation of
//! [`modalkit_core::DomHost`]. Option decoding and the re-entrancy-safe
//! [`cell::ModalCell`] are plain Rust and tested natively against the
//! headless document.
//!
//! ```js
//! import init, { Modal } from "./modalkit_web.js";
//!
//! await init();
//! const modal = new Modal({
//!   type: "ajax",
//!   source: "/fragments/terms",
//!   trigger: document.querySelector("#terms"),
//!   customAcceptTriggerSelector: ".accept",
//!   acceptCallback: () => console.log("accepted"),
//! });
//! modal.initTrigger();
//! ```

pub mod cell;
pub mod options;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{JsModal, WebDom};

pub use cell::{ModalCell, ModalCommand, ModalState};
pub use options::{JsModalOptions, options_from_json};

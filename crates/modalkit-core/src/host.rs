#![forbid(unsafe_code)]

//! The boundary between the lifecycle state machine and a document.
//!
//! [`DomHost`] is the only way the state machine touches the page. The
//! browser binding implements it over `web-sys`; [`crate::headless::MemoryDom`]
//! implements it over an in-memory node arena.
//!
//! Hosts are push-driven: anything that completes later (media load,
//! fragment response, animation end, user input) is delivered back to the
//! modal as a [`crate::ModalEvent`]. A host never calls into the modal from
//! inside a trait method.

use std::fmt;

/// Generation-stamped token for one asynchronous load.
///
/// Issued by the lifecycle for every media load or fragment request and
/// echoed back by the host in the completion event. A ticket from an
/// earlier `open()` no longer matches and its completion is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    #[must_use]
    pub(crate) const fn new(generation: u64) -> Self {
        Self { generation }
    }

    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.generation)
    }
}

/// Media element kinds whose content arrives asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Completes on the element's `load` event.
    Image,
    /// Completes on the element's `loadedmetadata` event.
    Video,
}

/// DOM listeners the lifecycle asks the host to install.
///
/// Each one maps to exactly one [`crate::ModalEvent`] variant that the host
/// delivers when the underlying DOM event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// `click` on the external trigger → `ModalEvent::TriggerClick`.
    TriggerClick,
    /// `click` on the backdrop → `ModalEvent::BackdropClick`.
    BackdropClick,
    /// `click` on the close button → `ModalEvent::CloseButtonClick`.
    CloseButtonClick,
    /// `keydown` on the wrapper → `ModalEvent::KeyDown`.
    WrapperKeyDown,
    /// `animationend` on the wrapper → `ModalEvent::AnimationEnd`.
    WrapperAnimationEnd,
    /// `click` on a custom close trigger inside loaded content.
    CustomCloseClick,
    /// `click` on a custom accept trigger inside loaded content.
    CustomAcceptClick,
}

impl Listener {
    /// DOM event type the listener is registered for.
    #[must_use]
    pub const fn dom_event(self) -> &'static str {
        match self {
            Self::WrapperKeyDown => "keydown",
            Self::WrapperAnimationEnd => "animationend",
            _ => "click",
        }
    }
}

/// Asynchronous GET for an AJAX fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub ticket: LoadTicket,
}

impl FragmentRequest {
    /// Header identifying the request as XHR-originated.
    pub const REQUESTED_WITH: (&'static str, &'static str) =
        ("X-Requested-With", "XMLHttpRequest");

    #[must_use]
    pub fn new(url: impl Into<String>, ticket: LoadTicket) -> Self {
        let (name, value) = Self::REQUESTED_WITH;
        Self {
            url: url.into(),
            headers: vec![(name.to_owned(), value.to_owned())],
            ticket,
        }
    }
}

/// Document operations required by the modal lifecycle.
///
/// Element handles are cheap clones referring to live nodes. All methods
/// are infallible from the caller's point of view: a host that hits a DOM
/// exception logs it and carries on, matching the silent-failure policy
/// for runtime errors.
pub trait DomHost {
    /// Handle to an element.
    type Node: Clone + PartialEq + fmt::Debug;

    // --- Structure ---

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Self::Node;

    /// The document body.
    fn body(&self) -> Self::Node;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Insert `child` into `parent` before `reference` (append if `None`).
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    );

    /// Detach `node` from its parent, if attached.
    fn detach(&mut self, node: &Self::Node);

    /// Whether `node` is currently connected to the document.
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// Deep-clone `node` (detached copy, no listeners).
    fn clone_deep(&mut self, node: &Self::Node) -> Self::Node;

    /// Replace the children of `node` by parsing `html` as markup.
    fn set_inner_html(&mut self, node: &Self::Node, html: &str);

    // --- Queries ---

    /// First element in the document matching `selector`.
    fn query_selector(&self, selector: &str) -> Option<Self::Node>;

    /// Descendants of `root` matching `selector`, in document order.
    fn query_selector_all(&self, root: &Self::Node, selector: &str) -> Vec<Self::Node>;

    // --- Attributes & classes ---

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn add_class(&mut self, node: &Self::Node, class: &str);
    fn remove_class(&mut self, node: &Self::Node, class: &str);
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    // --- Focus ---

    /// `document.activeElement`, if any element other than the body has focus.
    fn active_element(&self) -> Option<Self::Node>;

    fn focus(&mut self, node: &Self::Node);

    // --- Listeners ---

    fn listen(&mut self, node: &Self::Node, listener: Listener);
    fn unlisten(&mut self, node: &Self::Node, listener: Listener);

    /// Drop every listener registered on `root` or its descendants.
    fn unlisten_subtree(&mut self, root: &Self::Node);

    // --- Asynchronous loads ---

    /// Start loading `src` into the media element `node`.
    ///
    /// The host later delivers `MediaLoaded(ticket)` or `MediaFailed(ticket)`.
    fn load_media(&mut self, node: &Self::Node, kind: MediaKind, src: &str, ticket: LoadTicket);

    /// Issue an asynchronous GET.
    ///
    /// The host later delivers `FragmentResponse { ticket, status, body }`;
    /// network failures are reported with status `0`.
    fn fetch_fragment(&mut self, request: FragmentRequest);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_event_types() {
        assert_eq!(Listener::TriggerClick.dom_event(), "click");
        assert_eq!(Listener::CustomAcceptClick.dom_event(), "click");
        assert_eq!(Listener::WrapperKeyDown.dom_event(), "keydown");
        assert_eq!(Listener::WrapperAnimationEnd.dom_event(), "animationend");
    }

    #[test]
    fn fragment_request_carries_xhr_header() {
        let request = FragmentRequest::new("/frag", LoadTicket::new(3));
        assert_eq!(
            request.headers,
            vec![("X-Requested-With".to_owned(), "XMLHttpRequest".to_owned())]
        );
        assert_eq!(request.ticket.generation(), 3);
        assert_eq!(request.ticket.to_string(), "load#3");
    }
}

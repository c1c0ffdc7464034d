#![forbid(unsafe_code)]

//! Kind-specific construction of the content item.
//!
//! Loaders only build elements. Attaching the item, focus handling and
//! hook dispatch are shared and live in the lifecycle.

use tracing::{debug, warn};

use crate::host::{DomHost, FragmentRequest, LoadTicket, MediaKind};
use crate::options::ModalOptions;
use crate::source::{ContentSource, VIMEO_FRAME_SIZE, YOUTUBE_FRAME_SIZE};

/// Outcome of starting a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadStart<N> {
    /// Item is built and can be attached right away.
    Ready(N),
    /// Item is built; the host reports media completion later.
    Pending(N),
    /// A fragment request is in flight; the item is built on response.
    Requested,
    /// Nothing to show. The modal falls back to focus handling.
    Unavailable,
}

/// HTTP status treated as a successful fragment response.
pub const FRAGMENT_OK: u16 = 200;

pub(crate) fn start<H: DomHost>(
    host: &mut H,
    options: &ModalOptions,
    ticket: LoadTicket,
) -> LoadStart<H::Node> {
    match &options.source {
        ContentSource::Image { url } => {
            let item = host.create_element("img");
            tag_item(host, &item, options);
            host.load_media(&item, MediaKind::Image, url, ticket);
            LoadStart::Pending(item)
        }
        ContentSource::Video { url } => {
            let item = host.create_element("video");
            host.set_attribute(&item, "autoplay", "");
            host.set_attribute(&item, "controls", "");
            tag_item(host, &item, options);
            host.load_media(&item, MediaKind::Video, url, ticket);
            LoadStart::Pending(item)
        }
        ContentSource::YouTube { .. } => {
            LoadStart::Ready(embed_item(host, options, YOUTUBE_FRAME_SIZE))
        }
        ContentSource::Vimeo { .. } => LoadStart::Ready(embed_item(host, options, VIMEO_FRAME_SIZE)),
        ContentSource::Dialog { selector } => match host.query_selector(selector) {
            Some(source) => LoadStart::Ready(dialog_item(host, options, &source)),
            None => {
                warn!(selector = %selector, "dialog source not found");
                LoadStart::Unavailable
            }
        },
        ContentSource::Ajax { url } => {
            debug!(url = %url, %ticket, "requesting fragment");
            host.fetch_fragment(FragmentRequest::new(url.clone(), ticket));
            LoadStart::Requested
        }
    }
}

/// Build the AJAX item from a successful response body.
pub(crate) fn fragment_item<H: DomHost>(host: &mut H, options: &ModalOptions, body: &str) -> H::Node {
    let item = host.create_element("div");
    tag_item(host, &item, options);
    host.set_attribute(&item, "tabindex", "-1");
    host.set_inner_html(&item, body);
    item
}

/// Move `aria-labelledby` / `aria-describedby` from a dialog item onto the
/// wrapper. An item missing either one gets `role="document"`.
pub(crate) fn hoist_dialog_aria<H: DomHost>(host: &mut H, item: &H::Node, wrapper: &H::Node) {
    let labelled = non_empty(host.attribute(item, "aria-labelledby"));
    let described = non_empty(host.attribute(item, "aria-describedby"));
    if labelled.is_none() || described.is_none() {
        host.set_attribute(item, "role", "document");
    }
    for (name, value) in [("aria-labelledby", labelled), ("aria-describedby", described)] {
        if let Some(value) = value {
            host.set_attribute(wrapper, name, &value);
            host.remove_attribute(item, name);
        }
    }
}

fn embed_item<H: DomHost>(host: &mut H, options: &ModalOptions, size: (&str, &str)) -> H::Node {
    let item = host.create_element("iframe");
    if let Some(src) = options.source.embed_url() {
        host.set_attribute(&item, "src", &src);
    }
    host.set_attribute(&item, "allowfullscreen", "");
    host.set_attribute(&item, "frameborder", "0");
    host.set_attribute(&item, "width", size.0);
    host.set_attribute(&item, "height", size.1);
    tag_item(host, &item, options);
    item
}

fn dialog_item<H: DomHost>(host: &mut H, options: &ModalOptions, source: &H::Node) -> H::Node {
    let item = host.clone_deep(source);
    host.remove_attribute(&item, "id");
    tag_item(host, &item, options);
    host.set_attribute(&item, "tabindex", "-1");
    host.remove_attribute(&item, "hidden");
    item
}

fn tag_item<H: DomHost>(host: &mut H, item: &H::Node, options: &ModalOptions) {
    let classes = &options.classes;
    host.add_class(item, &classes.modal_item);
    for class in classes.item_classes(options.kind()) {
        host.add_class(item, class);
    }
    for class in &options.custom_item_classes {
        host.add_class(item, class);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::headless::MemoryDom;
    use crate::source::ModalKind;

    fn options(kind: ModalKind, source: &str) -> ModalOptions {
        ModalOptions::new(kind, source).unwrap()
    }

    #[test]
    fn youtube_iframe_attributes() {
        let mut dom = MemoryDom::new();
        let opts = options(ModalKind::YouTube, "https://youtu.be/abc123");
        let LoadStart::Ready(item) = start(&mut dom, &opts, LoadTicket::new(1)) else {
            panic!("youtube loads synchronously");
        };
        assert_eq!(dom.tag(item), "iframe");
        assert_eq!(
            dom.attribute(&item, "src").as_deref(),
            Some("https://www.youtube.com/embed/abc123?rel=0&autoplay=1&showinfo=0")
        );
        assert_eq!(dom.attribute(&item, "width").as_deref(), Some("560px"));
        assert_eq!(dom.attribute(&item, "height").as_deref(), Some("315px"));
        assert_eq!(dom.attribute(&item, "frameborder").as_deref(), Some("0"));
        assert_eq!(dom.classes(item), vec!["modal-item", "modal-item--youtube"]);
    }

    #[test]
    fn video_is_pending_with_controls() {
        let mut dom = MemoryDom::new();
        let opts = options(ModalKind::Video, "/clip.mp4").custom_item_classes(["wide"]);
        let LoadStart::Pending(item) = start(&mut dom, &opts, LoadTicket::new(4)) else {
            panic!("video waits for metadata");
        };
        assert!(dom.attribute(&item, "autoplay").is_some());
        assert!(dom.attribute(&item, "controls").is_some());
        assert_eq!(
            dom.classes(item),
            vec!["modal-item", "modal-item--video", "wide"]
        );
        let media: Vec<_> = dom.drain_media().collect();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].src, "/clip.mp4");
        assert_eq!(media[0].kind, MediaKind::Video);
        assert_eq!(media[0].ticket, LoadTicket::new(4));
    }

    #[test]
    fn dialog_clone_strips_identity() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        dom.append_html(
            body,
            r#"<div id="terms" hidden aria-labelledby="t-title"><h2 id="t-title">Terms</h2></div>"#,
        );
        let opts = options(ModalKind::Dialog, "#terms");
        let LoadStart::Ready(item) = start(&mut dom, &opts, LoadTicket::new(1)) else {
            panic!("dialog source exists");
        };
        assert_eq!(dom.attribute(&item, "id"), None);
        assert_eq!(dom.attribute(&item, "hidden"), None);
        assert_eq!(dom.attribute(&item, "tabindex").as_deref(), Some("-1"));
        assert!(!dom.is_connected(&item));

        let wrapper = dom.create_element("div");
        hoist_dialog_aria(&mut dom, &item, &wrapper);
        assert_eq!(dom.attribute(&item, "role").as_deref(), Some("document"));
        assert_eq!(
            dom.attribute(&wrapper, "aria-labelledby").as_deref(),
            Some("t-title")
        );
        assert_eq!(dom.attribute(&item, "aria-labelledby"), None);
    }

    #[test]
    fn fully_labelled_dialog_keeps_default_role() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        dom.append_html(
            body,
            r#"<section id="d" aria-labelledby="a" aria-describedby="b"></section>"#,
        );
        let opts = options(ModalKind::Dialog, "#d");
        let LoadStart::Ready(item) = start(&mut dom, &opts, LoadTicket::new(1)) else {
            panic!("dialog source exists");
        };
        let wrapper = dom.create_element("div");
        hoist_dialog_aria(&mut dom, &item, &wrapper);
        assert_eq!(dom.attribute(&item, "role"), None);
        assert_eq!(dom.attribute(&wrapper, "aria-describedby").as_deref(), Some("b"));
    }

    #[test]
    fn missing_dialog_is_unavailable() {
        let mut dom = MemoryDom::new();
        let opts = options(ModalKind::Dialog, "#missing");
        assert_eq!(
            start(&mut dom, &opts, LoadTicket::new(1)),
            LoadStart::Unavailable
        );
    }

    #[test]
    fn ajax_issues_request_and_builds_item_later() {
        let mut dom = MemoryDom::new();
        let opts = options(ModalKind::Ajax, "/fragment");
        assert_eq!(
            start(&mut dom, &opts, LoadTicket::new(2)),
            LoadStart::Requested
        );
        let requests: Vec<_> = dom.drain_fetches().collect();
        assert_eq!(requests, vec![FragmentRequest::new("/fragment", LoadTicket::new(2))]);

        let item = fragment_item(&mut dom, &opts, "<p>Hello <b>there</b></p>");
        assert_eq!(
            dom.classes(item),
            vec!["modal-item", "modal-item--dialog", "modal-item--ajax"]
        );
        assert_eq!(dom.inner_html(item), "<p>Hello <b>there</b></p>");
    }
}

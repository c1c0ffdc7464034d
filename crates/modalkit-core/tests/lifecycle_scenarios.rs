#![forbid(unsafe_code)]

//! End-to-end lifecycle scenarios against the headless DOM.
//!
//! Each test drives a [`Modal`] over [`MemoryDom`] the way a browser would:
//! user input and load completions arrive as [`ModalEvent`]s.

use std::cell::RefCell;
use std::rc::Rc;

use modalkit_core::headless::{MemoryDom, NodeId};
use modalkit_core::{
    DomHost, EventEffects, Key, KeyInput, Listener, Modal, ModalEvent, ModalHooks, ModalKind,
    ModalOptions, ModalPhase, Modifiers,
};
use pretty_assertions::assert_eq;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PAGE: &str = r#"
<button id="launch">Open</button>
<div id="terms" hidden aria-labelledby="terms-title">
  <h2 id="terms-title">Terms</h2>
  <p>Read carefully.</p>
</div>
<div id="form" hidden aria-labelledby="f-t" aria-describedby="f-d">
  <input name="email">
  <button class="js-accept">Agree</button>
</div>
"#;

fn page() -> MemoryDom {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    dom.append_html(body, PAGE);
    dom
}

fn source_for(kind: ModalKind) -> &'static str {
    match kind {
        ModalKind::Image => "/img/cat.png",
        ModalKind::Video => "/media/clip.mp4",
        ModalKind::YouTube => "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        ModalKind::Vimeo => "https://vimeo.com/76979871",
        ModalKind::Dialog => "#terms",
        ModalKind::Ajax => "/fragments/terms",
    }
}

fn modal(options: ModalOptions) -> Modal<MemoryDom> {
    Modal::new(page(), options).expect("valid options")
}

/// Complete every queued load successfully.
fn deliver_all(modal: &mut Modal<MemoryDom>, fragment: &str) {
    let media: Vec<_> = modal.host_mut().drain_media().collect();
    for load in media {
        modal.handle_event(ModalEvent::MediaLoaded(load.ticket));
    }
    let fetches: Vec<_> = modal.host_mut().drain_fetches().collect();
    for request in fetches {
        modal.handle_event(ModalEvent::FragmentResponse {
            ticket: request.ticket,
            status: 200,
            body: fragment.to_owned(),
        });
    }
}

fn wrapper(modal: &Modal<MemoryDom>) -> NodeId {
    modal.elements().expect("wrapper exists").wrapper
}

fn items_in_document(modal: &Modal<MemoryDom>) -> usize {
    let dom = modal.host();
    dom.query_selector_all(&dom.body(), ".modal-item").len()
}

type Journal = Rc<RefCell<Vec<&'static str>>>;

fn journaling_hooks(journal: &Journal) -> ModalHooks<NodeId> {
    let j = |name: &'static str| {
        let journal = Rc::clone(journal);
        move || journal.borrow_mut().push(name)
    };
    let with_elements = |name: &'static str| {
        let journal = Rc::clone(journal);
        move |_: &modalkit_core::ModalElements<NodeId>| journal.borrow_mut().push(name)
    };
    let before = Rc::clone(journal);
    ModalHooks::new()
        .on_init_trigger(j("init_trigger"))
        .on_remove_trigger(j("remove_trigger"))
        .on_before_open(move || {
            before.borrow_mut().push("before_open");
            None
        })
        .on_open(with_elements("open"))
        .on_close(with_elements("close"))
        .on_accept(j("accept"))
        .on_remove(j("remove"))
        .on_load(with_elements("load"))
}

// ===========================================================================
// Loading
// ===========================================================================

#[test]
fn every_kind_attaches_exactly_one_item() {
    for kind in ModalKind::ALL {
        let mut m = modal(ModalOptions::new(kind, source_for(kind)).unwrap());
        m.open();
        deliver_all(&mut m, "<p>fragment</p>");

        let wrapper = wrapper(&m);
        let dom = m.host();
        assert!(dom.is_connected(&wrapper), "{kind}: wrapper attached");
        assert!(dom.has_class(&wrapper, "is-loaded"), "{kind}: loaded class");
        assert_eq!(
            dom.query_selector_all(&wrapper, ".modal-item").len(),
            1,
            "{kind}: single item"
        );
        assert!(m.elements().unwrap().item.is_some(), "{kind}: item recorded");
    }
}

#[test]
fn youtube_short_link_embeds_video_id() {
    let mut m = modal(ModalOptions::parse("youtube", "https://youtu.be/abc123").unwrap());
    m.open();
    let item = m.elements().unwrap().item.unwrap();
    let src = m.host().attribute(&item, "src").unwrap();
    assert!(src.contains("abc123"));
    assert_eq!(m.host().tag(item), "iframe");
}

#[test]
fn vimeo_iframe_has_fixed_size() {
    let mut m = modal(ModalOptions::parse("vimeo", "https://vimeo.com/76979871").unwrap());
    m.open();
    let item = m.elements().unwrap().item.unwrap();
    let dom = m.host();
    assert_eq!(dom.attribute(&item, "width").as_deref(), Some("640px"));
    assert_eq!(dom.attribute(&item, "height").as_deref(), Some("272px"));
    assert!(dom.attribute(&item, "allowfullscreen").is_some());
}

#[test]
fn dialog_aria_moves_to_wrapper() {
    let mut m = modal(ModalOptions::parse("dialog", "#terms").unwrap());
    m.open();
    let wrapper = wrapper(&m);
    let item = m.elements().unwrap().item.unwrap();
    let dom = m.host();
    assert_eq!(
        dom.attribute(&wrapper, "aria-labelledby").as_deref(),
        Some("terms-title")
    );
    assert_eq!(dom.attribute(&item, "aria-labelledby"), None);
    assert_eq!(dom.attribute(&item, "role").as_deref(), Some("document"));
    assert_eq!(dom.attribute(&item, "hidden"), None);
    assert_eq!(dom.attribute(&item, "id"), None);
    // The page's own dialog stays untouched.
    let original = dom.element_by_id("terms").unwrap();
    assert!(dom.attribute(&original, "hidden").is_some());
}

#[test]
fn missing_dialog_leaves_empty_wrapper_without_load_hook() {
    let journal = Journal::default();
    let mut m = modal(ModalOptions::parse("dialog", "#missing").unwrap())
        .with_hooks(journaling_hooks(&journal));
    m.open();

    let wrapper = wrapper(&m);
    assert!(m.is_opened());
    assert!(m.host().is_connected(&wrapper));
    assert!(!m.host().has_class(&wrapper, "is-loaded"));
    assert_eq!(items_in_document(&m), 0);
    assert!(m.elements().unwrap().item.is_none());
    assert!(!journal.borrow().contains(&"load"));
}

#[test]
fn ajax_failure_focuses_wrapper_and_restores_on_remove() {
    let mut dom = page();
    let launch = dom.element_by_id("launch").unwrap();
    dom.focus(&launch);
    let options = ModalOptions::parse("ajax", "/fragments/missing")
        .unwrap()
        .close_button(false);
    let mut m = Modal::new(dom, options).unwrap();
    m.open();

    let request = m.host_mut().drain_fetches().next().unwrap();
    assert_eq!(request.url, "/fragments/missing");
    assert!(
        request
            .headers
            .contains(&("X-Requested-With".to_owned(), "XMLHttpRequest".to_owned()))
    );
    m.handle_event(ModalEvent::FragmentResponse {
        ticket: request.ticket,
        status: 404,
        body: "not found".to_owned(),
    });

    let wrapper = wrapper(&m);
    assert!(m.is_opened());
    assert_eq!(items_in_document(&m), 0);
    assert_eq!(m.host().active_element(), Some(wrapper));
    assert_eq!(m.host().attribute(&wrapper, "tabindex").as_deref(), Some("-1"));

    m.remove();
    assert_eq!(m.host().active_element(), Some(launch));
}

#[test]
fn media_error_falls_back_to_focus_only() {
    let mut m = modal(ModalOptions::parse("video", "/broken.mp4").unwrap());
    m.open();
    let load = m.host_mut().drain_media().next().unwrap();
    m.handle_event(ModalEvent::MediaFailed(load.ticket));

    let close_button = m.elements().unwrap().close_button.unwrap();
    assert_eq!(items_in_document(&m), 0);
    assert_eq!(m.host().active_element(), Some(close_button));
    assert!(m.is_opened());
}

#[test]
fn ajax_success_wires_custom_triggers() {
    let options = ModalOptions::parse("ajax", "/fragments/confirm")
        .unwrap()
        .custom_close_trigger(".js-close")
        .custom_accept_trigger(".js-accept");
    let mut m = modal(options);
    m.open();
    deliver_all(
        &mut m,
        r##"<p>Sure?</p><button class="js-accept">Yes</button><a class="js-close" href="#">No</a>"##,
    );

    let item = m.elements().unwrap().item.unwrap();
    let dom = m.host();
    let accept = dom.query_selector_all(&item, ".js-accept")[0];
    let close = dom.query_selector_all(&item, ".js-close")[0];
    assert!(dom.has_listener(accept, Listener::CustomAcceptClick));
    assert!(dom.has_listener(close, Listener::CustomCloseClick));
    assert_eq!(
        dom.classes(item),
        vec!["modal-item", "modal-item--dialog", "modal-item--ajax"]
    );

    assert_eq!(
        m.handle_event(ModalEvent::CustomAcceptClick),
        EventEffects::STOP_PROPAGATION
    );
    assert!(m.is_accepted());
    assert_eq!(
        m.handle_event(ModalEvent::CustomCloseClick),
        EventEffects::STOP_PROPAGATION
    );
    assert!(!m.is_wrapper_created());
    assert_eq!(m.host().listener_count(), 0);
}

// ===========================================================================
// Open / close / remove
// ===========================================================================

#[test]
fn second_open_does_not_duplicate_wrapper() {
    let mut m = modal(ModalOptions::parse("dialog", "#terms").unwrap());
    m.open();
    let generation = m.generation();
    m.open();
    assert_eq!(m.generation(), generation);
    let dom = m.host();
    assert_eq!(dom.query_selector_all(&dom.body(), "#modal").len(), 1);
}

#[test]
fn close_without_animation_removes_synchronously() {
    let journal = Journal::default();
    let mut m = modal(ModalOptions::parse("youtube", "https://youtu.be/abc123").unwrap())
        .with_hooks(journaling_hooks(&journal));
    m.open();
    let wrapper = wrapper(&m);
    m.close();

    assert!(!m.is_opened());
    assert!(!m.is_wrapper_created());
    assert!(!m.host().is_connected(&wrapper));
    assert_eq!(m.phase(), ModalPhase::Closed);
    assert_eq!(
        *journal.borrow(),
        vec!["before_open", "load", "open", "close", "remove"]
    );
}

#[test]
fn close_with_animation_waits_for_close_animation() {
    let options = ModalOptions::parse("dialog", "#terms")
        .unwrap()
        .animation("modal-in", "modal-out");
    let mut m = modal(options);
    m.open();
    let wrapper = wrapper(&m);
    assert!(m.host().has_class(&wrapper, "is-opening"));
    assert!(!m.host().has_class(&wrapper, "is-opened"));

    m.handle_event(ModalEvent::animation_end("modal-in"));
    assert!(m.host().has_class(&wrapper, "is-opened"));
    assert!(!m.host().has_class(&wrapper, "is-opening"));

    m.close();
    assert!(m.host().is_connected(&wrapper));
    assert!(m.host().has_class(&wrapper, "is-closing"));
    assert!(!m.host().has_class(&wrapper, "is-opened"));

    m.handle_event(ModalEvent::animation_end("modal-in"));
    assert!(m.host().is_connected(&wrapper));

    m.handle_event(ModalEvent::animation_end("modal-out"));
    assert!(!m.host().is_connected(&wrapper));
    assert!(m.host().has_class(&wrapper, "is-closed"));
    assert!(!m.is_wrapper_created());
}

#[test]
fn body_marker_follows_open_state() {
    let mut m = modal(ModalOptions::parse("dialog", "#terms").unwrap());
    let body = m.host().body();
    m.open();
    assert!(m.host().has_class(&body, "is-modal-opened"));
    m.close();
    assert!(!m.host().has_class(&body, "is-modal-opened"));
}

#[test]
fn remove_restores_focus_to_opener() {
    let mut dom = page();
    let launch = dom.element_by_id("launch").unwrap();
    dom.focus(&launch);
    let mut m = Modal::new(dom, ModalOptions::parse("dialog", "#terms").unwrap()).unwrap();

    m.open();
    assert_ne!(m.host().active_element(), Some(launch));
    m.remove();
    assert_eq!(m.host().active_element(), Some(launch));
    assert!(!m.is_opened());
}

#[test]
fn remove_while_open_fires_close_then_remove_once() {
    let journal = Journal::default();
    let mut m = modal(ModalOptions::parse("dialog", "#terms").unwrap())
        .with_hooks(journaling_hooks(&journal));
    m.open();
    journal.borrow_mut().clear();
    m.remove();
    m.remove();
    assert_eq!(*journal.borrow(), vec!["close", "remove"]);
}

#[test]
fn accept_is_one_way_and_independent_of_state() {
    let journal = Journal::default();
    let mut m = modal(ModalOptions::parse("dialog", "#terms").unwrap())
        .with_hooks(journaling_hooks(&journal));
    m.accept();
    m.accept();
    m.open();
    m.close();
    assert!(m.is_accepted());
    let accepts = journal.borrow().iter().filter(|e| **e == "accept").count();
    assert_eq!(accepts, 1);
}

#[test]
fn trigger_binding_is_idempotent() {
    let journal = Journal::default();
    let mut dom = page();
    let launch = dom.element_by_id("launch").unwrap();
    dom.focus(&launch);
    let mut m = Modal::new(dom, ModalOptions::parse("dialog", "#terms").unwrap())
        .unwrap()
        .with_trigger(launch)
        .with_hooks(journaling_hooks(&journal));

    m.init_trigger();
    m.init_trigger();
    assert!(m.is_trigger_initialized());
    assert_eq!(m.host().listeners_on(launch), vec![Listener::TriggerClick]);
    assert_eq!(
        m.handle_event(ModalEvent::TriggerClick),
        EventEffects::PREVENT_DEFAULT
    );
    assert!(m.is_opened());

    m.remove_trigger();
    m.remove_trigger();
    assert!(m.host().listeners_on(launch).is_empty());
    let entries = journal.borrow();
    assert_eq!(entries.iter().filter(|e| **e == "init_trigger").count(), 1);
    assert_eq!(entries.iter().filter(|e| **e == "remove_trigger").count(), 1);
}

// ===========================================================================
// Keyboard
// ===========================================================================

#[test]
fn tab_on_last_focusable_wraps_to_first() {
    let mut m = modal(ModalOptions::parse("dialog", "#form").unwrap());
    m.open();
    let trap = m.focus_trap().nodes().to_vec();
    assert!(trap.len() >= 2);
    let first = trap[0];
    let last = trap[trap.len() - 1];
    assert_eq!(m.host().active_element(), Some(first));

    m.host_mut().focus(&last);
    let effects = m.handle_event(ModalEvent::key(Key::Tab));
    assert_eq!(effects, EventEffects::PREVENT_DEFAULT);
    assert_eq!(m.host().active_element(), Some(first));

    let shift_tab = KeyInput::new(Key::Tab).with_mods(Modifiers::SHIFT);
    let effects = m.handle_event(ModalEvent::KeyDown(shift_tab));
    assert_eq!(effects, EventEffects::PREVENT_DEFAULT);
    assert_eq!(m.host().active_element(), Some(last));
}

#[test]
fn tab_inside_trap_is_left_to_the_browser() {
    let mut m = modal(ModalOptions::parse("dialog", "#form").unwrap());
    m.open();
    let trap = m.focus_trap().nodes().to_vec();
    m.host_mut().focus(&trap[1]);
    assert_eq!(
        m.handle_event(ModalEvent::key(Key::Tab)),
        EventEffects::empty()
    );
    assert_eq!(m.host().active_element(), Some(trap[1]));
}

#[test]
fn escape_closes_and_stops_propagation() {
    let mut m = modal(ModalOptions::parse("dialog", "#terms").unwrap());
    m.open();
    let effects = m.handle_event(ModalEvent::KeyDown(KeyInput::from_dom(
        "Escape",
        Modifiers::empty(),
    )));
    assert_eq!(effects, EventEffects::STOP_PROPAGATION);
    assert!(!m.is_wrapper_created());
}

// ===========================================================================
// Stale completions
// ===========================================================================

#[test]
fn late_fragment_after_close_never_attaches() {
    let mut m = modal(ModalOptions::parse("ajax", "/fragments/slow").unwrap());
    m.open();
    let request = m.host_mut().drain_fetches().next().unwrap();
    m.close();
    m.handle_event(ModalEvent::FragmentResponse {
        ticket: request.ticket,
        status: 200,
        body: "<p>late</p>".to_owned(),
    });
    assert!(!m.is_wrapper_created());
    assert_eq!(items_in_document(&m), 0);
}

#[test]
fn completion_from_previous_open_is_discarded() {
    let mut m = modal(ModalOptions::parse("image", "/img/cat.png").unwrap());
    m.open();
    let stale = m.host_mut().drain_media().next().unwrap().ticket;
    m.close();
    m.open();
    let fresh = m.host_mut().drain_media().next().unwrap().ticket;
    assert_ne!(stale, fresh);

    m.handle_event(ModalEvent::MediaLoaded(stale));
    assert_eq!(items_in_document(&m), 0);

    m.handle_event(ModalEvent::MediaLoaded(fresh));
    assert_eq!(items_in_document(&m), 1);

    m.handle_event(ModalEvent::MediaLoaded(fresh));
    assert_eq!(items_in_document(&m), 1);
}

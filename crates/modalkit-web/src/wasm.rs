#![forbid(unsafe_code)]

//! `wasm-bindgen` exports and the `web-sys` document host.
//!
//! [`WebDom`] implements [`DomHost`] over the live document. Every DOM
//! listener it installs is a `Closure` that translates the browser event
//! into a [`ModalEvent`] and hands it to the owning [`ModalCell`] through a
//! weak back-reference, so a dropped modal never keeps itself alive through
//! its own listeners.
//!
//! Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Function, Object, Reflect};
use modalkit_core::{
    DomHost, EventEffects, FragmentRequest, KeyInput, Listener, LoadTicket, MediaKind, Modal,
    ModalElements, ModalError, ModalEvent, ModalHooks, ModalPhase, Modifiers,
};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AnimationEvent, Document, Element, Event, HtmlElement, KeyboardEvent, Node, XmlHttpRequest,
};

use crate::cell::{ModalCell, ModalCommand, ModalState};
use crate::options::{CALLBACK_KEYS, JsModalOptions};

/// `XMLHttpRequest.DONE`.
const XHR_DONE: u16 = 4;

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "modalkit panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("modalkit panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn to_js_error(err: ModalError) -> JsError {
    JsError::new(&err.to_string())
}

// ---------------------------------------------------------------------------
// Event plumbing
// ---------------------------------------------------------------------------

/// Weak back-reference from DOM callbacks to the modal they feed.
type EventSink = Rc<RefCell<Weak<ModalCell<WebDom>>>>;

fn deliver(sink: &EventSink, event: ModalEvent) -> EventEffects {
    // Upgrade first so the sink borrow ends before the modal runs.
    let cell = sink.borrow().upgrade();
    match cell {
        Some(cell) => cell.dispatch(event),
        None => EventEffects::empty(),
    }
}

fn modal_event(listener: Listener, event: &Event) -> Option<ModalEvent> {
    let translated = match listener {
        Listener::TriggerClick => ModalEvent::TriggerClick,
        Listener::BackdropClick => ModalEvent::BackdropClick,
        Listener::CloseButtonClick => ModalEvent::CloseButtonClick,
        Listener::CustomCloseClick => ModalEvent::CustomCloseClick,
        Listener::CustomAcceptClick => ModalEvent::CustomAcceptClick,
        Listener::WrapperKeyDown => {
            let key = event.dyn_ref::<KeyboardEvent>()?;
            let mods = Modifiers::from_dom(
                key.shift_key(),
                key.alt_key(),
                key.ctrl_key(),
                key.meta_key(),
            );
            ModalEvent::KeyDown(KeyInput::from_dom(&key.key(), mods))
        }
        Listener::WrapperAnimationEnd => {
            ModalEvent::animation_end(event.dyn_ref::<AnimationEvent>()?.animation_name())
        }
    };
    Some(translated)
}

fn apply_effects(event: &Event, effects: EventEffects) {
    if effects.contains(EventEffects::PREVENT_DEFAULT) {
        event.prevent_default();
    }
    if effects.contains(EventEffects::STOP_PROPAGATION) {
        event.stop_propagation();
    }
}

/// One installed `addEventListener` callback.
struct Registration {
    node: Element,
    event: &'static str,
    /// `None` for one-load media watchers.
    listener: Option<Listener>,
    closure: Closure<dyn FnMut(Event)>,
}

impl Registration {
    fn uninstall(&self) {
        let _ = self
            .node
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

struct InFlight {
    xhr: XmlHttpRequest,
    _on_ready: Closure<dyn FnMut()>,
}

// ---------------------------------------------------------------------------
// WebDom
// ---------------------------------------------------------------------------

/// [`DomHost`] over the browser document.
pub struct WebDom {
    document: Document,
    body: Element,
    /// Inert stand-in returned when the document rejects a tag name.
    scratch: Element,
    sink: EventSink,
    listeners: Vec<Registration>,
    requests: Vec<InFlight>,
}

impl std::fmt::Debug for WebDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDom")
            .field("listeners", &self.listeners.len())
            .field("requests", &self.requests.len())
            .finish_non_exhaustive()
    }
}

impl WebDom {
    /// Host over `window.document`.
    ///
    /// # Errors
    ///
    /// When there is no window, document or body.
    pub fn new() -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("modalkit: no document"))?;
        let body: Element = document
            .body()
            .ok_or_else(|| JsValue::from_str("modalkit: document has no body"))?
            .into();
        let scratch = document.create_element("div")?;
        Ok(Self {
            document,
            body,
            scratch,
            sink: Rc::new(RefCell::new(Weak::new())),
            listeners: Vec::new(),
            requests: Vec::new(),
        })
    }

    fn sink(&self) -> EventSink {
        Rc::clone(&self.sink)
    }

    fn register(
        &mut self,
        node: &Element,
        event: &'static str,
        listener: Option<Listener>,
        closure: Closure<dyn FnMut(Event)>,
    ) {
        if let Err(err) =
            node.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            warn!(event, error = ?err, "addEventListener failed");
            return;
        }
        self.listeners.push(Registration {
            node: node.clone(),
            event,
            listener,
            closure,
        });
    }

    fn drop_registrations(&mut self, mut doomed: impl FnMut(&Registration) -> bool) {
        self.listeners.retain(|registration| {
            if doomed(registration) {
                registration.uninstall();
                false
            } else {
                true
            }
        });
    }
}

impl Drop for WebDom {
    fn drop(&mut self) {
        for registration in &self.listeners {
            registration.uninstall();
        }
        for request in &self.requests {
            request.xhr.set_onreadystatechange(None);
        }
    }
}

impl DomHost for WebDom {
    type Node = Element;

    fn create_element(&mut self, tag: &str) -> Element {
        self.document.create_element(tag).unwrap_or_else(|err| {
            warn!(tag, error = ?err, "createElement rejected tag name");
            self.scratch.clone()
        })
    }

    fn body(&self) -> Element {
        self.body.clone()
    }

    fn append_child(&mut self, parent: &Element, child: &Element) {
        if let Err(err) = parent.append_child(child) {
            warn!(error = ?err, "appendChild failed");
        }
    }

    fn insert_before(&mut self, parent: &Element, child: &Element, reference: Option<&Element>) {
        let reference: Option<&Node> = reference.map(|node| &**node);
        if let Err(err) = parent.insert_before(child, reference) {
            warn!(error = ?err, "insertBefore failed");
        }
    }

    fn detach(&mut self, node: &Element) {
        node.remove();
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn clone_deep(&mut self, node: &Element) -> Element {
        match node.clone_node_with_deep(true).map(JsCast::dyn_into::<Element>) {
            Ok(Ok(copy)) => copy,
            _ => {
                warn!("cloneNode failed");
                self.create_element("div")
            }
        }
    }

    fn set_inner_html(&mut self, node: &Element, html: &str) {
        node.set_inner_html(html);
    }

    fn query_selector(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    fn query_selector_all(&self, root: &Element, selector: &str) -> Vec<Element> {
        let Ok(list) = root.query_selector_all(selector) else {
            warn!(selector, "querySelectorAll rejected selector");
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) {
        if let Err(err) = node.set_attribute(name, value) {
            warn!(name, error = ?err, "setAttribute failed");
        }
    }

    fn remove_attribute(&mut self, node: &Element, name: &str) {
        let _ = node.remove_attribute(name);
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn add_class(&mut self, node: &Element, class: &str) {
        let _ = node.class_list().add_1(class);
    }

    fn remove_class(&mut self, node: &Element, class: &str) {
        let _ = node.class_list().remove_1(class);
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn active_element(&self) -> Option<Element> {
        self.document
            .active_element()
            .filter(|active| *active != self.body)
    }

    fn focus(&mut self, node: &Element) {
        match node.dyn_ref::<HtmlElement>() {
            Some(element) => {
                let _ = element.focus();
            }
            None => debug!("focus target is not an HTMLElement"),
        }
    }

    fn listen(&mut self, node: &Element, listener: Listener) {
        let installed = self
            .listeners
            .iter()
            .any(|r| r.listener == Some(listener) && r.node == *node);
        if installed {
            return;
        }
        let sink = self.sink();
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(translated) = modal_event(listener, &event) else {
                return;
            };
            apply_effects(&event, deliver(&sink, translated));
        });
        self.register(node, listener.dom_event(), Some(listener), closure);
    }

    fn unlisten(&mut self, node: &Element, listener: Listener) {
        self.drop_registrations(|r| r.listener == Some(listener) && r.node == *node);
    }

    fn unlisten_subtree(&mut self, root: &Element) {
        let root: &Node = root;
        self.drop_registrations(|r| root.contains(Some(&*r.node)));
    }

    fn load_media(&mut self, node: &Element, kind: MediaKind, src: &str, ticket: LoadTicket) {
        // Only the latest load is ever awaited.
        self.drop_registrations(|r| r.listener.is_none());

        let ready = match kind {
            MediaKind::Image => "load",
            MediaKind::Video => "loadedmetadata",
        };
        for (event, loaded) in [(ready, true), ("error", false)] {
            let sink = self.sink();
            let closure = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                let completion = if loaded {
                    ModalEvent::MediaLoaded(ticket)
                } else {
                    ModalEvent::MediaFailed(ticket)
                };
                deliver(&sink, completion);
            });
            self.register(node, event, None, closure);
        }
        self.set_attribute(node, "src", src);
    }

    fn fetch_fragment(&mut self, request: FragmentRequest) {
        self.requests.retain(|r| r.xhr.ready_state() != XHR_DONE);

        let ticket = request.ticket;
        let xhr = match XmlHttpRequest::new() {
            Ok(xhr) => xhr,
            Err(err) => {
                warn!(error = ?err, "XMLHttpRequest unavailable");
                // The modal is mid-open, so the cell queues this until it returns.
                deliver(
                    &self.sink,
                    ModalEvent::FragmentResponse {
                        ticket,
                        status: 0,
                        body: String::new(),
                    },
                );
                return;
            }
        };

        let sink = self.sink();
        let watched = xhr.clone();
        let on_ready = Closure::<dyn FnMut()>::new(move || {
            if watched.ready_state() != XHR_DONE {
                return;
            }
            let status = watched.status().unwrap_or(0);
            let body = watched.response_text().ok().flatten().unwrap_or_default();
            deliver(&sink, ModalEvent::FragmentResponse { ticket, status, body });
        });
        xhr.set_onreadystatechange(Some(on_ready.as_ref().unchecked_ref()));

        let sent = xhr
            .open_with_async("GET", &request.url, true)
            .and_then(|()| {
                request
                    .headers
                    .iter()
                    .try_for_each(|(name, value)| xhr.set_request_header(name, value))
            })
            .and_then(|()| xhr.send());
        if let Err(err) = sent {
            warn!(url = %request.url, error = ?err, "fragment request not sent");
        }
        self.requests.push(InFlight {
            xhr,
            _on_ready: on_ready,
        });
    }
}

// ---------------------------------------------------------------------------
// Page callbacks
// ---------------------------------------------------------------------------

fn elements_to_js(elements: &ModalElements<Element>) -> JsValue {
    let obj = Object::new();
    set_js(&obj, "wrapper", elements.wrapper.clone().into());
    set_js(&obj, "backdrop", elements.backdrop.clone().into());
    set_js(&obj, "spinner", elements.spinner.clone().into());
    set_js(
        &obj,
        "item",
        elements.item.clone().map_or(JsValue::NULL, Into::into),
    );
    set_js(
        &obj,
        "closeButton",
        elements.close_button.clone().map_or(JsValue::NULL, Into::into),
    );
    obj.into()
}

/// The `this` page callbacks run with, filled in once the modal exists.
type ThisSlot = Rc<RefCell<JsValue>>;

fn call(callback: &Function, this: &ThisSlot, args: &[JsValue]) -> Option<JsValue> {
    // Cloned out so a callback re-entering the modal never meets a live borrow.
    let this = this.borrow().clone();
    let result = match args {
        [] => callback.call0(&this),
        [first, ..] => callback.call1(&this, first),
    };
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            console_error(&format!("modalkit: callback threw: {err:?}"));
            None
        }
    }
}

fn callback(options: &JsValue, key: &str) -> Option<Function> {
    Reflect::get(options, &JsValue::from_str(key))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

fn js_hooks(options: &JsValue, this: &ThisSlot) -> ModalHooks<Element> {
    let [init_trigger, remove_trigger, before_open, open, close, accept, remove, load] =
        CALLBACK_KEYS.map(|key| callback(options, key));

    let mut hooks = ModalHooks::new();
    if let Some(f) = init_trigger {
        let this = Rc::clone(this);
        hooks = hooks.on_init_trigger(move || {
            call(&f, &this, &[]);
        });
    }
    if let Some(f) = remove_trigger {
        let this = Rc::clone(this);
        hooks = hooks.on_remove_trigger(move || {
            call(&f, &this, &[]);
        });
    }
    if let Some(f) = before_open {
        let this = Rc::clone(this);
        hooks = hooks.on_before_open(move || call(&f, &this, &[]).and_then(|value| value.as_bool()));
    }
    if let Some(f) = open {
        let this = Rc::clone(this);
        hooks = hooks.on_open(move |elements| {
            call(&f, &this, &[elements_to_js(elements)]);
        });
    }
    if let Some(f) = close {
        let this = Rc::clone(this);
        hooks = hooks.on_close(move |elements| {
            call(&f, &this, &[elements_to_js(elements)]);
        });
    }
    if let Some(f) = accept {
        let this = Rc::clone(this);
        hooks = hooks.on_accept(move || {
            call(&f, &this, &[]);
        });
    }
    if let Some(f) = remove {
        let this = Rc::clone(this);
        hooks = hooks.on_remove(move || {
            call(&f, &this, &[]);
        });
    }
    if let Some(f) = load {
        let this = Rc::clone(this);
        hooks = hooks.on_load(move |elements| {
            call(&f, &this, &[elements_to_js(elements)]);
        });
    }
    hooks
}

fn phase_label(phase: ModalPhase) -> &'static str {
    match phase {
        ModalPhase::Closed => "closed",
        ModalPhase::Opening => "opening",
        ModalPhase::Opened => "opened",
        ModalPhase::Closing => "closing",
    }
}

// ---------------------------------------------------------------------------
// JS export
// ---------------------------------------------------------------------------

/// A modal bound to the page, exported to JavaScript as `Modal`.
///
/// ```js
/// const modal = new Modal({ type: "image", source: "/cat.png", trigger });
/// modal.initTrigger();
/// ```
#[wasm_bindgen(js_name = Modal)]
pub struct JsModal {
    handle: Handle,
}

/// The constructed instance owns the modal; the one handed to callbacks as
/// `this` holds a weak handle.
enum Handle {
    Owner(Rc<ModalCell<WebDom>>),
    Callback(Weak<ModalCell<WebDom>>),
}

impl JsModal {
    fn cell(&self) -> Option<Rc<ModalCell<WebDom>>> {
        match &self.handle {
            Handle::Owner(cell) => Some(Rc::clone(cell)),
            Handle::Callback(cell) => cell.upgrade(),
        }
    }

    fn run(&self, command: ModalCommand) {
        match self.cell() {
            Some(cell) => {
                cell.run(command);
            }
            None => debug!(?command, "modal dropped, command ignored"),
        }
    }

    fn state(&self) -> ModalState {
        self.cell().map(|cell| cell.state()).unwrap_or_default()
    }
}

#[wasm_bindgen(js_class = Modal)]
impl JsModal {
    /// Validate `options` and prepare the modal. Nothing is rendered yet.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<JsModal, JsError> {
        install_panic_hook();

        if !options.is_object() {
            return Err(JsError::new("modal options must be an object"));
        }
        let json: String = js_sys::JSON::stringify(&options)
            .map_err(|_| JsError::new("modal options must be JSON-serializable"))?
            .into();
        let parsed = JsModalOptions::from_json(&json)
            .and_then(JsModalOptions::into_options)
            .map_err(to_js_error)?;

        let dom = WebDom::new().map_err(|_| JsError::new("modal requires a document body"))?;
        let sink = dom.sink();
        let this: ThisSlot = Rc::new(RefCell::new(JsValue::UNDEFINED));
        let mut modal = Modal::new(dom, parsed)
            .map_err(to_js_error)?
            .with_hooks(js_hooks(&options, &this));
        let trigger = Reflect::get(&options, &JsValue::from_str("trigger"))
            .ok()
            .and_then(|value| value.dyn_into::<Element>().ok());
        if let Some(trigger) = trigger {
            modal = modal.with_trigger(trigger);
        }

        let cell = Rc::new(ModalCell::new(modal));
        *sink.borrow_mut() = Rc::downgrade(&cell);
        *this.borrow_mut() = JsValue::from(JsModal {
            handle: Handle::Callback(Rc::downgrade(&cell)),
        });
        Ok(Self {
            handle: Handle::Owner(cell),
        })
    }

    #[wasm_bindgen(js_name = initTrigger)]
    pub fn init_trigger(&self) {
        self.run(ModalCommand::InitTrigger);
    }

    #[wasm_bindgen(js_name = removeTrigger)]
    pub fn remove_trigger(&self) {
        self.run(ModalCommand::RemoveTrigger);
    }

    pub fn open(&self) {
        self.run(ModalCommand::Open);
    }

    pub fn close(&self) {
        self.run(ModalCommand::Close);
    }

    pub fn accept(&self) {
        self.run(ModalCommand::Accept);
    }

    pub fn remove(&self) {
        self.run(ModalCommand::Remove);
    }

    #[wasm_bindgen(js_name = setOpenable)]
    pub fn set_openable(&self, openable: bool) {
        self.run(ModalCommand::SetOpenable(openable));
    }

    #[wasm_bindgen(getter, js_name = isOpened)]
    pub fn is_opened(&self) -> bool {
        self.state().is_opened
    }

    #[wasm_bindgen(getter, js_name = isAccepted)]
    pub fn is_accepted(&self) -> bool {
        self.state().is_accepted
    }

    #[wasm_bindgen(getter, js_name = isOpenable)]
    pub fn is_openable(&self) -> bool {
        self.state().is_openable
    }

    /// Same as `setOpenable`, for callbacks written as
    /// `this.isOpenable = false`.
    #[wasm_bindgen(setter, js_name = isOpenable)]
    pub fn set_is_openable(&self, openable: bool) {
        self.run(ModalCommand::SetOpenable(openable));
    }

    #[wasm_bindgen(getter, js_name = isWrapperCreated)]
    pub fn is_wrapper_created(&self) -> bool {
        self.state().is_wrapper_created
    }

    #[wasm_bindgen(getter, js_name = isTriggerInitialized)]
    pub fn is_trigger_initialized(&self) -> bool {
        self.state().is_trigger_initialized
    }

    #[wasm_bindgen(getter, js_name = hasAnimation)]
    pub fn has_animation(&self) -> bool {
        self.state().has_animation
    }

    /// `"closed"`, `"opening"`, `"opened"` or `"closing"`.
    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String {
        phase_label(self.state().phase).to_owned()
    }

    /// `{ wrapper, backdrop, spinner, item, closeButton }`, or `null`
    /// without a wrapper or while the modal is busy.
    pub fn elements(&self) -> JsValue {
        self.cell()
            .and_then(|cell| cell.with(|modal| modal.elements().map(elements_to_js)))
            .flatten()
            .unwrap_or(JsValue::NULL)
    }
}

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modalkit_core::headless::MemoryDom;
use modalkit_core::{DomHost, Key, LoadTicket, Modal, ModalEvent, ModalKind, ModalOptions};

#[derive(Debug, Arbitrary)]
enum Op {
    Open,
    Close,
    Accept,
    Remove,
    Backdrop,
    Escape,
    Tab,
    AnimationEnd(bool),
    Complete { index: u8, ok: bool },
}

#[derive(Debug, Arbitrary)]
struct Input {
    kind: u8,
    animated: bool,
    ops: Vec<Op>,
}

fn source_for(kind: ModalKind) -> &'static str {
    match kind {
        ModalKind::Image => "/a.png",
        ModalKind::Video => "/a.mp4",
        ModalKind::YouTube => "https://youtu.be/abc123",
        ModalKind::Vimeo => "https://vimeo.com/1234",
        ModalKind::Dialog => "#dlg",
        ModalKind::Ajax => "/frag",
    }
}

fuzz_target!(|input: Input| {
    let kind = ModalKind::ALL[usize::from(input.kind) % ModalKind::ALL.len()];
    let mut dom = MemoryDom::new();
    let body = dom.body();
    dom.append_html(body, r#"<div id="dlg" hidden><input><button>ok</button></div>"#);
    let mut options = ModalOptions::new(kind, source_for(kind)).expect("fixed sources are valid");
    if input.animated {
        options = options.animation("in", "out");
    }
    let mut modal = Modal::new(dom, options).expect("valid options");
    let mut issued: Vec<(LoadTicket, bool)> = Vec::new();

    for op in input.ops.iter().take(128) {
        match op {
            Op::Open => modal.open(),
            Op::Close => modal.close(),
            Op::Accept => modal.accept(),
            Op::Remove => modal.remove(),
            Op::Backdrop => {
                modal.handle_event(ModalEvent::BackdropClick);
            }
            Op::Escape => {
                modal.handle_event(ModalEvent::key(Key::Escape));
            }
            Op::Tab => {
                modal.handle_event(ModalEvent::key(Key::Tab));
            }
            Op::AnimationEnd(open) => {
                modal.handle_event(ModalEvent::animation_end(if *open { "in" } else { "out" }));
            }
            Op::Complete { index, ok } => {
                if let Some(&(ticket, media)) = issued.get(usize::from(*index) % issued.len().max(1)) {
                    let event = match (media, *ok) {
                        (true, true) => ModalEvent::MediaLoaded(ticket),
                        (true, false) => ModalEvent::MediaFailed(ticket),
                        (false, ok) => ModalEvent::FragmentResponse {
                            ticket,
                            status: if ok { 200 } else { 404 },
                            body: "<p><button>x</button></p>".to_owned(),
                        },
                    };
                    modal.handle_event(event);
                }
            }
        }
        let host = modal.host_mut();
        let media: Vec<_> = host.drain_media().map(|m| (m.ticket, true)).collect();
        let fetches: Vec<_> = host.drain_fetches().map(|f| (f.ticket, false)).collect();
        issued.extend(media);
        issued.extend(fetches);

        let dom = modal.host();
        let wrappers = dom.query_selector_all(&dom.body(), "#modal").len();
        assert_eq!(wrappers == 1, modal.is_wrapper_created());
        assert!(wrappers <= 1);
        assert!(!modal.is_opened() || modal.is_wrapper_created());
        assert!(dom.query_selector_all(&dom.body(), ".modal-item").len() <= 1);
    }
});

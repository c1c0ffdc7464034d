#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modalkit_core::{ContentSource, ModalKind};

#[derive(Debug, Arbitrary)]
struct Input {
    kind: u8,
    source: String,
}

fuzz_target!(|input: Input| {
    let kind = ModalKind::ALL[usize::from(input.kind) % ModalKind::ALL.len()];
    let Ok(parsed) = ContentSource::parse(kind, &input.source) else {
        return;
    };
    assert_eq!(parsed.kind(), kind);
    match &parsed {
        ContentSource::YouTube { video_id } | ContentSource::Vimeo { video_id } => {
            assert!(!video_id.is_empty());
            let url = parsed.embed_url().expect("embed kinds have a url");
            assert!(url.contains(video_id.as_str()));
        }
        _ => assert!(parsed.embed_url().is_none()),
    }
});

use docchat_core::config::{expand_path, resolve_with_base};
use docchat_core::types::{Chunk, SourceRef, StreamEvent};
use std::path::Path;

#[test]
fn stream_event_wire_shape() {
    let token = StreamEvent::Token { text: "blue".to_string() };
    let json = serde_json::to_value(&token).expect("serialize");
    assert_eq!(json["type"], "token");
    assert_eq!(json["text"], "blue");

    let done: StreamEvent = serde_json::from_str(r#"{"type":"done"}"#).expect("deserialize");
    assert_eq!(done, StreamEvent::Done);

    let err = StreamEvent::Error { message: "boom".to_string() };
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["type"], "error");
}

#[test]
fn terminal_events_are_done_and_error_only() {
    assert!(StreamEvent::Done.is_terminal());
    assert!(StreamEvent::Error { message: String::new() }.is_terminal());
    assert!(!StreamEvent::Token { text: String::new() }.is_terminal());
    assert!(!StreamEvent::Sources { sources: vec![] }.is_terminal());
}

#[test]
fn source_ref_carries_chunk_identity() {
    let chunk = Chunk {
        id: 7,
        doc_id: "manual".to_string(),
        page: 3,
        content: "ignored by the reference".to_string(),
    };
    let source = SourceRef::from(&chunk);
    assert_eq!(source.chunk_id, 7);
    assert_eq!(source.doc_id, "manual");
    assert_eq!(source.page, 3);
}

#[test]
fn path_expansion_resolves_relative_against_base() {
    let base = Path::new("/srv/docchat");
    assert_eq!(resolve_with_base(base, "data/index"), base.join("data/index"));
    assert_eq!(resolve_with_base(base, "/abs/index"), Path::new("/abs/index"));
    // No env vars or tildes: passes through untouched.
    assert_eq!(expand_path("plain/path"), Path::new("plain/path"));
}

use std::path::Path;

use docchat_core::error::IndexError;
use docchat_core::types::PageChunk;
use docchat_index::FlatIndex;
use tempfile::TempDir;

fn chunk(doc_id: &str, page: u32, content: &str) -> PageChunk {
    PageChunk { doc_id: doc_id.to_string(), page, content: content.to_string() }
}

#[test]
fn empty_index_searches_to_nothing() {
    let index = FlatIndex::new();
    let hits = index.search(&[1.0, 0.0], 5).expect("search");
    assert!(hits.is_empty(), "empty index yields zero results, not an error");
}

#[test]
fn append_assigns_monotonic_ids_and_search_orders_by_similarity() {
    let mut index = FlatIndex::new();
    let ids = index
        .append(vec![
            (chunk("a", 1, "east"), vec![1.0, 0.0]),
            (chunk("a", 1, "north"), vec![0.0, 1.0]),
            (chunk("a", 2, "northeast"), vec![0.7, 0.7]),
        ])
        .expect("append");
    assert_eq!(ids, vec![0, 1, 2]);

    let hits = index.search(&[1.0, 0.1], 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.content, "east");
    assert_eq!(hits[1].chunk.content, "northeast");
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn ties_keep_insertion_order() {
    let mut index = FlatIndex::new();
    index
        .append(vec![
            (chunk("a", 1, "first"), vec![0.0, 1.0]),
            (chunk("a", 1, "second"), vec![0.0, 1.0]),
        ])
        .expect("append");
    let hits = index.search(&[0.0, 1.0], 2).expect("search");
    assert_eq!(hits[0].chunk.content, "first");
    assert_eq!(hits[1].chunk.content, "second");
}

#[test]
fn search_is_idempotent_on_an_unmodified_index() {
    let mut index = FlatIndex::new();
    index
        .append(vec![
            (chunk("a", 1, "alpha"), vec![0.9, 0.1]),
            (chunk("b", 1, "bravo"), vec![0.1, 0.9]),
        ])
        .expect("append");
    let first = index.search(&[0.5, 0.5], 2).expect("search");
    let second = index.search(&[0.5, 0.5], 2).expect("search");
    let ids_first: Vec<_> = first.iter().map(|h| h.chunk.id).collect();
    let ids_second: Vec<_> = second.iter().map(|h| h.chunk.id).collect();
    assert_eq!(ids_first, ids_second);
}

#[test]
fn save_then_load_round_trips_search_results() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("index.json");

    let mut index = FlatIndex::new();
    index
        .append(vec![
            (chunk("doc", 1, "alpha"), vec![1.0, 0.0, 0.0]),
            (chunk("doc", 2, "bravo"), vec![0.0, 1.0, 0.0]),
        ])
        .expect("append");
    index.save(&path).expect("save");

    let reloaded = FlatIndex::load(&path).expect("load");
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.dim(), Some(3));

    let query = [0.9, 0.1, 0.0];
    let before = index.search(&query, 2).expect("search");
    let after = reloaded.search(&query, 2).expect("search");
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.chunk.id, a.chunk.id);
        assert!((b.score - a.score).abs() < 1e-6);
    }
}

#[test]
fn loading_a_missing_index_signals_not_loaded() {
    let err = FlatIndex::load(Path::new("/nonexistent/docchat/index.json"))
        .expect_err("must not invent an index");
    assert!(matches!(err, IndexError::NotLoaded(_)));
}

#[test]
fn mixed_dimensions_are_rejected() {
    let mut index = FlatIndex::new();
    index.append(vec![(chunk("a", 1, "alpha"), vec![1.0, 0.0])]).expect("append");

    let err = index
        .append(vec![(chunk("b", 1, "bravo"), vec![1.0, 0.0, 0.0])])
        .expect_err("dimension mismatch must be rejected");
    assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, got: 3 }));

    let err = index.search(&[1.0], 1).expect_err("query dimension must match");
    assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, got: 1 }));
}

#[test]
fn reappending_the_same_chunk_duplicates_it() {
    // Documented limitation: no dedup on append.
    let mut index = FlatIndex::new();
    index.append(vec![(chunk("a", 1, "same text"), vec![1.0, 0.0])]).expect("append");
    index.append(vec![(chunk("a", 1, "same text"), vec![1.0, 0.0])]).expect("append");
    assert_eq!(index.len(), 2);
}

//! Similarity queries end to end.

use crate::common::*;
use quiver::{ClientConfig, Include, QueryRecords};

#[test]
fn single_query_returns_nearest_first() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("points", sample_records(10));

    let hits = client.query_one(&id, vec![4.2, 0.0], 3).wait().unwrap();
    let ids: Vec<&str> = hits.iter().map(|m| m.record.id.as_str()).collect();
    assert_eq!(ids, vec!["rec-4", "rec-5", "rec-3"]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(hits[0].record.document.as_deref(), Some("document 4"));
}

#[test]
fn batched_query_keeps_query_order() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("points", sample_records(10));

    let results = client
        .query(
            &id,
            QueryRecords {
                query_embeddings: vec![vec![9.0, 0.0], vec![0.0, 0.0]],
                n_results: 2,
                where_: None,
                where_document: None,
                include: vec![Include::Embeddings, Include::Distances],
            },
        )
        .wait()
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0][0].record.id, "rec-9");
    assert_eq!(results[1][0].record.id, "rec-0");
    assert_eq!(results[1][0].distance, Some(0.0));
    assert_eq!(results[1][0].record.embedding, Some(vec![0.0, 0.0]));
    assert_eq!(results[1][0].record.document, None);
}

#[test]
fn query_on_empty_collection_gives_empty_lists() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("void", Vec::new());
    let hits = client.query_one(&id, vec![1.0, 1.0], 5).wait().unwrap();
    assert!(hits.is_empty());
}

//! Lazy pagination over records and collections.

use crate::common::*;
use quiver::{collect_all, ClientConfig, Error, GetRecords, HttpResponse};

fn seeded(n: usize) -> (std::sync::Arc<FakeServer>, quiver::Client, String) {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("paged", sample_records(n));
    (server, client, id)
}

#[test]
fn forty_seven_records_in_pages_of_five() {
    let (server, client, id) = seeded(47);

    let first = client.get_pages(&id, GetRecords::default(), 5);
    let mut iter = first.wait().unwrap().expand();
    let ids: Vec<String> = iter.by_ref().map(|r| r.unwrap().id).collect();

    assert_eq!(ids.len(), 47);
    assert_eq!(ids[0], "rec-0");
    assert_eq!(ids[46], "rec-46");
    assert_eq!(iter.pages_loaded(), 10);
    assert_eq!(server.count_requests("/get"), 10);
}

#[test]
fn pages_are_fetched_only_on_demand() {
    let (server, client, id) = seeded(47);

    let first = client.get_pages(&id, GetRecords::default(), 5).wait().unwrap();
    assert!(first.has_more());
    assert_eq!(server.count_requests("/get"), 1);

    let taken: Vec<_> = first.expand().take(7).collect();
    assert_eq!(taken.len(), 7);
    assert_eq!(server.count_requests("/get"), 2);
}

#[test]
fn exact_multiple_costs_one_empty_fetch() {
    let (server, client, id) = seeded(10);
    let all = collect_all(&client.get_pages(&id, GetRecords::default(), 5)).unwrap();
    assert_eq!(all.len(), 10);
    assert_eq!(server.count_requests("/get"), 3);
}

#[test]
fn short_first_page_has_no_continuation() {
    let (server, client, id) = seeded(3);
    let page = client.get_pages(&id, GetRecords::default(), 5).wait().unwrap();
    assert!(!page.has_more());
    assert!(page.next_page().is_none());
    assert_eq!(page.items().len(), 3);
    assert_eq!(server.count_requests("/get"), 1);
}

#[test]
fn failing_continuation_yields_one_error_then_ends() {
    let (server, client, id) = seeded(20);
    server.inject_fault(|req| {
        let body = req.json_body()?;
        (body["offset"].as_u64() == Some(10)).then(|| HttpResponse::new(500, "shard offline"))
    });

    let results: Vec<_> = client
        .get_pages(&id, GetRecords::default(), 5)
        .wait()
        .unwrap()
        .expand()
        .collect();
    assert_eq!(results.len(), 11);
    assert!(results[..10].iter().all(Result::is_ok));
    assert!(matches!(results[10], Err(Error::Status { code: 500, .. })));
}

#[test]
fn explicit_offset_starts_mid_collection() {
    let (_server, client, id) = seeded(12);
    let rest = collect_all(&client.get(
        &id,
        GetRecords {
            offset: Some(8),
            limit: Some(3),
            ..Default::default()
        },
    ))
    .unwrap();
    let ids: Vec<&str> = rest.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["rec-8", "rec-9", "rec-10", "rec-11"]);
}

#[test]
fn list_collections_paginates() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    for i in 0..7 {
        server.seed(&format!("col-{}", i), Vec::new());
    }

    let names: Vec<String> = collect_all(&client.list_collections(Some(2)))
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names.len(), 7);
    assert_eq!(server.count_requests("/collections"), 4);
}

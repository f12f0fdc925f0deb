//! Batch ingestion through the client.

use std::collections::HashSet;
use std::time::Duration;

use crate::common::*;
use quiver::{ClientConfig, Error, HttpResponse, Method};

#[test]
fn two_hundred_records_batch_three_parallelism_five() {
    let server = FakeServer::new();
    server.set_latency(Duration::from_millis(2));
    let client = client_for(&server, ClientConfig::new().io_threads(8));
    let col = client.create_collection("bulk", None, false).wait().unwrap();

    let report = client
        .ingest(&col.id, sample_records(200), 3, 5)
        .wait()
        .unwrap();
    assert_eq!(report.batches, 67);
    assert_eq!(report.records, 200);

    let stored: HashSet<String> = server.stored_ids("bulk").into_iter().collect();
    assert_eq!(stored.len(), 200);
    assert_eq!(server.count_requests("/add"), 67);
    assert!(server.peak_in_flight() <= 5);
}

#[test]
fn failed_batch_surfaces_and_earlier_batches_stay() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let col = client.create_collection("partial", None, false).wait().unwrap();
    server.inject_fault(|req| {
        let body = req.json_body()?;
        let first = body["ids"][0].as_str()?;
        (req.method == Method::Post && first == "rec-12")
            .then(|| HttpResponse::new(507, "insufficient storage"))
    });

    let err = client
        .ingest(&col.id, sample_records(30), 4, 1)
        .wait()
        .unwrap_err();
    assert!(matches!(err, Error::Status { code: 507, .. }));

    // batches 0..3 (records 0..12) were acknowledged before the failure
    let stored = server.stored_ids("partial");
    assert_eq!(stored.len(), 12);
    assert_eq!(server.count_requests("/add"), 4);
}

#[test]
fn invalid_batch_parameters_make_no_calls() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("idle", Vec::new());

    for (batch, par) in [(0, 2), (2, 0)] {
        let err = client.ingest(&id, sample_records(5), batch, par).wait().unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
    assert_eq!(server.request_count(), 0);
}

#[test]
fn empty_ingest_resolves_immediately() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("empty", Vec::new());
    let report = client.ingest(&id, Vec::new(), 10, 2);
    assert!(report.is_resolved());
    assert_eq!(report.wait().unwrap().batches, 0);
    assert_eq!(server.request_count(), 0);
}

#[test]
fn bad_record_late_in_input_rejects_before_any_batch() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("checked", Vec::new());

    let mut records = sample_records(10);
    records[7].id = String::new();
    let err = client.ingest(&id, records, 3, 1).wait().unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));
    assert_eq!(server.request_count(), 0);
    assert!(server.stored_ids("checked").is_empty());
}

#[test]
fn mismatch_across_batches_is_caught_locally() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let id = server.seed("spread", Vec::new());

    // each record is its own batch, so only a whole-input check sees these
    let mut ragged = sample_records(10);
    ragged[5].embedding = Some(vec![5.0, 0.0, 1.0]);
    let err = client.ingest(&id, ragged, 1, 2).wait().unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));

    let mut duplicated = sample_records(10);
    duplicated[9].id = "rec-0".to_string();
    let err = client.ingest(&id, duplicated, 1, 2).wait().unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));

    assert_eq!(server.request_count(), 0);
}

//! Collection lifecycle and record CRUD.

use crate::common::*;
use quiver::{ClientConfig, DeleteRecords, EmbeddingRecord, Error, GetRecords, Include, UpdateCollection};

#[test]
fn create_get_update_delete_collection() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());

    let created = client.create_collection("papers", None, false).wait().unwrap();
    assert_eq!(created.name, "papers");

    let dup = client.create_collection("papers", None, false).wait();
    assert!(matches!(dup, Err(Error::Status { code: 409, .. })));

    let same = client.get_or_create_collection("papers", None).wait().unwrap();
    assert_eq!(same.id, created.id);

    client
        .update_collection(
            &created.id,
            UpdateCollection {
                new_name: Some("articles".into()),
                new_metadata: None,
            },
        )
        .wait()
        .unwrap();
    assert_eq!(client.get_collection("articles").wait().unwrap().id, created.id);
    assert!(matches!(
        client.get_collection("papers").wait(),
        Err(Error::Status { code: 404, .. })
    ));

    client.delete_collection("articles").wait().unwrap();
    assert_eq!(client.count_collections().wait().unwrap(), 0);
}

#[test]
fn add_upsert_update_delete_records() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let col = client.create_collection("notes", None, false).wait().unwrap();

    client.add(&col.id, sample_records(4)).wait().unwrap();
    assert_eq!(client.count(&col.id).wait().unwrap(), 4);

    client
        .upsert(
            &col.id,
            vec![
                EmbeddingRecord::new("rec-0", vec![9.0, 9.0]).with_document("replaced"),
                EmbeddingRecord::new("rec-9", vec![1.0, 1.0]),
            ],
        )
        .wait()
        .unwrap();
    assert_eq!(client.count(&col.id).wait().unwrap(), 5);

    client
        .update(
            &col.id,
            vec![EmbeddingRecord {
                id: "rec-1".into(),
                document: Some("edited".into()),
                ..Default::default()
            }],
        )
        .wait()
        .unwrap();

    let fetched = client
        .get(
            &col.id,
            GetRecords {
                ids: Some(vec!["rec-0".into(), "rec-1".into()]),
                include: vec![Include::Documents, Include::Embeddings],
                ..Default::default()
            },
        )
        .wait()
        .unwrap()
        .into_items();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].document.as_deref(), Some("replaced"));
    assert_eq!(fetched[0].embedding, Some(vec![9.0, 9.0]));
    assert_eq!(fetched[1].document.as_deref(), Some("edited"));
    assert_eq!(fetched[1].embedding, Some(vec![1.0, 0.0]));

    client
        .delete(
            &col.id,
            DeleteRecords {
                ids: Some(vec!["rec-2".into(), "rec-3".into()]),
                ..Default::default()
            },
        )
        .wait()
        .unwrap();
    assert_eq!(server.stored_ids("notes"), vec!["rec-0", "rec-1", "rec-9"]);
}

#[test]
fn records_without_documents_omit_the_column() {
    let server = FakeServer::new();
    let client = client_for(&server, ClientConfig::new());
    let col = client.create_collection("bare", None, false).wait().unwrap();
    client
        .add(
            &col.id,
            vec![
                EmbeddingRecord::new("a", vec![0.0, 1.0]),
                EmbeddingRecord::new("b", vec![1.0, 0.0]),
            ],
        )
        .wait()
        .unwrap();

    let rows = client
        .get(&col.id, GetRecords::default())
        .wait()
        .unwrap()
        .into_items();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.document.is_none() && r.metadata.is_none()));
}

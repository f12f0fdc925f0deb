//! Record operations on one collection: writes, reads, queries, ingestion.
//!
//! Collections are addressed by id (`Collection::id`).

use std::collections::HashSet;

use quiver_concurrency::{ingest, Deferred, IngestReport, Page, PageRequest};
use quiver_core::{EmbeddingRecord, Error, QueryMatch, Result};
use quiver_wire::{
    decode_ack, decode_count, decode_query, decode_records, encode_records, DeleteRecords,
    GetRecords, QueryRecords,
};

use super::{collection_endpoint, paged, to_body, Client};
use crate::transport::Method;

/// Which embeddings a write must carry.
#[derive(Clone, Copy)]
enum Embeddings {
    Required,
    Optional,
}

/// Local checks shared by add/upsert/update.
fn validate_records(records: &[EmbeddingRecord], embeddings: Embeddings) -> Result<()> {
    if records.is_empty() {
        return Err(Error::invalid_input("no records given"));
    }
    let mut seen = HashSet::with_capacity(records.len());
    let mut dimension: Option<usize> = None;
    for record in records {
        if record.id.is_empty() {
            return Err(Error::invalid_input("record id must not be empty"));
        }
        if !seen.insert(record.id.as_str()) {
            return Err(Error::invalid_input(format!(
                "duplicate record id '{}'",
                record.id
            )));
        }
        match (record.dimension(), embeddings) {
            (None, Embeddings::Required) => {
                return Err(Error::invalid_input(format!(
                    "record '{}' has no embedding",
                    record.id
                )))
            }
            (None, Embeddings::Optional) => {}
            (Some(0), _) => {
                return Err(Error::invalid_input(format!(
                    "record '{}' has an empty embedding",
                    record.id
                )))
            }
            (Some(d), _) => match dimension {
                None => dimension = Some(d),
                Some(expected) if expected != d => {
                    return Err(Error::invalid_input(format!(
                        "record '{}' has dimension {}, expected {}",
                        record.id, d, expected
                    )))
                }
                Some(_) => {}
            },
        }
    }
    Ok(())
}

impl Client {
    // =========================================================================
    // Writes
    // =========================================================================

    fn write_records(
        &self,
        collection_id: &str,
        verb: &str,
        records: &[EmbeddingRecord],
        embeddings: Embeddings,
    ) -> Deferred<()> {
        let prepared = validate_records(records, embeddings)
            .and_then(|()| collection_endpoint(collection_id, &format!("/{}", verb)))
            .and_then(|path| Ok((path, encode_records(records)?)));
        match prepared {
            Ok((path, body)) => {
                self.executor
                    .execute_as(Method::Post, &path, Vec::new(), Some(body), decode_ack)
            }
            Err(e) => Deferred::failed(e),
        }
    }

    /// Insert new records. Every record needs an embedding of one shared
    /// dimension; ids must be unique within the call.
    pub fn add(&self, collection_id: &str, records: Vec<EmbeddingRecord>) -> Deferred<()> {
        self.write_records(collection_id, "add", &records, Embeddings::Required)
    }

    /// Insert or overwrite records by id.
    pub fn upsert(&self, collection_id: &str, records: Vec<EmbeddingRecord>) -> Deferred<()> {
        self.write_records(collection_id, "upsert", &records, Embeddings::Required)
    }

    /// Change fields of existing records. Absent fields are left untouched.
    pub fn update(&self, collection_id: &str, records: Vec<EmbeddingRecord>) -> Deferred<()> {
        self.write_records(collection_id, "update", &records, Embeddings::Optional)
    }

    /// Delete records by id and/or filter.
    ///
    /// An empty request (no ids, no filters) is rejected rather than
    /// deleting everything.
    pub fn delete(&self, collection_id: &str, request: DeleteRecords) -> Deferred<()> {
        let empty = request.ids.as_ref().map_or(true, Vec::is_empty)
            && request.where_.is_none()
            && request.where_document.is_none();
        if empty {
            return Deferred::failed(Error::invalid_input(
                "delete needs ids or a filter",
            ));
        }
        let prepared = validate_filters(&request.where_, &request.where_document)
            .and_then(|()| collection_endpoint(collection_id, "/delete"))
            .and_then(|path| Ok((path, to_body(&request)?)));
        match prepared {
            Ok((path, body)) => {
                self.executor
                    .execute_as(Method::Post, &path, Vec::new(), Some(body), decode_ack)
            }
            Err(e) => Deferred::failed(e),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Number of records in the collection.
    pub fn count(&self, collection_id: &str) -> Deferred<u64> {
        match collection_endpoint(collection_id, "/count") {
            Ok(path) => {
                self.executor
                    .execute_as(Method::Get, &path, Vec::new(), None, decode_count)
            }
            Err(e) => Deferred::failed(e),
        }
    }

    /// Fetch records.
    ///
    /// When `request.limit` is set the result is paginated starting at
    /// `request.offset` (default 0): every full page carries a continuation
    /// to the next window with the same filters. Otherwise a single final
    /// page holds every match.
    pub fn get(&self, collection_id: &str, request: GetRecords) -> Deferred<Page<EmbeddingRecord>> {
        let window = request
            .limit
            .map(|limit| PageRequest::new(request.offset.unwrap_or(0), limit));
        let prepared = validate_filters(&request.where_, &request.where_document)
            .and_then(|()| collection_endpoint(collection_id, "/get"));
        let path = match prepared {
            Ok(path) => path,
            Err(e) => return Deferred::failed(e),
        };

        let executor = std::sync::Arc::clone(&self.executor);
        paged(window, move |w: Option<PageRequest>| {
            let mut body = request.clone();
            if let Some(w) = w {
                body.limit = Some(w.limit);
                body.offset = Some(w.offset);
            }
            match to_body(&body) {
                Ok(body) => executor.execute_as(
                    Method::Post,
                    &path,
                    Vec::new(),
                    Some(body),
                    decode_records,
                ),
                Err(e) => Deferred::failed(e),
            }
        })
    }

    /// [`get`](Self::get) in pages of `page_size`, starting at `request.offset`.
    pub fn get_pages(
        &self,
        collection_id: &str,
        request: GetRecords,
        page_size: usize,
    ) -> Deferred<Page<EmbeddingRecord>> {
        self.get(
            collection_id,
            GetRecords {
                limit: Some(page_size),
                ..request
            },
        )
    }

    // =========================================================================
    // Similarity search
    // =========================================================================

    /// Nearest neighbours for each query embedding; one result list per query,
    /// in query order.
    pub fn query(&self, collection_id: &str, request: QueryRecords) -> Deferred<Vec<Vec<QueryMatch>>> {
        let prepared = validate_query(&request)
            .and_then(|()| collection_endpoint(collection_id, "/query"))
            .and_then(|path| Ok((path, to_body(&request)?)));
        match prepared {
            Ok((path, body)) => {
                self.executor
                    .execute_as(Method::Post, &path, Vec::new(), Some(body), decode_query)
            }
            Err(e) => Deferred::failed(e),
        }
    }

    /// Single-embedding query with default includes and no filters.
    pub fn query_one(
        &self,
        collection_id: &str,
        embedding: Vec<f32>,
        n_results: usize,
    ) -> Deferred<Vec<QueryMatch>> {
        self.query(
            collection_id,
            QueryRecords {
                query_embeddings: vec![embedding],
                n_results,
                where_: None,
                where_document: None,
                include: quiver_core::Include::query_default(),
            },
        )
        .and_then(|mut results| {
            results
                .pop()
                .ok_or_else(|| Error::protocol("query returned no result list"))
        })
    }

    // =========================================================================
    // Bulk ingestion
    // =========================================================================

    /// Add `records` in batches of `batch_size` through `parallelism`
    /// concurrent submissions.
    ///
    /// Records are validated as a whole before any request. The deferred
    /// reports the first failed batch; batches acknowledged before it stay
    /// in the collection. See
    /// [`quiver_concurrency::ingest`] for the scheduling rules.
    pub fn ingest(
        &self,
        collection_id: &str,
        records: Vec<EmbeddingRecord>,
        batch_size: usize,
        parallelism: usize,
    ) -> Deferred<IngestReport> {
        if let Err(e) = collection_endpoint(collection_id, "/add") {
            return Deferred::failed(e);
        }
        // whole input, before the first batch
        if !records.is_empty() {
            if let Err(e) = validate_records(&records, Embeddings::Required) {
                return Deferred::failed(e);
            }
        }
        let client = self.clone();
        let collection_id = collection_id.to_string();
        ingest(records, batch_size, parallelism, move |batch: &[EmbeddingRecord]| {
            client.write_records(&collection_id, "add", batch, Embeddings::Required)
        })
    }
}

fn validate_filters(
    where_: &Option<quiver_core::Where>,
    where_document: &Option<quiver_core::WhereDocument>,
) -> Result<()> {
    if let Some(w) = where_ {
        w.validate()?;
    }
    if let Some(w) = where_document {
        w.validate()?;
    }
    Ok(())
}

fn validate_query(request: &QueryRecords) -> Result<()> {
    if request.query_embeddings.is_empty() {
        return Err(Error::invalid_input("query needs at least one embedding"));
    }
    if request.n_results == 0 {
        return Err(Error::invalid_input("n_results must be at least 1"));
    }
    let dimension = request.query_embeddings[0].len();
    if dimension == 0 {
        return Err(Error::invalid_input("query embeddings must not be empty"));
    }
    if let Some(bad) = request.query_embeddings.iter().find(|e| e.len() != dimension) {
        return Err(Error::invalid_input(format!(
            "query embeddings differ in dimension: {} and {}",
            dimension,
            bad.len()
        )));
    }
    validate_filters(&request.where_, &request.where_document)
}

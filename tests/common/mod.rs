//! Shared test utilities for workspace integration tests.
//!
//! [`FakeServer`] is an in-memory stand-in for the remote database that
//! speaks the same JSON endpoints, so `Client` can be exercised end to end
//! without a network. Import via `#[path = "../common/mod.rs"] mod common;`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use quiver::{
    to_columns, to_rows, Client, ClientConfig, EmbeddingRecord, Field, HttpRequest, HttpResponse,
    Method, Transport, TransportError, ALL_FIELDS,
};
use serde_json::{json, Map, Value as JsonValue};

// ============================================================================
// Server state
// ============================================================================

struct StoredCollection {
    id: String,
    name: String,
    metadata: Option<JsonValue>,
    records: Vec<EmbeddingRecord>,
}

impl StoredCollection {
    fn to_json(&self) -> JsonValue {
        json!({"id": self.id, "name": self.name, "metadata": self.metadata})
    }
}

#[derive(Default)]
struct State {
    collections: Vec<StoredCollection>,
    next_id: usize,
}

type FaultRule = Box<dyn Fn(&HttpRequest) -> Option<HttpResponse> + Send + Sync>;

/// In-memory vector database answering the client's REST calls.
pub struct FakeServer {
    state: Mutex<State>,
    requests: Mutex<Vec<(Method, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fault: Mutex<Option<FaultRule>>,
    latency: Mutex<Option<std::time::Duration>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            fault: Mutex::new(None),
            latency: Mutex::new(None),
        })
    }

    /// Answer with the rule's response whenever it returns one.
    pub fn inject_fault(
        &self,
        rule: impl Fn(&HttpRequest) -> Option<HttpResponse> + Send + Sync + 'static,
    ) {
        *self.fault.lock() = Some(Box::new(rule));
    }

    /// Sleep this long inside every request.
    pub fn set_latency(&self, latency: std::time::Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// `(method, path)` of every request, in arrival order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Requests whose path ends with `suffix`.
    pub fn count_requests(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(_, p)| p.ends_with(suffix))
            .count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Ids stored in the collection called `name`, in insertion order.
    pub fn stored_ids(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .collections
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.records.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Seed `name` directly, bypassing the client. Returns the collection id.
    pub fn seed(&self, name: &str, records: Vec<EmbeddingRecord>) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("col-{}", state.next_id);
        state.collections.push(StoredCollection {
            id: id.clone(),
            name: name.to_string(),
            metadata: None,
            records,
        });
        id
    }

    fn route(&self, request: &HttpRequest) -> HttpResponse {
        let path = match request.url.find("/api/v1") {
            Some(start) => &request.url[start + "/api/v1".len()..],
            None => return not_found(&request.url),
        };
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let body = request.json_body().unwrap_or(JsonValue::Null);
        let mut state = self.state.lock();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["heartbeat"]) => ok(json!({"nanosecond heartbeat": 1_000_000u64})),
            (Method::Get, ["version"]) => ok(json!("0.5.0-fake")),
            (Method::Post, ["reset"]) => {
                state.collections.clear();
                ok(json!(true))
            }
            (Method::Get, ["count_collections"]) => ok(json!(state.collections.len())),
            (Method::Get, ["collections"]) => {
                let offset = param(request, "offset").unwrap_or(0);
                let limit = param(request, "limit").unwrap_or(usize::MAX);
                let page: Vec<JsonValue> = state
                    .collections
                    .iter()
                    .skip(offset)
                    .take(limit)
                    .map(StoredCollection::to_json)
                    .collect();
                ok(json!(page))
            }
            (Method::Post, ["collections"]) => {
                let name = body["name"].as_str().unwrap_or_default().to_string();
                if let Some(existing) = state.collections.iter().find(|c| c.name == name) {
                    if body["get_or_create"].as_bool().unwrap_or(false) {
                        return ok(existing.to_json());
                    }
                    return error(409, &format!("collection {} already exists", name));
                }
                state.next_id += 1;
                let collection = StoredCollection {
                    id: format!("col-{}", state.next_id),
                    name,
                    metadata: body.get("metadata").cloned(),
                    records: Vec::new(),
                };
                let rendered = collection.to_json();
                state.collections.push(collection);
                ok(rendered)
            }
            (Method::Get, ["collections", name]) => {
                match state.collections.iter().find(|c| c.name == *name) {
                    Some(c) => ok(c.to_json()),
                    None => not_found(name),
                }
            }
            (Method::Delete, ["collections", name]) => {
                let before = state.collections.len();
                state.collections.retain(|c| c.name != *name);
                if state.collections.len() == before {
                    not_found(name)
                } else {
                    ok(JsonValue::Null)
                }
            }
            (Method::Put, ["collections", id]) => match find_mut(&mut state, id) {
                Some(c) => {
                    if let Some(name) = body["new_name"].as_str() {
                        c.name = name.to_string();
                    }
                    if let Some(metadata) = body.get("new_metadata") {
                        c.metadata = Some(metadata.clone());
                    }
                    ok(JsonValue::Null)
                }
                None => not_found(id),
            },
            (Method::Get, ["collections", id, "count"]) => match find_mut(&mut state, id) {
                Some(c) => ok(json!(c.records.len())),
                None => not_found(id),
            },
            (Method::Post, ["collections", id, verb]) => match find_mut(&mut state, id) {
                Some(c) => records_endpoint(c, verb, &body),
                None => not_found(id),
            },
            _ => not_found(path),
        }
    }
}

impl Transport for FakeServer {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request
            .url
            .find("/api/v1")
            .map(|i| request.url[i..].to_string())
            .unwrap_or_else(|| request.url.clone());
        self.requests.lock().push((request.method, path));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }

        let injected = self.fault.lock().as_ref().and_then(|rule| rule(request));
        let response = injected.unwrap_or_else(|| self.route(request));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

// ============================================================================
// Record endpoints
// ============================================================================

fn records_endpoint(c: &mut StoredCollection, verb: &str, body: &JsonValue) -> HttpResponse {
    match verb {
        "add" | "upsert" | "update" => {
            let incoming = match decode_columns(body) {
                Ok(records) => records,
                Err(reason) => return error(422, &reason),
            };
            for record in incoming {
                let existing = c.records.iter().position(|r| r.id == record.id);
                match (verb, existing) {
                    ("add", Some(_)) | ("update", None) => {}
                    ("update", Some(i)) => {
                        let r = &mut c.records[i];
                        if record.embedding.is_some() {
                            r.embedding = record.embedding;
                        }
                        if record.document.is_some() {
                            r.document = record.document;
                        }
                        if record.metadata.is_some() {
                            r.metadata = record.metadata;
                        }
                    }
                    (_, Some(i)) => c.records[i] = record,
                    (_, None) => c.records.push(record),
                }
            }
            ok(json!(true))
        }
        "delete" => {
            let ids = string_list(&body["ids"]);
            c.records.retain(|r| !ids.contains(&r.id));
            ok(JsonValue::Null)
        }
        "get" => {
            let ids = string_list(&body["ids"]);
            let offset = body["offset"].as_u64().unwrap_or(0) as usize;
            let limit = body["limit"].as_u64().map_or(usize::MAX, |l| l as usize);
            let selected: Vec<EmbeddingRecord> = c
                .records
                .iter()
                .filter(|r| ids.is_empty() || ids.contains(&r.id))
                .skip(offset)
                .take(limit)
                .cloned()
                .collect();
            let fields = included_fields(&body["include"]);
            ok(JsonValue::Object(render_columns(&selected, &fields)))
        }
        "query" => {
            let n = body["n_results"].as_u64().unwrap_or(10) as usize;
            let queries: Vec<Vec<f32>> =
                serde_json::from_value(body["query_embeddings"].clone()).unwrap_or_default();
            let fields = included_fields(&body["include"]);
            let mut per_field: BTreeMap<&str, Vec<JsonValue>> = BTreeMap::new();
            let mut distances = Vec::new();
            for q in &queries {
                let mut scored: Vec<(f32, &EmbeddingRecord)> = c
                    .records
                    .iter()
                    .filter_map(|r| r.embedding.as_ref().map(|e| (l2(q, e), r)))
                    .collect();
                scored.sort_by(|a, b| a.0.total_cmp(&b.0));
                scored.truncate(n);
                let hits: Vec<EmbeddingRecord> = scored.iter().map(|(_, r)| (*r).clone()).collect();
                let columns = render_columns(&hits, &fields);
                for field in ALL_FIELDS {
                    let name = field.wire_name();
                    per_field
                        .entry(name)
                        .or_default()
                        .push(columns.get(name).cloned().unwrap_or(JsonValue::Null));
                }
                distances.push(json!(scored.iter().map(|(d, _)| *d).collect::<Vec<_>>()));
            }
            let mut out = Map::new();
            for (name, rows) in per_field {
                out.insert(name.to_string(), JsonValue::Array(rows));
            }
            out.insert("distances".into(), JsonValue::Array(distances));
            ok(JsonValue::Object(out))
        }
        other => not_found(other),
    }
}

fn decode_columns(body: &JsonValue) -> Result<Vec<EmbeddingRecord>, String> {
    let object = body.as_object().ok_or("body must be an object")?;
    let columns = quiver_wire::columns_from_json(object).map_err(|e| e.to_string())?;
    to_rows(&columns, &ALL_FIELDS).map_err(|e| e.to_string())
}

fn render_columns(records: &[EmbeddingRecord], fields: &[Field]) -> Map<String, JsonValue> {
    let columns = to_columns(records, fields).unwrap_or_default();
    let mut out = quiver_wire::columns_to_json(&columns);
    // ids are always returned, even for an empty result
    out.entry("ids").or_insert_with(|| json!([]));
    out
}

fn included_fields(include: &JsonValue) -> Vec<Field> {
    let mut fields = vec![Field::Ids];
    fields.extend(
        string_list(include)
            .iter()
            .filter_map(|name| Field::from_wire_name(name)),
    );
    fields
}

// ============================================================================
// Helpers
// ============================================================================

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn string_list(value: &JsonValue) -> Vec<String> {
    value
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn param(request: &HttpRequest, name: &str) -> Option<usize> {
    request.query_param(name).and_then(|v| v.parse().ok())
}

fn find_mut<'a>(state: &'a mut State, id: &str) -> Option<&'a mut StoredCollection> {
    state.collections.iter_mut().find(|c| c.id == id)
}

fn ok(value: JsonValue) -> HttpResponse {
    HttpResponse::json(&value)
}

fn error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(status, json!({"error": message}).to_string())
}

fn not_found(what: &str) -> HttpResponse {
    error(404, &format!("{} not found", what))
}

// ============================================================================
// Client construction
// ============================================================================

/// A client wired to `server`.
pub fn client_for(server: &Arc<FakeServer>, config: ClientConfig) -> Client {
    let transport: Arc<dyn Transport> = Arc::clone(server) as Arc<dyn Transport>;
    Client::with_transport(config, transport).unwrap()
}

/// `n` records `rec-0..` with 2-d embeddings and a document each.
pub fn sample_records(n: usize) -> Vec<EmbeddingRecord> {
    (0..n)
        .map(|i| {
            EmbeddingRecord::new(format!("rec-{}", i), vec![i as f32, 0.0])
                .with_document(format!("document {}", i))
        })
        .collect()
}

/// Install a `tracing` subscriber once; set `RUST_LOG`-style filtering via the env.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

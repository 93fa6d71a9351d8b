//! In-memory file catalog behind the `Transport` seam.
//!
//! Mirrors the server rules the client depends on: unique uids, 24-hex
//! stable identifiers, an `ETag` per record version and `If-None-Match`
//! checked on PATCH/PUT.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use filecatalog_client::{
    CatalogClient, CatalogConfig, CatalogResult, HttpRequest, HttpResponse, Metadata, Transport,
};
use reqwest::Method;
use serde_json::{json, Value};

const FILES_PATH: &str = "/api/files";

#[derive(Debug, Clone)]
struct Record {
    doc: Metadata,
    version: u64,
}

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<String, Record>,
    next_id: u64,
    calls: Vec<(Method, String)>,
    omit_etags: bool,
    fetch_delay: Option<Duration>,
}

/// Shared handle: clones see the same records and call log.
#[derive(Debug, Clone, Default)]
pub struct FakeCatalog {
    state: Arc<Mutex<State>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh client (empty caches) talking to this catalog.
    pub fn client(&self) -> CatalogClient {
        CatalogClient::with_transport(CatalogConfig::default(), self.clone())
            .expect("failed to create client")
    }

    /// Stop sending `ETag` headers.
    pub fn omit_etags(&self, omit: bool) {
        self.state.lock().unwrap().omit_etags = omit;
    }

    /// Hold every GET /api/files/{id} for `delay` before answering.
    pub fn slow_fetches(&self, delay: Duration) {
        self.state.lock().unwrap().fetch_delay = Some(delay);
    }

    /// Bump a record's version behind the client's back.
    pub fn touch(&self, uid: &str) {
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .values_mut()
            .find(|r| r.doc.get("uid") == Some(&json!(uid)))
            .expect("no record with that uid");
        record.version += 1;
    }

    pub fn stable_id(&self, uid: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .records
            .iter()
            .find(|(_, r)| r.doc.get("uid") == Some(&json!(uid)))
            .map(|(id, _)| id.clone())
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// GET /api/files
    pub fn list_calls(&self) -> usize {
        self.count(|method, path| method == Method::GET && path == FILES_PATH)
    }

    /// GET /api/files/{id}
    pub fn fetch_calls(&self) -> usize {
        self.count(|method, path| method == Method::GET && path != FILES_PATH)
    }

    /// PATCH or PUT
    pub fn write_calls(&self) -> usize {
        self.count(|method, _| method == Method::PATCH || method == Method::PUT)
    }

    fn count(&self, pred: impl Fn(Method, &str) -> bool) -> usize {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|(method, path)| pred(method.clone(), path.as_str()))
            .count()
    }
}

impl Transport for FakeCatalog {
    fn execute(&self, request: HttpRequest) -> CatalogResult<HttpResponse> {
        let path = request.url.path().to_string();
        let delay = self.state.lock().unwrap().fetch_delay;
        if let Some(delay) = delay.filter(|_| request.method == Method::GET && path != FILES_PATH)
        {
            thread::sleep(delay);
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push((request.method.clone(), path.clone()));

        let response = if path == FILES_PATH {
            match request.method {
                Method::GET => list(&state, &request),
                Method::POST => create(&mut state, &request),
                _ => reply(405, None, json!("method not allowed")),
            }
        } else if let Some(id) = path.strip_prefix("/api/files/") {
            let id = id.to_string();
            if !is_valid_id(&id) {
                reply(400, None, json!(format!("invalid mongo_id `{}`", id)))
            } else {
                match request.method {
                    Method::GET => fetch(&state, &id),
                    Method::PATCH | Method::PUT => write(&mut state, &id, &request),
                    Method::DELETE => match state.records.remove(&id) {
                        Some(_) => HttpResponse {
                            status: 204,
                            etag: None,
                            body: String::new(),
                        },
                        None => reply(404, None, json!("file not found")),
                    },
                    _ => reply(405, None, json!("method not allowed")),
                }
            }
        } else {
            reply(404, None, json!("no such route"))
        };

        if state.omit_etags {
            return Ok(HttpResponse {
                etag: None,
                ..response
            });
        }
        Ok(response)
    }
}

fn reply(status: u16, etag: Option<String>, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        etag,
        body: body.to_string(),
    }
}

fn etag(version: u64) -> String {
    format!("\"v{}\"", version)
}

fn is_valid_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

fn links(id: &str) -> Value {
    json!({
        "self": {"href": format!("{}/{}", FILES_PATH, id)},
        "parent": {"href": FILES_PATH}
    })
}

fn render(id: &str, record: &Record) -> Value {
    let mut doc = record.doc.clone();
    doc.insert("mongo_id".to_string(), json!(id));
    doc.insert("_links".to_string(), links(id));
    Value::Object(doc)
}

fn list(state: &State, request: &HttpRequest) -> HttpResponse {
    let mut filter = None;
    let mut limit = None;
    let mut start = 0usize;

    for (key, value) in request.url.query_pairs() {
        match key.as_ref() {
            "query" => match serde_json::from_str::<Value>(&value) {
                Ok(Value::Object(map)) => filter = Some(map),
                _ => return reply(400, None, json!("invalid query")),
            },
            "limit" => match value.parse::<usize>() {
                Ok(n) => limit = Some(n),
                Err(_) => return reply(400, None, json!("invalid limit")),
            },
            "start" => match value.parse::<usize>() {
                Ok(n) => start = n,
                Err(_) => return reply(400, None, json!("invalid start")),
            },
            _ => {}
        }
    }

    let matches: Vec<(&String, &Record)> = state
        .records
        .iter()
        .filter(|(_, record)| {
            filter
                .as_ref()
                .map(|f| f.iter().all(|(k, v)| record.doc.get(k) == Some(v)))
                .unwrap_or(true)
        })
        .skip(start)
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    let summaries: Vec<Value> = matches
        .iter()
        .map(|(id, record)| json!({"mongo_id": id, "uid": record.doc["uid"]}))
        .collect();
    let files: Vec<String> = matches
        .iter()
        .map(|(id, _)| format!("{}/{}", FILES_PATH, id))
        .collect();

    reply(
        200,
        None,
        json!({
            "_links": {"self": {"href": FILES_PATH}, "parent": {"href": "/api"}},
            "_embedded": {"files": summaries},
            "files": files
        }),
    )
}

fn create(state: &mut State, request: &HttpRequest) -> HttpResponse {
    let doc = match parse_body(request) {
        Ok(doc) => doc,
        Err(response) => return response,
    };
    let Some(uid) = doc.get("uid").cloned() else {
        return reply(400, None, json!("missing uid"));
    };
    if state.records.values().any(|r| r.doc.get("uid") == Some(&uid)) {
        return reply(409, None, json!("conflict with existing file (uid already exists)"));
    }

    state.next_id += 1;
    let id = format!("{:024x}", 0x5a00_0000_u64 + state.next_id);
    state.records.insert(id.clone(), Record { doc, version: 1 });

    reply(
        201,
        None,
        json!({
            "_links": {"self": {"href": FILES_PATH}, "parent": {"href": "/api"}},
            "file": format!("{}/{}", FILES_PATH, id)
        }),
    )
}

fn fetch(state: &State, id: &str) -> HttpResponse {
    match state.records.get(id) {
        Some(record) => reply(200, Some(etag(record.version)), render(id, record)),
        None => reply(404, None, json!("file not found")),
    }
}

fn write(state: &mut State, id: &str, request: &HttpRequest) -> HttpResponse {
    let Some(current) = state.records.get(id).cloned() else {
        return reply(404, None, json!("file not found"));
    };
    if request.if_none_match.as_deref() != Some(etag(current.version).as_str()) {
        return reply(409, None, json!("etag mismatch"));
    }

    let body = match parse_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if body.contains_key("mongo_id") {
        return reply(400, None, json!("forbidden field mongo_id"));
    }
    if let Some(uid) = body.get("uid") {
        if Some(uid) != current.doc.get("uid") {
            return reply(400, None, json!("changing the uid is not allowed"));
        }
    }

    let doc = if request.method == Method::PATCH {
        let mut merged = current.doc.clone();
        merged.extend(body);
        merged
    } else {
        let mut replaced = body;
        replaced.insert("uid".to_string(), current.doc["uid"].clone());
        replaced
    };

    let record = Record {
        doc,
        version: current.version + 1,
    };
    let response = reply(200, Some(etag(record.version)), render(id, &record));
    state.records.insert(id.to_string(), record);
    response
}

fn parse_body(request: &HttpRequest) -> Result<Metadata, HttpResponse> {
    match request
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
    {
        Some(Ok(Value::Object(doc))) => Ok(doc),
        _ => Err(reply(400, None, json!("body must be a JSON object"))),
    }
}

/// Response document without the `_links` block.
pub fn without_links(mut doc: Metadata) -> Metadata {
    doc.remove("_links");
    doc
}

/// JSON object literal as a `Metadata` map.
pub fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

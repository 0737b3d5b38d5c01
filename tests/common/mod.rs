// Scripted transport: replays canned responses in order and records every
// request so tests can assert on the exact call sequence.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use v2ctl::api::{ApiClient, ApiRequest, RawResponse, Transport};
use v2ctl::Result;

#[derive(Default)]
pub struct Scripted {
    replies: RefCell<VecDeque<RawResponse>>,
    seen: RefCell<Vec<ApiRequest>>,
}

impl Scripted {
    pub fn reply(self, data: Value) -> Self {
        self.raw(200, json!({ "code": "SUCCESS", "data": data }).to_string())
    }

    pub fn fail(self, message: &str) -> Self {
        self.raw(200, json!({ "code": "FAIL", "message": message }).to_string())
    }

    pub fn raw(self, status: u16, body: String) -> Self {
        self.replies.borrow_mut().push_back(RawResponse { status, body });
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.borrow().clone()
    }

    /// `METHOD operation` for each request, in order.
    pub fn calls(&self) -> Vec<String> {
        self.seen
            .borrow()
            .iter()
            .map(|r| format!("{} {}", r.method, r.operation))
            .collect()
    }
}

impl Transport for Scripted {
    fn execute(&self, request: &ApiRequest) -> Result<RawResponse> {
        self.seen.borrow_mut().push(request.clone());
        let reply = self.replies.borrow_mut().pop_front();
        Ok(reply.unwrap_or_else(|| panic!("unexpected request {} {}", request.method, request.operation)))
    }
}

pub fn client(script: Scripted) -> ApiClient<Scripted> {
    ApiClient::new(script, Some("token".into()))
}

pub fn server(id: u64, latency: &str) -> Value {
    json!({
        "id": id,
        "_type": "subscriptionServer",
        "name": format!("node-{id}"),
        "address": format!("10.0.0.{id}:443"),
        "net": "ws",
        "pingLatency": latency,
    })
}

pub fn subscription(id: u64, status: &str, servers: Vec<Value>) -> Value {
    json!({
        "id": id,
        "_type": "subscription",
        "host": format!("sub{id}.example"),
        "status": status,
        "servers": servers,
    })
}

pub fn connected(id: u64, sub: usize, outbound: &str) -> Value {
    json!({ "id": id, "_type": "subscriptionServer", "sub": sub, "outbound": outbound })
}

pub fn snapshot(running: bool, connected: Vec<Value>, subscriptions: Vec<Value>) -> Value {
    json!({
        "running": running,
        "touch": { "connectedServer": connected, "subscriptions": subscriptions },
    })
}

pub fn latencies(pairs: &[(u64, &str)]) -> Value {
    let whiches: Vec<Value> = pairs
        .iter()
        .map(|(id, l)| json!({ "id": id, "_type": "subscriptionServer", "sub": 0, "pingLatency": l }))
        .collect();
    json!({ "whiches": whiches })
}

/// Body of the `n`th request.
pub fn body(script: &Scripted, n: usize) -> Value {
    script.requests()[n].body.clone().unwrap_or(Value::Null)
}

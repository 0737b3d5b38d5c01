// API client module: a small blocking HTTP client that talks to the local
// proxy daemon. Every response is an envelope `{code, data?, message?}`;
// it is decoded here so callers only ever see typed payloads or an `Error`.

use crate::error::{Error, Result};
use crate::model::TouchSnapshot;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:2017/api";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One call against the daemon, independent of how it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub operation: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub token: Option<String>,
}

/// Status and raw body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests somewhere. `HttpTransport` talks to the daemon; tests
/// plug in a scripted implementation.
pub trait Transport {
    fn execute(&self, request: &ApiRequest) -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("v2ctl/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpTransport {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> Result<RawResponse> {
        let url = format!("{}/{}", self.base_url, request.operation);
        let mut req = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(token) = &request.token {
            req = req.header(AUTHORIZATION, token.as_str());
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }
        let transport_err = |source| Error::Transport {
            operation: request.operation.to_string(),
            source,
        };
        let res = req.send().map_err(transport_err)?;
        let status = res.status().as_u16();
        let body = res.text().map_err(transport_err)?;
        Ok(RawResponse { status, body })
    }
}

#[derive(Deserialize)]
#[serde(tag = "code", rename_all = "UPPERCASE")]
enum Envelope {
    Success {
        #[serde(default)]
        data: Value,
    },
    Fail {
        #[serde(default)]
        message: Option<String>,
    },
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenPayload {
    token: String,
}

/// Entry of the latency request and response (`whiches`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Which {
    pub id: u64,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default)]
    pub sub: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_latency: Option<String>,
}

#[derive(Deserialize)]
struct LatencyPayload {
    #[serde(default)]
    whiches: Vec<Which>,
}

/// Typed client over a `Transport`, holding the auth token read from config.
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    token: Option<String>,
}

impl ApiClient<HttpTransport> {
    pub fn from_base_url(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        Ok(ApiClient::new(HttpTransport::new(base_url)?, token))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, token: Option<String>) -> Self {
        ApiClient { transport, token }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and unwrap its envelope into `R`.
    pub fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        operation: &'static str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<R> {
        let request = ApiRequest {
            method,
            operation,
            query,
            body,
            token: self.token.clone(),
        };
        debug!(method = %request.method, operation, "sending request");
        let raw = self.transport.execute(&request)?;
        decode(operation, raw)
    }

    /// POST /login and return the issued token.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        self.credentials("login", username, password)
    }

    /// POST /account to create the first user; the daemon answers with a token.
    pub fn create_account(&self, username: &str, password: &str) -> Result<String> {
        self.credentials("account", username, password)
    }

    fn credentials(&self, operation: &'static str, username: &str, password: &str) -> Result<String> {
        let body = serde_json::to_value(Credentials { username, password })
            .map_err(|source| Error::Encode { operation: operation.to_string(), source })?;
        let payload: TokenPayload = self.request(Method::POST, operation, vec![], Some(body))?;
        Ok(payload.token)
    }

    /// GET /touch: the full daemon state.
    pub fn touch(&self) -> Result<TouchSnapshot> {
        self.request(Method::GET, "touch", vec![], None)
    }

    pub fn version(&self) -> Result<Value> {
        self.request(Method::GET, "version", vec![], None)
    }

    pub fn outbounds(&self) -> Result<Value> {
        self.request(Method::GET, "outbounds", vec![], None)
    }

    pub fn import(&self, url: &str) -> Result<Value> {
        self.request(Method::POST, "import", vec![], Some(json!({ "url": url })))
    }

    /// Measure latency for `whiches` in one batch. Returns what the daemon
    /// reported, which may be a subset of the request.
    pub fn http_latency(&self, whiches: &[Which]) -> Result<Vec<Which>> {
        let encoded = serde_json::to_string(whiches)
            .map_err(|source| Error::Encode { operation: "httpLatency".into(), source })?;
        let payload: LatencyPayload = self.request(
            Method::GET,
            "httpLatency",
            vec![("whiches".to_string(), encoded)],
            None,
        )?;
        Ok(payload.whiches)
    }

    /// PUT /subscription to re-fetch its servers. Like the other mutating
    /// calls below, `None` means the daemon succeeded without a snapshot.
    pub fn update_subscription(&self, subscription_id: u64) -> Result<Option<TouchSnapshot>> {
        self.request(
            Method::PUT,
            "subscription",
            vec![],
            Some(json!({ "id": subscription_id, "_type": "subscription" })),
        )
    }

    /// POST /connection: attach server `id` of subscription `sub` to `outbound`.
    pub fn connect_server(&self, id: u64, kind: &str, sub: usize, outbound: &str) -> Result<Option<TouchSnapshot>> {
        self.request(
            Method::POST,
            "connection",
            vec![],
            Some(json!({ "id": id, "outbound": outbound, "sub": sub, "_type": kind })),
        )
    }

    /// DELETE /connection: detach a server from `outbound`.
    pub fn disconnect_server(&self, id: u64, kind: &str, sub: usize, outbound: &str) -> Result<Option<TouchSnapshot>> {
        self.request(
            Method::DELETE,
            "connection",
            vec![],
            Some(json!({ "id": id, "outbound": outbound, "sub": sub, "_type": kind })),
        )
    }

    /// Start the proxy engine.
    pub fn start_engine(&self) -> Result<Option<TouchSnapshot>> {
        self.request(Method::POST, "v2ray", vec![], None)
    }
}

fn decode<R: DeserializeOwned>(operation: &str, raw: RawResponse) -> Result<R> {
    if !(200..300).contains(&raw.status) {
        return Err(Error::HttpStatus {
            operation: operation.to_string(),
            status: raw.status,
        });
    }
    let decode_err = |source| Error::Decode {
        operation: operation.to_string(),
        source,
    };
    match serde_json::from_str(&raw.body).map_err(decode_err)? {
        Envelope::Success { data } => serde_json::from_value(data).map_err(decode_err),
        Envelope::Fail { message } => Err(Error::Rejected {
            operation: operation.to_string(),
            message,
        }),
    }
}

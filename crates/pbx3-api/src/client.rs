// PBX3 API HTTP client
//
// Wraps `reqwest::Client` with base/path URL joining, bearer auth read live
// from a `SessionProvider`, and the text-first decode policy. Every verb
// funnels through `send`, which is the single place a 401 turns into a
// session invalidation.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, TransportFailure};
use crate::session::{SessionProvider, SessionStore};
use crate::transport::TransportConfig;

const APPLICATION_JSON: &str = "application/json";

// ── Payload ──────────────────────────────────────────────────────────

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The body was empty.
    Empty,
    /// The body parsed as JSON.
    Json(Value),
    /// The body was not JSON; kept verbatim.
    Text(String),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Collapse into a JSON value: empty becomes `null`, text becomes a string.
    pub fn into_json(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Decode into a typed value.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, Error> {
        let value = self.into_json();
        T::deserialize(&value).map_err(|e| {
            let body = value.to_string();
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Success-path decode policy: empty is [`Payload::Empty`], JSON is parsed,
/// anything else degrades to [`Payload::Text`]. Never fails.
pub fn decode_text(text: String) -> Payload {
    if text.is_empty() {
        return Payload::Empty;
    }
    match serde_json::from_str(&text) {
        Ok(value) => Payload::Json(value),
        Err(e) => {
            trace!(error = %e, "response body is not JSON, returning raw text");
            Payload::Text(text)
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the PBX3 administration API.
///
/// Cheap to clone. Credentials are never cached: each call asks the
/// session provider for the current endpoint and token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client with fixed credentials.
    ///
    /// The credentials live in a private [`SessionStore`], so a 401 still
    /// clears them for the lifetime of this client.
    pub fn new(
        base_endpoint: impl Into<String>,
        token: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let session = SessionStore::with_credentials(base_endpoint, token).shared();
        Self::from_session(session, transport)
    }

    /// Build a client that reads credentials live from `session`.
    pub fn from_session(
        session: Arc<dyn SessionProvider>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, session))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, session: Arc<dyn SessionProvider>) -> Self {
        Self { http, session }
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    /// Resolve `path` against the current base endpoint.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        join_url(&self.session.base_endpoint(), path)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub async fn get(&self, path: &str) -> Result<Payload, Error> {
        let url = self.url(path)?;
        self.request(Method::GET, path, url, None).await
    }

    /// GET with a form-encoded query string.
    ///
    /// `query` must serialize to a JSON object or a list of `(key, value)`
    /// pairs whose values are strings, numbers, booleans, or null (skipped).
    pub async fn get_with_query<Q>(&self, path: &str, query: &Q) -> Result<Payload, Error>
    where
        Q: Serialize + ?Sized,
    {
        let pairs = query_pairs(query)?;
        let mut url = self.url(path)?;
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        self.request(Method::GET, path, url, None).await
    }

    /// POST `body` as JSON. A body that serializes to `null` (`&()`, `None`)
    /// is sent without content.
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<Payload, Error>
    where
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        let url = self.url(path)?;
        self.request(Method::POST, path, url, body).await
    }

    /// PUT `body` as JSON, with the same null-body rule as [`post`](Self::post).
    pub async fn put<B>(&self, path: &str, body: &B) -> Result<Payload, Error>
    where
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        let url = self.url(path)?;
        self.request(Method::PUT, path, url, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Payload, Error> {
        let url = self.url(path)?;
        self.request(Method::DELETE, path, url, None).await
    }

    /// GET a binary resource (recordings, greetings, backups) without decoding.
    pub async fn get_blob(&self, path: &str) -> Result<Bytes, Error> {
        let url = self.url(path)?;
        debug!("GET {url} (blob)");

        let builder = self.prepare(Method::GET, url)?;
        let resp = self.send(Method::GET, path, builder).await?;
        Ok(resp.bytes().await?)
    }

    // ── Request pipeline ─────────────────────────────────────────────

    async fn request(
        &self,
        method: Method,
        path: &str,
        url: Url,
        body: Option<Value>,
    ) -> Result<Payload, Error> {
        debug!("{method} {url}");

        let mut builder = self.prepare(method.clone(), url)?;
        if let Some(ref body) = body {
            // `json` also sets Content-Type: application/json.
            builder = builder.json(body);
        }

        let resp = self.send(method, path, builder).await?;
        let text = resp.text().await?;
        Ok(decode_text(text))
    }

    /// Attach `Accept` and, when a token is present, `Authorization`.
    fn prepare(&self, method: Method, url: Url) -> Result<RequestBuilder, Error> {
        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT, APPLICATION_JSON);

        if let Some(token) = self.session.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error::InvalidToken(e.to_string()))?;
            value.set_sensitive(true);
            builder = builder.header(AUTHORIZATION, value);
        }

        Ok(builder)
    }

    /// Send and classify. Non-success statuses become a [`TransportFailure`];
    /// a 401 first invalidates the session and requests a login redirect.
    async fn send(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let raw = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    path,
                    status = status.as_u16(),
                    error = %e,
                    "could not read error response body"
                );
                String::new()
            }
        };
        let failure = Box::new(TransportFailure::new(method, path, status, raw));

        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "request rejected with 401, clearing session");
            self.session.invalidate();
            self.session.on_login_redirect();
            return Err(Error::SessionExpired(failure));
        }

        debug!(status = status.as_u16(), "{}", failure.message);
        Err(Error::Http(failure))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_endpoint", &self.session.base_endpoint())
            .finish_non_exhaustive()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Join base and path with exactly one slash. Absolute `http(s)://` paths
/// (pagination links) pass through untouched.
fn join_url(base: &str, path: &str) -> Result<Url, Error> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(Url::parse(path)?);
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Option<Value>, Error> {
    let value = serde_json::to_value(body).map_err(Error::Encode)?;
    Ok((!value.is_null()).then_some(value))
}

/// Flatten a query mapping into string pairs, dropping nulls.
fn query_pairs<Q: Serialize + ?Sized>(query: &Q) -> Result<Vec<(String, String)>, Error> {
    let value = serde_json::to_value(query).map_err(|e| Error::InvalidQuery(e.to_string()))?;

    let entries: Vec<(String, Value)> = match value {
        Value::Null => Vec::new(),
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Array(pair) => match <[Value; 2]>::try_from(pair) {
                    Ok([Value::String(key), value]) => Ok((key, value)),
                    _ => Err(Error::InvalidQuery(
                        "expected (key, value) pairs with string keys".into(),
                    )),
                },
                other => Err(Error::InvalidQuery(format!(
                    "expected a (key, value) pair, got {other}"
                ))),
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(Error::InvalidQuery(format!(
                "expected a mapping, got {other}"
            )));
        }
    };

    entries
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some(Ok((key, s))),
            Value::Number(n) => Some(Ok((key, n.to_string()))),
            Value::Bool(b) => Some(Ok((key, b.to_string()))),
            Value::Array(_) | Value::Object(_) => Some(Err(Error::InvalidQuery(format!(
                "value for '{key}' must be a string, number, or boolean"
            )))),
        })
        .collect()
}

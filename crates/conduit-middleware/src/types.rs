//! Request and response descriptors (spec §3).

use conduit_core::key::KeyBody;
use std::collections::BTreeMap;

/// HTTP methods the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A request body, typed by shape rather than by wire representation.
#[derive(Debug, Clone)]
pub enum Body {
    Json(serde_json::Value),
    Form(BTreeMap<String, String>),
    Binary(bytes::Bytes),
}

impl Body {
    fn as_key_body(&self) -> KeyBody<'_> {
        match self {
            Body::Json(v) => KeyBody::Json(v),
            Body::Form(m) => KeyBody::Form(m),
            Body::Binary(b) => KeyBody::Binary(b),
        }
    }
}

/// How the caller wants the response body typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Structured,
    Binary,
    Text,
}

/// A response body, typed per the originating request's `ResponseType`.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Binary(bytes::Bytes),
    Text(String),
}

impl ResponseBody {
    /// Extracts a business code from a structured body's top-level `code`
    /// field, if present. Binary/text bodies never carry a business code.
    pub fn business_code(&self) -> Option<i64> {
        match self {
            ResponseBody::Json(value) => value.get("code").and_then(|c| c.as_i64()),
            _ => None,
        }
    }
}

/// Case-insensitive header storage. Header names are normalised to
/// lowercase on insert and lookup so the pipeline interoperates with both
/// "header object" and "plain mapping" representations a caller might hand
/// it.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.remove(&name.to_ascii_lowercase());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A logical request as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub params: Option<BTreeMap<String, String>>,
    pub body: Option<Body>,
    pub headers: Headers,
    pub response_type: ResponseType,
    /// The id this request was registered under in the `CancelRegistry`, if any.
    pub cancel_token_id: Option<String>,
    /// Mutated by the pipeline: how many attempts have been made so far.
    pub retry_count: usize,
    /// Mutated by the pipeline: whether a refresh has already been attempted
    /// for this request, to prevent refresh loops.
    pub refresh_attempted: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: None,
            body: None,
            headers: Headers::new(),
            response_type: ResponseType::Structured,
            cancel_token_id: None,
            retry_count: 0,
            refresh_attempted: false,
        }
    }

    /// The canonical key this request derives (spec §4.1), used by the
    /// Cache, the Coalescer and the RefreshController's de-duplication.
    pub fn key(&self) -> String {
        conduit_core::request_key(
            self.method.as_str(),
            &self.url,
            self.params.as_ref(),
            self.body.as_ref().map(Body::as_key_body),
        )
    }

    pub fn set_bearer_token(&mut self, token: &str) {
        self.headers.insert("authorization", format!("Bearer {token}"));
    }
}

/// A response as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: ResponseBody,
    pub request: RequestDescriptor,
    /// Set when this response was synthesised from the Cache rather than
    /// received from the transport.
    pub from_cache: bool,
}

impl ResponseDescriptor {
    pub fn business_code(&self) -> Option<i64> {
        self.body.business_code()
    }
}

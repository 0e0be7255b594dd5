//! Stub responses.
//!
//! # Responsibilities
//! - Describe what a matched route sends back (status, headers, body)
//! - Resolve the body lazily: fixed payload or producer invoked per call
//! - Normalize bodies into a sequence of chunks
//!
//! # Design Decisions
//! - Responses are immutable once registered; routes share them via `Arc`
//! - Fixed data wins over a producer when both are supplied
//! - Headers are merged over `Content-Type: application/json`, caller wins

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Result, StubError};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A response body: one chunk or a sequence of chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Single(Bytes),
    Chunks(Vec<Bytes>),
}

impl Payload {
    /// Flatten into the chunk sequence written to the wire.
    pub fn into_chunks(self) -> Vec<Bytes> {
        match self {
            Payload::Single(chunk) => vec![chunk],
            Payload::Chunks(chunks) => chunks,
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Single(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Single(Bytes::from(value))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Single(Bytes::from(value))
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Single(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Single(Bytes::from(value.to_string()))
    }
}

impl From<Vec<Bytes>> for Payload {
    fn from(value: Vec<Bytes>) -> Self {
        Payload::Chunks(value)
    }
}

impl From<Vec<String>> for Payload {
    fn from(value: Vec<String>) -> Self {
        Payload::Chunks(value.into_iter().map(Bytes::from).collect())
    }
}

/// Zero-argument body producer, invoked once per dispatched request.
pub type Producer = Arc<dyn Fn() -> Payload + Send + Sync>;

/// Where a response body comes from.
#[derive(Clone)]
pub enum BodySource {
    Fixed(Payload),
    Computed(Producer),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySource::Fixed(payload) => f.debug_tuple("Fixed").field(payload).finish(),
            BodySource::Computed(_) => f.write_str("Computed(<producer>)"),
        }
    }
}

/// The resolved output of a `Response`: what the listener writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<Bytes>,
}

impl Reply {
    /// Look up a header value, ignoring name case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Concatenate all chunks.
    pub fn body_bytes(&self) -> Bytes {
        self.body.concat().into()
    }
}

/// A registered stub response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<BodySource>,
}

impl Response {
    /// A response with the given status, the default headers and no body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())],
            body: None,
        }
    }

    /// `200` with a fixed body.
    pub fn ok(data: impl Into<Payload>) -> Self {
        Self::new(200).body(data)
    }

    /// `200` with a JSON body.
    pub fn json(value: serde_json::Value) -> Self {
        Self::new(200).body(value)
    }

    /// Set a fixed body. Replaces any producer.
    pub fn body(mut self, data: impl Into<Payload>) -> Self {
        self.body = Some(BodySource::Fixed(data.into()));
        self
    }

    /// Compute the body at request time. Ignored when fixed data is set.
    pub fn producer<F, P>(mut self, producer: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: Into<Payload> + 'static,
    {
        if !matches!(self.body, Some(BodySource::Fixed(_))) {
            self.body = Some(BodySource::Computed(Arc::new(move || producer().into())));
        }
        self
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(existing) => *existing = (name, value),
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Merge several headers over the current ones.
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |response, (k, v)| response.header(k, v))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header_list(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_source(&self) -> Option<&BodySource> {
        self.body.as_ref()
    }

    /// Resolve the body and produce the reply.
    ///
    /// A producer runs exactly once per call.
    pub fn call(&self) -> Result<Reply> {
        let payload = match &self.body {
            Some(BodySource::Fixed(payload)) => payload.clone(),
            Some(BodySource::Computed(producer)) => producer(),
            None => return Err(StubError::ResponseBodyMissing),
        };

        Ok(Reply {
            status: self.status,
            headers: self.headers.clone(),
            body: payload.into_chunks(),
        })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(BodySource::Fixed(_)) => write!(f, "{} (fixed)", self.status),
            Some(BodySource::Computed(_)) => write!(f, "{} (computed)", self.status),
            None => write!(f, "{} (no body)", self.status),
        }
    }
}

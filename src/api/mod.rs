//! Backend API surface
//!
//! The three endpoints the client knows about, the two ways a call can fail,
//! and the `Backend` seam the shell talks through. Response bodies are opaque
//! JSON values; nothing here knows their schema.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub use http::HttpBackend;

/// Default prefix for generated item names
pub const DEFAULT_ITEM_PREFIX: &str = "TestItem";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound call: method, path relative to the backend origin, optional JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub method: Method,
    pub path: &'static str,
    pub body: Option<Value>,
}

impl Endpoint {
    pub fn ping() -> Self {
        Self {
            method: Method::Get,
            path: "/api/ping",
            body: None,
        }
    }

    pub fn add_item(name: &str) -> Self {
        Self {
            method: Method::Post,
            path: "/api/add-item",
            body: Some(serde_json::json!({ "name": name })),
        }
    }

    pub fn get_latest_item() -> Self {
        Self {
            method: Method::Get,
            path: "/api/get-latest-item",
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Backend answered with a status outside 2xx
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    /// Network failure, or a body that is not JSON
    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn call(&self, endpoint: &Endpoint) -> Result<Value, ApiError>;
}

/// Render a response body as two-space-indented JSON
pub fn render_json(value: &Value) -> String {
    // Serializing a Value cannot fail (keys are always strings)
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Generates `<prefix>-<millis>` item names.
///
/// The numeric part is the wall clock in milliseconds, bumped forward when two
/// names are requested within the same millisecond, so names never repeat
/// inside one process.
#[derive(Debug)]
pub struct ItemNamer {
    prefix: String,
    last: AtomicU64,
}

impl ItemNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last: AtomicU64::new(0),
        }
    }

    pub fn next_name(&self) -> String {
        let now = now_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return format!("{}-{}", self.prefix, candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

impl Default for ItemNamer {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_PREFIX)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

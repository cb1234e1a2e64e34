//! JSON envelope for the admin endpoints:
//!
//! ```json
//! { "data": { ... }, "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 } }
//! ```
//!
//! `POST /ussd` replies are never wrapped; gateways read the bare
//! `{message, continuation}` object.

use std::time::Instant;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// UUID v7.
    pub request_id: String,
    /// RFC 3339.
    pub timestamp: String,
    pub response_time_ms: u64,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap `data`, timing the request from `started`.
    pub fn timed(data: T, started: Instant) -> Self {
        let request_id = uuid::Uuid::now_v7().to_string();
        Self {
            data,
            meta: ApiMeta {
                request_id,
                timestamp: chrono::Utc::now().to_rfc3339(),
                response_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            },
        }
    }
}

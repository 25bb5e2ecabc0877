//! Shared reqwest error mapping for the HTTP backends.

use std::time::Instant;

use crate::error::{truncate_body, BackendError};

/// Maps a failed `send()` into a [`BackendError`].
pub(super) fn send_error(backend: &'static str, err: reqwest::Error, started: Instant) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout {
            backend,
            elapsed: started.elapsed(),
        }
    } else {
        BackendError::Transport {
            backend,
            detail: err.to_string(),
        }
    }
}

/// Builds a [`BackendError::Status`] from a non-success response, keeping the
/// (truncated) body so the caller can see why the request was rejected.
pub(super) async fn read_error(backend: &'static str, resp: reqwest::Response) -> BackendError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(backend, status, body = %truncate_body(&body), "backend returned an error");
    BackendError::Status {
        backend,
        status,
        body: truncate_body(&body),
    }
}

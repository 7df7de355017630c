//! Ports to the REST backend and the session collaborator.

use crate::error::FetchError;
use async_trait::async_trait;

/// Raw HTTP response handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Issues GET requests against the backend.
///
/// Implementations return `Err` only for transport-level failures (connection
/// refused, TLS, body read). Non-2xx statuses come back as a response so the
/// orchestrator can classify them. Dropping the returned future must cancel the
/// request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError>;
}

/// Receives authentication failures.
///
/// The sync layer does not decide whether a 401 means logout; it reports the
/// endpoint here and treats the request as failed.
pub trait SessionObserver: Send + Sync {
    fn on_unauthorized(&self, endpoint: &str);
}

/// Observer that ignores authentication failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionObserver;

impl SessionObserver for NoopSessionObserver {
    fn on_unauthorized(&self, _endpoint: &str) {}
}

//! Application-level errors.

use mapbot_protocol::RequestError;

/// Errors surfaced by the application services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The backend request failed (transport or protocol level).
    #[error("request failed: {0}")]
    Request(#[from] RequestError),
    /// A host platform call failed.
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

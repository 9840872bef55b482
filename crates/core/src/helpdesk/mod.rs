//! Helpdesk (ticketing API) access.
//!
//! A [`HelpdeskConnector`] builds a fresh [`HelpdeskApi`] client per
//! invocation, optionally authenticating as a different identity than the
//! service account. Nothing is cached between invocations.

mod client;
mod types;

pub use client::{HttpConnector, HttpHelpdesk};
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the helpdesk.
#[derive(Debug, Error)]
pub enum HelpdeskError {
    /// Url, email or token not configured. Fatal to the invocation.
    #[error("Missing helpdesk credentials: {0}")]
    MissingCredentials(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Helpdesk request timed out")]
    Timeout,

    /// API returned a non-success status on a read.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl HelpdeskError {
    /// Whether this error means no request can succeed in this invocation.
    pub fn is_configuration(&self) -> bool {
        matches!(self, HelpdeskError::MissingCredentials(_))
    }
}

/// Request primitives against the helpdesk REST API.
///
/// Reads return parsed payloads and fail on non-success statuses. Writes
/// return the raw HTTP status so callers decide what counts as success;
/// they only fail when no response was received.
#[async_trait]
pub trait HelpdeskApi: Send + Sync {
    /// Email the requests are authored as.
    fn identity(&self) -> &str;

    /// Run a ticket search query.
    async fn search(&self, query: &str) -> Result<SearchPage, HelpdeskError>;

    /// Look up a user. `Ok(None)` when the payload carries no user.
    async fn get_user(&self, user_id: u64) -> Result<Option<HelpdeskUser>, HelpdeskError>;

    /// List the comments of a ticket, oldest first.
    async fn list_comments(&self, ticket_id: u64) -> Result<Vec<CommentEntry>, HelpdeskError>;

    /// Append a comment to a ticket (asynchronous processing).
    async fn update_ticket(
        &self,
        ticket_id: u64,
        update: &TicketUpdate,
    ) -> Result<u16, HelpdeskError>;

    /// Set the transcript of a voice call.
    async fn patch_call(&self, call_id: u64, transcript: &str) -> Result<u16, HelpdeskError>;

    /// Create a new comment on a voice call.
    async fn create_call_comment(
        &self,
        call_id: u64,
        comment: &CallComment,
    ) -> Result<u16, HelpdeskError>;
}

/// Builds per-invocation helpdesk clients.
pub trait HelpdeskConnector: Send + Sync {
    /// Build a client. `identity` overrides the service account email.
    fn connect(&self, identity: Option<&str>) -> Result<Arc<dyn HelpdeskApi>, HelpdeskError>;
}

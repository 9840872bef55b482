//! reqwest-backed helpdesk client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::HelpdeskConfig;
use crate::metrics::record_helpdesk_request;

use super::types::{CommentsEnvelope, UserEnvelope};
use super::{
    CallComment, CommentEntry, HelpdeskApi, HelpdeskConnector, HelpdeskError, HelpdeskUser,
    SearchPage, TicketUpdate,
};

/// Helpdesk REST client bound to one identity.
///
/// Authenticates with HTTP Basic `<email>/token:<token>`.
pub struct HttpHelpdesk {
    client: Client,
    base_url: String,
    identity: String,
    token: String,
}

impl std::fmt::Debug for HttpHelpdesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpHelpdesk")
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HttpHelpdesk {
    /// Create a client. `identity` overrides the configured service email.
    pub fn new(config: &HelpdeskConfig, identity: Option<&str>) -> Result<Self, HelpdeskError> {
        let base_url = non_empty(config.url.as_deref())
            .ok_or_else(|| HelpdeskError::MissingCredentials("helpdesk.url".to_string()))?;
        let identity = non_empty(identity)
            .or_else(|| non_empty(config.email.as_deref()))
            .ok_or_else(|| HelpdeskError::MissingCredentials("helpdesk.email".to_string()))?;
        let token = non_empty(config.token.as_deref())
            .ok_or_else(|| HelpdeskError::MissingCredentials("helpdesk.token".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity: identity.to_string(),
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(format!("{}/token", self.identity), Some(&self.token))
    }

    /// Send a request, recording metrics. Any HTTP status is a response.
    async fn send(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<Response, HelpdeskError> {
        let start = Instant::now();
        let result = self.authorized(builder).send().await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(response) => {
                record_helpdesk_request(operation, response.status().is_success(), elapsed);
                debug!(
                    operation = operation,
                    status = response.status().as_u16(),
                    "Helpdesk request complete"
                );
                Ok(response)
            }
            Err(e) => {
                record_helpdesk_request(operation, false, elapsed);
                if e.is_timeout() {
                    Err(HelpdeskError::Timeout)
                } else {
                    Err(HelpdeskError::Http(e))
                }
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<T, HelpdeskError> {
        let response = self.send(operation, builder).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HelpdeskError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        response.json().await.map_err(|e| {
            HelpdeskError::ParseError(format!("Failed to parse {} response: {}", operation, e))
        })
    }
}

#[async_trait]
impl HelpdeskApi for HttpHelpdesk {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn search(&self, query: &str) -> Result<SearchPage, HelpdeskError> {
        let request = self
            .client
            .get(self.endpoint("/api/v2/search.json"))
            .query(&[("query", query)]);
        self.read_json("search", request).await
    }

    async fn get_user(&self, user_id: u64) -> Result<Option<HelpdeskUser>, HelpdeskError> {
        let request = self
            .client
            .get(self.endpoint(&format!("/api/v2/users/{}.json", user_id)));
        let envelope: UserEnvelope = self.read_json("get_user", request).await?;
        Ok(envelope.user)
    }

    async fn list_comments(&self, ticket_id: u64) -> Result<Vec<CommentEntry>, HelpdeskError> {
        let request = self
            .client
            .get(self.endpoint(&format!("/api/v2/tickets/{}/comments.json", ticket_id)));
        let envelope: CommentsEnvelope = self.read_json("list_comments", request).await?;
        Ok(envelope.comments)
    }

    async fn update_ticket(
        &self,
        ticket_id: u64,
        update: &TicketUpdate,
    ) -> Result<u16, HelpdeskError> {
        let request = self
            .client
            .put(self.endpoint(&format!("/api/v2/tickets/{}.json", ticket_id)))
            .query(&[("async", "true")])
            .json(&json!({ "ticket": { "comment": update } }));
        let response = self.send("update_ticket", request).await?;
        Ok(response.status().as_u16())
    }

    async fn patch_call(&self, call_id: u64, transcript: &str) -> Result<u16, HelpdeskError> {
        let request = self
            .client
            .patch(self.endpoint(&format!("/api/v2/calls/{}", call_id)))
            .json(&json!({ "transcript": transcript }));
        let response = self.send("patch_call", request).await?;
        Ok(response.status().as_u16())
    }

    async fn create_call_comment(
        &self,
        call_id: u64,
        comment: &CallComment,
    ) -> Result<u16, HelpdeskError> {
        let request = self
            .client
            .post(self.endpoint(&format!("/api/v2/calls/{}/comments", call_id)))
            .json(comment);
        let response = self.send("create_call_comment", request).await?;
        Ok(response.status().as_u16())
    }
}

/// Connector producing [`HttpHelpdesk`] clients from configuration.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: HelpdeskConfig,
}

impl HttpConnector {
    pub fn new(config: HelpdeskConfig) -> Self {
        Self { config }
    }
}

impl HelpdeskConnector for HttpConnector {
    fn connect(&self, identity: Option<&str>) -> Result<Arc<dyn HelpdeskApi>, HelpdeskError> {
        Ok(Arc::new(HttpHelpdesk::new(&self.config, identity)?))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

//! Mock helpdesk for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::helpdesk::{
    CallComment, CommentEntry, HelpdeskApi, HelpdeskConnector, HelpdeskError, HelpdeskUser,
    SearchHit, SearchPage, TicketUpdate, VOICE_COMMENT_TYPE,
};

/// Identity used when no override is given.
pub const SERVICE_IDENTITY: &str = "service@example.com";

/// A request received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Search {
        query: String,
    },
    GetUser {
        user_id: u64,
    },
    ListComments {
        ticket_id: u64,
    },
    UpdateTicket {
        identity: String,
        ticket_id: u64,
        html_body: String,
        public: bool,
    },
    PatchCall {
        identity: String,
        call_id: u64,
        transcript: String,
    },
    CreateCallComment {
        identity: String,
        call_id: u64,
        title: String,
        call_fields: Vec<String>,
    },
}

impl RecordedRequest {
    /// Short name of the request kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordedRequest::Search { .. } => "search",
            RecordedRequest::GetUser { .. } => "get_user",
            RecordedRequest::ListComments { .. } => "list_comments",
            RecordedRequest::UpdateTicket { .. } => "update_ticket",
            RecordedRequest::PatchCall { .. } => "patch_call",
            RecordedRequest::CreateCallComment { .. } => "create_call_comment",
        }
    }
}

/// In-memory helpdesk.
///
/// Tickets are registered per contact id; a search returns the tickets of
/// every `comment:"<contactId>"` term in the query. Writes succeed with
/// 200 (ticket, call patch) and 201 (call comment) unless configured
/// otherwise.
#[derive(Debug)]
pub struct MockHelpdesk {
    tickets: Arc<RwLock<HashMap<String, SearchHit>>>,
    users: Arc<RwLock<HashMap<u64, String>>>,
    comments: Arc<RwLock<HashMap<u64, Vec<CommentEntry>>>>,
    search_failures: Arc<RwLock<HashSet<String>>>,
    /// Overrides the count of multi-term searches.
    bulk_count: Arc<RwLock<Option<u64>>>,
    ticket_update_status: Arc<RwLock<u16>>,
    fail_ticket_updates: Arc<RwLock<bool>>,
    fail_call_requests: Arc<RwLock<bool>>,
    fail_comment_listing: Arc<RwLock<bool>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl Default for MockHelpdesk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHelpdesk {
    pub fn new() -> Self {
        Self {
            tickets: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
            comments: Arc::new(RwLock::new(HashMap::new())),
            search_failures: Arc::new(RwLock::new(HashSet::new())),
            bulk_count: Arc::new(RwLock::new(None)),
            ticket_update_status: Arc::new(RwLock::new(200)),
            fail_ticket_updates: Arc::new(RwLock::new(false)),
            fail_call_requests: Arc::new(RwLock::new(false)),
            fail_comment_listing: Arc::new(RwLock::new(false)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register the ticket that mentions `contact_id`.
    pub async fn add_ticket(&self, contact_id: &str, ticket_id: u64, assignee_id: Option<u64>) {
        self.tickets.write().await.insert(
            contact_id.to_string(),
            SearchHit {
                id: ticket_id,
                assignee_id,
            },
        );
    }

    pub async fn add_user(&self, user_id: u64, email: &str) {
        self.users.write().await.insert(user_id, email.to_string());
    }

    /// Attach a voice call comment for `contact_id` to a ticket.
    pub async fn add_voice_comment(&self, ticket_id: u64, contact_id: &str, call_id: u64, title: &str) {
        self.comments
            .write()
            .await
            .entry(ticket_id)
            .or_default()
            .push(CommentEntry {
                kind: VOICE_COMMENT_TYPE.to_string(),
                data: Some(json!({
                    "external_id": contact_id,
                    "call_id": call_id,
                    "title": title,
                })),
            });
    }

    /// Make this exact query fail.
    pub async fn fail_search(&self, query: &str) {
        self.search_failures.write().await.insert(query.to_string());
    }

    pub async fn set_bulk_count(&self, count: Option<u64>) {
        *self.bulk_count.write().await = count;
    }

    pub async fn set_ticket_update_status(&self, status: u16) {
        *self.ticket_update_status.write().await = status;
    }

    /// Ticket updates fail without a response.
    pub async fn fail_ticket_updates(&self, fail: bool) {
        *self.fail_ticket_updates.write().await = fail;
    }

    /// Call patches and call comments fail without a response.
    pub async fn fail_call_requests(&self, fail: bool) {
        *self.fail_call_requests.write().await = fail;
    }

    pub async fn fail_comment_listing(&self, fail: bool) {
        *self.fail_comment_listing.write().await = fail;
    }

    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Queries of all recorded searches.
    pub async fn recorded_searches(&self) -> Vec<String> {
        self.requests
            .read()
            .await
            .iter()
            .filter_map(|r| match r {
                RecordedRequest::Search { query } => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, request: RecordedRequest) {
        self.requests.write().await.push(request);
    }

    async fn search(&self, query: &str) -> Result<SearchPage, HelpdeskError> {
        self.record(RecordedRequest::Search {
            query: query.to_string(),
        })
        .await;
        if self.search_failures.read().await.contains(query) {
            return Err(HelpdeskError::Timeout);
        }

        let terms = comment_terms(query);
        let tickets = self.tickets.read().await;
        let results: Vec<SearchHit> = terms
            .iter()
            .filter_map(|term| tickets.get(*term).cloned())
            .collect();

        let count = match *self.bulk_count.read().await {
            Some(count) if terms.len() > 1 => count,
            _ => results.len() as u64,
        };
        Ok(SearchPage { count, results })
    }

    async fn get_user(&self, user_id: u64) -> Result<Option<HelpdeskUser>, HelpdeskError> {
        self.record(RecordedRequest::GetUser { user_id }).await;
        match self.users.read().await.get(&user_id) {
            Some(email) => Ok(Some(HelpdeskUser {
                id: user_id,
                email: Some(email.clone()),
            })),
            None => Err(HelpdeskError::ApiError {
                status: 404,
                message: "RecordNotFound".to_string(),
            }),
        }
    }

    async fn list_comments(&self, ticket_id: u64) -> Result<Vec<CommentEntry>, HelpdeskError> {
        self.record(RecordedRequest::ListComments { ticket_id }).await;
        if *self.fail_comment_listing.read().await {
            return Err(HelpdeskError::ApiError {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        Ok(self
            .comments
            .read()
            .await
            .get(&ticket_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_ticket(
        &self,
        identity: &str,
        ticket_id: u64,
        update: &TicketUpdate,
    ) -> Result<u16, HelpdeskError> {
        self.record(RecordedRequest::UpdateTicket {
            identity: identity.to_string(),
            ticket_id,
            html_body: update.html_body.clone(),
            public: update.public,
        })
        .await;
        if *self.fail_ticket_updates.read().await {
            return Err(HelpdeskError::Timeout);
        }
        Ok(*self.ticket_update_status.read().await)
    }

    async fn patch_call(
        &self,
        identity: &str,
        call_id: u64,
        transcript: &str,
    ) -> Result<u16, HelpdeskError> {
        self.record(RecordedRequest::PatchCall {
            identity: identity.to_string(),
            call_id,
            transcript: transcript.to_string(),
        })
        .await;
        if *self.fail_call_requests.read().await {
            return Err(HelpdeskError::Timeout);
        }
        Ok(200)
    }

    async fn create_call_comment(
        &self,
        identity: &str,
        call_id: u64,
        comment: &CallComment,
    ) -> Result<u16, HelpdeskError> {
        self.record(RecordedRequest::CreateCallComment {
            identity: identity.to_string(),
            call_id,
            title: comment.title.clone(),
            call_fields: comment.call_fields.clone(),
        })
        .await;
        if *self.fail_call_requests.read().await {
            return Err(HelpdeskError::Timeout);
        }
        Ok(201)
    }
}

/// Contact ids of the `comment:"..."` terms of a query.
fn comment_terms(query: &str) -> Vec<&str> {
    query
        .split("comment:\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .collect()
}

/// A client bound to one identity, backed by a shared [`MockHelpdesk`].
struct MockSession {
    helpdesk: Arc<MockHelpdesk>,
    identity: String,
}

#[async_trait]
impl HelpdeskApi for MockSession {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn search(&self, query: &str) -> Result<SearchPage, HelpdeskError> {
        self.helpdesk.search(query).await
    }

    async fn get_user(&self, user_id: u64) -> Result<Option<HelpdeskUser>, HelpdeskError> {
        self.helpdesk.get_user(user_id).await
    }

    async fn list_comments(&self, ticket_id: u64) -> Result<Vec<CommentEntry>, HelpdeskError> {
        self.helpdesk.list_comments(ticket_id).await
    }

    async fn update_ticket(
        &self,
        ticket_id: u64,
        update: &TicketUpdate,
    ) -> Result<u16, HelpdeskError> {
        self.helpdesk
            .update_ticket(&self.identity, ticket_id, update)
            .await
    }

    async fn patch_call(&self, call_id: u64, transcript: &str) -> Result<u16, HelpdeskError> {
        self.helpdesk
            .patch_call(&self.identity, call_id, transcript)
            .await
    }

    async fn create_call_comment(
        &self,
        call_id: u64,
        comment: &CallComment,
    ) -> Result<u16, HelpdeskError> {
        self.helpdesk
            .create_call_comment(&self.identity, call_id, comment)
            .await
    }
}

/// Connector handing out sessions on a shared [`MockHelpdesk`].
#[derive(Debug)]
pub struct MockConnector {
    helpdesk: Arc<MockHelpdesk>,
    connect_error: AtomicBool,
}

impl MockConnector {
    pub fn new(helpdesk: Arc<MockHelpdesk>) -> Self {
        Self {
            helpdesk,
            connect_error: AtomicBool::new(false),
        }
    }

    /// Simulate missing credentials.
    pub fn set_connect_error(&self, fail: bool) {
        self.connect_error.store(fail, Ordering::SeqCst);
    }
}

impl HelpdeskConnector for MockConnector {
    fn connect(&self, identity: Option<&str>) -> Result<Arc<dyn HelpdeskApi>, HelpdeskError> {
        if self.connect_error.load(Ordering::SeqCst) {
            return Err(HelpdeskError::MissingCredentials("helpdesk.token".to_string()));
        }
        Ok(Arc::new(MockSession {
            helpdesk: Arc::clone(&self.helpdesk),
            identity: identity.unwrap_or(SERVICE_IDENTITY).to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_terms() {
        assert_eq!(
            comment_terms("type:ticket comment:\"C1\" comment:\"C2\""),
            vec!["C1", "C2"]
        );
        assert!(comment_terms("type:ticket").is_empty());
    }

    #[tokio::test]
    async fn test_session_uses_identity_override() {
        let helpdesk = Arc::new(MockHelpdesk::new());
        let connector = MockConnector::new(Arc::clone(&helpdesk));

        let service = connector.connect(None).unwrap();
        assert_eq!(service.identity(), SERVICE_IDENTITY);

        let agent = connector.connect(Some("agent@acme.com")).unwrap();
        agent
            .update_ticket(1, &TicketUpdate::private_note("x"))
            .await
            .unwrap();
        assert!(matches!(
            &helpdesk.recorded_requests().await[0],
            RecordedRequest::UpdateTicket { identity, .. } if identity == "agent@acme.com"
        ));
    }
}

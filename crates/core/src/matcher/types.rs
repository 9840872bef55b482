use serde::{Deserialize, Serialize};

/// A contact resolved to the ticket that mentions it.
///
/// Only ever built from search results; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedTicket {
    pub contact_id: String,
    pub ticket_id: u64,
    /// Email of the ticket's assignee, when one is assigned and resolvable.
    pub assignee_email: Option<String>,
}

//! Ticket matching.
//!
//! Resolves contact identifiers to the helpdesk tickets that mention them.
//! Contacts are searched in chunks sized to keep the combined query under
//! the configured length: one bulk query counts the chunk's hits, then each
//! member is resolved with its own query, concurrently. Chunks run one after
//! another.

mod types;

pub use types::MatchedTicket;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::helpdesk::{HelpdeskApi, HelpdeskConnector, HelpdeskError};
use crate::metrics::{CONTACTS_MATCHED, SEARCH_CHUNKS};

/// Characters reserved for the endpoint path and the `type:ticket` prefix.
pub const QUERY_SAFETY_MARGIN: usize = 100;

/// Estimated characters per `comment:"<contactId>"` term.
pub const TERM_LENGTH_ESTIMATE: usize = 50;

const SEARCH_PREFIX: &str = "type:ticket";

/// Number of contacts per combined query. Never less than one.
pub fn chunk_size(max_query_length: usize) -> usize {
    (max_query_length.saturating_sub(QUERY_SAFETY_MARGIN) / TERM_LENGTH_ESTIMATE).max(1)
}

/// Build the search query for a set of contacts.
pub fn build_query<S: AsRef<str>>(contact_ids: &[S]) -> String {
    contact_ids
        .iter()
        .fold(String::from(SEARCH_PREFIX), |mut query, contact_id| {
            query.push_str(" comment:\"");
            query.push_str(contact_id.as_ref());
            query.push('"');
            query
        })
}

/// Finds the tickets belonging to pending contacts.
pub struct TicketMatcher {
    connector: Arc<dyn HelpdeskConnector>,
    max_query_length: usize,
}

impl TicketMatcher {
    pub fn new(connector: Arc<dyn HelpdeskConnector>, max_query_length: usize) -> Self {
        Self {
            connector,
            max_query_length,
        }
    }

    /// Match contacts to tickets.
    ///
    /// Unmatched contacts are omitted from the result. Request failures count
    /// as "no match"; only a client that cannot be built fails the call.
    pub async fn find_tickets(
        &self,
        contact_ids: &[String],
    ) -> Result<Vec<MatchedTicket>, HelpdeskError> {
        let api = self.connector.connect(None)?;

        let mut matched = Vec::new();
        for chunk in contact_ids.chunks(chunk_size(self.max_query_length)) {
            matched.extend(match_chunk(api.as_ref(), chunk).await);
        }

        CONTACTS_MATCHED.inc_by(matched.len() as u64);
        info!(
            requested = contact_ids.len(),
            matched = matched.len(),
            "Ticket matching complete"
        );
        Ok(matched)
    }
}

/// Match one chunk of contacts.
async fn match_chunk(api: &dyn HelpdeskApi, chunk: &[String]) -> Vec<MatchedTicket> {
    let expected = if chunk.len() == 1 {
        SEARCH_CHUNKS.with_label_values(&["single"]).inc();
        1
    } else {
        match api.search(&build_query(chunk)).await {
            Ok(page) => page.count,
            Err(e) => {
                SEARCH_CHUNKS.with_label_values(&["probe_failed"]).inc();
                warn!(contacts = chunk.len(), error = %e, "Bulk ticket search failed");
                return Vec::new();
            }
        }
    };

    if expected == 0 {
        SEARCH_CHUNKS.with_label_values(&["empty"]).inc();
        debug!(contacts = chunk.len(), "No tickets mention this chunk");
        return Vec::new();
    }
    if chunk.len() > 1 {
        SEARCH_CHUNKS.with_label_values(&["probed"]).inc();
    }

    // Accepted matches are capped at the bulk count.
    let accepted = AtomicU64::new(0);
    let lookups = chunk
        .iter()
        .map(|contact_id| resolve_contact(api, contact_id, expected, &accepted));

    join_all(lookups).await.into_iter().flatten().collect()
}

/// Resolve a single contact to its first matching ticket.
async fn resolve_contact(
    api: &dyn HelpdeskApi,
    contact_id: &str,
    expected: u64,
    accepted: &AtomicU64,
) -> Option<MatchedTicket> {
    if accepted.load(Ordering::SeqCst) >= expected {
        return None;
    }

    let page = match api.search(&build_query(&[contact_id])).await {
        Ok(page) => page,
        Err(e) => {
            warn!(contact_id = contact_id, error = %e, "Ticket search failed");
            return None;
        }
    };
    let hit = page.first()?.clone();

    let claimed = accepted
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            (n < expected).then_some(n + 1)
        })
        .is_ok();
    if !claimed {
        debug!(contact_id = contact_id, "Bulk count reached, dropping match");
        return None;
    }

    let assignee_email = match hit.assignee_id {
        Some(user_id) => match api.get_user(user_id).await {
            Ok(user) => user.and_then(|u| u.email),
            Err(e) => {
                warn!(user_id = user_id, error = %e, "Assignee lookup failed");
                None
            }
        },
        None => None,
    };

    debug!(contact_id = contact_id, ticket_id = hit.id, "Matched ticket");
    Some(MatchedTicket {
        contact_id: contact_id.to_string(),
        ticket_id: hit.id,
        assignee_email,
    })
}

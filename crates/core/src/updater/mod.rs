//! Ticket updates.
//!
//! Appends the rendered analysis to a matched ticket as a private note,
//! authored as the ticket's assignee when one is known. When the ticket
//! already carries a voice call comment for the contact and transcripts are
//! routed to the voice call, the plaintext transcript goes to the call
//! instead of the note.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::comment::TicketComment;
use crate::config::TranscriptDestination;
use crate::helpdesk::{
    CallComment, ExistingVoiceComment, HelpdeskApi, HelpdeskConnector, HelpdeskError,
    TicketUpdate,
};
use crate::matcher::MatchedTicket;
use crate::metrics::{TICKET_UPDATES, VOICE_CALL_UPDATES};

/// Status the ticket update must return to count as delivered.
pub const TICKET_UPDATE_SUCCESS: u16 = 200;

/// Where the transcript ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum TranscriptPlacement {
    /// Inlined as HTML in the ticket note.
    Ticket,
    /// Sent to the voice call as plaintext.
    VoiceCall { call_id: u64 },
}

/// Statuses of every request issued for one ticket update.
///
/// `None` means no response was received. For the call steps that covers
/// both a failed request and a step skipped because `placement` is
/// [`TranscriptPlacement::Ticket`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub ticket_id: u64,
    pub placement: TranscriptPlacement,
    pub ticket_status: Option<u16>,
    pub call_patch_status: Option<u16>,
    pub voice_comment_status: Option<u16>,
}

impl UpdateReport {
    /// Whether the ticket note was accepted. The call steps do not count.
    pub fn is_success(&self) -> bool {
        self.ticket_status == Some(TICKET_UPDATE_SUCCESS)
    }
}

/// HTML body of the ticket note.
pub fn compose_note(comment: &TicketComment, placement: TranscriptPlacement) -> String {
    match placement {
        TranscriptPlacement::Ticket => format!(
            "<div>{}{}</div>",
            comment.html_summary, comment.html_transcript
        ),
        TranscriptPlacement::VoiceCall { .. } => format!("<div>{}</div>", comment.html_summary),
    }
}

/// Runs the update sequence for matched tickets.
pub struct TicketUpdater {
    connector: Arc<dyn HelpdeskConnector>,
    destination: TranscriptDestination,
}

impl TicketUpdater {
    pub fn new(connector: Arc<dyn HelpdeskConnector>, destination: TranscriptDestination) -> Self {
        Self {
            connector,
            destination,
        }
    }

    /// Update one ticket.
    ///
    /// Only a client that cannot be built is an error. Request failures are
    /// recorded in the report; check [`UpdateReport::is_success`].
    pub async fn update_ticket(
        &self,
        matched: &MatchedTicket,
        comment: &TicketComment,
    ) -> Result<UpdateReport, HelpdeskError> {
        let api = self.connector.connect(matched.assignee_email.as_deref())?;

        let voice_comment = find_voice_comment(api.as_ref(), matched).await;
        let placement = match (&voice_comment, self.destination) {
            (Some(voice), TranscriptDestination::VoiceComment) => TranscriptPlacement::VoiceCall {
                call_id: voice.call_id,
            },
            _ => TranscriptPlacement::Ticket,
        };
        debug!(
            contact_id = %matched.contact_id,
            ticket_id = matched.ticket_id,
            placement = ?placement,
            "Updating ticket"
        );

        let call_patch_status = match placement {
            TranscriptPlacement::VoiceCall { call_id } => {
                patch_call(api.as_ref(), call_id, &comment.plain_text_transcript).await
            }
            TranscriptPlacement::Ticket => None,
        };

        let update = TicketUpdate::private_note(compose_note(comment, placement));
        let ticket_status = match api.update_ticket(matched.ticket_id, &update).await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(ticket_id = matched.ticket_id, error = %e, "Ticket update failed");
                None
            }
        };

        let voice_comment_status = match (placement, &voice_comment) {
            (TranscriptPlacement::VoiceCall { call_id }, Some(voice)) => {
                create_call_comment(api.as_ref(), call_id, voice).await
            }
            _ => None,
        };

        let report = UpdateReport {
            ticket_id: matched.ticket_id,
            placement,
            ticket_status,
            call_patch_status,
            voice_comment_status,
        };

        if report.is_success() {
            TICKET_UPDATES.with_label_values(&["success"]).inc();
            info!(
                contact_id = %matched.contact_id,
                ticket_id = matched.ticket_id,
                author = api.identity(),
                "Ticket updated"
            );
        } else {
            TICKET_UPDATES.with_label_values(&["failed"]).inc();
            warn!(
                contact_id = %matched.contact_id,
                ticket_id = matched.ticket_id,
                status = ?report.ticket_status,
                "Ticket update not accepted"
            );
        }
        Ok(report)
    }
}

/// Voice call comment for the contact, if the ticket has one.
async fn find_voice_comment(
    api: &dyn HelpdeskApi,
    matched: &MatchedTicket,
) -> Option<ExistingVoiceComment> {
    match api.list_comments(matched.ticket_id).await {
        Ok(comments) => comments
            .iter()
            .find_map(|c| c.voice_comment_for(&matched.contact_id)),
        Err(e) => {
            warn!(ticket_id = matched.ticket_id, error = %e, "Listing ticket comments failed");
            None
        }
    }
}

/// `Some(status)` for any response, `None` when the request failed.
fn record_call_step(step: &str, call_id: u64, result: Result<u16, HelpdeskError>) -> Option<u16> {
    match result {
        Ok(status) => {
            let outcome = if (200..300).contains(&status) {
                "success"
            } else {
                warn!(call_id = call_id, status = status, step = step, "Voice call step rejected");
                "failed"
            };
            VOICE_CALL_UPDATES.with_label_values(&[step, outcome]).inc();
            Some(status)
        }
        Err(e) => {
            VOICE_CALL_UPDATES.with_label_values(&[step, "failed"]).inc();
            warn!(call_id = call_id, step = step, error = %e, "Voice call step failed");
            None
        }
    }
}

async fn patch_call(api: &dyn HelpdeskApi, call_id: u64, transcript: &str) -> Option<u16> {
    let result = api.patch_call(call_id, transcript).await;
    record_call_step("patch_call", call_id, result)
}

async fn create_call_comment(
    api: &dyn HelpdeskApi,
    call_id: u64,
    existing: &ExistingVoiceComment,
) -> Option<u16> {
    let result = api
        .create_call_comment(call_id, &CallComment::transcript_for(existing))
        .await;
    record_call_step("create_comment", call_id, result)
}

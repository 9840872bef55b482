//! Ticket comment content built from an analysis document.

mod render;

pub use render::render_comment;

use serde::{Deserialize, Serialize};

/// Rendered comment fragments for one contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketComment {
    /// Header, categories, sentiment and conversation statistics.
    pub html_summary: String,
    pub html_transcript: String,
    /// Transcript suitable for a voice call's transcript field.
    pub plain_text_transcript: String,
}

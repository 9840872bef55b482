//! Helpdesk API payload types.

use serde::{Deserialize, Serialize};

/// Comment type used by the telephony integration for call records.
pub const VOICE_COMMENT_TYPE: &str = "TpeVoiceComment";

/// Call fields rendered on a new voice call comment.
pub const VOICE_COMMENT_FIELDS: [&str; 4] =
    ["call_started_at", "direction", "transcript", "external_id"];

/// Search endpoint response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchPage {
    /// First hit, in the API's default ordering.
    pub fn first(&self) -> Option<&SearchHit> {
        if self.count == 0 {
            return None;
        }
        self.results.first()
    }
}

/// A single ticket search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub id: u64,
    #[serde(default)]
    pub assignee_id: Option<u64>,
}

/// A helpdesk user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelpdeskUser {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    #[serde(default)]
    pub user: Option<HelpdeskUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsEnvelope {
    #[serde(default)]
    pub comments: Vec<CommentEntry>,
}

/// A ticket comment as returned by the comment-list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Type-specific payload; present on voice comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct VoiceCommentData {
    #[serde(default)]
    external_id: Option<String>,
    call_id: u64,
    #[serde(default)]
    title: Option<String>,
}

impl CommentEntry {
    /// Interpret this comment as a voice call comment for `contact_id`.
    pub fn voice_comment_for(&self, contact_id: &str) -> Option<ExistingVoiceComment> {
        if self.kind != VOICE_COMMENT_TYPE {
            return None;
        }
        let data: VoiceCommentData = serde_json::from_value(self.data.clone()?).ok()?;
        if data.external_id.as_deref() != Some(contact_id) {
            return None;
        }
        Some(ExistingVoiceComment {
            call_id: data.call_id,
            title: data.title.unwrap_or_default(),
        })
    }
}

/// The voice call comment already attached to a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingVoiceComment {
    pub call_id: u64,
    pub title: String,
}

/// Comment appended to a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketUpdate {
    pub html_body: String,
    pub public: bool,
}

impl TicketUpdate {
    /// An internal (non-public) note.
    pub fn private_note(html_body: impl Into<String>) -> Self {
        Self {
            html_body: html_body.into(),
            public: false,
        }
    }
}

/// Comment created on a voice call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallComment {
    pub title: String,
    pub call_fields: Vec<String>,
}

impl CallComment {
    /// Transcript comment reusing the title of an existing call comment.
    pub fn transcript_for(existing: &ExistingVoiceComment) -> Self {
        Self {
            title: existing.title.clone(),
            call_fields: VOICE_COMMENT_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_page_first_respects_count() {
        let page = SearchPage {
            count: 0,
            results: vec![SearchHit {
                id: 1,
                assignee_id: None,
            }],
        };
        assert!(page.first().is_none());

        let page: SearchPage = serde_json::from_value(json!({
            "count": 2,
            "results": [
                {"id": 11, "assignee_id": 7, "result_type": "ticket"},
                {"id": 12, "assignee_id": null}
            ]
        }))
        .unwrap();
        let first = page.first().unwrap();
        assert_eq!(first.id, 11);
        assert_eq!(first.assignee_id, Some(7));
    }

    #[test]
    fn test_voice_comment_for_matching_contact() {
        let entry: CommentEntry = serde_json::from_value(json!({
            "type": "TpeVoiceComment",
            "data": {"external_id": "C1", "call_id": 900, "title": "Inbound call"}
        }))
        .unwrap();

        let voice = entry.voice_comment_for("C1").unwrap();
        assert_eq!(voice.call_id, 900);
        assert_eq!(voice.title, "Inbound call");
        assert!(entry.voice_comment_for("C2").is_none());
    }

    #[test]
    fn test_voice_comment_ignores_other_types() {
        let entry: CommentEntry = serde_json::from_value(json!({
            "type": "Comment",
            "body": "hello"
        }))
        .unwrap();
        assert!(entry.data.is_none());
        assert!(entry.voice_comment_for("C1").is_none());

        let entry: CommentEntry = serde_json::from_value(json!({
            "type": "VoiceComment",
            "data": {"external_id": "C1", "call_id": 1}
        }))
        .unwrap();
        assert!(entry.voice_comment_for("C1").is_none());
    }

    #[test]
    fn test_voice_comment_without_call_id_is_ignored() {
        let entry: CommentEntry = serde_json::from_value(json!({
            "type": "TpeVoiceComment",
            "data": {"external_id": "C1"}
        }))
        .unwrap();
        assert!(entry.voice_comment_for("C1").is_none());
    }

    #[test]
    fn test_call_comment_fields() {
        let comment = CallComment::transcript_for(&ExistingVoiceComment {
            call_id: 5,
            title: "Call".to_string(),
        });
        assert_eq!(comment.title, "Call");
        assert_eq!(
            comment.call_fields,
            vec!["call_started_at", "direction", "transcript", "external_id"]
        );
    }

    #[test]
    fn test_private_note() {
        let update = TicketUpdate::private_note("<div>x</div>");
        assert!(!update.public);
        assert_eq!(update.html_body, "<div>x</div>");
    }
}

//! Conversation-analysis document model.
//!
//! Mirrors the analytics JSON output. Every section is optional so partial
//! documents still render.

use serde::{Deserialize, Serialize};

/// A conversation-analysis document for one contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisRecord {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub conversation_characteristics: ConversationCharacteristics,
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
    #[serde(default)]
    pub categories: Categories,
    #[serde(default)]
    pub customer_metadata: CustomerMetadata,
}

impl AnalysisRecord {
    pub fn contact_id(&self) -> &str {
        &self.customer_metadata.contact_id
    }

    /// Participant id playing `role`, if present.
    pub fn participant_id(&self, role: ParticipantRole) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.participant_role == role)
            .map(|p| p.participant_id.as_str())
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .matched_categories
            .iter()
            .any(|c| c == category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Participant {
    pub participant_id: String,
    pub participant_role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Agent,
    Customer,
    #[serde(other)]
    Other,
}

/// A value split by conversation side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BySide<T> {
    #[serde(rename = "AGENT", default)]
    pub agent: Option<T>,
    #[serde(rename = "CUSTOMER", default)]
    pub customer: Option<T>,
}

impl<T> BySide<T> {
    pub fn get(&self, role: ParticipantRole) -> Option<&T> {
        match role {
            ParticipantRole::Agent => self.agent.as_ref(),
            ParticipantRole::Customer => self.customer.as_ref(),
            ParticipantRole::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ConversationCharacteristics {
    #[serde(default)]
    pub sentiment: SentimentSummary,
    #[serde(default)]
    pub non_talk_time: TimeTotal,
    #[serde(default)]
    pub talk_time: TalkTime,
    #[serde(default)]
    pub interruptions: Interruptions,
    #[serde(default)]
    pub talk_speed: TalkSpeed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SentimentSummary {
    #[serde(default)]
    pub overall_sentiment: BySide<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TimeTotal {
    #[serde(default)]
    pub total_time_millis: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TalkTime {
    #[serde(default)]
    pub details_by_participant: BySide<TimeTotal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Interruptions {
    #[serde(default)]
    pub interruptions_by_interrupter: BySide<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TalkSpeed {
    #[serde(default)]
    pub details_by_participant: BySide<WordsPerMinute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct WordsPerMinute {
    #[serde(default)]
    pub average_words_per_minute: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptTurn {
    pub participant_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_sentiment")]
    pub sentiment: TurnSentiment,
    #[serde(default)]
    pub begin_offset_millis: u64,
}

fn default_sentiment() -> TurnSentiment {
    TurnSentiment::Neutral
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnSentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Categories {
    #[serde(default)]
    pub matched_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerMetadata {
    #[serde(default)]
    pub contact_id: String,
}

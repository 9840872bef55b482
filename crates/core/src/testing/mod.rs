//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the reconciler, so the whole pipeline
//! can be exercised without a helpdesk, object store or database.
//!
//! # Example
//!
//! ```rust,ignore
//! use lensdesk_core::testing::{MockConnector, MockHelpdesk};
//!
//! let helpdesk = Arc::new(MockHelpdesk::new());
//! helpdesk.add_ticket("C1", 101, Some(7)).await;
//! helpdesk.add_user(7, "agent@acme.com").await;
//!
//! let connector = Arc::new(MockConnector::new(Arc::clone(&helpdesk)));
//! // hand the connector to a TicketMatcher or Reconciler...
//! ```

mod mock_analysis_source;
mod mock_helpdesk;
mod mock_retry_store;

pub use mock_analysis_source::MockAnalysisSource;
pub use mock_helpdesk::{MockConnector, MockHelpdesk, RecordedRequest, SERVICE_IDENTITY};
pub use mock_retry_store::{MockRetryStore, RecordedStoreOp};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    use crate::analysis::{
        AnalysisRecord, BySide, Categories, ConversationCharacteristics, CustomerMetadata,
        Interruptions, Participant, ParticipantRole, SentimentSummary, TalkSpeed, TalkTime,
        TimeTotal, TranscriptTurn, TurnSentiment, WordsPerMinute,
    };

    fn turn(participant: &str, content: &str, sentiment: TurnSentiment, offset: u64) -> TranscriptTurn {
        TranscriptTurn {
            participant_id: participant.to_string(),
            content: content.to_string(),
            sentiment,
            begin_offset_millis: offset,
        }
    }

    /// A two-party call analysis.
    ///
    /// Agent `a-1` speaks 6s and is positive overall, customer `c-1` speaks
    /// 3s and is negative, with 1s of silence and one agent interruption.
    pub fn analysis_record(contact_id: &str, categories: &[&str]) -> AnalysisRecord {
        AnalysisRecord {
            participants: vec![
                Participant {
                    participant_id: "a-1".to_string(),
                    participant_role: ParticipantRole::Agent,
                },
                Participant {
                    participant_id: "c-1".to_string(),
                    participant_role: ParticipantRole::Customer,
                },
            ],
            conversation_characteristics: ConversationCharacteristics {
                sentiment: SentimentSummary {
                    overall_sentiment: BySide {
                        agent: Some(2.5),
                        customer: Some(-2.0),
                    },
                },
                non_talk_time: TimeTotal {
                    total_time_millis: 1000,
                },
                talk_time: TalkTime {
                    details_by_participant: BySide {
                        agent: Some(TimeTotal {
                            total_time_millis: 6000,
                        }),
                        customer: Some(TimeTotal {
                            total_time_millis: 3000,
                        }),
                    },
                },
                interruptions: Interruptions {
                    interruptions_by_interrupter: BySide {
                        agent: Some(vec![json!({"BeginOffsetMillis": 1200, "DurationMillis": 300})]),
                        customer: None,
                    },
                },
                talk_speed: TalkSpeed {
                    details_by_participant: BySide {
                        agent: Some(WordsPerMinute {
                            average_words_per_minute: Some(150),
                        }),
                        customer: None,
                    },
                },
            },
            transcript: vec![
                turn("a-1", "Hello, how can I help?", TurnSentiment::Positive, 0),
                turn("c-1", "My bill is wrong & late", TurnSentiment::Negative, 4000),
                turn("a-1", "Let me check that for you.", TurnSentiment::Neutral, 9000),
                turn("c-1", "Okay, thanks.", TurnSentiment::Mixed, 15000),
            ],
            categories: Categories {
                matched_categories: categories.iter().map(|c| c.to_string()).collect(),
            },
            customer_metadata: CustomerMetadata {
                contact_id: contact_id.to_string(),
            },
        }
    }

    /// Storage notification for a new analysis document.
    pub fn object_created_event(key: &str) -> serde_json::Value {
        json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {"object": {"key": key}}
            }]
        })
    }

    /// Scheduler trigger.
    pub fn scheduled_event() -> serde_json::Value {
        json!({
            "source": "aws.events",
            "detail-type": "Scheduled Event",
            "detail": {}
        })
    }
}

//! HTML and plaintext rendering of analysis documents.

use std::fmt::Write;

use crate::analysis::{AnalysisRecord, ParticipantRole, TurnSentiment};
use crate::config::RenderConfig;

use super::TicketComment;

/// Overall sentiment scores above this are labelled positive.
const POSITIVE_THRESHOLD: f64 = 1.5;
/// Overall sentiment scores below this are labelled negative.
const NEGATIVE_THRESHOLD: f64 = -1.5;

const HEADER: &str = "<div class=\"contact-lens-header\">Conversation analysis</div>";

#[derive(Debug, Clone, Copy)]
enum Side {
    Agent,
    Customer,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Agent => "Agent",
            Side::Customer => "Customer",
        }
    }

    fn role(self) -> ParticipantRole {
        match self {
            Side::Agent => ParticipantRole::Agent,
            Side::Customer => ParticipantRole::Customer,
        }
    }
}

/// Render the ticket comment fragments for an analysis document.
pub fn render_comment(analysis: &AnalysisRecord, options: &RenderConfig) -> TicketComment {
    let contact_note = format!(
        "<div><strong>Contact ID: </strong>{}</div>",
        escape_html(analysis.contact_id())
    );

    let categories = &analysis.categories.matched_categories;
    let categories_section = if categories.is_empty() {
        String::new()
    } else {
        let tags: String = categories
            .iter()
            .map(|c| format!("<div class=\"lens-cat\">{}</div>", escape_html(c)))
            .collect();
        format!("{}<div>{}</div>", section_title("Categories"), tags)
    };

    let sentiment_section = format!(
        "{}<div style=\"float:left; width: 50%\">{}</div><div>{}</div>\
         <div style=\"margin-top: 8px; font-style: italic;\">For a more detailed sentiment analysis, view the {}</div>",
        section_title("Overall sentiment analysis"),
        overall_sentiment(analysis, Side::Agent),
        overall_sentiment(analysis, Side::Customer),
        contact_record_link(analysis, options),
    );

    let conversation_section = format!(
        "{}<div style=\"float:left; width: 50%;\">{}</div><div>{}</div>\
         <div style=\"margin-bottom: 10px;\">&nbsp;</div>",
        section_title("Conversation characteristics"),
        conversation_characteristics(analysis, Side::Agent),
        conversation_characteristics(analysis, Side::Customer),
    );

    let transcript_section = format!(
        "<div class=\"contact-lens-section-title\" style=\"margin-top: 6px;\">Transcript</div>{}",
        html_transcript(analysis)
    );

    TicketComment {
        html_summary: format!(
            "{}{}",
            HEADER,
            wrap_in_box(&format!(
                "{}{}{}{}",
                contact_note, categories_section, sentiment_section, conversation_section
            ))
        ),
        html_transcript: wrap_in_box(&transcript_section),
        plain_text_transcript: plain_text_transcript(analysis),
    }
}

fn wrap_in_box(contents: &str) -> String {
    format!("<div class=\"contact-lens-box\">{}</div>", contents)
}

fn section_title(title: &str) -> String {
    format!("<div class=\"contact-lens-section-title\">{}</div>", title)
}

/// Percentage of `share` in `total`, rounded half up. Zero when `total` is zero.
fn percent(share: u64, total: u64) -> i64 {
    if total == 0 {
        return 0;
    }
    (share as f64 / total as f64 * 100.0).round() as i64
}

fn sentiment_label(score: f64) -> &'static str {
    if score > POSITIVE_THRESHOLD {
        "Positive"
    } else if score < NEGATIVE_THRESHOLD {
        "Negative"
    } else {
        "Neutral"
    }
}

fn overall_sentiment(analysis: &AnalysisRecord, side: Side) -> String {
    let score = analysis
        .conversation_characteristics
        .sentiment
        .overall_sentiment
        .get(side.role())
        .copied()
        .unwrap_or(0.0);

    let participant = analysis.participant_id(side.role());
    let turns: Vec<TurnSentiment> = analysis
        .transcript
        .iter()
        .filter(|turn| Some(turn.participant_id.as_str()) == participant)
        .map(|turn| turn.sentiment)
        .collect();
    let rate = |label: TurnSentiment| {
        percent(
            turns.iter().filter(|s| **s == label).count() as u64,
            turns.len() as u64,
        )
    };

    let positive = rate(TurnSentiment::Positive);
    let negative = rate(TurnSentiment::Negative);
    let neutral = rate(TurnSentiment::Neutral);
    let mixed = if turns.is_empty() {
        0
    } else {
        (100 - (positive + negative + neutral)).max(0)
    };

    format!(
        "<p><strong>{}</strong> overall sentiment: {}</p><p>Positive: {}%</p>\
         <p>Negative: {}%</p><p>Neutral: {}%</p><p>Mixed: {}%</p>",
        side.label(),
        sentiment_label(score),
        positive,
        negative,
        neutral,
        mixed
    )
}

fn contact_record_link(analysis: &AnalysisRecord, options: &RenderConfig) -> String {
    let Some(instance) = options
        .connect_instance_url
        .as_deref()
        .filter(|u| !u.is_empty())
    else {
        return "related contact trace record".to_string();
    };

    let mut url = instance.to_string();
    if url.ends_with(".awsapps.com") {
        url.push_str("/connect");
    }
    let _ = write!(
        url,
        "/contact-trace-records/details/{}",
        urlencoding::encode(analysis.contact_id())
    );
    if let Some(tz) = options.time_zone.as_deref().filter(|tz| !tz.is_empty()) {
        let _ = write!(url, "?tz={}", urlencoding::encode(tz));
    }

    format!(
        "<a href=\"{}\" rel=\"noreferer\" target=\"_blank\">contact trace record</a>",
        url
    )
}

fn conversation_characteristics(analysis: &AnalysisRecord, side: Side) -> String {
    let chars = &analysis.conversation_characteristics;
    let talk_millis = |role| {
        chars
            .talk_time
            .details_by_participant
            .get(role)
            .map(|t| t.total_time_millis)
            .unwrap_or(0)
    };
    let agent_talk = talk_millis(ParticipantRole::Agent);
    let customer_talk = talk_millis(ParticipantRole::Customer);
    let total = chars.non_talk_time.total_time_millis + agent_talk + customer_talk;

    let talk_rate = match side {
        Side::Agent => percent(agent_talk, total),
        Side::Customer => percent(customer_talk, total),
    };
    let interruptions = chars
        .interruptions
        .interruptions_by_interrupter
        .get(side.role())
        .map(Vec::len)
        .unwrap_or(0);
    let talk_speed = chars
        .talk_speed
        .details_by_participant
        .get(side.role())
        .and_then(|s| s.average_words_per_minute)
        .filter(|wpm| *wpm > 0)
        .map(|wpm| wpm.to_string())
        .unwrap_or_else(|| "n/a".to_string());

    let label = side.label();
    let mut html = format!(
        "<p>{label} interruptions: {interruptions}</p>\
         <p>{label} talk speed: {talk_speed} words/min</p>\
         <p>{label} talk time: {talk_rate}%</p>"
    );
    if let Side::Agent = side {
        let customer_rate = percent(customer_talk, total);
        let non_talk = if total == 0 {
            0
        } else {
            100 - (talk_rate + customer_rate)
        };
        let _ = write!(html, "<p>Non-talk time: {}%</p>", non_talk);
    }
    html
}

/// `mm:ss` offset of a transcript turn.
fn time_mark(offset_millis: u64) -> String {
    let secs = offset_millis / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn html_icon(sentiment: TurnSentiment) -> &'static str {
    match sentiment {
        TurnSentiment::Positive => "&#x1F600;",
        TurnSentiment::Neutral => "&#x1F610;",
        TurnSentiment::Mixed => "&#x1F615;",
        TurnSentiment::Negative => "&#x1F620;",
    }
}

fn emoji(sentiment: TurnSentiment) -> &'static str {
    match sentiment {
        TurnSentiment::Positive => "\u{1F600}",
        TurnSentiment::Neutral => "\u{1F610}",
        TurnSentiment::Mixed => "\u{1F615}",
        TurnSentiment::Negative => "\u{1F620}",
    }
}

/// Role label per turn; anyone who is not the agent speaks as the customer.
fn turn_role(analysis: &AnalysisRecord, participant_id: &str) -> &'static str {
    match analysis.participant_id(ParticipantRole::Agent) {
        Some(agent) if agent == participant_id => "agent",
        _ => "customer",
    }
}

fn html_transcript(analysis: &AnalysisRecord) -> String {
    let mut html = String::new();
    for turn in &analysis.transcript {
        let role = turn_role(analysis, &turn.participant_id);
        let smiley = format!(
            "<div class=\"sentiment-icon sentiment-icon-{}\" style=\"background-color: #fafafa;\">{}</div>",
            role,
            html_icon(turn.sentiment)
        );
        let bubble = format!(
            "<div class=\"turn-bubble\">{}</div>",
            escape_html(&turn.content)
        );
        let body = if role == "agent" {
            format!("{}{}", smiley, bubble)
        } else {
            format!("{}{}", bubble, smiley)
        };
        let _ = write!(
            html,
            "<div class=\"{role}-time\">{} &#183; {}</div><div class=\"{role}-turn\">{}</div>",
            role.to_uppercase(),
            time_mark(turn.begin_offset_millis),
            body
        );
    }
    html
}

fn plain_text_transcript(analysis: &AnalysisRecord) -> String {
    let mut text = String::new();
    for turn in &analysis.transcript {
        let _ = write!(
            text,
            "\n[{}] {} {}: {}",
            time_mark(turn.begin_offset_millis),
            emoji(turn.sentiment),
            turn_role(analysis, &turn.participant_id),
            turn.content
        );
    }
    text
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

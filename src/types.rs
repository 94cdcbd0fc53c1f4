//! Shared types for the reply-decision engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

// ── Inbound message ─────────────────────────────────────────────────

/// A guest message as handed to the engine by the inbound shell
/// (webhook or poller). Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID (channel-native or generated).
    pub id: Uuid,
    /// Conversation this message belongs to.
    pub conversation_id: String,
    /// Guest identifier (platform handle, email, phone).
    pub guest_id: String,
    /// Message body.
    pub text: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
    /// Source channel: "airbnb", "vrbo", "direct", "email", etc.
    pub channel: String,
}

impl Message {
    /// Build a message received now, with a generated ID.
    pub fn new(
        conversation_id: impl Into<String>,
        guest_id: impl Into<String>,
        text: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.into(),
            guest_id: guest_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
            channel: channel.into(),
        }
    }
}

// ── Intent ──────────────────────────────────────────────────────────

/// Closed intent category for a guest message. Exactly one per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    BookingInquiry,
    CheckinQuestion,
    CheckoutQuestion,
    EarlyCheckin,
    LateCheckout,
    ExtendStay,
    AmenityQuestion,
    LocalRecommendation,
    DepositQuestion,
    IssueReport,
    Unknown,
}

impl Intent {
    /// Short label for logging and audit records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BookingInquiry => "booking_inquiry",
            Self::CheckinQuestion => "checkin_question",
            Self::CheckoutQuestion => "checkout_question",
            Self::EarlyCheckin => "early_checkin",
            Self::LateCheckout => "late_checkout",
            Self::ExtendStay => "extend_stay",
            Self::AmenityQuestion => "amenity_question",
            Self::LocalRecommendation => "local_recommendation",
            Self::DepositQuestion => "deposit_question",
            Self::IssueReport => "issue_report",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Reply record ────────────────────────────────────────────────────

/// How the reply text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyDisposition {
    /// A rule matched and every placeholder resolved.
    Rendered,
    /// A rule matched but a variable was missing — the template's own
    /// fallback body was used.
    TemplateFallback,
    /// No rule matched — the process-wide default fallback body was used.
    DefaultFallback,
}

impl ReplyDisposition {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::TemplateFallback => "template_fallback",
            Self::DefaultFallback => "default_fallback",
        }
    }
}

/// Audit record for one decided reply. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub conversation_id: String,
    pub message_id: Uuid,
    pub intent: Intent,
    /// Matched template id, or `"fallback"` when no rule matched.
    pub template_id: String,
    pub rendered_text: String,
    pub disposition: ReplyDisposition,
    pub timestamp: DateTime<Utc>,
}

/// Result of `decide_reply`: the record is always present; a failed memory
/// write is reported separately so the host can retry the write or send
/// the reply anyway.
#[derive(Debug)]
pub struct ReplyOutcome {
    pub record: ReplyRecord,
    pub storage: std::result::Result<(), StorageError>,
}

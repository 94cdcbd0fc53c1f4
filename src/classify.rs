//! Deterministic intent classification.
//!
//! Evaluates the template set's ordered intent rules; the first rule whose
//! conditions all hold wins. No rule → `Unknown`. Never fails: empty or
//! whitespace-only text is `Unknown` by definition.

use tracing::debug;

use crate::memory::ConversationMemory;
use crate::templates::TemplateSet;
use crate::types::{Intent, Message};

/// Classify a message given the conversation's memory snapshot.
///
/// Deterministic: a fixed rule set and fixed (text, memory) always yield the
/// same intent.
pub fn classify(set: &TemplateSet, message: &Message, memory: &ConversationMemory) -> Intent {
    let text = message.text.trim();
    if text.is_empty() {
        return Intent::Unknown;
    }

    for (i, rule) in set.intent_rules.iter().enumerate() {
        if rule.matches(text, memory) {
            debug!(
                rule = i,
                intent = %rule.intent,
                "Intent rule matched"
            );
            return rule.intent;
        }
    }

    Intent::Unknown
}

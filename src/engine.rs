//! Reply assembler — orchestrates classify → select → render, applies the
//! fallback policy, updates conversation memory, and returns the audit
//! record.
//!
//! The flow is straight-line with two decision branches (match / render).
//! There are no retries or loops here: retry/backoff belongs to the outbound
//! sender. Given the same message and the same starting memory snapshot the
//! decision output is stable; only the memory write is a side effect.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::classify;
use crate::config::EngineConfig;
use crate::error::{ConfigError, RenderError};
use crate::matcher;
use crate::memory::{ConversationMemory, MemoryMutation, MemoryStore, ReplyLogEntry};
use crate::places::{self, PlaceResolver};
use crate::render::{self, RenderContext};
use crate::templates::{TemplateSet, TemplateStore};
use crate::types::{Intent, Message, ReplyDisposition, ReplyOutcome, ReplyRecord};

/// Template id recorded when no rule matched.
const FALLBACK_ID: &str = "fallback";

/// The reply-decision engine.
///
/// Shareable across tasks: decisions read an immutable template snapshot,
/// and the memory store serializes per-conversation writes internally.
pub struct ReplyEngine {
    templates: TemplateStore,
    memory: Arc<dyn MemoryStore>,
    places: Option<Arc<dyn PlaceResolver>>,
    config: EngineConfig,
}

impl ReplyEngine {
    pub fn new(set: TemplateSet, memory: Arc<dyn MemoryStore>, config: EngineConfig) -> Self {
        Self {
            templates: TemplateStore::new(set),
            memory,
            places: None,
            config,
        }
    }

    /// Attach a place resolver for `{{nearby_place}}`-style bindings.
    pub fn with_places(mut self, places: Arc<dyn PlaceResolver>) -> Self {
        self.places = Some(places);
        self
    }

    /// Validate and atomically activate a new template definition. On error
    /// the running set stays active and in-flight decisions are untouched.
    pub fn reload_templates(&self, json: &str) -> Result<(), ConfigError> {
        self.templates.reload_json(json)
    }

    /// Decide the automated reply for one inbound guest message.
    ///
    /// Always produces a record — the fallback path guarantees text even
    /// when classification, matching, and rendering all come up empty. A
    /// failed memory write is reported in `ReplyOutcome::storage` without
    /// suppressing the record.
    pub async fn decide_reply(&self, message: Message) -> ReplyOutcome {
        let set = self.templates.snapshot();

        // Read memory before classification; a read failure degrades to a
        // fresh conversation rather than losing the reply.
        let memory = match self.memory.get(&message.conversation_id).await {
            Ok(memory) => memory,
            Err(e) => {
                warn!(
                    conversation_id = %message.conversation_id,
                    error = %e,
                    "Memory read failed; proceeding with fresh memory"
                );
                ConversationMemory::fresh(&message.conversation_id)
            }
        };

        let intent = classify::classify(&set, &message, &memory);
        let extracted = extract_bindings(&message.text);
        let ctx = self.build_context(&message, &memory, &extracted, intent);

        let choice = matcher::select(&set, intent, &message, &memory);
        let rule_index = choice.as_ref().map(|c| c.rule.index);

        let (template_id, rendered_text, disposition) =
            match choice {
                Some(choice) => match render::render(choice.template, &ctx) {
                    Ok(text) => (
                        choice.template.id.clone(),
                        text,
                        ReplyDisposition::Rendered,
                    ),
                    Err(RenderError::MissingVariable(name)) => {
                        debug!(
                            template_id = %choice.template.id,
                            missing = %name,
                            "Variable unresolved; using template fallback body"
                        );
                        (
                            choice.template.id.clone(),
                            choice.template.fallback.clone(),
                            ReplyDisposition::TemplateFallback,
                        )
                    }
                },
                None => (
                    FALLBACK_ID.to_string(),
                    self.config.default_fallback.clone(),
                    ReplyDisposition::DefaultFallback,
                ),
            };

        let record = ReplyRecord {
            conversation_id: message.conversation_id.clone(),
            message_id: message.id,
            intent,
            template_id: template_id.clone(),
            rendered_text,
            disposition,
            timestamp: Utc::now(),
        };

        let mutation = MemoryMutation {
            intent: Some(intent),
            bindings: extracted,
            reply: Some(ReplyLogEntry {
                template_id,
                timestamp: record.timestamp,
            }),
        };
        let storage = match self.memory.update(&message.conversation_id, mutation).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(
                    conversation_id = %message.conversation_id,
                    error = %e,
                    "Memory write failed; reply still returned"
                );
                Err(e)
            }
        };

        info!(
            conversation_id = %record.conversation_id,
            intent = %record.intent,
            template_id = %record.template_id,
            rule = ?rule_index,
            disposition = record.disposition.label(),
            "Reply decided"
        );

        ReplyOutcome { record, storage }
    }

    /// Assemble the render context: property profile, then conversation
    /// bindings, then message fields and per-message extractions, then place
    /// lookups. Later layers override earlier ones.
    fn build_context(
        &self,
        message: &Message,
        memory: &ConversationMemory,
        extracted: &BTreeMap<String, String>,
        intent: Intent,
    ) -> RenderContext {
        let mut ctx = RenderContext::new();
        ctx.merge(&self.config.profile);
        ctx.merge(&memory.variable_bindings);
        ctx.bind("guest_id", &message.guest_id);
        ctx.bind("channel", &message.channel);
        ctx.merge(extracted);

        if let Some(resolver) = &self.places
            && (intent == Intent::LocalRecommendation || places::wants_local_recs(&message.text))
        {
            let query = extracted
                .get("destination")
                .map(String::as_str)
                .unwrap_or(&message.text);
            if let Some(place) = resolver.resolve(query) {
                debug!(place = %place.name, "Place resolved");
                ctx.bind("nearby_place", &place.name);
                if let Some(area) = &place.area {
                    ctx.bind("nearby_area", area);
                }
            }
        }

        ctx
    }
}

fn destination_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:how far (?:is|to|from)|distance (?:to|from)|drive time to)\s+([a-z0-9' ]+)")
            .unwrap()
    })
}

fn requested_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:around|about|at|by)\s+(\d{1,2}(?::\d{2})?\s*(?:am|pm))\b").unwrap()
    })
}

/// Deterministic bindings extracted from the message text, merged into the
/// render context and persisted into the conversation's bindings.
fn extract_bindings(text: &str) -> BTreeMap<String, String> {
    let mut bindings = BTreeMap::new();

    if let Some(caps) = destination_re().captures(text) {
        let destination = caps[1].trim().trim_end_matches(['?', '.', '!']).trim();
        if !destination.is_empty() {
            bindings.insert("destination".to_string(), destination.to_string());
        }
    }
    if let Some(caps) = requested_time_re().captures(text) {
        bindings.insert("requested_time".to_string(), caps[1].trim().to_string());
    }

    bindings
}

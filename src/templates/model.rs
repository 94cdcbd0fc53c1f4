//! Declarative template/rule model.
//!
//! The raw `*Def` structs mirror the JSON file exactly; `TemplateSet::load`
//! compiles them into validated structures with compiled regexes. The file is
//! a serialization format only — it never carries executable logic.

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::memory::ConversationMemory;
use crate::types::Intent;

// ── Raw file schema ─────────────────────────────────────────────────

/// Raw declarative definition, deserialized with serde before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateFile {
    /// Ordered classifier rules — first match wins.
    #[serde(default)]
    pub intent_rules: Vec<IntentRuleDef>,
    pub templates: Vec<TemplateDef>,
    pub rules: Vec<RuleDef>,
}

/// One classifier rule: pattern over message text and/or a memory condition.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentRuleDef {
    pub intent: Intent,
    /// Case-insensitive regex over the message text.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Memory condition: the conversation's most recent intent.
    #[serde(default)]
    pub last_intent: Option<Intent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDef {
    pub id: String,
    /// Reply body with `{{name}}` placeholders.
    pub body: String,
    /// Declared variable names; every body placeholder must be declared.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Placeholder-free body used when a variable cannot be resolved.
    pub fallback: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
    pub template_id: String,
    /// Intent the message must have been classified as. Absent = any.
    #[serde(default)]
    pub intent: Option<Intent>,
    /// Case-insensitive regex over the message text. Presence makes the
    /// rule keyword-specific.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub priority: i32,
    /// Memory binding that must be present (e.g. only offer the wifi
    /// template once `wifi_password` is known).
    #[serde(default)]
    pub requires_binding: Option<String>,
    /// Memory binding that must be absent.
    #[serde(default)]
    pub forbids_binding: Option<String>,
}

// ── Compiled structures ─────────────────────────────────────────────

/// Specificity class of a rule, derived from its predicate.
/// Explicit keyword match outranks intent-only, which outranks wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Wildcard,
    IntentOnly,
    Keyword,
}

impl Specificity {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Wildcard => "wildcard",
            Self::IntentOnly => "intent_only",
            Self::Keyword => "keyword",
        }
    }
}

/// A compiled classifier rule.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    pub pattern: Option<Regex>,
    pub last_intent: Option<Intent>,
}

impl IntentRule {
    /// True when every present condition holds. Validation guarantees at
    /// least one condition is present.
    pub fn matches(&self, text: &str, memory: &ConversationMemory) -> bool {
        if let Some(re) = &self.pattern
            && !re.is_match(text)
        {
            return false;
        }
        if let Some(last) = self.last_intent
            && memory.last_intent() != Some(last)
        {
            return false;
        }
        true
    }
}

/// A compiled selection rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Declaration index — the final tie-breaker.
    pub index: usize,
    pub template_id: String,
    pub intent: Option<Intent>,
    pub pattern: Option<Regex>,
    pub priority: i32,
    pub specificity: Specificity,
    pub requires_binding: Option<String>,
    pub forbids_binding: Option<String>,
}

impl Rule {
    /// True when the predicate is satisfied by (intent, text, memory).
    pub fn matches(&self, intent: Intent, text: &str, memory: &ConversationMemory) -> bool {
        if let Some(required) = self.intent
            && required != intent
        {
            return false;
        }
        if let Some(re) = &self.pattern
            && !re.is_match(text)
        {
            return false;
        }
        if let Some(name) = &self.requires_binding
            && !memory.variable_bindings.contains_key(name)
        {
            return false;
        }
        if let Some(name) = &self.forbids_binding
            && memory.variable_bindings.contains_key(name)
        {
            return false;
        }
        true
    }
}

/// A validated reply template.
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub body: String,
    /// Placeholders the body actually uses (scanned at load).
    pub required: BTreeSet<String>,
    /// Placeholder-free fallback body (enforced at load).
    pub fallback: String,
}

/// Compile a case-insensitive regex, attributing failures to `owner`.
pub(crate) fn compile_pattern(pattern: &str, owner: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::Pattern {
            owner: owner.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

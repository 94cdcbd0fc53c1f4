//! Validated template set and the hot-swappable store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::ConfigError;
use crate::render;
use crate::templates::model::{
    IntentRule, Rule, Specificity, Template, TemplateFile, compile_pattern,
};

/// One complete, internally consistent set of classifier rules, templates,
/// and selection rules. Immutable after load; readers work from an `Arc`
/// snapshot so a reload never tears an in-flight decision.
#[derive(Debug)]
pub struct TemplateSet {
    pub intent_rules: Vec<IntentRule>,
    templates: HashMap<String, Template>,
    pub rules: Vec<Rule>,
}

impl TemplateSet {
    /// Validate and compile a raw definition.
    ///
    /// All-or-nothing: any invalid pattern, undeclared placeholder,
    /// placeholder in a fallback body, dangling template reference, or
    /// ambiguous rule pair fails the whole load.
    pub fn load(file: TemplateFile) -> Result<Self, ConfigError> {
        let mut intent_rules = Vec::with_capacity(file.intent_rules.len());
        for (i, def) in file.intent_rules.into_iter().enumerate() {
            let owner = format!("intent rule {i}");
            if def.pattern.is_none() && def.last_intent.is_none() {
                return Err(ConfigError::EmptyPredicate { owner });
            }
            let pattern = def
                .pattern
                .as_deref()
                .map(|p| compile_pattern(p, &owner))
                .transpose()?;
            intent_rules.push(IntentRule {
                intent: def.intent,
                pattern,
                last_intent: def.last_intent,
            });
        }

        let mut templates = HashMap::new();
        for def in file.templates {
            if templates.contains_key(&def.id) {
                return Err(ConfigError::DuplicateTemplate(def.id));
            }
            let required = render::placeholders(&def.body);
            for name in &required {
                if !def.variables.iter().any(|v| v == name) {
                    return Err(ConfigError::UndeclaredPlaceholder {
                        template_id: def.id,
                        placeholder: name.clone(),
                    });
                }
            }
            if let Some(name) = render::placeholders(&def.fallback).into_iter().next() {
                return Err(ConfigError::PlaceholderInFallback {
                    template_id: def.id,
                    placeholder: name,
                });
            }
            templates.insert(
                def.id.clone(),
                Template {
                    id: def.id,
                    body: def.body,
                    required,
                    fallback: def.fallback,
                },
            );
        }

        let mut rules = Vec::with_capacity(file.rules.len());
        let mut seen: HashMap<_, usize> = HashMap::new();
        for (index, def) in file.rules.into_iter().enumerate() {
            if !templates.contains_key(&def.template_id) {
                return Err(ConfigError::UnknownTemplate {
                    rule_index: index,
                    template_id: def.template_id,
                });
            }
            let owner = format!("rule {index}");
            let pattern = def
                .pattern
                .as_deref()
                .map(|p| compile_pattern(p, &owner))
                .transpose()?;
            let specificity = match (&pattern, &def.intent) {
                (Some(_), _) => Specificity::Keyword,
                (None, Some(_)) => Specificity::IntentOnly,
                (None, None) => Specificity::Wildcard,
            };

            // Two rules with the same predicate, priority, and specificity
            // cannot be ordered by anything but declaration position, which
            // would make the tie silent. Reject at load.
            let key = (
                def.intent,
                def.pattern.clone(),
                def.requires_binding.clone(),
                def.forbids_binding.clone(),
                def.priority,
            );
            if let Some(&first) = seen.get(&key) {
                return Err(ConfigError::AmbiguousRules {
                    first,
                    second: index,
                });
            }
            seen.insert(key, index);

            rules.push(Rule {
                index,
                template_id: def.template_id,
                intent: def.intent,
                pattern,
                priority: def.priority,
                specificity,
                requires_binding: def.requires_binding,
                forbids_binding: def.forbids_binding,
            });
        }

        Ok(Self {
            intent_rules,
            templates,
            rules,
        })
    }

    /// Parse and validate a JSON definition.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: TemplateFile = serde_json::from_str(json)?;
        Self::load(file)
    }

    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}

/// Hot-swappable holder for the active [`TemplateSet`].
///
/// `snapshot` hands out the current `Arc`; `reload` swaps in a fully
/// validated replacement or leaves the active set untouched. In-flight
/// decisions keep the snapshot they started with.
pub struct TemplateStore {
    active: RwLock<Arc<TemplateSet>>,
}

impl TemplateStore {
    pub fn new(set: TemplateSet) -> Self {
        Self {
            active: RwLock::new(Arc::new(set)),
        }
    }

    /// The currently active set.
    pub fn snapshot(&self) -> Arc<TemplateSet> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Validate `json` and atomically swap it in. On error the previous set
    /// stays active.
    pub fn reload_json(&self, json: &str) -> Result<(), ConfigError> {
        let set = TemplateSet::from_json(json)?;
        let templates = set.template_count();
        let rules = set.rules.len();
        *self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(set);
        info!(templates, rules, "Template set reloaded");
        Ok(())
    }
}

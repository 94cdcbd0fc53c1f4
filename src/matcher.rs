//! Rule matching with a total, documented tie-break.
//!
//! Candidates are the rules whose predicate is satisfied by
//! (intent, message text, memory). Selection order:
//!
//! 1. highest specificity class (keyword > intent-only > wildcard)
//! 2. highest declared priority
//! 3. earliest declaration order
//!
//! Declaration indexes are unique, so the order is total: a fixed rule set
//! and fixed inputs always select the same rule. Silent non-determinism in
//! reply selection is the primary correctness risk, hence the explicit chain.

use tracing::debug;

use crate::memory::ConversationMemory;
use crate::templates::{Rule, Template, TemplateSet};
use crate::types::{Intent, Message};

/// A selected rule together with its template.
#[derive(Debug)]
pub struct TemplateChoice<'a> {
    pub rule: &'a Rule,
    pub template: &'a Template,
}

/// Select the winning template for a classified message. `None` means no
/// rule matched — an expected outcome the assembler turns into the default
/// fallback, not an error.
pub fn select<'a>(
    set: &'a TemplateSet,
    intent: Intent,
    message: &Message,
    memory: &ConversationMemory,
) -> Option<TemplateChoice<'a>> {
    let winner = set
        .rules
        .iter()
        .filter(|r| r.matches(intent, &message.text, memory))
        .max_by(|a, b| {
            a.specificity
                .cmp(&b.specificity)
                .then(a.priority.cmp(&b.priority))
                // Earlier declaration wins the remaining tie.
                .then(b.index.cmp(&a.index))
        })?;

    debug!(
        rule = winner.index,
        template_id = %winner.template_id,
        specificity = winner.specificity.label(),
        priority = winner.priority,
        "Rule selected"
    );
    set.template(&winner.template_id)
        .map(|template| TemplateChoice {
            rule: winner,
            template,
        })
}

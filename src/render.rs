//! Placeholder substitution for reply templates.
//!
//! Placeholders are `{{name}}`. Rendering is all-or-nothing: if any
//! placeholder the template body uses is absent from the context, the call
//! returns `MissingVariable` and emits nothing — a partially-filled reply
//! never leaves this module.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::RenderError;
use crate::templates::Template;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap())
}

/// Names of every placeholder occurring in `text`.
pub fn placeholders(text: &str) -> BTreeSet<String> {
    placeholder_re()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Transient variable context for one render. Built per message from the
/// property profile, conversation memory, message fields, and place lookups;
/// not persisted.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable. Later binds win.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Merge a whole map of bindings. Later merges win.
    pub fn merge<'a, I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (k, v) in bindings {
            self.values.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Substitute every placeholder in the template body from the context.
///
/// Errors with the first missing variable (in placeholder-name order) rather
/// than emitting a partially-filled string.
pub fn render(template: &Template, ctx: &RenderContext) -> Result<String, RenderError> {
    for name in &template.required {
        if ctx.get(name).is_none() {
            return Err(RenderError::MissingVariable(name.clone()));
        }
    }

    let out = placeholder_re().replace_all(&template.body, |caps: &regex::Captures| {
        // Every body placeholder is in `required`, checked above.
        ctx.get(&caps[1]).unwrap_or_default().to_string()
    });
    Ok(out.into_owned())
}

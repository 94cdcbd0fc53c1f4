//! Error types for Host Concierge.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

/// Template/rule definition errors.
///
/// Fatal to a load or reload attempt, never to the running engine — a failed
/// reload leaves the previously active template set in place.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse template definition: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid pattern {pattern:?} in {owner}: {source}")]
    Pattern {
        owner: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Duplicate template id: {0}")]
    DuplicateTemplate(String),

    #[error("Template {template_id} uses undeclared placeholder {placeholder}")]
    UndeclaredPlaceholder {
        template_id: String,
        placeholder: String,
    },

    #[error("Fallback body of template {template_id} contains placeholder {placeholder}")]
    PlaceholderInFallback {
        template_id: String,
        placeholder: String,
    },

    #[error("Rule {rule_index} references unknown template {template_id}")]
    UnknownTemplate {
        rule_index: usize,
        template_id: String,
    },

    #[error("Rules {first} and {second} are ambiguous: same predicate, priority, and specificity")]
    AmbiguousRules { first: usize, second: usize },

    #[error("{owner} has an empty predicate (needs a pattern, an intent, or a memory condition)")]
    EmptyPredicate { owner: String },
}

/// Memory persistence errors.
///
/// A failed memory write never suppresses the computed reply — the engine
/// returns the record and surfaces the write failure alongside it.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Template rendering errors. Recoverable — the assembler falls back to the
/// template's own placeholder-free fallback body.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Missing variable: {0}")]
    MissingVariable(String),
}

/// Outbound transmission error, reported by an [`crate::outbound::OutboundSender`].
#[derive(Debug, thiserror::Error)]
#[error("Send failed: {0}")]
pub struct SendError(pub String);

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

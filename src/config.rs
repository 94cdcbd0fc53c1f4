//! Configuration types.

use std::collections::BTreeMap;

/// Bounds for per-conversation memory sequences.
#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    /// Maximum intents kept in `last_intents` (oldest dropped).
    pub max_intents: usize,
    /// Maximum entries kept in `reply_log` (oldest dropped).
    pub max_replies: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            max_intents: 16,
            max_replies: 32,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Process-wide fallback reply used when no rule matches. Must contain
    /// no placeholders — it is emitted verbatim.
    pub default_fallback: String,
    /// Memory sequence bounds.
    pub limits: MemoryLimits,
    /// Property profile bindings available to every render (check-in/out
    /// times, fees). Per-conversation bindings override these.
    pub profile: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut profile = BTreeMap::new();
        profile.insert("checkin_time".to_string(), "4:00 PM".to_string());
        profile.insert("checkout_time".to_string(), "11:00 AM".to_string());
        profile.insert("early_checkin_fee".to_string(), "50".to_string());
        profile.insert("late_checkout_fee".to_string(), "50".to_string());

        Self {
            default_fallback: "Thanks for reaching out! Let me look into that \
                               and get right back to you."
                .to_string(),
            limits: MemoryLimits::default(),
            profile,
        }
    }
}

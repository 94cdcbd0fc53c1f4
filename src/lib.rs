//! Host Concierge — deterministic reply-decision engine for guest messaging.
//!
//! For each inbound guest message the engine classifies intent, selects a
//! reply template by rule priority/specificity, renders it from conversation
//! memory and external lookups, and returns an auditable [`types::ReplyRecord`].
//! Webhook ingestion, channel API clients, and persistence backends are the
//! host's concern.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod memory;
pub mod outbound;
pub mod places;
pub mod render;
pub mod templates;
pub mod types;

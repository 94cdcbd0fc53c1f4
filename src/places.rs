//! Place lookups for local-recommendation replies.
//!
//! The engine only needs a name resolver; the actual directory (Google
//! Places, a cached index, a hand-curated list) lives behind the
//! [`PlaceResolver`] trait outside the decision core.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A resolved place, enough to render a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// Neighborhood or area descriptor, if known.
    pub area: Option<String>,
}

/// Resolves a free-text query ("good sushi", "Stingaree") to a place.
/// Implementations must not block — pre-resolve or cache upstream.
pub trait PlaceResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Option<Place>;
}

/// True when the guest is actually asking about food/drink and not an
/// ops/support matter that happens to share vocabulary ("trash bins",
/// "check-in code").
pub fn wants_local_recs(text: &str) -> bool {
    static POS: OnceLock<Regex> = OnceLock::new();
    static NEG: OnceLock<Regex> = OnceLock::new();
    let pos = POS.get_or_init(|| {
        Regex::new(
            r"(?i)\b(restaurant|eat|dinner|lunch|breakfast|coffee|cafe|brunch|bar|brewery|pizza|sushi)\b",
        )
        .unwrap()
    });
    let neg = NEG.get_or_init(|| {
        Regex::new(r"(?i)\b(trash|garbage|bins?|wifi|portal|code|lock|check[- ]?in|check[- ]?out|parking)\b")
            .unwrap()
    });

    let text = text.trim();
    if text.is_empty() || neg.is_match(text) {
        return false;
    }
    pos.is_match(text)
}

/// Keyword-indexed static directory — the offline/demo resolver.
#[derive(Debug, Default)]
pub struct StaticPlaceDirectory {
    entries: Vec<(Vec<String>, Place)>,
}

impl StaticPlaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a place under lowercase keywords.
    pub fn add(mut self, keywords: &[&str], place: Place) -> Self {
        self.entries.push((
            keywords.iter().map(|k| k.to_lowercase()).collect(),
            place,
        ));
        self
    }
}

impl PlaceResolver for StaticPlaceDirectory {
    fn resolve(&self, query: &str) -> Option<Place> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| query.contains(k.as_str())))
            .map(|(_, place)| place.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_questions_trigger_recs() {
        assert!(wants_local_recs("Can you recommend a restaurant nearby?"));
        assert!(wants_local_recs("best COFFEE in walking distance"));
        assert!(wants_local_recs("any good sushi?"));
    }

    #[test]
    fn ops_messages_do_not_trigger_recs() {
        assert!(!wants_local_recs("where do the trash bins go?"));
        assert!(!wants_local_recs("what's the check-in code?"));
        assert!(!wants_local_recs(""));
        // Negative vocabulary wins even when food words appear.
        assert!(!wants_local_recs("the bar code for the lock box?"));
    }

    #[test]
    fn directory_resolves_by_keyword() {
        let dir = StaticPlaceDirectory::new()
            .add(
                &["restaurant", "dinner", "seafood"],
                Place {
                    name: "Stingaree".into(),
                    area: Some("Crystal Beach".into()),
                },
            )
            .add(
                &["coffee", "breakfast"],
                Place {
                    name: "The Daily Grind".into(),
                    area: None,
                },
            );

        assert_eq!(
            dir.resolve("any restaurant you like?").unwrap().name,
            "Stingaree"
        );
        assert_eq!(
            dir.resolve("Where's good COFFEE?").unwrap().name,
            "The Daily Grind"
        );
        assert!(dir.resolve("museum suggestions").is_none());
    }

    #[test]
    fn first_registered_entry_wins() {
        let dir = StaticPlaceDirectory::new()
            .add(&["pizza"], Place { name: "First".into(), area: None })
            .add(&["pizza"], Place { name: "Second".into(), area: None });
        assert_eq!(dir.resolve("pizza please").unwrap().name, "First");
    }
}

//! Entity extraction.
//!
//! [`RegexEntityExtractor`] is always available: a closed-taxonomy
//! dictionary lookup plus a handful of regex-shaped heuristics for
//! capitalized phrases, numbers, and currency. It is grounded directly on
//! the dictionary entries of the original Python extractor, expanded to
//! cover every [`crate::model::EntityType`] variant this crate's taxonomy
//! names.
//!
//! A statistical/NER backend is a documented extension point
//! (`EntityExtractor` as a trait object) rather than something this crate
//! ships a model for — see `MemoryEngine::with_providers`.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::model::EntityType;

/// One entity found in a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    /// Entity name as it appeared (or its canonical display form, for
    /// dictionary hits).
    pub name: String,
    /// Closed-taxonomy type.
    pub entity_type: EntityType,
}

/// A seam for turning free text into a list of candidate entities.
pub trait EntityExtractor: Send + Sync {
    /// Extract entities from `text`. Implementations should be idempotent
    /// and side-effect free.
    fn extract(&self, text: &str) -> Vec<ExtractedEntity>;
}

/// Dictionary + regex entity extractor. Deterministic, no model download.
pub struct RegexEntityExtractor;

impl Default for RegexEntityExtractor {
    fn default() -> Self {
        Self
    }
}

/// Known terms and their type, the same starter set the system this crate
/// supersedes shipped, expanded with a few more tech/concept terms.
static KNOWN_ENTITIES: LazyLock<Vec<(&'static str, EntityType)>> = LazyLock::new(|| {
    vec![
        ("python", EntityType::Tech),
        ("javascript", EntityType::Tech),
        ("typescript", EntityType::Tech),
        ("rust", EntityType::Tech),
        ("docker", EntityType::Tech),
        ("flask", EntityType::Tech),
        ("fastapi", EntityType::Tech),
        ("sqlite", EntityType::Tech),
        ("postgresql", EntityType::Tech),
        ("mcp", EntityType::Tech),
        ("memory", EntityType::Concept),
        ("graph", EntityType::Concept),
        ("knowledge", EntityType::Concept),
        ("embedding", EntityType::Concept),
        ("activation", EntityType::Concept),
    ]
});

/// Stopwords dropped from capitalized-phrase candidates; matches the
/// original's noise filter plus the single-letter exceptions ("I", "a").
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "is",
        "are", "was", "were", "be", "been", "this", "that", "these", "those", "it", "its",
    ]
    .into_iter()
    .collect()
});

impl RegexEntityExtractor {
    /// Look up a single lowercased token against the closed dictionary.
    fn dictionary_lookup(token: &str) -> Option<EntityType> {
        KNOWN_ENTITIES
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, ty)| *ty)
    }

    fn is_noise(token: &str) -> bool {
        if token.is_empty() {
            return true;
        }
        if token.len() == 1 && !token.eq_ignore_ascii_case("i") && token != "a" {
            return true;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
        STOPWORDS.contains(token.to_lowercase().as_str())
    }

    /// Collect maximal runs of capitalized words (person/organization
    /// candidates), e.g. "San Francisco" or "Jane Doe".
    fn capitalized_phrases(text: &str) -> Vec<String> {
        let mut phrases = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for word in text.split_whitespace() {
            let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
            let starts_upper = trimmed
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false);

            if starts_upper && trimmed.len() > 1 {
                current.push(trimmed);
            } else {
                if current.len() >= 1 {
                    phrases.push(current.join(" "));
                }
                current.clear();
            }
        }
        if !current.is_empty() {
            phrases.push(current.join(" "));
        }
        phrases
    }

    fn financial_and_measurement(text: &str) -> Vec<ExtractedEntity> {
        let mut found = Vec::new();
        for token in text.split_whitespace() {
            let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '.' && c != '%' && c != '$');
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('$')
                || trimmed
                    .chars()
                    .next()
                    .map(|c| c.is_ascii_digit())
                    .unwrap_or(false)
                    && trimmed.contains('$')
            {
                found.push(ExtractedEntity {
                    name: trimmed.to_string(),
                    entity_type: EntityType::Financial,
                });
            } else if trimmed.ends_with('%')
                && trimmed[..trimmed.len() - 1].parse::<f64>().is_ok()
            {
                found.push(ExtractedEntity {
                    name: trimmed.to_string(),
                    entity_type: EntityType::Measurement,
                });
            }
        }
        found
    }
}

impl EntityExtractor for RegexEntityExtractor {
    fn extract(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        for token in text.split(|c: char| !c.is_alphanumeric()) {
            let lower = token.to_lowercase();
            if Self::is_noise(&lower) {
                continue;
            }
            if let Some(entity_type) = Self::dictionary_lookup(&lower) {
                if seen.insert((lower.clone(), entity_type)) {
                    entities.push(ExtractedEntity {
                        name: lower,
                        entity_type,
                    });
                }
            }
        }

        for phrase in Self::capitalized_phrases(text) {
            let key_lower = phrase.to_lowercase();
            if Self::is_noise(&key_lower) || KNOWN_ENTITIES.iter().any(|(n, _)| *n == key_lower) {
                continue;
            }
            let entity_type = if phrase.split_whitespace().count() > 1 {
                EntityType::Organization
            } else {
                EntityType::Person
            };
            if seen.insert((key_lower, entity_type)) {
                entities.push(ExtractedEntity {
                    name: phrase,
                    entity_type,
                });
            }
        }

        for entity in Self::financial_and_measurement(text) {
            if seen.insert((entity.name.clone(), entity.entity_type)) {
                entities.push(entity);
            }
        }

        entities
    }
}

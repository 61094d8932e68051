//! Event-name pattern resolution
//!
//! A pattern is split on the configured separator into tokens. Tokens
//! without the wildcard marker pass through literally, registered or not.
//! Tokens with the marker expand to every registered name they match, where
//! the marker stands for one or more word or hyphen characters.

use crate::{EmitterConfig, EmitterError, EmitterResult};
use regex::{Regex, RegexBuilder};
use tracing::trace;

/// Expands emit patterns into concrete event names
#[derive(Debug, Clone)]
pub struct NameResolver {
    separator: String,
    marker: char,
    case_insensitive: bool,
}

impl NameResolver {
    /// Build a resolver from emitter configuration
    pub fn new(config: &EmitterConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            marker: config.wildcard.marker,
            case_insensitive: config.wildcard.case_insensitive,
        }
    }

    /// Whether a token contains the wildcard marker
    pub fn is_wildcard(&self, token: &str) -> bool {
        token.contains(self.marker)
    }

    /// Resolve a pattern against the currently registered names.
    ///
    /// Output follows token order; a wildcard token contributes its matches
    /// in the order of `registered`.
    pub fn resolve(&self, pattern: &str, registered: &[String]) -> EmitterResult<Vec<String>> {
        let mut names = Vec::new();

        for token in pattern
            .split(self.separator.as_str())
            .map(str::trim)
            .filter(|token| !token.is_empty())
        {
            if !self.is_wildcard(token) {
                names.push(token.to_string());
                continue;
            }

            let matcher = self.compile(token)?;
            let before = names.len();
            names.extend(
                registered
                    .iter()
                    .filter(|name| matcher.is_match(name))
                    .cloned(),
            );
            trace!(
                pattern = token,
                matches = names.len() - before,
                "Expanded wildcard event pattern"
            );
        }

        Ok(names)
    }

    /// Compile a wildcard token into an anchored matcher
    pub fn compile(&self, token: &str) -> EmitterResult<Regex> {
        let body = token
            .split(self.marker)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"[\w-]+");

        RegexBuilder::new(&format!("^{}$", body))
            .case_insensitive(self.case_insensitive)
            .build()
            .map_err(|source| EmitterError::InvalidPattern {
                pattern: token.to_string(),
                source,
            })
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(&EmitterConfig::default())
    }
}

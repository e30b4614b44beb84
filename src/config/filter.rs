//! Keyword filtering contract shared by all source connectors.

use serde::{Deserialize, Serialize};

/// Keyword criteria applied to every retrieved record.
///
/// - `search`: each keyword is queried against the source separately.
/// - `exclude`: a record is dropped if any of these appears (substring,
///   case-insensitive) in its title+abstract.
/// - `require`: scored rather than strict: a record passes when the set is
///   empty or at least one required keyword appears in its title+abstract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordFilter {
    #[serde(default)]
    pub search: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub require: Vec<String>,
}

impl KeywordFilter {
    pub fn new(search: Vec<String>) -> Self {
        Self {
            search,
            exclude: Vec::new(),
            require: Vec::new(),
        }
    }

    pub fn exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn require(mut self, require: Vec<String>) -> Self {
        self.require = require;
        self
    }

    /// Whether a record with the given title and abstract passes the
    /// exclude and require criteria.
    pub fn accepts(&self, title: &str, abstract_text: &str) -> bool {
        let combined = format!("{} {}", title, abstract_text).to_lowercase();

        if self
            .exclude
            .iter()
            .any(|kw| combined.contains(&kw.to_lowercase()))
        {
            return false;
        }

        if self.require.is_empty() {
            return true;
        }

        let score = self
            .require
            .iter()
            .filter(|kw| combined.contains(&kw.to_lowercase()))
            .count();
        score > 0
    }
}

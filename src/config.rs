//! Course definitions loaded from disk.
//!
//! Stored as a JSON object keyed by a short course key:
//! ```json
//! {
//!   "bio": {
//!     "name": "AP Biology",
//!     "identifier": 2,
//!     "categories": ["Homework", "Tests&Quizzes", "Final?"],
//!     "weights": [30, 50, 20]
//!   }
//! }
//! ```
//! `num` is accepted as an alias for `identifier`; `final_category` overrides
//! the category used for final-grade projections.

use anyhow::{Context, Result, bail};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::path::Path;

use crate::gradebook::course::{Course, DEFAULT_FINAL_CATEGORY};
use crate::gradebook::types::Identifier;
use crate::source::normalize_label;

/// One course entry of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseDefinition {
    pub name: String,
    #[serde(alias = "num")]
    pub identifier: Identifier,
    pub categories: Vec<String>,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub final_category: Option<String>,
}

/// All configured courses, in file order.
#[derive(Debug, Clone)]
pub struct CourseConfig {
    entries: IndexMap<String, CourseDefinition>,
}

impl CourseConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read course config {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid course config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: IndexMap<String, CourseDefinition> = serde_json::from_str(content)?;
        for (key, definition) in &entries {
            definition.validate(key)?;
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&CourseDefinition> {
        self.entries.get(key)
    }

    /// Iterates over all `(course_key, definition)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CourseDefinition)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a fresh, unretrieved [`Course`] for every entry.
    pub fn into_courses(self) -> IndexMap<String, Course> {
        self.entries
            .into_iter()
            .map(|(key, definition)| {
                let course = definition.build(&key);
                (key, course)
            })
            .collect()
    }
}

impl CourseDefinition {
    fn validate(&self, key: &str) -> Result<()> {
        if self.categories.len() != self.weights.len() {
            bail!(
                "course '{key}' lists {} categories but {} weights",
                self.categories.len(),
                self.weights.len()
            );
        }

        let mut seen = IndexSet::new();
        for name in &self.categories {
            let normalized = normalize_label(name);
            if normalized != *name {
                bail!(
                    "course '{key}' category '{name}' can never match an exported label; \
                     write it as '{normalized}'"
                );
            }
            if !seen.insert(name.as_str()) {
                bail!("course '{key}' lists category '{name}' more than once");
            }
        }

        Ok(())
    }

    pub fn build(&self, key: &str) -> Course {
        let categories = self
            .categories
            .iter()
            .cloned()
            .zip(self.weights.iter().copied());
        let final_category = self
            .final_category
            .clone()
            .unwrap_or_else(|| DEFAULT_FINAL_CATEGORY.to_string());

        Course::new(key, self.name.clone(), self.identifier.clone(), categories)
            .with_final_category(final_category)
    }
}

//! Tags
//!
//! ManageIQ encodes a tag as a path, `/managed/<category>/<value>`. Tags are
//! decoded once into a [`TagMap`] when a resource is read.

use crate::error::{MiqError, MiqResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const MANAGED_PREFIX: &str = "/managed/";

/// Categories kept in the map but not shown or migrated
fn is_hidden(category: &str) -> bool {
    category == "lifecycle" || category.contains("folder_path")
}

/// Decoded `category -> value` tags of one resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the `tags` array of an expanded resource
    pub fn from_tags(tags: &[Value]) -> Self {
        let mut map = Self::new();
        for tag in tags {
            let Some(name) = tag.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            match parse_tag_name(name) {
                Some((category, value)) => map.insert(category, value),
                None => tracing::warn!("Skipping malformed tag name '{}'", name),
            }
        }
        map
    }

    pub fn insert(&mut self, category: &str, value: &str) {
        self.0.insert(category.to_string(), value.to_string());
    }

    pub fn get(&self, category: &str) -> Option<&str> {
        self.0.get(category).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn vmtype(&self) -> Option<&str> {
        self.get("vmtype")
    }

    /// Tags worth showing to an operator
    pub fn visible(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0
            .iter()
            .filter(|(k, _)| !is_hidden(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Visible tags of `self` that `target` lacks or holds with another value
    pub fn missing_from(&self, target: &TagMap) -> Vec<(String, String)> {
        self.visible()
            .filter(|(category, value)| target.get(category) != Some(*value))
            .map(|(category, value)| (category.to_string(), value.to_string()))
            .collect()
    }
}

/// Split `/managed/<category>/<value>`
fn parse_tag_name(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix(MANAGED_PREFIX)?;
    let (category, value) = rest.split_once('/')?;
    if category.is_empty() || value.is_empty() {
        return None;
    }
    Some((category, value))
}

/// Allowed tag values per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagCatalog(BTreeMap<String, Vec<String>>);

impl Default for TagCatalog {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            "location".to_string(),
            vec!["b7".to_string(), "sm22".to_string(), "metro".to_string()],
        );
        categories.insert(
            "vmtype".to_string(),
            vec!["cloud".to_string(), "traditional".to_string()],
        );
        Self(categories)
    }
}

impl TagCatalog {
    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        Self(categories)
    }

    /// Normalize a category/value pair typed by a user.
    ///
    /// `location*` and `vmtype*` collapse to their category; values of known
    /// categories must be one of the allowed values (case-insensitive).
    pub fn normalize(&self, category: &str, value: &str) -> MiqResult<(String, String)> {
        let category = category.trim().to_lowercase();
        let category = if category.contains("location") {
            "location".to_string()
        } else if category.contains("vmtype") {
            "vmtype".to_string()
        } else {
            category
        };
        if category.is_empty() {
            return Err(MiqError::Validation("tag category is empty".to_string()));
        }

        let value = value.trim().to_lowercase();
        if value.is_empty() {
            return Err(MiqError::Validation(format!(
                "tag value for '{}' is empty",
                category
            )));
        }

        if let Some(allowed) = self.0.get(&category) {
            if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&value)) {
                return Err(MiqError::Validation(format!(
                    "'{}' is not a known {} (expected one of: {})",
                    value,
                    category,
                    allowed.join(", ")
                )));
            }
        }

        Ok((category, value))
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

/// Ordered form body using the provider's bracket notation for nested keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn push_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// `metadata[k]=v` for every entry.
    pub fn push_map(&mut self, prefix: &str, map: &BTreeMap<String, String>) {
        for (key, value) in map {
            self.push(format!("{prefix}[{key}]"), value);
        }
    }

    /// `expand[]=a&expand[]=b`
    pub fn push_list(&mut self, prefix: &str, values: &[String]) {
        for value in values {
            self.push(format!("{prefix}[]"), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

use std::collections::{btree_map, BTreeMap};

/// Filter value meaning "all values at this level".
pub const WILDCARD: &str = "*";

/// A filter value: one identifier (or the wildcard), or a list of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

impl FilterValue {
    pub fn wildcard() -> Self { FilterValue::One(WILDCARD.to_string()) }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, FilterValue::One(v) if v == WILDCARD)
    }

    /// Wire form: lists are comma-joined.
    pub fn to_wire(&self) -> String {
        match self {
            FilterValue::One(v) => v.clone(),
            FilterValue::Many(vs) => vs.join(","),
        }
    }

    /// The concrete identifiers named by this value; empty for the wildcard.
    pub fn values(&self) -> Vec<&str> {
        match self {
            _ if self.is_wildcard() => vec![],
            FilterValue::One(v) => vec![v.as_str()],
            FilterValue::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self { FilterValue::One(v.to_string()) }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self { FilterValue::One(v) }
}

impl From<Vec<String>> for FilterValue {
    fn from(vs: Vec<String>) -> Self { FilterValue::Many(vs) }
}

impl From<Vec<&str>> for FilterValue {
    fn from(vs: Vec<&str>) -> Self { FilterValue::Many(vs.into_iter().map(str::to_string).collect()) }
}

impl From<&[&str]> for FilterValue {
    fn from(vs: &[&str]) -> Self { FilterValue::Many(vs.iter().map(|v| v.to_string()).collect()) }
}

/// Normalize a loosely written level name: `County_Subdivision` → `county subdivision`.
pub fn normalize_level(name: &str) -> String {
    name.trim().replace('_', " ").to_lowercase()
}

/// Caller-supplied geography filters, keyed by normalized level name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoFilterSpec {
    filters: BTreeMap<String, FilterValue>,
}

impl GeoFilterSpec {
    pub fn new() -> Self { Self::default() }

    /// Builder-style insert.
    pub fn with(mut self, level: &str, value: impl Into<FilterValue>) -> Self {
        self.insert(level, value);
        self
    }

    pub fn insert(&mut self, level: &str, value: impl Into<FilterValue>) {
        self.filters.insert(normalize_level(level), value.into());
    }

    pub fn get(&self, level: &str) -> Option<&FilterValue> {
        self.filters.get(&normalize_level(level))
    }

    pub fn contains(&self, level: &str) -> bool {
        self.filters.contains_key(&normalize_level(level))
    }

    /// Normalized level names, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FilterValue> { self.filters.iter() }

    pub fn len(&self) -> usize { self.filters.len() }

    pub fn is_empty(&self) -> bool { self.filters.is_empty() }

    pub(crate) fn key_list(&self) -> Vec<String> { self.filters.keys().cloned().collect() }
}

impl<K: AsRef<str>, V: Into<FilterValue>> FromIterator<(K, V)> for GeoFilterSpec {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut spec = GeoFilterSpec::new();
        for (k, v) in iter {
            spec.insert(k.as_ref(), v);
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_normalized() {
        let spec = GeoFilterSpec::new()
            .with("County_Subdivision", "*")
            .with(" STATE ", "36");
        assert_eq!(spec.keys().collect::<Vec<_>>(), vec!["county subdivision", "state"]);
        assert_eq!(spec.get("state"), Some(&FilterValue::from("36")));
        assert!(spec.contains("county_subdivision"));
    }

    #[test]
    fn list_values_join_with_commas() {
        let v = FilterValue::from(vec!["001", "003"]);
        assert_eq!(v.to_wire(), "001,003");
        assert!(!v.is_wildcard());
        assert_eq!(v.values(), vec!["001", "003"]);
        assert!(FilterValue::wildcard().values().is_empty());
    }

    #[test]
    fn from_pairs() {
        let spec: GeoFilterSpec = [("state", "34"), ("block_group", "*")].into_iter().collect();
        assert_eq!(spec.len(), 2);
        assert!(spec.get("block group").unwrap().is_wildcard());
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

/// Multi-valued string metadata attached to a URL.
///
/// Keys are case-sensitive. Values under one key keep the order they were
/// added in. A key mapped to an empty list is still present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    values: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` after any values already stored under `key`.
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    pub fn add_values<I, V>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.values
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Replace whatever is stored under `key` with a single value.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    pub fn set_values(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.values.insert(key.into(), values);
    }

    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.first().map(String::as_str)
    }

    pub fn values(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        self.keys().filter(move |k| k.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writer that puts every key under `prefix`.
    pub fn scoped(&mut self, prefix: &'static str) -> ScopedMetadata<'_> {
        ScopedMetadata { bag: self, prefix }
    }
}

/// Borrowed view of a [`Metadata`] that can only write keys under one prefix.
pub struct ScopedMetadata<'a> {
    bag: &'a mut Metadata,
    prefix: &'static str,
}

impl ScopedMetadata<'_> {
    /// Add a trimmed value under `prefix + field`; blank values are dropped.
    pub fn add(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.bag.add_value(format!("{}{}", self.prefix, field), value);
    }
}

// ── Tests ──

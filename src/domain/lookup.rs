use serde::Serialize;
use std::collections::BTreeMap;

use super::Asset;

/// A per-symbol lookup that did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolFailure {
    pub asset: Asset,
    pub reason: String,
}

/// Outcome of running the same lookup across several symbols.
///
/// Successes and failures are kept side by side so one bad symbol never
/// hides the rest of the data, and the failures stay visible to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolResults<T> {
    values: BTreeMap<Asset, T>,
    failures: Vec<SymbolFailure>,
}

impl<T> Default for SymbolResults<T> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> SymbolResults<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: Asset, value: T) {
        self.values.insert(asset, value);
    }

    pub fn fail(&mut self, asset: Asset, reason: impl Into<String>) {
        self.failures.push(SymbolFailure {
            asset,
            reason: reason.into(),
        });
    }

    /// Fold one lookup result into the aggregate
    pub fn push<E: std::fmt::Display>(&mut self, asset: Asset, result: Result<T, E>) {
        match result {
            Ok(value) => self.insert(asset, value),
            Err(e) => self.fail(asset, e.to_string()),
        }
    }

    pub fn get(&self, asset: Asset) -> Option<&T> {
        self.values.get(&asset)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Asset, &T)> {
        self.values.iter().map(|(asset, value)| (*asset, value))
    }

    pub fn failures(&self) -> &[SymbolFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T, E: std::fmt::Display> FromIterator<(Asset, Result<T, E>)> for SymbolResults<T> {
    fn from_iter<I: IntoIterator<Item = (Asset, Result<T, E>)>>(iter: I) -> Self {
        let mut results = SymbolResults::new();
        for (asset, result) in iter {
            results.push(asset, result);
        }
        results
    }
}

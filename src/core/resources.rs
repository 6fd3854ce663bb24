//! Named, numeric resource bundles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::PoolError;

/// A bundle of named, non-negative resource amounts.
///
/// The same type serves as executor capacity and as task reservation.
/// Dimensions absent from a bundle count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resources(BTreeMap<String, u64>);

impl Resources {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one dimension, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, amount: u64) -> Self {
        self.0.insert(key.into(), amount);
        self
    }

    /// Amount declared for `key`; zero when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// True when no dimension is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of declared dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(key, amount)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The declared dimension names, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Componentwise sum of `self` and `other`.
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        let mut out = self.0.clone();
        for (key, amount) in &other.0 {
            let slot = out.entry(key.clone()).or_insert(0);
            *slot = slot.saturating_add(*amount);
        }
        Self(out)
    }

    /// True when every dimension of `self` fits within `capacity`.
    ///
    /// Dimensions `capacity` does not declare have zero capacity.
    #[must_use]
    pub fn fits_within(&self, capacity: &Self) -> bool {
        self.0.iter().all(|(key, amount)| *amount <= capacity.get(key))
    }

    /// Parse a bundle from a JSON object of non-negative integer amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidResources`] when `value` is not an object
    /// or any amount is negative, fractional, or not a number.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PoolError> {
        let Some(object) = value.as_object() else {
            return Err(PoolError::InvalidResources(
                "resource declaration must be a JSON object".into(),
            ));
        };
        let mut out = BTreeMap::new();
        for (key, amount) in object {
            let Some(amount) = amount.as_u64() else {
                return Err(PoolError::InvalidResources(format!(
                    "resource `{key}` must be a non-negative integer"
                )));
            };
            out.insert(key.clone(), amount);
        }
        Ok(Self(out))
    }
}

impl FromIterator<(String, u64)> for Resources {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

//! Canonical label sets and their fingerprints.
//!
//! Labels arrive as arbitrary key-value mappings; both cardinality
//! admission and rollup grouping need an order-independent form and a
//! stable digest. `Labels` keeps keys sorted by construction, so the
//! fingerprint never depends on insertion order.

use std::collections::BTreeMap;
use std::hash::Hasher;

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

/// A normalized label set: keys unique and sorted.
///
/// Two label sets are considered equal when their fingerprints match AND
/// their normalized forms match; map equality covers both at once, the
/// fingerprint alone is only a grouping key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    /// Create an empty label set.
    ///
    /// # Returns
    ///
    /// Returns a `Labels` with no entries; `normalize` of nothing.
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Normalize an arbitrary key-value mapping into canonical form.
    ///
    /// # Parameters
    ///
    /// - `pairs` - Any iterable of key-value pairs, in any order
    ///
    /// # Returns
    ///
    /// Returns a `Labels` with keys sorted; later duplicates of a key win.
    pub fn normalize<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Compute a stable digest of the normalized form.
    ///
    /// The digest is taken over the key-sorted serialization, so any two
    /// mappings with the same entries produce the same value regardless of
    /// how they were built.
    ///
    /// # Returns
    ///
    /// Returns a 64-bit FNV digest of the canonical serialization.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        for (name, value) in &self.0 {
            hasher.write(name.as_bytes());
            hasher.write_u8(0xff);
            hasher.write(value.as_bytes());
            hasher.write_u8(0xff);
        }
        hasher.finish()
    }

    /// Check whether this set satisfies an exact-match filter.
    ///
    /// Every key-value pair of `filter` must be present verbatim; a key
    /// absent from this set is a non-match.
    ///
    /// # Parameters
    ///
    /// - `filter` - Requested label pairs, empty matches everything
    ///
    /// # Returns
    ///
    /// Returns `true` if all filter pairs are present in this set.
    pub fn matches(&self, filter: &Labels) -> bool {
        filter.0.iter().all(|(k, v)| self.0.get(k) == Some(v))
    }

    /// Number of labels in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the labels in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Keys of the set, in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::normalize(iter)
    }
}

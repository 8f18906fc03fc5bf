//! Read-only overlay of several maps.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Looks keys up through a stack of maps; earlier layers shadow later ones.
pub struct ProxyMap<'a, K, V> {
    layers: Vec<&'a HashMap<K, V>>,
}

impl<'a, K, V> Default for ProxyMap<'a, K, V> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<'a, K: Eq + Hash, V> ProxyMap<'a, K, V> {
    pub fn new(layers: impl IntoIterator<Item = &'a HashMap<K, V>>) -> Self {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Add a layer below the existing ones.
    pub fn push(&mut self, layer: &'a HashMap<K, V>) -> &mut Self {
        self.layers.push(layer);
        self
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&'a V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.layers.iter().copied().find_map(|layer| layer.get(key))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.layers.iter().any(|layer| layer.contains_key(key))
    }

    /// Distinct keys in layer order.
    pub fn keys(&self) -> impl Iterator<Item = &'a K> + '_ {
        let mut seen = HashSet::new();
        self.layers
            .iter()
            .copied()
            .flat_map(|layer| layer.keys())
            .filter(move |key| seen.insert(*key))
    }

    /// Visible entries: each key paired with the value of its first layer.
    pub fn iter(&self) -> impl Iterator<Item = (&'a K, &'a V)> + '_ {
        self.keys()
            .filter_map(move |key| self.get(key).map(|value| (key, value)))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.is_empty())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasher, Hash};

use crate::ir::helpers::RepeatableState;

/// Hash map that remembers the order in which keys were first inserted.
/// Iteration follows that order.
#[derive(Clone, Debug)]
pub struct OrderedMap<K, V, S = RepeatableState>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    map: HashMap<K, V, S>,
    order: Vec<K>,
}

impl<K, V, S> OrderedMap<K, V, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            map: HashMap::with_hasher(hasher),
            order: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(capacity, hasher),
            order: Vec::with_capacity(capacity),
        }
    }

    /// Inserts the value. A key that is already present keeps its position
    /// and gets the new value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.map.insert(key.clone(), value);
        if old.is_none() {
            self.order.push(key);
        }
        old
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(|key| self.map.get(key).map(|value| (key, value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

/// Hash set that remembers the order in which values were first inserted.
#[derive(Clone, Debug)]
pub struct OrderedSet<V, S = RepeatableState>
where
    V: Clone + Eq + Hash,
    S: BuildHasher,
{
    set: HashSet<V, S>,
    order: Vec<V>,
}

impl<V, S> OrderedSet<V, S>
where
    V: Clone + Eq + Hash,
    S: BuildHasher,
{
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            set: HashSet::with_hasher(hasher),
            order: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            set: HashSet::with_capacity_and_hasher(capacity, hasher),
            order: Vec::with_capacity(capacity),
        }
    }

    /// Returns `false` if the value was already present.
    pub fn insert(&mut self, value: V) -> bool {
        if self.set.contains(&value) {
            return false;
        }
        self.set.insert(value.clone());
        self.order.push(value);
        true
    }

    #[must_use]
    pub fn contains(&self, value: &V) -> bool {
        self.set.contains(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.order.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<V> {
        self.order
    }
}

impl<V, S> Extend<V> for OrderedSet<V, S>
where
    V: Clone + Eq + Hash,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = V>>(&mut self, iter: T) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<V, S> FromIterator<V> for OrderedSet<V, S>
where
    V: Clone + Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let mut set = OrderedSet::with_hasher(S::default());
        set.extend(iter);
        set
    }
}

impl<V, S> IntoIterator for OrderedSet<V, S>
where
    V: Clone + Eq + Hash,
    S: BuildHasher,
{
    type Item = V;
    type IntoIter = std::vec::IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

impl<'s, V, S> IntoIterator for &'s OrderedSet<V, S>
where
    V: Clone + Eq + Hash,
    S: BuildHasher,
{
    type Item = &'s V;
    type IntoIter = std::slice::Iter<'s, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ordered_set_keeps_first_appearance() {
        let set: OrderedSet<&str> = ["b", "a", "b", "c", "a"].into_iter().collect();
        assert_eq!(set.len(), 3);
        assert_eq!(set.into_vec(), vec!["b", "a", "c"]);
    }

    #[test]
    fn ordered_map_overwrite_keeps_position() {
        let mut map: OrderedMap<&str, i32> = OrderedMap::with_hasher(RepeatableState);
        assert_eq!(map.insert("x", 1), None);
        assert_eq!(map.insert("y", 2), None);
        assert_eq!(map.insert("x", 3), Some(1));
        let pairs: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(pairs, vec![("x", 3), ("y", 2)]);
    }
}

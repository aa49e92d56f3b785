//! A map that rolls back local changes when a scope ends.
//!
//! TeX's grouping rules say that an assignment made inside a group is undone when
//! the group ends, unless the assignment was made globally.
//! The [ScopedMap] implements exactly these rules for a generic key-value map.
//!
//! The map keeps the visible value of each key in a single backing hash map,
//! so lookups cost the same regardless of how deeply scopes are nested.
//! Each open scope owns a save frame recording how to restore keys that were
//! changed locally inside it.
//! Ending a scope replays the frame.
//!
//! ```
//! # use texparser_stdext::collections::scopedmap::*;
//! let mut map = ScopedMap::default();
//! map.insert("a", 1, Scope::Local);
//! map.begin_scope();
//! map.insert("a", 2, Scope::Local);
//! map.insert("b", 3, Scope::Global);
//! assert_eq!(map.get(&"a"), Some(&2));
//! map.end_scope().unwrap();
//! assert_eq!(map.get(&"a"), Some(&1));
//! assert_eq!(map.get(&"b"), Some(&3));
//! ```
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// Whether an assignment is confined to the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scope {
    /// The assignment is undone when the current scope ends.
    #[default]
    Local,
    /// The assignment persists across scope ends.
    Global,
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Undo<V> {
    Restore(V),
    Remove,
}

/// Error returned when ending a scope with no scope open.
#[derive(Debug, PartialEq, Eq)]
pub struct NoScopeToEndError;

impl std::fmt::Display for NoScopeToEndError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "there is no scope to end")
    }
}

impl std::error::Error for NoScopeToEndError {}

/// Map with scoped assignments.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "K: Eq + Hash + serde::Serialize, V: serde::Serialize",
        deserialize = "K: Eq + Hash + serde::Deserialize<'de>, V: serde::Deserialize<'de>"
    ))
)]
pub struct ScopedMap<K, V> {
    values: HashMap<K, V>,
    frames: Vec<HashMap<K, Undo<V>>>,
}

impl<K, V> Default for ScopedMap<K, V> {
    fn default() -> Self {
        Self {
            values: Default::default(),
            frames: Default::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> ScopedMap<K, V> {
    /// Inserts the key-value pair with the given scope.
    ///
    /// Returns true if the key already had a visible value.
    pub fn insert(&mut self, key: K, val: V, scope: Scope) -> bool {
        self.assign(key, Some(val), scope)
    }

    /// Removes the key with the given scope.
    ///
    /// A local removal is undone when the current scope ends.
    /// Returns true if the key had a visible value.
    pub fn remove(&mut self, key: &K, scope: Scope) -> bool {
        self.assign(key.clone(), None, scope)
    }

    fn assign(&mut self, key: K, val: Option<V>, scope: Scope) -> bool {
        let old = match val {
            None => self.values.remove(&key),
            Some(val) => self.values.insert(key.clone(), val),
        };
        let existed = old.is_some();
        match scope {
            Scope::Global => {
                // Nothing should revert a global assignment, so pending undos are purged.
                for frame in &mut self.frames {
                    frame.remove(&key);
                }
            }
            Scope::Local => {
                if let Some(frame) = self.frames.last_mut() {
                    // Only the first local change in a scope records the undo.
                    if let Entry::Vacant(vacant) = frame.entry(key) {
                        vacant.insert(match old {
                            None => Undo::Remove,
                            Some(old) => Undo::Restore(old),
                        });
                    }
                }
            }
        }
        existed
    }

    /// Returns the visible value for the key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// Returns true if the key has a visible value.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    /// Opens a new scope.
    pub fn begin_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Closes the innermost scope, reverting all local assignments made within it.
    pub fn end_scope(&mut self) -> Result<(), NoScopeToEndError> {
        let frame = self.frames.pop().ok_or(NoScopeToEndError)?;
        for (key, undo) in frame {
            match undo {
                Undo::Remove => {
                    self.values.remove(&key);
                }
                Undo::Restore(old) => {
                    self.values.insert(key, old);
                }
            }
        }
        Ok(())
    }

    /// Returns the number of open scopes.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Iterates over the visible key-value pairs in an arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for ScopedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            frames: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_end_scope() {
        let mut map = ScopedMap::default();
        map.begin_scope();
        map.insert(3, 5, Scope::Local);
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&3), None);
    }

    #[test]
    fn insert_after_nested_insert() {
        let mut map = ScopedMap::default();
        map.begin_scope();
        map.insert(3, 5, Scope::Local);
        assert_eq!(map.end_scope(), Ok(()));
        map.insert(3, 4, Scope::Local);
        assert_eq!(map.get(&3), Some(&4));
    }

    #[test]
    fn local_overwrite_is_reverted() {
        let mut map = ScopedMap::default();
        map.insert(3, 5, Scope::Local);
        map.begin_scope();
        map.insert(3, 6, Scope::Local);
        map.insert(3, 7, Scope::Local);
        assert_eq!(map.get(&3), Some(&7));
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&3), Some(&5));
    }

    #[test]
    fn global_insert_survives_scope_end() {
        let mut map = ScopedMap::default();
        map.begin_scope();
        map.insert(3, 5, Scope::Global);
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&3), Some(&5));
    }

    #[test]
    fn global_insert_purges_local_undos() {
        let mut map = ScopedMap::default();
        map.insert(3, 1, Scope::Local);
        map.begin_scope();
        map.insert(3, 2, Scope::Local);
        map.begin_scope();
        map.insert(3, 3, Scope::Local);
        map.insert(3, 4, Scope::Global);
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&3), Some(&4));
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&3), Some(&4));
    }

    #[test]
    fn local_after_global_is_reverted_to_global_value() {
        let mut map = ScopedMap::default();
        map.begin_scope();
        map.insert(3, 1, Scope::Global);
        map.insert(3, 2, Scope::Local);
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&3), Some(&1));
    }

    #[test]
    fn local_remove_is_reverted() {
        let mut map = ScopedMap::default();
        map.insert("a", 1, Scope::Local);
        map.begin_scope();
        assert!(map.remove(&"a", Scope::Local));
        assert_eq!(map.get(&"a"), None);
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&"a"), Some(&1));
    }

    #[test]
    fn end_scope_without_scope() {
        let mut map = ScopedMap::<usize, usize>::default();
        assert_eq!(map.end_scope(), Err(NoScopeToEndError));
    }

    #[test]
    fn depth_tracks_open_scopes() {
        let mut map = ScopedMap::<usize, usize>::default();
        assert_eq!(map.depth(), 0);
        map.begin_scope();
        map.begin_scope();
        assert_eq!(map.depth(), 2);
        map.end_scope().unwrap();
        assert_eq!(map.depth(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn scope_serde() {
        let serialized = serde_json::to_string(&Scope::Global).unwrap();
        let deserialized: Scope = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, Scope::Global);
    }
}

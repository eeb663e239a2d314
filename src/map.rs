//! The public container (§6): wires the key adapter, the structural
//! [`Trie`], and a [`ValueLifecycle`] together into the operations a
//! caller actually uses.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::PrefixMapError;
use crate::key::{self, IntoPrefixKey, Key};
use crate::node::NIL;
use crate::options::PrefixMapOptions;
use crate::trie::{Slotted, Trie};
use crate::value::{NoopLifecycle, ValueLifecycle};

/// An in-memory longest-prefix-match container.
///
/// Generic over the stored value `V` and an optional [`ValueLifecycle`]
/// hook `L` (defaulting to [`NoopLifecycle`], appropriate whenever `V`'s
/// own `Drop` impl already does the right thing).
pub struct PrefixMap<V, L = NoopLifecycle> {
    trie: Trie<V>,
    options: PrefixMapOptions,
    lifecycle: L,
}

impl<V> PrefixMap<V, NoopLifecycle> {
    /// A V4 map with `maxbits = 32` and `raw_output = false`.
    pub fn new() -> Self {
        Self::with_options(PrefixMapOptions::default())
    }

    pub fn with_options(options: PrefixMapOptions) -> Self {
        Self::with_options_and_lifecycle(options, NoopLifecycle)
    }
}

impl<V> Default for PrefixMap<V, NoopLifecycle> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, L: ValueLifecycle<V>> PrefixMap<V, L> {
    pub fn with_options_and_lifecycle(
        options: PrefixMapOptions,
        lifecycle: L,
    ) -> Self {
        options.validate();
        PrefixMap {
            trie: Trie::new(options.family, options.maxbits),
            options,
            lifecycle,
        }
    }

    fn key_of<K: IntoPrefixKey>(
        &self,
        key: K,
    ) -> Result<crate::prefix::Prefix, PrefixMapError> {
        key.into_prefix_key(self.options.family, self.options.maxbits)
    }

    /// LPM lookup; `None` if nothing covers the query.
    pub fn get<K: IntoPrefixKey>(
        &self,
        key: K,
    ) -> Result<Option<&V>, PrefixMapError> {
        let query = self.key_of(key)?;
        Ok(self
            .trie
            .search_best(&query, true)
            .and_then(|id| self.trie.value_of(id)))
    }

    /// Like [`Self::get`], but returns the key of the matched prefix.
    pub fn get_key<K: IntoPrefixKey>(
        &self,
        key: K,
    ) -> Result<Option<Key>, PrefixMapError> {
        let query = self.key_of(key)?;
        Ok(self.trie.search_best(&query, true).map(|id| {
            key::render(&self.trie.prefix_of(id), self.options.raw_output)
        }))
    }

    /// True iff an **exact** match exists.
    pub fn has_key<K: IntoPrefixKey>(
        &self,
        key: K,
    ) -> Result<bool, PrefixMapError> {
        let query = self.key_of(key)?;
        Ok(self.trie.search_exact(&query).is_some())
    }

    /// True iff an **LPM** match exists. Unlike the rest of the API, a
    /// bad key is reported as "no match" rather than an error (§6).
    pub fn contains<K: IntoPrefixKey>(&self, key: K) -> bool {
        match self.key_of(key) {
            Ok(query) => self.trie.search_best(&query, true).is_some(),
            Err(_) => false,
        }
    }

    /// Stores `value` under `key`, replacing (and releasing) any prior
    /// value at an exact match.
    pub fn insert<K: IntoPrefixKey>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<Option<V>, PrefixMapError> {
        let query = self.key_of(key)?;
        self.insert_prefix(query, value)
    }

    /// As [`Self::insert`], but overriding the key's own parsed length.
    pub fn insert_with_len<K: IntoPrefixKey>(
        &mut self,
        key: K,
        prefixlen: u8,
        value: V,
    ) -> Result<Option<V>, PrefixMapError> {
        let query = key.into_prefix_key_with_len(
            self.options.family,
            self.options.maxbits,
            prefixlen,
        )?;
        self.insert_prefix(query, value)
    }

    fn insert_prefix(
        &mut self,
        query: crate::prefix::Prefix,
        value: V,
    ) -> Result<Option<V>, PrefixMapError> {
        if self.trie.frozen {
            return Err(PrefixMapError::Frozen);
        }
        let slot = self.trie.lookup_or_create(&query)?;
        let id = match slot {
            Slotted::Existing(id) => id,
            Slotted::Created(id) => id,
        };
        self.lifecycle.acquire(&value);
        let old = self.trie.set_value(id, value);
        if let Some(old_value) = &old {
            self.lifecycle.release(old_value);
        } else {
            self.trie.real_count += 1;
        }
        debug!("insert: len now {}", self.trie.len());
        Ok(old)
    }

    /// Removes the exact match for `key`.
    pub fn delete<K: IntoPrefixKey>(
        &mut self,
        key: K,
    ) -> Result<V, PrefixMapError> {
        if self.trie.frozen {
            return Err(PrefixMapError::Frozen);
        }
        let query = self.key_of(key)?;
        let id = self
            .trie
            .search_exact(&query)
            .ok_or(PrefixMapError::NotFound)?;
        let value = self.trie.remove_real(id);
        self.lifecycle.release(&value);
        self.trie.real_count -= 1;
        Ok(value)
    }

    /// All stored keys, in walk order.
    pub fn keys(&self) -> Vec<Key> {
        self.trie
            .walk_real()
            .into_iter()
            .map(|id| {
                key::render(
                    &self.trie.prefix_of(id),
                    self.options.raw_output,
                )
            })
            .collect()
    }

    /// Number of stored (real) entries.
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.len() == 0
    }

    /// Strict descendants of the exact match for `key`.
    pub fn children<K: IntoPrefixKey>(
        &self,
        key: K,
    ) -> Result<Vec<Key>, PrefixMapError> {
        let query = self.key_of(key)?;
        let base = self
            .trie
            .search_exact(&query)
            .ok_or(PrefixMapError::NotFound)?;
        Ok(self
            .trie
            .children_of(base)
            .into_iter()
            .map(|id| {
                key::render(
                    &self.trie.prefix_of(id),
                    self.options.raw_output,
                )
            })
            .collect())
    }

    /// Nearest proper ancestor of the exact match for `key`, if any.
    pub fn parent<K: IntoPrefixKey>(
        &self,
        key: K,
    ) -> Result<Option<Key>, PrefixMapError> {
        let query = self.key_of(key)?;
        self.trie
            .search_exact(&query)
            .ok_or(PrefixMapError::NotFound)?;
        Ok(self.trie.search_best(&query, false).map(|id| {
            key::render(
                &self.trie.prefix_of(id),
                self.options.raw_output,
            )
        }))
    }

    /// Compacts all nodes into a contiguous arena; mutation is rejected
    /// until [`Self::thaw`]. Idempotent.
    pub fn freeze(&mut self) {
        self.trie.freeze();
    }

    /// Inverse of [`Self::freeze`]. Idempotent.
    pub fn thaw(&mut self) {
        self.trie.thaw();
    }

    pub fn is_frozen(&self) -> bool {
        self.trie.frozen
    }

    /// Access to the configured lifecycle hook, mainly useful for callers
    /// (and tests) that need to inspect bookkeeping `L` accumulates.
    pub fn lifecycle(&self) -> &L {
        &self.lifecycle
    }
}

/// Destruction (§5): walk every remaining real node and release its value
/// through the lifecycle hook before the arena itself is freed, so
/// `#acquire == #release` holds for a map dropped with live entries still
/// in it, not only one emptied by explicit `delete` calls first.
impl<V, L: ValueLifecycle<V>> Drop for PrefixMap<V, L> {
    fn drop(&mut self) {
        for id in self.trie.walk_real() {
            if let Some(value) = self.trie.value_of(id) {
                self.lifecycle.release(value);
            }
        }
    }
}

impl<'a, V, L> IntoIterator for &'a PrefixMap<V, L> {
    type Item = Key;
    type IntoIter = std::vec::IntoIter<Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys().into_iter()
    }
}

/// The on-disk/on-wire form of a frozen [`PrefixMap`] (§6's "Persisted
/// state layout"): the header, the node arena's byte image, and the
/// ordered value list.
#[derive(Serialize, Deserialize)]
pub struct Snapshot<V> {
    family: crate::family::Family,
    maxbits: u8,
    raw_output: bool,
    node_count: u32,
    head: u32,
    nodes: Vec<u8>,
    values: Vec<Option<V>>,
}

impl<V: Clone, L: ValueLifecycle<V> + Default> PrefixMap<V, L> {
    /// Serializes a frozen map. Requires the map to already be frozen —
    /// call [`Self::freeze`] first.
    pub fn to_snapshot(&self) -> Result<Snapshot<V>, PrefixMapError> {
        if !self.trie.frozen {
            return Err(PrefixMapError::Frozen);
        }
        let (nodes, node_count, head) = self.trie.snapshot_parts();
        Ok(Snapshot {
            family: self.options.family,
            maxbits: self.options.maxbits,
            raw_output: self.options.raw_output,
            node_count,
            head,
            nodes,
            values: self.trie.cloned_values(),
        })
    }

    /// Restores a map from a snapshot produced by [`Self::to_snapshot`].
    /// The result is frozen; call [`Self::thaw`] to mutate it.
    pub fn from_snapshot(
        snapshot: Snapshot<V>,
    ) -> Result<Self, PrefixMapError> {
        let trie = Trie::from_snapshot_parts(
            snapshot.family,
            snapshot.maxbits,
            &snapshot.nodes,
            snapshot.node_count,
            if snapshot.head == u32::MAX { NIL } else { snapshot.head },
            snapshot.values,
        )?;
        let options = PrefixMapOptions {
            maxbits: snapshot.maxbits,
            family: snapshot.family,
            raw_output: snapshot.raw_output,
        };
        Ok(PrefixMap {
            trie,
            options,
            lifecycle: L::default(),
        })
    }
}

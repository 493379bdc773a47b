//! Set operations over sequences and tables

pub mod comparer;
mod duplicates;
mod row_diff;

use std::convert::Infallible;
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;

pub use comparer::{ComparerSet, Key, KeyComparer, KeyComparerBuilder};
pub use duplicates::{duplicates, duplicates_with_indices, missing_elements};
pub use row_diff::{RowMatcher, RowUpdate, TableInsertUpdate};

/// Outer elements split by membership in the inner sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertUpdate<T> {
    /// Outer elements absent from inner, in outer order
    pub inserts: Vec<T>,
    /// Outer elements present in inner, in outer order
    pub updates: Vec<T>,
}

impl<T> InsertUpdate<T> {
    fn new() -> Self {
        Self {
            inserts: Vec::new(),
            updates: Vec::new(),
        }
    }

    /// Whether anything would be inserted
    pub fn has_inserts(&self) -> bool {
        !self.inserts.is_empty()
    }
}

impl<T> Default for InsertUpdate<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn fx_hash<H: Hash + ?Sized>(value: &H) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

fn infallible<T>(result: std::result::Result<T, Infallible>) -> T {
    match result {
        Ok(v) => v,
        Err(never) => match never {},
    }
}

/// Set difference and insert/update partitioning.
///
/// Every operation walks the outer sequence once, after the inner side has
/// been indexed by hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetDiff {
    distinct: bool,
}

impl SetDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            distinct: config.distinct,
        }
    }

    /// Drop repeated elements (or keys) from the output
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Elements of `outer` that do not occur in `inner`
    pub fn difference<T, I, O>(&self, inner: I, outer: O) -> Vec<T>
    where
        T: Eq + Hash,
        I: IntoIterator<Item = T>,
        O: IntoIterator<Item = T>,
    {
        self.insert_update(inner, outer).inserts
    }

    /// Elements of `outer` whose key does not occur among the keys of `inner`
    pub fn difference_by_key<T, K, F, I, O>(&self, inner: I, outer: O, key: F) -> Vec<T>
    where
        K: Eq + Hash,
        F: Fn(&T) -> K,
        I: IntoIterator<Item = T>,
        O: IntoIterator<Item = T>,
    {
        self.insert_update_by_key(inner, outer, key).inserts
    }

    /// Elements of `outer` that no element of `inner` equals under `comparer`
    pub fn difference_with<'a, T, I, O>(
        &self,
        inner: I,
        outer: O,
        comparer: &KeyComparer<T>,
    ) -> Result<Vec<&'a T>>
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
        O: IntoIterator<Item = &'a T>,
    {
        Ok(self.insert_update_with(inner, outer, comparer)?.inserts)
    }

    /// Partition `outer` by membership in `inner`
    pub fn insert_update<T, I, O>(&self, inner: I, outer: O) -> InsertUpdate<T>
    where
        T: Eq + Hash,
        I: IntoIterator<Item = T>,
        O: IntoIterator<Item = T>,
    {
        let inner: FxHashSet<T> = inner.into_iter().collect();
        infallible(self.partition(
            outer,
            |x| Ok((inner.contains(x), fx_hash(x))),
            |a, b| Ok(a == b),
        ))
    }

    /// Partition `outer` by membership of each element's key among inner keys
    pub fn insert_update_by_key<T, K, F, I, O>(&self, inner: I, outer: O, key: F) -> InsertUpdate<T>
    where
        K: Eq + Hash,
        F: Fn(&T) -> K,
        I: IntoIterator<Item = T>,
        O: IntoIterator<Item = T>,
    {
        let inner: FxHashSet<K> = inner.into_iter().map(|x| key(&x)).collect();
        infallible(self.partition(
            outer,
            |x| {
                let k = key(x);
                Ok((inner.contains(&k), fx_hash(&k)))
            },
            |a, b| Ok(key(a) == key(b)),
        ))
    }

    /// Partition `outer` by membership in `inner` under `comparer`.
    ///
    /// A predicate-only comparer is honored with linear scans. In key mode
    /// every key of both sequences must share one shape, otherwise
    /// `ShapeMismatch`.
    pub fn insert_update_with<'a, T, I, O>(
        &self,
        inner: I,
        outer: O,
        comparer: &KeyComparer<T>,
    ) -> Result<InsertUpdate<&'a T>>
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
        O: IntoIterator<Item = &'a T>,
    {
        let mut set = ComparerSet::new(comparer);
        for item in inner {
            set.insert(item)?;
        }
        self.partition(
            outer,
            |x| {
                set.observe(x)?;
                let hash = if comparer.has_key() {
                    comparer.hash_code(x)?
                } else {
                    0
                };
                Ok((set.contains(x)?, hash))
            },
            |a, b| comparer.equals(a, b),
        )
    }

    /// Walk `outer` once, routing each element by `lookup`, which reports
    /// inner membership and a hash consistent with `same`. The hash and
    /// `same` are only used to drop repeats when distinct output is on.
    fn partition<T, E, O, P, S>(
        &self,
        outer: O,
        mut lookup: P,
        same: S,
    ) -> std::result::Result<InsertUpdate<T>, E>
    where
        O: IntoIterator<Item = T>,
        P: FnMut(&T) -> std::result::Result<(bool, u64), E>,
        S: Fn(&T, &T) -> std::result::Result<bool, E>,
    {
        let mut out = InsertUpdate::new();
        let mut seen: [FxHashMap<u64, Vec<usize>>; 2] = Default::default();

        for item in outer {
            let (present, hash) = lookup(&item)?;
            let (target, seen) = if present {
                (&mut out.updates, &mut seen[1])
            } else {
                (&mut out.inserts, &mut seen[0])
            };

            if self.distinct {
                let bucket = seen.entry(hash).or_default();
                let mut repeated = false;
                for &idx in bucket.iter() {
                    if same(&target[idx], &item)? {
                        repeated = true;
                        break;
                    }
                }
                if repeated {
                    continue;
                }
                bucket.push(target.len());
            }
            target.push(item);
        }

        Ok(out)
    }
}

/// Elements of `outer` that do not occur in `inner`
pub fn difference<T, I, O>(inner: I, outer: O) -> Vec<T>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
    O: IntoIterator<Item = T>,
{
    SetDiff::new().difference(inner, outer)
}

/// Elements of `outer` whose key does not occur among the keys of `inner`
pub fn difference_by_key<T, K, F, I, O>(inner: I, outer: O, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
    I: IntoIterator<Item = T>,
    O: IntoIterator<Item = T>,
{
    SetDiff::new().difference_by_key(inner, outer, key)
}

/// Partition `outer` into elements missing from `inner` and elements present in it
pub fn insert_update<T, I, O>(inner: I, outer: O) -> InsertUpdate<T>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
    O: IntoIterator<Item = T>,
{
    SetDiff::new().insert_update(inner, outer)
}

/// Whether `value` equals any element of `collection`
pub fn is_in<'a, T, I>(value: &T, collection: I) -> bool
where
    T: PartialEq + 'a,
    I: IntoIterator<Item = &'a T>,
{
    collection.into_iter().any(|x| x == value)
}

/// Whether any element of `collection` satisfies `predicate`
pub fn is_in_by<'a, T, I, P>(collection: I, mut predicate: P) -> bool
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    P: FnMut(&T) -> bool,
{
    collection.into_iter().any(|x| predicate(x))
}

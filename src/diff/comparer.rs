//! Key-based equality comparer

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::error::{Error, Result};
use crate::model::Value;

/// Surrogate key extracted from a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Scalar(Value),
    /// Ordered components, compared element-wise
    Composite(Vec<Value>),
}

impl Key {
    fn describe(&self) -> String {
        match self {
            Key::Scalar(v) => format!("{} `{}`", v.kind(), v.display()),
            Key::Composite(vs) => {
                let kinds: Vec<_> = vs.iter().map(|v| v.kind()).collect();
                format!("({})", kinds.join(", "))
            }
        }
    }
}

fn fx_hash<H: Hash + ?Sized>(value: &H) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Composite keys XOR their component hashes
fn key_hash(key: &Key) -> u64 {
    match key {
        Key::Scalar(v) => fx_hash(v),
        Key::Composite(vs) => vs.iter().fold(0, |acc, v| acc ^ fx_hash(v)),
    }
}

/// Layout of a key: scalar or composite arity, plus the kind of every
/// non-null slot. `None` marks a slot only seen as null so far.
#[derive(Debug, Clone, PartialEq)]
enum KeyShape {
    Scalar(Option<&'static str>),
    Composite(Vec<Option<&'static str>>),
}

fn slot_kind(v: &Value) -> Option<&'static str> {
    (!v.is_null()).then(|| v.kind())
}

impl KeyShape {
    fn of(key: &Key) -> Self {
        match key {
            Key::Scalar(v) => KeyShape::Scalar(slot_kind(v)),
            Key::Composite(vs) => KeyShape::Composite(vs.iter().map(slot_kind).collect()),
        }
    }

    fn describe(&self) -> String {
        let name = |k: &Option<&'static str>| k.unwrap_or("null");
        match self {
            KeyShape::Scalar(k) => name(k).to_string(),
            KeyShape::Composite(ks) => {
                let kinds: Vec<_> = ks.iter().map(name).collect();
                format!("({})", kinds.join(", "))
            }
        }
    }

    /// Fails with `ShapeMismatch` if `key` cannot be compared with keys of this shape
    fn check(&self, key: &Key) -> Result<()> {
        let slot = |expected: &Option<&'static str>, v: &Value| match (expected, slot_kind(v)) {
            (Some(left), Some(right)) if *left != right => Err(Error::ShapeMismatch {
                left: left.to_string(),
                right: right.to_string(),
            }),
            _ => Ok(()),
        };
        match (self, key) {
            (KeyShape::Scalar(k), Key::Scalar(v)) => slot(k, v),
            (KeyShape::Composite(ks), Key::Composite(vs)) if ks.len() == vs.len() => {
                ks.iter().zip(vs).try_for_each(|(k, v)| slot(k, v))
            }
            _ => Err(Error::ShapeMismatch {
                left: self.describe(),
                right: key.describe(),
            }),
        }
    }

    /// Fill slots seen only as null with the kinds in `key`
    fn absorb(&mut self, key: &Key) {
        match (self, key) {
            (KeyShape::Scalar(k @ None), Key::Scalar(v)) => *k = slot_kind(v),
            (KeyShape::Composite(ks), Key::Composite(vs)) => {
                for (k, v) in ks.iter_mut().zip(vs) {
                    if k.is_none() {
                        *k = slot_kind(v);
                    }
                }
            }
            _ => {}
        }
    }
}

impl From<Value> for Key {
    fn from(v: Value) -> Self {
        Key::Scalar(v)
    }
}

impl From<Vec<Value>> for Key {
    fn from(vs: Vec<Value>) -> Self {
        Key::Composite(vs)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Scalar(Value::Int(i))
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Scalar(Value::from(i))
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Scalar(Value::Bool(b))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Scalar(Value::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Scalar(Value::from(s))
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key::Composite(vec![a.into(), b.into()])
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for Key {
    fn from((a, b, c): (A, B, C)) -> Self {
        Key::Composite(vec![a.into(), b.into(), c.into()])
    }
}

type KeyFn<T> = Box<dyn Fn(&T) -> Key + Send + Sync>;
type PredicateFn<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

enum Strategy<T> {
    Key(KeyFn<T>),
    Predicate(PredicateFn<T>),
}

/// Equality and hashing over `T` through a key extractor or a predicate.
///
/// The strategy is chosen at construction and never changes.
pub struct KeyComparer<T> {
    strategy: Strategy<T>,
}

impl<T> KeyComparer<T> {
    /// Compare by an extracted key
    pub fn by_key<K, F>(extract: F) -> Self
    where
        K: Into<Key>,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self {
            strategy: Strategy::Key(Box::new(move |x| extract(x).into())),
        }
    }

    /// Compare with a binary predicate. Such a comparer cannot hash.
    pub fn by_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            strategy: Strategy::Predicate(Box::new(predicate)),
        }
    }

    pub fn builder() -> KeyComparerBuilder<T> {
        KeyComparerBuilder {
            key: None,
            predicate: None,
        }
    }

    /// Whether this comparer extracts keys (and can therefore hash)
    pub fn has_key(&self) -> bool {
        matches!(self.strategy, Strategy::Key(_))
    }

    /// Extracted key, if in key mode
    pub fn key_of(&self, obj: &T) -> Option<Key> {
        match &self.strategy {
            Strategy::Key(extract) => Some(extract(obj)),
            Strategy::Predicate(_) => None,
        }
    }

    /// Compare two objects
    pub fn equals(&self, x: &T, y: &T) -> Result<bool> {
        match &self.strategy {
            Strategy::Predicate(predicate) => Ok(predicate(x, y)),
            Strategy::Key(extract) => keys_equal(&extract(x), &extract(y)),
        }
    }

    /// Hash an object's key. Composite keys XOR their component hashes.
    pub fn hash_code(&self, obj: &T) -> Result<u64> {
        match &self.strategy {
            Strategy::Predicate(_) => Err(Error::HashUnavailable),
            Strategy::Key(extract) => Ok(key_hash(&extract(obj))),
        }
    }

    /// First occurrence of every distinct element, in order
    pub fn distinct<'a, I>(&self, items: I) -> Result<Vec<&'a T>>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let mut set = ComparerSet::new(self);
        for item in items {
            set.insert(item)?;
        }
        Ok(set.into_items())
    }

    /// Elements grouped by equality; groups in order of first appearance
    pub fn group<'a, I>(&self, items: I) -> Result<Vec<Vec<&'a T>>>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let mut set = ComparerSet::new(self);
        let mut groups: Vec<Vec<&'a T>> = Vec::new();
        for item in items {
            match set.find(item)? {
                Some(idx) => groups[idx].push(item),
                None => {
                    set.insert(item)?;
                    groups.push(vec![item]);
                }
            }
        }
        Ok(groups)
    }

    /// Elements that occur more than once, grouped together.
    /// With `distinct`, each repeated element is returned once.
    pub fn duplicates<'a, I>(&self, items: I, distinct: bool) -> Result<Vec<&'a T>>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let groups = self.group(items)?;
        Ok(groups
            .into_iter()
            .filter(|g| g.len() > 1)
            .flat_map(|g| {
                let take = if distinct { 1 } else { g.len() };
                g.into_iter().take(take)
            })
            .collect())
    }

    /// Whether any element equals `value`
    pub fn contains<'a, I>(&self, items: I, value: &T) -> Result<bool>
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for item in items {
            if self.equals(item, value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<T> std::fmt::Debug for KeyComparer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.has_key() { "key" } else { "predicate" };
        f.debug_struct("KeyComparer").field("mode", &mode).finish()
    }
}

fn values_equal(a: &Value, b: &Value) -> Result<bool> {
    if !a.is_null() && !b.is_null() && a.kind() != b.kind() {
        return Err(Error::ShapeMismatch {
            left: a.kind().to_string(),
            right: b.kind().to_string(),
        });
    }
    Ok(a == b)
}

fn keys_equal(a: &Key, b: &Key) -> Result<bool> {
    match (a, b) {
        (Key::Scalar(x), Key::Scalar(y)) => values_equal(x, y),
        (Key::Composite(xs), Key::Composite(ys)) if xs.len() == ys.len() => {
            let mut equal = true;
            for (x, y) in xs.iter().zip(ys) {
                equal &= values_equal(x, y)?;
            }
            Ok(equal)
        }
        _ => Err(Error::ShapeMismatch {
            left: a.describe(),
            right: b.describe(),
        }),
    }
}

/// Builds a comparer from exactly one strategy
pub struct KeyComparerBuilder<T> {
    key: Option<KeyFn<T>>,
    predicate: Option<PredicateFn<T>>,
}

impl<T> KeyComparerBuilder<T> {
    pub fn key<K, F>(mut self, extract: F) -> Self
    where
        K: Into<Key>,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.key = Some(Box::new(move |x| extract(x).into()));
        self
    }

    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn build(self) -> Result<KeyComparer<T>> {
        let strategy = match (self.key, self.predicate) {
            (Some(key), None) => Strategy::Key(key),
            (None, Some(predicate)) => Strategy::Predicate(predicate),
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "a key extractor or an equality predicate is required".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgument(
                    "a comparer takes a key extractor or an equality predicate, not both"
                        .to_string(),
                ))
            }
        };
        Ok(KeyComparer { strategy })
    }
}

/// Insertion-ordered set whose equality comes from a [`KeyComparer`].
///
/// Hashed buckets in key mode, a linear scan in predicate mode. In key mode
/// the set remembers the shape of the keys it has seen, and any key of a
/// different shape is a `ShapeMismatch`, whichever bucket it hashes to.
pub struct ComparerSet<'c, 'a, T> {
    comparer: &'c KeyComparer<T>,
    items: Vec<&'a T>,
    buckets: FxHashMap<u64, Vec<usize>>,
    shape: Option<KeyShape>,
}

impl<'c, 'a, T> ComparerSet<'c, 'a, T> {
    pub fn new(comparer: &'c KeyComparer<T>) -> Self {
        Self {
            comparer,
            items: Vec::new(),
            buckets: FxHashMap::default(),
            shape: None,
        }
    }

    /// Index of a stored element equal to `item`
    pub fn find(&self, item: &T) -> Result<Option<usize>> {
        if let Some(key) = self.comparer.key_of(item) {
            if let Some(shape) = &self.shape {
                shape.check(&key)?;
            }
            for &idx in self.buckets.get(&key_hash(&key)).into_iter().flatten() {
                if self.comparer.equals(self.items[idx], item)? {
                    return Ok(Some(idx));
                }
            }
            return Ok(None);
        }
        for (idx, stored) in self.items.iter().enumerate() {
            if self.comparer.equals(stored, item)? {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }

    /// Check `item`'s key against the keys seen so far and remember its
    /// shape, without storing the item
    pub fn observe(&mut self, item: &T) -> Result<()> {
        if let Some(key) = self.comparer.key_of(item) {
            self.observe_key(&key)?;
        }
        Ok(())
    }

    fn observe_key(&mut self, key: &Key) -> Result<()> {
        match &mut self.shape {
            Some(shape) => {
                shape.check(key)?;
                shape.absorb(key);
            }
            None => self.shape = Some(KeyShape::of(key)),
        }
        Ok(())
    }

    /// Add `item` unless an equal element is stored. Returns `true` if added.
    pub fn insert(&mut self, item: &'a T) -> Result<bool> {
        if self.find(item)?.is_some() {
            return Ok(false);
        }
        if let Some(key) = self.comparer.key_of(item) {
            self.observe_key(&key)?;
            self.buckets
                .entry(key_hash(&key))
                .or_default()
                .push(self.items.len());
        }
        self.items.push(item);
        Ok(true)
    }

    pub fn contains(&self, item: &T) -> Result<bool> {
        Ok(self.find(item)?.is_some())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<&'a T> {
        self.items
    }
}

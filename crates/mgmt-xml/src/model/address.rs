//! Resource addresses.
//!
//! An [`Address`] is an immutable path of `(key, value)` pairs. Appending a
//! level shares the existing path instead of copying it, so an address handed
//! to an emitted operation can never be changed by later appends made while
//! the parser walks deeper into the document.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct Segment {
    key: String,
    value: String,
    parent: Option<Arc<Segment>>,
}

/// A persistent hierarchical resource address.
#[derive(Clone, Default)]
pub struct Address {
    last: Option<Arc<Segment>>,
    len: usize,
}

impl Address {
    /// The empty address (the model root).
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds an address from root-first pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .fold(Self::root(), |addr, (k, v)| addr.append(k, v))
    }

    /// Returns a new address one level deeper. The receiver is unchanged.
    pub fn append(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            last: Some(Arc::new(Segment {
                key: key.into(),
                value: value.into(),
                parent: self.last.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Returns this address re-rooted under `prefix`.
    pub fn prefixed_with(&self, prefix: &Address) -> Self {
        self.pairs()
            .into_iter()
            .fold(prefix.clone(), |addr, (k, v)| addr.append(k, v))
    }

    /// Returns the address one level up, or the root for the root.
    pub fn parent(&self) -> Self {
        match &self.last {
            Some(segment) => Self {
                last: segment.parent.clone(),
                len: self.len - 1,
            },
            None => Self::root(),
        }
    }

    /// Returns the deepest `(key, value)` pair.
    pub fn last(&self) -> Option<(&str, &str)> {
        self.last
            .as_deref()
            .map(|s| (s.key.as_str(), s.value.as_str()))
    }

    /// Returns the pairs in root-first order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.len);
        let mut cursor = self.last.as_deref();
        while let Some(segment) = cursor {
            pairs.push((segment.key.as_str(), segment.value.as_str()));
            cursor = segment.parent.as_deref();
        }
        pairs.reverse();
        pairs
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if `prefix` is a (non-strict) prefix of this address.
    pub fn starts_with(&self, prefix: &Address) -> bool {
        if prefix.len > self.len {
            return false;
        }
        let mut cursor = self.clone();
        while cursor.len > prefix.len {
            cursor = cursor.parent();
        }
        cursor == *prefix
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let mut a = self.last.as_ref();
        let mut b = other.last.as_ref();
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if Arc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.key != y.key || x.value != y.value {
                        return false;
                    }
                    a = x.parent.as_ref();
                    b = y.parent.as_ref();
                }
                _ => return false,
            }
        }
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        for (k, v) in self.pairs() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("/");
        }
        for (k, v) in self.pairs() {
            write!(f, "/{k}={v}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

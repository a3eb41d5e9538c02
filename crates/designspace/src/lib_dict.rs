//! Instance `lib` dictionary.

use indexmap::IndexMap;

/// A scalar plist value from an instance `<lib>`.
#[derive(Debug, Clone, PartialEq)]
pub enum LibValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(String),
    /// Containers, data and dates; kept only so the key is known to exist.
    Other,
}

impl LibValue {
    /// Truthiness as the Glyphs export flag is interpreted.
    pub fn is_truthy(&self) -> bool {
        match self {
            LibValue::Bool(b) => *b,
            LibValue::Integer(i) => *i != 0,
            LibValue::Real(r) => *r != 0.0,
            LibValue::String(s) => !s.is_empty(),
            LibValue::Other => true,
        }
    }
}

/// Key/value pairs of an instance `<lib><dict>`, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceLib {
    entries: IndexMap<String, LibValue>,
}

impl InstanceLib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&LibValue> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: LibValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, LibValue)> for InstanceLib {
    fn from_iter<I: IntoIterator<Item = (K, LibValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

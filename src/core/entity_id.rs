//! Entity identification - WHICH declaration (suite + name).
//!
//! EntityId uniquely identifies a library, project or distribution across
//! every loaded suite. It's interned for cheap comparison and copying.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{LazyLock, RwLock};

use serde::{Deserialize, Serialize};

/// Global entity ID interner
static ENTITY_INTERNER: LazyLock<RwLock<HashMap<EntityIdInner, &'static EntityIdInner>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// A unique identifier for a declared entity (interned).
///
/// EntityIds are `Copy` and compare by pointer.
#[derive(Clone, Copy)]
pub struct EntityId {
    inner: &'static EntityIdInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityIdInner {
    suite: String,
    name: String,
}

impl EntityId {
    /// Create a new entity ID.
    pub fn new(suite: impl Into<String>, name: impl Into<String>) -> Self {
        Self::intern(EntityIdInner {
            suite: suite.into(),
            name: name.into(),
        })
    }

    fn intern(inner: EntityIdInner) -> Self {
        {
            let interner = ENTITY_INTERNER
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(&interned) = interner.get(&inner) {
                return EntityId { inner: interned };
            }
        }

        let mut interner = ENTITY_INTERNER
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Double-check after acquiring write lock
        if let Some(&interned) = interner.get(&inner) {
            return EntityId { inner: interned };
        }

        let leaked: &'static EntityIdInner = Box::leak(Box::new(inner.clone()));
        interner.insert(inner, leaked);

        EntityId { inner: leaked }
    }

    /// Name of the suite that declares the entity.
    pub fn suite(&self) -> &'static str {
        &self.inner.suite
    }

    /// Entity name within its suite.
    pub fn name(&self) -> &'static str {
        &self.inner.name
    }

    /// Parse a `suite:name` string.
    pub fn parse(s: &str) -> Option<Self> {
        let (suite, name) = s.split_once(':')?;
        if suite.is_empty() || name.is_empty() || name.contains(':') {
            return None;
        }
        Some(EntityId::new(suite, name))
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.inner, state)
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner
            .suite
            .cmp(&other.inner.suite)
            .then_with(|| self.inner.name.cmp(&other.inner.name))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}:{})", self.inner.suite, self.inner.name)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.inner.suite, self.inner.name)
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntityId::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid entity id `{}`", s)))
    }
}

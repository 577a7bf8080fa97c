//! Export profiles as seen by the engine.
//!
//! Profiles are created and destroyed by the host. The engine only reads
//! their export roots and include references.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Stable identity of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProfileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A named export profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    /// Folders packaged by this profile, in declaration order.
    #[serde(default)]
    pub roots: Vec<String>,
    /// Other profiles bundled into this one. May name profiles that no
    /// longer exist.
    #[serde(default)]
    pub includes: Vec<ProfileId>,
}

impl Profile {
    pub fn new(id: impl Into<ProfileId>) -> Self {
        Self {
            id: id.into(),
            roots: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// Add an export root.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Add an included profile reference.
    pub fn including(mut self, id: impl Into<ProfileId>) -> Self {
        self.includes.push(id.into());
        self
    }

    /// Whether this profile bundles other profiles.
    pub fn is_composite(&self) -> bool {
        !self.includes.is_empty()
    }

    /// Whether `other` differs in anything the cached scan depends on.
    pub fn scan_inputs_differ(&self, other: &Profile) -> bool {
        self.roots != other.roots || self.includes != other.includes
    }
}

/// Ordered set of the host's open profiles.
#[derive(Debug, Default, Clone)]
pub struct ProfileRegistry {
    profiles: IndexMap<ProfileId, Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile, returning the previous definition.
    pub fn upsert(&mut self, profile: Profile) -> Option<Profile> {
        self.profiles.insert(profile.id.clone(), profile)
    }

    /// Remove a profile, keeping the order of the rest.
    pub fn remove(&mut self, id: &ProfileId) -> Option<Profile> {
        self.profiles.shift_remove(id)
    }

    pub fn get(&self, id: &ProfileId) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &ProfileId) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<Profile> for ProfileRegistry {
    fn from_iter<T: IntoIterator<Item = Profile>>(iter: T) -> Self {
        let mut registry = Self::new();
        for profile in iter {
            registry.upsert(profile);
        }
        registry
    }
}

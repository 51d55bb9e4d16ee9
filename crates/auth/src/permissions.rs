use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

/// The wildcard token granting every permission.
pub const WILDCARD: &str = "*";

/// Canonicalize a raw permission string for comparison.
///
/// Trims surrounding whitespace, lowercases, and turns `:` separators into
/// `.`, so `"Invoices:Create"` and `"invoices.create"` compare equal.
/// Blank input normalizes to the empty string; callers drop it.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase().replace(':', ".")
}

/// Normalized capability token (e.g. "invoices.create").
///
/// Always holds the output of [`normalize`] and is never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Normalize `raw`; returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn wildcard() -> Self {
        Self(WILDCARD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Permission::parse(&raw).ok_or_else(|| serde::de::Error::custom("empty permission"))
    }
}

/// Validated set of normalized permission tokens.
///
/// Blank entries are dropped on construction, duplicates collapse
/// (`"A:b"` and `"a.b"` are the same token).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw strings, normalizing each entry.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(raw.into_iter().filter_map(|s| Permission::parse(s.as_ref())).collect())
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(Permission::is_wildcard)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    /// Entries of `required` not present in `self` (ignores the wildcard).
    pub fn missing_from<'a>(&self, required: &'a PermissionSet) -> Vec<&'a Permission> {
        required.iter().filter(|p| !self.contains(p)).collect()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Well-known permission tokens checked by the API surface.
pub mod known {
    pub const TEAM_INVITE: &str = "team.invite";
    pub const TEAM_VIEW: &str = "team.view";
    pub const INVOICES_VIEW: &str = "invoices.view";
    pub const INVOICES_CREATE: &str = "invoices.create";
    pub const EXPENSES_VIEW: &str = "expenses.view";
    pub const CLIENTS_VIEW: &str = "clients.view";
}

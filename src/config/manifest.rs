//! The `[packages]` table: manager name to package list.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Package manifest: manager name to the ordered list of packages it owns.
///
/// Serialized as the `[packages]` table of the configuration file:
///
/// ```toml
/// [packages]
/// brew = ["git", "ripgrep"]
/// npm = ["typescript"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, Vec<String>>);

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when no manager lists any package.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Iterate over `(manager, packages)` pairs in manager-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Packages listed for `manager` (empty when absent).
    #[must_use]
    pub fn packages(&self, manager: &str) -> &[String] {
        self.0.get(manager).map(Vec::as_slice).unwrap_or_default()
    }

    /// Append `packages` to `manager`'s list, skipping entries already
    /// present.  Returns the names that were actually added.
    pub fn add<I, S>(&mut self, manager: &str, packages: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.0.entry(manager.to_string()).or_default();
        let mut added = Vec::new();
        for pkg in packages {
            let pkg = pkg.into();
            if !list.contains(&pkg) {
                list.push(pkg.clone());
                added.push(pkg);
            }
        }
        if list.is_empty() {
            self.0.remove(manager);
        }
        added
    }

    /// Remove `packages` from `manager`'s list.  Returns the names that were
    /// present and removed.  A manager left with no packages is dropped.
    pub fn remove<S: AsRef<str>>(&mut self, manager: &str, packages: &[S]) -> Vec<String> {
        let Some(list) = self.0.get_mut(manager) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        list.retain(|existing| {
            let hit = packages.iter().any(|p| p.as_ref() == existing);
            if hit {
                removed.push(existing.clone());
            }
            !hit
        });
        if list.is_empty() {
            self.0.remove(manager);
        }
        removed
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for Manifest {
    fn from_iter<T: IntoIterator<Item = (K, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_count_as_empty() {
        let manifest: Manifest = [("brew", Vec::new())].into_iter().collect();
        assert!(manifest.is_empty());
        assert!(Manifest::new().is_empty());
    }

    #[test]
    fn add_skips_duplicates_and_preserves_order() {
        let mut manifest = Manifest::new();
        assert_eq!(manifest.add("brew", ["git", "jq"]), vec!["git", "jq"]);
        assert_eq!(manifest.add("brew", ["jq", "fd"]), vec!["fd"]);
        assert_eq!(manifest.packages("brew"), ["git", "jq", "fd"]);
    }

    #[test]
    fn remove_drops_empty_manager() {
        let mut manifest = Manifest::new();
        manifest.add("npm", ["typescript"]);
        assert_eq!(manifest.remove("npm", &["typescript", "eslint"]), vec!["typescript"]);
        assert!(manifest.iter().next().is_none());
    }

    #[test]
    fn remove_from_unknown_manager_is_noop() {
        let mut manifest = Manifest::new();
        assert!(manifest.remove("gem", &["rake"]).is_empty());
    }

    #[test]
    fn deserializes_as_plain_table() {
        let manifest: Manifest =
            toml::from_str("brew = [\"git\"]\npip = [\"black\", \"ruff\"]\n").unwrap();
        assert_eq!(manifest.packages("pip"), ["black", "ruff"]);
        let managers: Vec<&str> = manifest.iter().map(|(m, _)| m).collect();
        assert_eq!(managers, ["brew", "pip"]);
    }
}

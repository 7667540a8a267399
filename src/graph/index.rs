use std::collections::HashMap;

use crate::core::release::ReleaseId;
use crate::core::version::Version;

#[derive(Debug, Clone, Default)]
struct PackageEntry {
    versions: Vec<Version>,
    ids: HashMap<String, ReleaseId>,
}

/// Lookup tables from package identity to release nodes.
///
/// Keyed by the full name and version strings, so two distinct releases can
/// never share a slot.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    packages: HashMap<String, PackageEntry>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.lookup(name, version).is_some()
    }

    /// Records `(name, version) → id`. Returns `false` and leaves the index
    /// untouched when the pair is already known.
    pub fn insert(&mut self, name: &str, version: Version, id: ReleaseId) -> bool {
        let entry = self.packages.entry(name.to_string()).or_default();
        if entry.ids.contains_key(&version.raw) {
            return false;
        }
        entry.ids.insert(version.raw.clone(), id);
        entry.versions.push(version);
        true
    }

    pub fn lookup(&self, name: &str, version: &str) -> Option<ReleaseId> {
        self.packages
            .get(name)
            .and_then(|entry| entry.ids.get(version))
            .copied()
    }

    /// Every known version of `name`, in registration order.
    pub fn known_versions(&self, name: &str) -> &[Version] {
        self.packages
            .get(name)
            .map(|entry| entry.versions.as_slice())
            .unwrap_or(&[])
    }

    pub fn forget(&mut self, name: &str, version: &str) {
        let Some(entry) = self.packages.get_mut(name) else {
            return;
        };
        entry.ids.remove(version);
        entry.versions.retain(|known| known.raw != version);
        if entry.ids.is_empty() {
            self.packages.remove(name);
        }
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::release::ReleaseId;
    use crate::core::version::Version;
    use crate::graph::index::IdentityIndex;

    #[test]
    fn lookup_uses_full_strings() {
        let mut index = IdentityIndex::new();
        assert!(index.insert("a-b", Version::new("1.0.0"), ReleaseId::new(0)));
        assert!(index.insert("a", Version::new("b-1.0.0"), ReleaseId::new(1)));

        assert_eq!(index.lookup("a-b", "1.0.0"), Some(ReleaseId::new(0)));
        assert_eq!(index.lookup("a", "b-1.0.0"), Some(ReleaseId::new(1)));
        assert_eq!(index.lookup("a", "1.0.0"), None);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut index = IdentityIndex::new();
        assert!(index.insert("a", Version::new("1.0.0"), ReleaseId::new(0)));
        assert!(!index.insert("a", Version::new("1.0.0"), ReleaseId::new(5)));
        assert_eq!(index.lookup("a", "1.0.0"), Some(ReleaseId::new(0)));
        assert_eq!(index.known_versions("a").len(), 1);
    }

    #[test]
    fn forget_prunes_versions_and_empty_packages() {
        let mut index = IdentityIndex::new();
        index.insert("a", Version::new("1.0.0"), ReleaseId::new(0));
        index.insert("a", Version::new("2.0.0"), ReleaseId::new(1));

        index.forget("a", "1.0.0");
        assert_eq!(index.lookup("a", "1.0.0"), None);
        assert_eq!(
            index
                .known_versions("a")
                .iter()
                .map(|v| v.raw.as_str())
                .collect::<Vec<_>>(),
            vec!["2.0.0"]
        );

        index.forget("a", "2.0.0");
        assert_eq!(index.package_count(), 0);
        assert!(index.known_versions("a").is_empty());
    }
}

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::release::{PackageRelease, ReleaseId};
use crate::core::version::Version;

pub mod analytics;
pub mod builder;
pub mod filter;
pub mod index;
pub mod query;
pub mod store;

use index::IdentityIndex;
use store::GraphStore;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("release {name}-{version} has an invalid publish timestamp '{timestamp}': {source}")]
    InvalidTimestamp {
        name: String,
        version: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("time window starts at {begin} which is after its end {end}")]
    InvalidWindow {
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Release nodes, dependency edges and the identity index that names them.
///
/// Mutation (`register`, `add_dependency`, `remove_releases`) takes
/// `&mut self`, so a build or filter pass always finishes before any query
/// can observe the graph. Filters are destructive; clone the graph first to
/// keep an unfiltered copy.
#[derive(Debug, Clone, Default)]
pub struct ReleaseGraph {
    store: GraphStore,
    index: IdentityIndex,
}

impl ReleaseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the node for `name@version`. Returns `None` when that release
    /// is already registered, or once any release has been removed; the
    /// graph is left as is in both cases.
    pub fn register(
        &mut self,
        name: &str,
        version: &str,
        published: DateTime<Utc>,
    ) -> Option<ReleaseId> {
        if self.index.contains(name, version) {
            return None;
        }
        let version = Version::new(version);
        let id = self.store.create_release(name, version.clone(), published)?;
        self.index.insert(name, version, id);
        Some(id)
    }

    pub fn lookup(&self, name: &str, version: &str) -> Option<ReleaseId> {
        self.index.lookup(name, version)
    }

    pub fn resolve(&self, name: &str, version: &str) -> Option<&PackageRelease> {
        self.lookup(name, version).and_then(|id| self.release(id))
    }

    pub fn known_versions(&self, name: &str) -> &[Version] {
        self.index.known_versions(name)
    }

    pub fn release(&self, id: ReleaseId) -> Option<&PackageRelease> {
        self.store.release(id)
    }

    pub fn releases(&self) -> impl Iterator<Item = &PackageRelease> + '_ {
        self.store.releases()
    }

    pub fn release_ids(&self) -> Vec<ReleaseId> {
        self.store.release_ids()
    }

    pub fn release_count(&self) -> usize {
        self.store.release_count()
    }

    pub fn package_count(&self) -> usize {
        self.index.package_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.store.dependency_count()
    }

    pub fn add_dependency(&mut self, from: ReleaseId, to: ReleaseId) -> bool {
        self.store.add_dependency(from, to)
    }

    pub(crate) fn extend_dependencies(&mut self, from: ReleaseId, targets: &[ReleaseId]) {
        self.store.extend_dependencies(from, targets);
    }

    pub fn dependencies(&self, id: ReleaseId) -> Vec<ReleaseId> {
        self.store.dependencies(id)
    }

    pub fn dependents(&self, id: ReleaseId) -> Vec<ReleaseId> {
        self.store.dependents(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = (ReleaseId, ReleaseId)> + '_ {
        self.store.edges()
    }

    /// Removes the given releases with their incident edges and drops them
    /// from the identity index. Returns how many releases were removed.
    pub fn remove_releases(&mut self, doomed: &HashSet<ReleaseId>) -> usize {
        let removed = self.store.remove_releases(doomed);
        for release in &removed {
            self.index.forget(&release.name, &release.version.raw);
        }
        removed.len()
    }
}

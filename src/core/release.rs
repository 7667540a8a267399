use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use petgraph::stable_graph::NodeIndex;
use serde::Serialize;

use crate::core::version::Version;

/// Identifier of a release node. Assigned by the graph store when the node
/// is created and never handed out again for the life of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReleaseId(u32);

impl ReleaseId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn from_node(node: NodeIndex) -> Self {
        Self(node.index() as u32)
    }

    pub(crate) fn node(self) -> NodeIndex {
        NodeIndex::new(self.0 as usize)
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One published version of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRelease {
    pub id: ReleaseId,
    pub name: String,
    pub version: Version,
    pub published: DateTime<Utc>,
}

impl PackageRelease {
    /// Total order behind every "latest" decision: publish time, then
    /// semantic version, then the raw version text, then the lower id.
    /// `Ordering::Greater` means `self` is the later release.
    pub fn recency_cmp(&self, other: &PackageRelease) -> Ordering {
        self.published
            .cmp(&other.published)
            .then_with(|| self.version.compare(&other.version))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl fmt::Display for PackageRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Picks the most recent release of every package name in `releases`.
pub fn latest_by_package<'a, I>(releases: I) -> HashMap<&'a str, &'a PackageRelease>
where
    I: IntoIterator<Item = &'a PackageRelease>,
{
    let mut latest: HashMap<&'a str, &'a PackageRelease> = HashMap::new();
    for release in releases {
        latest
            .entry(release.name.as_str())
            .and_modify(|current| {
                if release.recency_cmp(*current) == Ordering::Greater {
                    *current = release;
                }
            })
            .or_insert(release);
    }
    latest
}

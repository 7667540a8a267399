use std::collections::HashSet;

use chrono::{DateTime, Utc};
use petgraph::stable_graph::{EdgeIndex, StableDiGraph};
use petgraph::Direction;

use crate::core::release::{PackageRelease, ReleaseId};
use crate::core::version::Version;

/// Owns every release node and dependency edge.
///
/// Backed by a `StableDiGraph` so identifiers stay valid while other nodes
/// are removed. Releases are only created while a graph is being built; once
/// anything has been removed `create_release` refuses, so a freed slot is
/// never handed out again.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graph: StableDiGraph<PackageRelease, ()>,
    removed: usize,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_release(
        &mut self,
        name: &str,
        version: Version,
        published: DateTime<Utc>,
    ) -> Option<ReleaseId> {
        if self.removed > 0 {
            return None;
        }
        let node = self.graph.add_node(PackageRelease {
            id: ReleaseId::new(0),
            name: name.to_string(),
            version,
            published,
        });
        let id = ReleaseId::from_node(node);
        self.graph[node].id = id;
        Some(id)
    }

    pub fn contains(&self, id: ReleaseId) -> bool {
        self.graph.contains_node(id.node())
    }

    pub fn release(&self, id: ReleaseId) -> Option<&PackageRelease> {
        self.graph.node_weight(id.node())
    }

    pub fn releases(&self) -> impl Iterator<Item = &PackageRelease> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |node| self.graph.node_weight(node))
    }

    /// Live identifiers in ascending order.
    pub fn release_ids(&self) -> Vec<ReleaseId> {
        self.graph.node_indices().map(ReleaseId::from_node).collect()
    }

    pub fn release_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds `from → to` unless it is a self-loop or already present.
    pub fn add_dependency(&mut self, from: ReleaseId, to: ReleaseId) -> bool {
        if from == to || !self.contains(from) || !self.contains(to) {
            return false;
        }
        if self.graph.find_edge(from.node(), to.node()).is_some() {
            return false;
        }
        self.graph.add_edge(from.node(), to.node(), ());
        true
    }

    /// Bulk insert used by the builder's merge step. Callers guarantee the
    /// targets are live, distinct, and different from `from`.
    pub(crate) fn extend_dependencies(&mut self, from: ReleaseId, targets: &[ReleaseId]) {
        for to in targets {
            debug_assert_ne!(from, *to);
            self.graph.add_edge(from.node(), to.node(), ());
        }
    }

    /// Outgoing neighbours, ascending.
    pub fn dependencies(&self, id: ReleaseId) -> Vec<ReleaseId> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Incoming neighbours, ascending.
    pub fn dependents(&self, id: ReleaseId) -> Vec<ReleaseId> {
        self.neighbours(id, Direction::Incoming)
    }

    fn neighbours(&self, id: ReleaseId, direction: Direction) -> Vec<ReleaseId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out: Vec<ReleaseId> = self
            .graph
            .neighbors_directed(id.node(), direction)
            .map(ReleaseId::from_node)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn edges(&self) -> impl Iterator<Item = (ReleaseId, ReleaseId)> + '_ {
        self.graph.edge_indices().filter_map(move |edge| {
            self.graph
                .edge_endpoints(edge)
                .map(|(from, to)| (ReleaseId::from_node(from), ReleaseId::from_node(to)))
        })
    }

    /// Deletes every edge touching a doomed release, then the releases
    /// themselves. Returns the removed releases in ascending id order.
    pub fn remove_releases(&mut self, doomed: &HashSet<ReleaseId>) -> Vec<PackageRelease> {
        if doomed.is_empty() {
            return Vec::new();
        }

        let incident: Vec<EdgeIndex> = self
            .graph
            .edge_indices()
            .filter(|edge| {
                self.graph.edge_endpoints(*edge).is_some_and(|(from, to)| {
                    doomed.contains(&ReleaseId::from_node(from))
                        || doomed.contains(&ReleaseId::from_node(to))
                })
            })
            .collect();
        for edge in incident {
            self.graph.remove_edge(edge);
        }

        let mut ids: Vec<ReleaseId> = doomed.iter().copied().collect();
        ids.sort_unstable();
        let removed: Vec<PackageRelease> = ids
            .into_iter()
            .filter_map(|id| self.graph.remove_node(id.node()))
            .collect();
        self.removed += removed.len();
        removed
    }
}

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::release::{PackageRelease, ReleaseId};
use crate::graph::filter::in_window;
use crate::graph::ReleaseGraph;

/// Every release reachable from `name@version`, breadth first, root first.
/// Unknown roots yield an empty list.
pub fn transitive_closure(graph: &ReleaseGraph, name: &str, version: &str) -> Vec<PackageRelease> {
    match graph.lookup(name, version) {
        Some(root) => closure_from(graph, root),
        None => {
            debug!(%name, %version, "release not found");
            Vec::new()
        }
    }
}

pub fn closure_from(graph: &ReleaseGraph, root: ReleaseId) -> Vec<PackageRelease> {
    let Some(root_release) = graph.release(root) else {
        return Vec::new();
    };

    let mut seen: HashSet<ReleaseId> = HashSet::new();
    let mut queue: VecDeque<ReleaseId> = VecDeque::new();
    let mut out = vec![root_release.clone()];
    seen.insert(root);
    queue.push_back(root);

    while let Some(current) = queue.pop_front() {
        for next in graph.dependencies(current) {
            if !seen.insert(next) {
                continue;
            }
            if let Some(release) = graph.release(next) {
                out.push(release.clone());
            }
            queue.push_back(next);
        }
    }
    out
}

/// The root followed by the most recent reachable release of each
/// dependency package, in the order each package was first reached.
/// Empty when the root is unknown or reaches nothing.
pub fn latest_transitive_closure(
    graph: &ReleaseGraph,
    name: &str,
    version: &str,
) -> Vec<PackageRelease> {
    let closure = transitive_closure(graph, name, version);
    if closure.len() < 2 {
        return Vec::new();
    }

    let root = &closure[0];
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &PackageRelease> = HashMap::new();
    for release in &closure[1..] {
        match latest.get_mut(release.name.as_str()) {
            Some(current) => {
                if release.recency_cmp(*current) == Ordering::Greater {
                    *current = release;
                }
            }
            None => {
                order.push(release.name.as_str());
                latest.insert(release.name.as_str(), release);
            }
        }
    }

    let mut out = Vec::with_capacity(order.len() + 1);
    out.push(root.clone());
    out.extend(
        order
            .into_iter()
            .filter_map(|package| latest.get(package).map(|release| (*release).clone())),
    );
    out
}

/// Releases published inside `[begin, end]`, oldest first. Leaves the graph
/// untouched.
pub fn releases_between(
    graph: &ReleaseGraph,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<PackageRelease> {
    let mut out: Vec<PackageRelease> = graph
        .releases()
        .filter(|release| in_window(release.published, begin, end))
        .cloned()
        .collect();
    out.sort_by(|a, b| a.published.cmp(&b.published).then(a.id.cmp(&b.id)));
    out
}

/// Releases that declare a satisfied dependency on `name@version`.
pub fn direct_dependents(graph: &ReleaseGraph, name: &str, version: &str) -> Vec<PackageRelease> {
    let Some(target) = graph.lookup(name, version) else {
        debug!(%name, %version, "release not found");
        return Vec::new();
    };
    graph
        .dependents(target)
        .into_iter()
        .filter_map(|id| graph.release(id).cloned())
        .collect()
}

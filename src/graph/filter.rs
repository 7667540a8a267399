use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::core::release::{latest_by_package, ReleaseId};
use crate::graph::ReleaseGraph;

/// True when `instant` lies in the closed interval `[begin, end]`. An
/// instant equal to either bound always counts, so an inverted window still
/// matches releases sitting exactly on `begin` or `end`.
pub fn in_window(instant: DateTime<Utc>, begin: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    instant == begin || instant == end || (begin < instant && instant < end)
}

/// Removes every release published outside `[begin, end]`, along with its
/// edges. Destructive. Returns the number of releases removed.
#[instrument(skip(graph))]
pub fn filter_by_time_window(
    graph: &mut ReleaseGraph,
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
) -> usize {
    let doomed: HashSet<ReleaseId> = graph
        .releases()
        .filter(|release| !in_window(release.published, begin, end))
        .map(|release| release.id)
        .collect();
    let removed = graph.remove_releases(&doomed);
    info!(
        removed,
        remaining = graph.release_count(),
        "dropped releases outside time window"
    );
    removed
}

/// Keeps only the most recent release of each package. Destructive.
/// Returns the number of releases removed.
#[instrument(skip(graph))]
pub fn filter_to_latest_per_package(graph: &mut ReleaseGraph) -> usize {
    let keep: HashSet<ReleaseId> = latest_by_package(graph.releases())
        .into_values()
        .map(|release| release.id)
        .collect();
    let doomed: HashSet<ReleaseId> = graph
        .releases()
        .map(|release| release.id)
        .filter(|id| !keep.contains(id))
        .collect();
    let removed = graph.remove_releases(&doomed);
    info!(
        removed,
        remaining = graph.release_count(),
        "dropped superseded releases"
    );
    removed
}

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::constraint::{Constraint, RangeSyntax};
use crate::core::document::{Document, VersionRecord};
use crate::core::release::ReleaseId;
use crate::graph::{GraphError, ReleaseGraph, Result};
use crate::util::{parallel, progress};

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub syntax: RangeSyntax,
    /// Worker threads for dependency resolution; `None` uses rayon's pool.
    pub jobs: Option<usize>,
    pub progress: bool,
}

/// Counts gathered while materialising a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub packages: usize,
    pub releases: usize,
    pub dependencies: usize,
    pub duplicate_releases: usize,
    pub skipped_ranges: usize,
    pub skipped_candidates: usize,
    pub self_loops: usize,
}

struct PackageTask<'a> {
    name: &'a str,
    releases: Vec<(ReleaseId, &'a VersionRecord)>,
}

#[derive(Default)]
struct Resolution {
    edges: Vec<(ReleaseId, Vec<ReleaseId>)>,
    skipped_ranges: usize,
    skipped_candidates: usize,
    self_loops: usize,
}

/// Materialises the release graph for `document`.
///
/// Every release is registered first. Dependency ranges are then resolved
/// per package on the worker pool, each task reading the finished index and
/// writing to its own buffer, and the buffers are merged into the graph on
/// this thread.
#[instrument(skip_all, fields(packages = document.packages.len(), syntax = ?options.syntax))]
pub fn build_graph(
    document: &Document,
    options: &BuildOptions,
) -> Result<(ReleaseGraph, BuildReport)> {
    let mut graph = ReleaseGraph::new();
    let mut report = BuildReport {
        packages: document.packages.len(),
        ..BuildReport::default()
    };

    let mut tasks: Vec<PackageTask<'_>> = Vec::with_capacity(document.packages.len());
    for package in &document.packages {
        let mut releases = Vec::with_capacity(package.versions.len());
        for (version, record) in &package.versions {
            let published = parse_timestamp(&package.name, version, &record.timestamp)?;
            match graph.register(&package.name, version, published) {
                Some(id) => releases.push((id, record)),
                None => {
                    report.duplicate_releases += 1;
                    debug!(name = %package.name, %version, "duplicate release ignored");
                }
            }
        }
        tasks.push(PackageTask {
            name: &package.name,
            releases,
        });
    }
    report.releases = graph.release_count();
    info!(releases = report.releases, "registered releases");

    let bar = progress::package_bar(tasks.len(), options.progress);
    let resolutions = {
        let graph = &graph;
        let bar = &bar;
        parallel::run_in_parallel(tasks, options.jobs, |task| {
            let resolution = resolve_package(graph, &task, options.syntax);
            bar.inc(1);
            resolution
        })
    };
    bar.finish_and_clear();

    for resolution in resolutions {
        report.skipped_ranges += resolution.skipped_ranges;
        report.skipped_candidates += resolution.skipped_candidates;
        report.self_loops += resolution.self_loops;
        for (from, targets) in &resolution.edges {
            graph.extend_dependencies(*from, targets);
        }
    }
    report.dependencies = graph.dependency_count();

    info!(
        releases = report.releases,
        dependencies = report.dependencies,
        skipped_ranges = report.skipped_ranges,
        "built release graph"
    );
    Ok((graph, report))
}

fn parse_timestamp(name: &str, version: &str, timestamp: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|source| GraphError::InvalidTimestamp {
            name: name.to_string(),
            version: version.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn resolve_package(graph: &ReleaseGraph, task: &PackageTask<'_>, syntax: RangeSyntax) -> Resolution {
    let mut resolution = Resolution::default();
    for (dependent, record) in &task.releases {
        let mut targets = Vec::new();
        for (dependency, range) in record.dependencies() {
            let constraint = match Constraint::parse(range, syntax) {
                Ok(constraint) => constraint,
                Err(err) => {
                    resolution.skipped_ranges += 1;
                    debug!(package = task.name, %dependency, error = %err, "skipping dependency");
                    continue;
                }
            };

            for candidate in graph.known_versions(dependency) {
                let Some(parsed) = candidate.semver.as_ref() else {
                    resolution.skipped_candidates += 1;
                    continue;
                };
                if !constraint.matches(parsed) {
                    continue;
                }
                let Some(target) = graph.lookup(dependency, &candidate.raw) else {
                    continue;
                };
                if target == *dependent {
                    resolution.self_loops += 1;
                    continue;
                }
                targets.push(target);
            }
        }
        if targets.is_empty() {
            continue;
        }
        targets.sort_unstable();
        targets.dedup();
        resolution.edges.push((*dependent, targets));
    }
    resolution
}

#[cfg(test)]
mod tests {
    use crate::core::constraint::RangeSyntax;
    use crate::core::document::{Document, PackageRecord, VersionRecord};
    use crate::graph::builder::{build_graph, BuildOptions};
    use crate::graph::GraphError;

    fn options(syntax: RangeSyntax) -> BuildOptions {
        BuildOptions {
            syntax,
            jobs: Some(1),
            progress: false,
        }
    }

    fn ab_document() -> Document {
        Document::new(vec![
            PackageRecord::new("a").with_version(
                "1.0.0",
                VersionRecord::new("2020-01-01T00:00:00Z").with_dependency("b", "^1.0.0"),
            ),
            PackageRecord::new("b")
                .with_version("1.0.0", VersionRecord::new("2020-01-01T00:00:00Z"))
                .with_version("1.2.0", VersionRecord::new("2020-06-01T00:00:00Z"))
                .with_version("2.0.0", VersionRecord::new("2020-07-01T00:00:00Z")),
        ])
    }

    #[test]
    fn one_range_yields_an_edge_per_satisfying_version() {
        let (graph, report) = build_graph(&ab_document(), &options(RangeSyntax::Semver))
            .expect("build graph");
        let a = graph.lookup("a", "1.0.0").expect("a registered");
        let deps: Vec<String> = graph
            .dependencies(a)
            .into_iter()
            .filter_map(|id| graph.release(id).map(|r| r.to_string()))
            .collect();
        assert_eq!(deps, vec!["b-1.0.0", "b-1.2.0"]);
        assert_eq!(report.releases, 4);
        assert_eq!(report.dependencies, 2);
    }

    #[test]
    fn invalid_ranges_and_candidates_are_skipped() {
        let document = Document::new(vec![
            PackageRecord::new("c").with_version(
                "2.0.0",
                VersionRecord::new("2020-01-01T00:00:00Z")
                    .with_dependency("d", "not-a-range")
                    .with_dependency("e", ">=0.1.0"),
            ),
            PackageRecord::new("d").with_version("1.0.0", VersionRecord::new("2020-01-01T00:00:00Z")),
            PackageRecord::new("e")
                .with_version("0.2.0", VersionRecord::new("2020-01-01T00:00:00Z"))
                .with_version("nightly", VersionRecord::new("2020-01-02T00:00:00Z")),
        ]);
        let (graph, report) =
            build_graph(&document, &options(RangeSyntax::Semver)).expect("build graph");
        let c = graph.lookup("c", "2.0.0").expect("c registered");
        let e = graph.lookup("e", "0.2.0").expect("e registered");
        assert_eq!(graph.dependencies(c), vec![e]);
        assert_eq!(report.skipped_ranges, 1);
        assert_eq!(report.skipped_candidates, 1);
    }

    #[test]
    fn self_dependencies_never_become_edges() {
        let document = Document::new(vec![PackageRecord::new("loop").with_version(
            "1.0.0",
            VersionRecord::new("2020-01-01T00:00:00Z").with_dependency("loop", "*"),
        )]);
        let (graph, report) =
            build_graph(&document, &options(RangeSyntax::Semver)).expect("build graph");
        assert_eq!(graph.dependency_count(), 0);
        assert_eq!(report.self_loops, 1);
    }

    #[test]
    fn maven_ranges_are_unioned() {
        let document = Document::new(vec![
            PackageRecord::new("app").with_version(
                "1.0",
                VersionRecord::new("2020-01-01T00:00:00Z")
                    .with_dependency("lib", "(,1.0],[1.2,)"),
            ),
            PackageRecord::new("lib")
                .with_version("1.0", VersionRecord::new("2019-01-01T00:00:00Z"))
                .with_version("1.1", VersionRecord::new("2019-02-01T00:00:00Z"))
                .with_version("1.2", VersionRecord::new("2019-03-01T00:00:00Z")),
        ]);
        let (graph, _) =
            build_graph(&document, &options(RangeSyntax::Maven)).expect("build graph");
        let app = graph.lookup("app", "1.0").expect("app registered");
        let versions: Vec<String> = graph
            .dependencies(app)
            .into_iter()
            .filter_map(|id| graph.release(id).map(|r| r.version.raw.clone()))
            .collect();
        assert_eq!(versions, vec!["1.0", "1.2"]);
    }

    #[test]
    fn duplicate_releases_are_registered_once() {
        let document = Document::new(vec![
            PackageRecord::new("a").with_version("1.0.0", VersionRecord::new("2020-01-01T00:00:00Z")),
            PackageRecord::new("a").with_version("1.0.0", VersionRecord::new("2021-01-01T00:00:00Z")),
        ]);
        let (graph, report) =
            build_graph(&document, &options(RangeSyntax::Semver)).expect("build graph");
        assert_eq!(graph.release_count(), 1);
        assert_eq!(report.duplicate_releases, 1);
        let release = graph.resolve("a", "1.0.0").expect("a registered");
        assert_eq!(release.published.to_rfc3339(), "2020-01-01T00:00:00+00:00");
    }

    #[test]
    fn invalid_timestamp_aborts_the_build() {
        let document = Document::new(vec![PackageRecord::new("a")
            .with_version("1.0.0", VersionRecord::new("last tuesday"))]);
        let err = build_graph(&document, &options(RangeSyntax::Semver))
            .expect_err("expected timestamp failure");
        assert!(matches!(err, GraphError::InvalidTimestamp { ref name, .. } if name == "a"));
    }

    #[test]
    fn parallel_and_inline_builds_agree() {
        let document = ab_document();
        let (inline, _) =
            build_graph(&document, &options(RangeSyntax::Semver)).expect("inline build");
        let (pooled, _) = build_graph(
            &document,
            &BuildOptions {
                syntax: RangeSyntax::Semver,
                jobs: Some(4),
                progress: false,
            },
        )
        .expect("pooled build");
        assert_eq!(inline.edges().collect::<Vec<_>>(), pooled.edges().collect::<Vec<_>>());
    }
}

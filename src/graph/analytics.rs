//! Centrality scores over whatever releases the graph currently holds.
//!
//! Both algorithms work on a dense copy of the adjacency lists, indexed by
//! position in ascending [`ReleaseId`] order, so results are deterministic
//! for a given graph. Run the filters first to restrict the analysis to a
//! time window or to latest releases.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, instrument, warn};

use crate::core::release::ReleaseId;
use crate::graph::ReleaseGraph;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRankConfig {
    /// Probability of following an edge rather than teleporting.
    pub damping: f64,
    /// Stop once the L1 change between iterations drops below this.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 0.001,
            max_iterations: 100,
        }
    }
}

struct DenseGraph {
    ids: Vec<ReleaseId>,
    outgoing: Vec<Vec<usize>>,
}

impl DenseGraph {
    fn from_graph(graph: &ReleaseGraph) -> Self {
        let ids = graph.release_ids();
        let position: HashMap<ReleaseId, usize> =
            ids.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();
        let outgoing = ids
            .iter()
            .map(|id| {
                graph
                    .dependencies(*id)
                    .into_iter()
                    .filter_map(|dep| position.get(&dep).copied())
                    .collect()
            })
            .collect();
        Self { ids, outgoing }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn into_scores(self, values: Vec<f64>) -> HashMap<ReleaseId, f64> {
        self.ids.into_iter().zip(values).collect()
    }
}

/// Power-iteration PageRank. Rank flows along dependency edges, so heavily
/// depended-upon releases score highest; dangling releases spread their rank
/// evenly. Scores sum to 1.0 on a non-empty graph.
#[instrument(skip(graph))]
pub fn page_rank(graph: &ReleaseGraph, config: &PageRankConfig) -> HashMap<ReleaseId, f64> {
    let dense = DenseGraph::from_graph(graph);
    let n = dense.len();
    if n == 0 {
        return HashMap::new();
    }

    let n_f64 = n as f64;
    let mut ranks = vec![1.0 / n_f64; n];
    let mut next = vec![0.0_f64; n];
    let mut converged = false;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        let dangling: f64 = dense
            .outgoing
            .iter()
            .zip(&ranks)
            .filter(|(targets, _)| targets.is_empty())
            .map(|(_, rank)| rank)
            .sum();
        let base = (1.0 - config.damping) / n_f64 + config.damping * dangling / n_f64;
        next.iter_mut().for_each(|rank| *rank = base);

        for (source, targets) in dense.outgoing.iter().enumerate() {
            if targets.is_empty() {
                continue;
            }
            let share = config.damping * ranks[source] / targets.len() as f64;
            for target in targets {
                next[*target] += share;
            }
        }

        let delta: f64 = ranks
            .iter()
            .zip(&next)
            .map(|(old, new)| (old - new).abs())
            .sum();
        std::mem::swap(&mut ranks, &mut next);
        if delta < config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        debug!(iterations, "pagerank converged");
    } else {
        warn!(iterations, "pagerank stopped before converging");
    }
    dense.into_scores(ranks)
}

/// Betweenness centrality via Brandes' algorithm on the directed,
/// unweighted graph. Scores are not normalised.
#[instrument(skip(graph))]
pub fn betweenness(graph: &ReleaseGraph) -> HashMap<ReleaseId, f64> {
    let dense = DenseGraph::from_graph(graph);
    let n = dense.len();
    let mut centrality = vec![0.0_f64; n];

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut distance = vec![-1_i64; n];
    let mut delta = vec![0.0_f64; n];
    let mut queue: VecDeque<usize> = VecDeque::new();

    for source in 0..n {
        stack.clear();
        predecessors.iter_mut().for_each(Vec::clear);
        sigma.iter_mut().for_each(|s| *s = 0.0);
        distance.iter_mut().for_each(|d| *d = -1);
        delta.iter_mut().for_each(|d| *d = 0.0);

        sigma[source] = 1.0;
        distance[source] = 0;
        queue.push_back(source);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &dense.outgoing[v] {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    dense.into_scores(centrality)
}

/// Sums per-release scores into per-package scores.
pub fn aggregate_by_package(
    graph: &ReleaseGraph,
    scores: &HashMap<ReleaseId, f64>,
) -> HashMap<String, f64> {
    let mut out: HashMap<String, f64> = HashMap::new();
    for (id, score) in scores {
        if let Some(release) = graph.release(*id) {
            *out.entry(release.name.clone()).or_insert(0.0) += score;
        }
    }
    out
}

/// The `n` highest scores, descending; equal scores are ordered by key.
pub fn top_n<K>(scores: &HashMap<K, f64>, n: usize) -> Vec<(K, f64)>
where
    K: Clone + Ord,
{
    let mut ranked: Vec<(K, f64)> = scores
        .iter()
        .map(|(key, score)| (key.clone(), *score))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};

    use crate::core::release::ReleaseId;
    use crate::graph::analytics::{
        aggregate_by_package, betweenness, page_rank, top_n, PageRankConfig,
    };
    use crate::graph::ReleaseGraph;

    fn graph_of(nodes: &[(&str, &str)], edges: &[(usize, usize)]) -> (ReleaseGraph, Vec<ReleaseId>) {
        let published = Utc
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .single()
            .expect("valid test date");
        let mut graph = ReleaseGraph::new();
        let ids: Vec<ReleaseId> = nodes
            .iter()
            .map(|(name, version)| graph.register(name, version, published).expect("register"))
            .collect();
        for (from, to) in edges {
            graph.add_dependency(ids[*from], ids[*to]);
        }
        (graph, ids)
    }

    #[test]
    fn pagerank_sums_to_one() {
        let (graph, _) = graph_of(
            &[("a", "1.0.0"), ("b", "1.0.0"), ("c", "1.0.0"), ("d", "1.0.0")],
            &[(0, 1), (0, 2), (1, 2), (3, 2)],
        );
        let scores = page_rank(&graph, &PageRankConfig::default());
        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "total was {total}");
    }

    #[test]
    fn pagerank_favours_the_shared_dependency() {
        let (graph, ids) = graph_of(
            &[("a", "1.0.0"), ("b", "1.0.0"), ("c", "1.0.0"), ("d", "1.0.0")],
            &[(0, 2), (1, 2), (3, 2)],
        );
        let scores = page_rank(&graph, &PageRankConfig::default());
        let best = top_n(&scores, 1);
        assert_eq!(best[0].0, ids[2]);
    }

    #[test]
    fn pagerank_is_deterministic() {
        let (graph, _) = graph_of(
            &[("a", "1.0.0"), ("b", "1.0.0"), ("c", "1.0.0")],
            &[(0, 1), (1, 2), (2, 0)],
        );
        let config = PageRankConfig::default();
        assert_eq!(page_rank(&graph, &config), page_rank(&graph, &config));
    }

    #[test]
    fn empty_graph_has_no_scores() {
        let graph = ReleaseGraph::new();
        assert!(page_rank(&graph, &PageRankConfig::default()).is_empty());
        assert!(betweenness(&graph).is_empty());
    }

    #[test]
    fn betweenness_of_a_chain_peaks_in_the_middle() {
        let (graph, ids) = graph_of(
            &[("a", "1.0.0"), ("b", "1.0.0"), ("c", "1.0.0")],
            &[(0, 1), (1, 2)],
        );
        let scores = betweenness(&graph);
        assert_eq!(scores[&ids[0]], 0.0);
        assert_eq!(scores[&ids[1]], 1.0);
        assert_eq!(scores[&ids[2]], 0.0);
    }

    #[test]
    fn betweenness_splits_across_equal_paths() {
        // a → b → d and a → c → d
        let (graph, ids) = graph_of(
            &[("a", "1.0.0"), ("b", "1.0.0"), ("c", "1.0.0"), ("d", "1.0.0")],
            &[(0, 1), (0, 2), (1, 3), (2, 3)],
        );
        let scores = betweenness(&graph);
        assert!((scores[&ids[1]] - 0.5).abs() < 1e-12);
        assert!((scores[&ids[2]] - 0.5).abs() < 1e-12);
        assert_eq!(scores[&ids[3]], 0.0);
    }

    #[test]
    fn package_aggregation_sums_versions() {
        let (graph, ids) = graph_of(&[("a", "1.0.0"), ("a", "2.0.0"), ("b", "1.0.0")], &[]);
        let scores: HashMap<ReleaseId, f64> =
            [(ids[0], 0.25), (ids[1], 0.5), (ids[2], 0.25)].into_iter().collect();
        let by_package = aggregate_by_package(&graph, &scores);
        assert_eq!(by_package["a"], 0.75);
        assert_eq!(by_package["b"], 0.25);
    }

    #[test]
    fn top_n_breaks_ties_by_key() {
        let scores: HashMap<&str, f64> = [("b", 1.0), ("a", 1.0), ("c", 2.0)].into_iter().collect();
        assert_eq!(top_n(&scores, 2), vec![("c", 2.0), ("a", 1.0)]);
    }
}

//! Community detection by greedy agglomerative modularity optimization.
//!
//! Works on the undirected projection of the dependency graph, where the
//! weight between two nodes is the number of directed edges joining them.
//! Every node starts in its own community. At each step the adjacent pair of
//! communities with the largest gain `dQ = 2 (e_ij - a_i a_j)` is merged, until
//! no merge gains more than [`GAIN_EPSILON`].
//!
//! A community's id is the smallest id-order position among its members.
//! Gains within [`GAIN_EPSILON`] of each other are ties, broken in favour of
//! the lexically smallest `(smaller id, larger id)` pair, so identical graphs
//! always produce identical partitions.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::FrozenGraph;

pub const GAIN_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: usize,
    /// Member node ids in ascending order.
    pub members: Vec<String>,
    /// `L_c / m - (d_c / 2m)^2`.
    pub modularity_contribution: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Ordered by smallest member, numbered from zero.
    pub communities: Vec<Community>,
    pub modularity: f64,
}

impl Partition {
    /// Community number of each node id.
    pub fn membership(&self) -> HashMap<&str, usize> {
        self.communities
            .iter()
            .flat_map(|c| c.members.iter().map(move |m| (m.as_str(), c.id)))
            .collect()
    }
}

struct Cluster {
    members: Vec<usize>,
    /// Fraction of edge ends attached to the cluster.
    a: f64,
    /// Undirected weight to each adjacent cluster.
    neighbors: BTreeMap<usize, f64>,
}

pub fn detect_communities(graph: &FrozenGraph) -> Partition {
    let n = graph.node_count();
    let edges = graph.edge_positions();
    let m = edges.len() as f64;

    let mut degree = vec![0.0f64; n];
    for &(s, t) in &edges {
        degree[s] += 1.0;
        degree[t] += 1.0;
    }

    let mut clusters: BTreeMap<usize, Cluster> = (0..n)
        .map(|i| {
            (
                i,
                Cluster {
                    members: vec![i],
                    a: if m > 0.0 { degree[i] / (2.0 * m) } else { 0.0 },
                    neighbors: BTreeMap::new(),
                },
            )
        })
        .collect();
    for &(s, t) in &edges {
        if let Some(c) = clusters.get_mut(&s) {
            *c.neighbors.entry(t).or_insert(0.0) += 1.0;
        }
        if let Some(c) = clusters.get_mut(&t) {
            *c.neighbors.entry(s).or_insert(0.0) += 1.0;
        }
    }

    let mut merges = 0usize;
    while m > 0.0 {
        let mut best: Option<(f64, usize, usize)> = None;
        for (&i, cluster) in &clusters {
            for (&j, &w) in cluster.neighbors.range(i + 1..) {
                let a_j = clusters.get(&j).map_or(0.0, |c| c.a);
                let gain = 2.0 * (w / (2.0 * m) - cluster.a * a_j);
                let better = match best {
                    None => true,
                    Some((best_gain, _, _)) => gain > best_gain + GAIN_EPSILON,
                };
                if better {
                    best = Some((gain, i, j));
                }
            }
        }

        let Some((gain, keep, absorb)) = best else {
            break;
        };
        if gain <= GAIN_EPSILON {
            break;
        }
        merge(&mut clusters, keep, absorb);
        merges += 1;
    }

    let partition = score(graph, &edges, &degree, clusters);
    debug!(
        nodes = n,
        edges = edges.len(),
        merges,
        communities = partition.communities.len(),
        modularity = partition.modularity,
        "detected communities"
    );
    partition
}

fn merge(clusters: &mut BTreeMap<usize, Cluster>, keep: usize, absorb: usize) {
    let Some(absorbed) = clusters.remove(&absorb) else {
        return;
    };
    for (&k, &w) in &absorbed.neighbors {
        if k == keep {
            continue;
        }
        if let Some(other) = clusters.get_mut(&k) {
            other.neighbors.remove(&absorb);
            *other.neighbors.entry(keep).or_insert(0.0) += w;
        }
    }
    if let Some(kept) = clusters.get_mut(&keep) {
        kept.neighbors.remove(&absorb);
        for (k, w) in absorbed.neighbors {
            if k != keep {
                *kept.neighbors.entry(k).or_insert(0.0) += w;
            }
        }
        kept.members.extend(absorbed.members);
        kept.members.sort_unstable();
        kept.a += absorbed.a;
    }
}

/// Recomputes each community's contribution from the final membership.
fn score(
    graph: &FrozenGraph,
    edges: &[(usize, usize)],
    degree: &[f64],
    clusters: BTreeMap<usize, Cluster>,
) -> Partition {
    let m = edges.len() as f64;
    let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();

    let mut community_of = vec![0usize; ids.len()];
    for (number, cluster) in clusters.values().enumerate() {
        for &member in &cluster.members {
            community_of[member] = number;
        }
    }
    let mut internal = vec![0.0f64; clusters.len()];
    for &(s, t) in edges {
        if community_of[s] == community_of[t] {
            internal[community_of[s]] += 1.0;
        }
    }

    let communities: Vec<Community> = clusters
        .into_values()
        .enumerate()
        .map(|(number, cluster)| {
            let contribution = if m > 0.0 {
                let d: f64 = cluster.members.iter().map(|&i| degree[i]).sum();
                internal[number] / m - (d / (2.0 * m)).powi(2)
            } else {
                0.0
            };
            Community {
                id: number,
                members: cluster.members.iter().map(|&i| ids[i].to_string()).collect(),
                modularity_contribution: contribution,
            }
        })
        .collect();

    let modularity = communities.iter().map(|c| c.modularity_contribution).sum();
    Partition {
        communities,
        modularity,
    }
}

//! Dependency analysis — run this before executing a workflow.
//!
//! Two passes over the link graph:
//! 1. Kahn's algorithm generalized to emit topological *levels*: nodes
//!    within a level have no dependency on one another and can run in
//!    parallel. Levels are lexicographically sorted within themselves so
//!    that scheduling order is deterministic.
//! 2. If levels don't cover every node, the graph has at least one cycle.
//!    A DFS pass then enumerates every distinct elementary cycle, not just
//!    the first one found, so the caller can report all of them at once.

use std::collections::{HashMap, HashSet};

use crate::error::EngineError;
use crate::workflow::Workflow;

/// The result of a successful dependency analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Topological levels. `levels[0]` has no dependencies; each later
    /// level depends only on nodes in earlier levels. Node names within a
    /// level are sorted lexicographically.
    pub levels: Vec<Vec<String>>,
}

impl Analysis {
    /// All node names in level order, level contents lexicographically
    /// sorted — a flat topological order, for callers that don't care
    /// about parallelism.
    pub fn flattened(&self) -> Vec<String> {
        self.levels.iter().flatten().cloned().collect()
    }
}

/// Builds the dependency graph from a workflow's links and exposes level
/// analysis and cycle enumeration over it.
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    /// Analyze `workflow`. On success, returns the node set partitioned
    /// into parallel-safe levels. On a cyclic graph, returns
    /// [`EngineError::Cycle`] carrying every distinct cycle found.
    pub fn analyze(workflow: &Workflow) -> Result<Analysis, EngineError> {
        let names: Vec<String> =
            workflow.nodes().keys().chain(workflow.triggers().keys()).cloned().collect();

        let edges = Self::unique_edges(workflow);

        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = names.iter().map(|n| (n.as_str(), 0)).collect();
        for (source, target) in &edges {
            dependents.entry(source.as_str()).or_default().push(target.as_str());
            *in_degree.entry(target.as_str()).or_insert(0) += 1;
        }

        let mut remaining: HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut levels: Vec<Vec<String>> = Vec::new();

        loop {
            if remaining.is_empty() {
                break;
            }
            let mut ready: Vec<&str> =
                remaining.iter().filter(|n| in_degree.get(*n).copied().unwrap_or(0) == 0).copied().collect();
            if ready.is_empty() {
                let cycles = Self::find_all_cycles(&names, &dependents);
                return Err(EngineError::Cycle(cycles.len(), cycles));
            }
            ready.sort_unstable();

            for &node in &ready {
                remaining.remove(node);
                if let Some(next) = dependents.get(node) {
                    for &dependent in next {
                        if let Some(deg) = in_degree.get_mut(dependent) {
                            *deg = deg.saturating_sub(1);
                        }
                    }
                }
            }
            levels.push(ready.into_iter().map(str::to_owned).collect());
        }

        Ok(Analysis { levels })
    }

    fn unique_edges(workflow: &Workflow) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for link in workflow.links() {
            let pair = (link.source_node.clone(), link.target_node.clone());
            if seen.insert(pair.clone()) {
                edges.push(pair);
            }
        }
        edges
    }

    /// DFS over the dependency graph, recording every elementary cycle
    /// exactly once (cycles found starting from different nodes are
    /// normalized to the same rotation and deduplicated).
    fn find_all_cycles(names: &[String], dependents: &HashMap<&str, Vec<&str>>) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut seen = HashSet::new();

        for start in names {
            let mut stack = vec![start.clone()];
            let mut index: HashMap<String, usize> = HashMap::new();
            index.insert(start.clone(), 0);
            Self::dfs_cycles(start, &mut stack, &mut index, dependents, &mut cycles, &mut seen);
        }

        cycles
    }

    fn dfs_cycles(
        current: &str,
        stack: &mut Vec<String>,
        index: &mut HashMap<String, usize>,
        dependents: &HashMap<&str, Vec<&str>>,
        cycles: &mut Vec<Vec<String>>,
        seen: &mut HashSet<Vec<String>>,
    ) {
        let Some(neighbours) = dependents.get(current) else { return };
        for &next in neighbours {
            if let Some(&pos) = index.get(next) {
                let mut cycle: Vec<String> = stack[pos..].to_vec();
                Self::normalize_cycle(&mut cycle);
                if seen.insert(cycle.clone()) {
                    cycles.push(cycle);
                }
            } else {
                stack.push(next.to_owned());
                index.insert(next.to_owned(), stack.len() - 1);
                Self::dfs_cycles(next, stack, index, dependents, cycles, seen);
                stack.pop();
                index.remove(next);
            }
        }
    }

    /// Rotate a cycle so it starts at its lexicographically smallest
    /// member, without changing direction, so the same cycle found from
    /// two different starting points compares equal.
    fn normalize_cycle(cycle: &mut [String]) {
        if cycle.is_empty() {
            return;
        }
        let min_index = cycle.iter().enumerate().min_by_key(|(_, name)| name.as_str()).map(|(i, _)| i).unwrap();
        cycle.rotate_left(min_index);
    }
}

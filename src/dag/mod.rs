//! Hook dependency graph
//!
//! Hooks name at most one predecessor via `after`; the resulting DAG is
//! flattened into level-sets for batched parallel execution. Nodes live in an
//! arena indexed by position, so edges are plain indices and traversal never
//! fights the borrow checker.

use std::collections::HashMap;

use crate::config::Hook;

struct Node {
    children: Vec<usize>,
    in_degree: usize,
}

/// Dependency graph over one hook-type's hooks.
pub struct Graph<'a> {
    hooks: &'a [Hook],
    nodes: Vec<Node>,
}

impl<'a> Graph<'a> {
    /// Build the graph from hooks in configuration order. An `after` naming
    /// an unknown hook contributes no edge; the hook runs as a root
    /// (`validate` reports it separately).
    pub fn build(hooks: &'a [Hook]) -> Self {
        let index: HashMap<&str, usize> = hooks
            .iter()
            .enumerate()
            .map(|(i, h)| (h.name.as_str(), i))
            .collect();

        let mut nodes: Vec<Node> = hooks
            .iter()
            .map(|_| Node {
                children: Vec::new(),
                in_degree: 0,
            })
            .collect();

        for (child, hook) in hooks.iter().enumerate() {
            if let Some(after) = hook.after.as_deref().filter(|a| !a.is_empty()) {
                if let Some(&parent) = index.get(after) {
                    nodes[parent].children.push(child);
                    nodes[child].in_degree += 1;
                }
            }
        }

        Self { hooks, nodes }
    }

    /// Level-sets in topological order. Level 0 holds every hook with no
    /// predecessor; level i+1 holds hooks whose predecessor drained in an
    /// earlier level. Configuration order is preserved within a level.
    /// Hooks on a cycle never drain and are absent from the plan.
    pub fn execution_plan(&self) -> Vec<Vec<&'a Hook>> {
        let mut in_degree: Vec<isize> = self.nodes.iter().map(|n| n.in_degree as isize).collect();
        let mut plan = Vec::new();

        loop {
            let level: Vec<usize> = (0..self.nodes.len())
                .filter(|&i| in_degree[i] == 0)
                .collect();
            if level.is_empty() {
                break;
            }

            for &i in &level {
                in_degree[i] = -1;
                for &child in &self.nodes[i].children {
                    in_degree[child] -= 1;
                }
            }

            plan.push(level.iter().map(|&i| &self.hooks[i]).collect());
        }

        plan
    }

    /// Depth-first cycle check with an explicit recursion-stack marker, run
    /// before execution so the scheduler can refuse the whole plan.
    pub fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];

        for start in 0..self.nodes.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }

            // (node, next-child-offset) pairs emulate the recursion stack.
            let mut stack = vec![(start, 0usize)];
            marks[start] = Mark::OnStack;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if frame.1 < self.nodes[node].children.len() {
                    let child = self.nodes[node].children[frame.1];
                    frame.1 += 1;
                    match marks[child] {
                        Mark::OnStack => return true,
                        Mark::Unvisited => {
                            marks[child] = Mark::OnStack;
                            stack.push((child, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }

        false
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Graph Resolver
//!
//! Turns the declared stack set into a deployment order with Kahn's
//! algorithm. Among stacks that become ready at the same time the
//! lexicographically smallest name goes first, so the same input always
//! produces the same order.
//!
//! ```text
//! network ──► security ──► database
//!    │                        ▲
//!    └────────────────────────┘
//!
//! order: [network, security, database]
//! ```
//!
//! All functions here are pure.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Stack, StackName};
use crate::errors::{ProvisioningError, ProvisioningResult};

/// Dependency graph over stack names
#[derive(Debug, Clone)]
pub struct StackGraph {
    /// stack -> stacks it depends on
    dependencies: BTreeMap<StackName, BTreeSet<StackName>>,
    /// stack -> stacks that depend on it
    dependents: BTreeMap<StackName, BTreeSet<StackName>>,
}

impl StackGraph {
    /// Build the graph, rejecting unknown dependencies
    pub fn build(stacks: &[Stack]) -> ProvisioningResult<Self> {
        let mut dependencies: BTreeMap<StackName, BTreeSet<StackName>> = BTreeMap::new();
        let mut dependents: BTreeMap<StackName, BTreeSet<StackName>> = BTreeMap::new();

        for stack in stacks {
            if dependencies.insert(stack.name.clone(), BTreeSet::new()).is_some() {
                return Err(ProvisioningError::DuplicateStack(stack.name.clone()));
            }
            dependents.entry(stack.name.clone()).or_default();
        }

        for stack in stacks {
            for dependency in &stack.depends_on {
                if !dependencies.contains_key(dependency) {
                    return Err(ProvisioningError::UnknownDependency {
                        stack: stack.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
                if let Some(deps) = dependencies.get_mut(&stack.name) {
                    deps.insert(dependency.clone());
                }
                dependents
                    .entry(dependency.clone())
                    .or_default()
                    .insert(stack.name.clone());
            }
        }

        Ok(Self {
            dependencies,
            dependents,
        })
    }

    pub fn dependencies_of(&self, stack: &StackName) -> Option<&BTreeSet<StackName>> {
        self.dependencies.get(stack)
    }

    pub fn dependents_of(&self, stack: &StackName) -> Option<&BTreeSet<StackName>> {
        self.dependents.get(stack)
    }

    /// Every stack reachable through `depends_on`, excluding `stack` itself
    pub fn transitive_dependencies(&self, stack: &StackName) -> BTreeSet<StackName> {
        walk(&self.dependencies, stack)
    }

    /// Every stack that depends on `stack`, directly or not
    pub fn transitive_dependents(&self, stack: &StackName) -> BTreeSet<StackName> {
        walk(&self.dependents, stack)
    }

    /// Kahn's algorithm with lexicographic tie-break
    pub fn topological_order(&self) -> ProvisioningResult<Vec<StackName>> {
        let mut indegree: BTreeMap<&StackName, usize> = self
            .dependencies
            .iter()
            .map(|(name, deps)| (name, deps.len()))
            .collect();

        let mut ready: BTreeSet<&StackName> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.dependencies.len());

        while let Some(next) = ready.pop_first() {
            order.push(next.clone());
            if let Some(dependents) = self.dependents.get(next) {
                for dependent in dependents {
                    if let Some(degree) = indegree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(dependent);
                        }
                    }
                }
            }
        }

        if order.len() < self.dependencies.len() {
            let scheduled: BTreeSet<&StackName> = order.iter().collect();
            let remaining: BTreeSet<StackName> = self
                .dependencies
                .keys()
                .filter(|name| !scheduled.contains(name))
                .cloned()
                .collect();
            return Err(ProvisioningError::CyclicDependency {
                stacks: self.cycle_members(&remaining),
            });
        }

        Ok(order)
    }

    /// Stacks on some cycle among `candidates`
    ///
    /// Kahn leaves behind both cycle members and stacks downstream of a
    /// cycle. A stack is on a cycle when it can reach itself.
    fn cycle_members(&self, candidates: &BTreeSet<StackName>) -> Vec<StackName> {
        candidates
            .iter()
            .filter(|name| {
                self.dependencies
                    .get(*name)
                    .map(|deps| {
                        deps.contains(*name)
                            || deps
                                .iter()
                                .filter(|d| candidates.contains(*d))
                                .any(|d| walk(&self.dependencies, d).contains(*name))
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

fn walk(edges: &BTreeMap<StackName, BTreeSet<StackName>>, start: &StackName) -> BTreeSet<StackName> {
    let mut seen = BTreeSet::new();
    let mut frontier: Vec<&StackName> = edges
        .get(start)
        .map(|next| next.iter().collect())
        .unwrap_or_default();

    while let Some(current) = frontier.pop() {
        if seen.insert(current.clone()) {
            if let Some(next) = edges.get(current) {
                frontier.extend(next.iter());
            }
        }
    }
    seen.remove(start);
    seen
}

/// Resolve stacks into deployment order
///
/// Every stack appears after all stacks named in its `depends_on`.
///
/// # Errors
/// - `UnknownDependency` when a `depends_on` entry matches no stack
/// - `CyclicDependency` naming every stack on a cycle
pub fn resolve(stacks: &[Stack]) -> ProvisioningResult<Vec<Stack>> {
    let order = resolve_order(stacks)?;
    let by_name: BTreeMap<&StackName, &Stack> = stacks.iter().map(|s| (&s.name, s)).collect();

    Ok(order
        .iter()
        .filter_map(|name| by_name.get(name).map(|stack| (*stack).clone()))
        .collect())
}

/// Resolve stacks into an ordered list of names
pub fn resolve_order(stacks: &[Stack]) -> ProvisioningResult<Vec<StackName>> {
    StackGraph::build(stacks)?.topological_order()
}

/// Partial re-resolution
///
/// Returns the `changed` stacks plus everything that transitively depends
/// on them, in deployment order.
pub fn resolve_affected(
    stacks: &[Stack],
    changed: &[StackName],
) -> ProvisioningResult<Vec<StackName>> {
    let graph = StackGraph::build(stacks)?;
    let order = graph.topological_order()?;

    let mut affected = BTreeSet::new();
    for name in changed {
        if graph.dependencies_of(name).is_none() {
            return Err(ProvisioningError::UnknownStack(name.clone()));
        }
        affected.insert(name.clone());
        affected.extend(graph.transitive_dependents(name));
    }

    Ok(order.into_iter().filter(|n| affected.contains(n)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(order: &[StackName]) -> Vec<&str> {
        order.iter().map(StackName::as_str).collect()
    }

    #[test]
    fn test_lexicographic_tie_break() {
        let stacks = vec![
            Stack::new("storage"),
            Stack::new("monitoring"),
            Stack::new("network"),
            Stack::new("cdn").depends_on("storage"),
        ];
        let order = resolve_order(&stacks).unwrap();
        assert_eq!(names(&order), vec!["monitoring", "network", "storage", "cdn"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let stacks = vec![Stack::new("network").depends_on("network")];
        match resolve_order(&stacks) {
            Err(ProvisioningError::CyclicDependency { stacks }) => {
                assert_eq!(names(&stacks), vec!["network"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_downstream_of_cycle_not_named() {
        let stacks = vec![
            Stack::new("a").depends_on("b"),
            Stack::new("b").depends_on("a"),
            Stack::new("c").depends_on("a"),
        ];
        match resolve_order(&stacks) {
            Err(ProvisioningError::CyclicDependency { stacks }) => {
                assert_eq!(names(&stacks), vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_depends_on_collapsed() {
        let stacks = vec![
            Stack::new("network"),
            Stack::new("security").depends_on("network").depends_on("network"),
        ];
        let order = resolve_order(&stacks).unwrap();
        assert_eq!(names(&order), vec!["network", "security"]);
    }

    #[test]
    fn test_resolve_affected() {
        let stacks = vec![
            Stack::new("network"),
            Stack::new("security").depends_on("network"),
            Stack::new("database").depends_on("network").depends_on("security"),
            Stack::new("storage"),
            Stack::new("cdn").depends_on("storage"),
        ];
        let affected = resolve_affected(&stacks, &["security".into()]).unwrap();
        assert_eq!(names(&affected), vec!["security", "database"]);

        let affected = resolve_affected(&stacks, &["storage".into(), "network".into()]).unwrap();
        assert_eq!(
            names(&affected),
            vec!["network", "security", "database", "storage", "cdn"]
        );
    }

    #[test]
    fn test_resolve_affected_unknown_stack() {
        let stacks = vec![Stack::new("network")];
        assert!(matches!(
            resolve_affected(&stacks, &["cdn".into()]),
            Err(ProvisioningError::UnknownStack(_))
        ));
    }
}

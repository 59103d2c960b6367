// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Stack Resolution
//!
//! Random acyclic graphs always resolve with every dependency first, and
//! closing a back edge always reports the cycle.

use cim_provisioning::domain::{Stack, StackName};
use cim_provisioning::resolver::resolve_order;
use cim_provisioning::ProvisioningError;
use proptest::prelude::*;

fn stack_name(index: usize) -> String {
    format!("stack-{:02}", index)
}

/// Edges only point from a higher index to a lower one
fn acyclic_stacks() -> impl Strategy<Value = Vec<Stack>> {
    (2usize..12)
        .prop_flat_map(|n| {
            let edges = prop::collection::vec(any::<bool>(), n * (n - 1) / 2);
            (Just(n), edges)
        })
        .prop_map(|(n, edges)| {
            let mut edges = edges.into_iter();
            (0..n)
                .map(|i| {
                    let mut stack = Stack::new(stack_name(i));
                    for j in 0..i {
                        if edges.next().unwrap_or(false) {
                            stack = stack.depends_on(stack_name(j));
                        }
                    }
                    stack
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

proptest! {
    #[test]
    fn prop_dependencies_precede_dependents(stacks in acyclic_stacks()) {
        let order = resolve_order(&stacks).unwrap();
        prop_assert_eq!(order.len(), stacks.len());

        let position = |name: &StackName| order.iter().position(|n| n == name).unwrap();
        for stack in &stacks {
            for dependency in &stack.depends_on {
                prop_assert!(position(dependency) < position(&stack.name));
            }
        }
    }

    #[test]
    fn prop_resolution_ignores_input_order(stacks in acyclic_stacks()) {
        let mut reversed = stacks.clone();
        reversed.reverse();
        prop_assert_eq!(resolve_order(&stacks).unwrap(), resolve_order(&reversed).unwrap());
    }

    #[test]
    fn prop_back_edge_is_reported(n in 2usize..10) {
        // A chain 0 <- 1 <- ... <- n-1, closed by 0 depending on n-1
        let stacks: Vec<Stack> = (0..n)
            .map(|i| {
                let stack = Stack::new(stack_name(i));
                if i == 0 {
                    stack.depends_on(stack_name(n - 1))
                } else {
                    stack.depends_on(stack_name(i - 1))
                }
            })
            .collect();

        match resolve_order(&stacks) {
            Err(ProvisioningError::CyclicDependency { stacks: members }) => {
                let expected: Vec<StackName> = (0..n).map(|i| StackName::from(stack_name(i))).collect();
                prop_assert_eq!(members, expected);
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Boundary References
//!
//! A rule whose peer is another security boundary must name a resource
//! present in the evaluated snapshot. The per-stack gate evaluates a stack
//! together with its dependencies, so a dangling reference here means the
//! stack points at something it does not depend on.

use std::collections::BTreeSet;

use crate::domain::{Peer, Resource, ResourceId};

use super::{Policy, Violation};

pub const POLICY_NAME: &str = "SecurityBoundaryReference";

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityBoundaryReference;

impl Policy for SecurityBoundaryReference {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn evaluate(&self, resources: &[Resource]) -> Vec<Violation> {
        let known: BTreeSet<ResourceId> = resources.iter().map(Resource::id).collect();

        resources
            .iter()
            .flat_map(|resource| {
                let known = &known;
                resource
                    .network_rules
                    .iter()
                    .filter_map(move |rule| match &rule.peer {
                        Peer::SecurityBoundary(target) if !known.contains(target) => {
                            Some(Violation::blocking(
                                POLICY_NAME,
                                resource.id(),
                                format!("Rule references unknown security boundary {}", target),
                            ))
                        }
                        _ => None,
                    })
            })
            .collect()
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Mandatory Tags
//!
//! Removing any subset of the mandatory keys yields exactly one tagging
//! violation for the resource, naming every missing key.

use cim_provisioning::domain::{Resource, ResourceKind, StandardTags, MANDATORY_TAGS};
use cim_provisioning::policy::{tagging, EvaluationPhase, PolicyEngine, Severity};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_one_violation_names_every_missing_key(
        removed in prop::sample::subsequence(MANDATORY_TAGS.to_vec(), 0..=MANDATORY_TAGS.len()),
        blank in any::<bool>(),
    ) {
        let mut tags = StandardTags::default().to_map();
        for key in &removed {
            if blank {
                tags.insert(key.to_string(), String::new());
            } else {
                tags.remove(*key);
            }
        }
        let log_group = Resource::builder(ResourceKind::LogGroup, "app-logs").tags(tags).build();

        let violations: Vec<_> = PolicyEngine::mandatory()
            .evaluate(&[log_group], EvaluationPhase::PreDeployment)
            .into_iter()
            .filter(|v| v.policy == tagging::POLICY_NAME)
            .collect();

        if removed.is_empty() {
            prop_assert!(violations.is_empty());
        } else {
            prop_assert_eq!(violations.len(), 1);
            prop_assert_eq!(violations[0].severity, Severity::Blocking);
            for key in &removed {
                prop_assert!(violations[0].reason.contains(key), "{} not in {}", key, violations[0].reason);
            }
        }
    }
}

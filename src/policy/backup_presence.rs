// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup Policy Presence
//!
//! Every stateful resource carries exactly one backup policy, and that
//! policy must describe a usable retention window and recovery objectives.

use crate::domain::Resource;

use super::{Policy, Violation};

pub const POLICY_NAME: &str = "BackupPolicyPresence";

#[derive(Debug, Clone, Copy, Default)]
pub struct BackupPolicyPresence;

impl Policy for BackupPolicyPresence {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn evaluate(&self, resources: &[Resource]) -> Vec<Violation> {
        let mut violations = Vec::new();
        for resource in resources {
            match (&resource.backup, resource.stateful) {
                (None, true) => violations.push(Violation::blocking(
                    POLICY_NAME,
                    resource.id(),
                    "Stateful resource has no backup policy",
                )),
                (Some(policy), _) => {
                    if policy.retention_days == 0 {
                        violations.push(Violation::blocking(
                            POLICY_NAME,
                            resource.id(),
                            "Backup retention must be at least one day",
                        ));
                    }
                    if policy.rpo_minutes == 0 || policy.rto_minutes == 0 {
                        violations.push(Violation::blocking(
                            POLICY_NAME,
                            resource.id(),
                            "Backup RTO and RPO must be positive",
                        ));
                    }
                    if !resource.stateful {
                        violations.push(Violation::advisory(
                            POLICY_NAME,
                            resource.id(),
                            "Backup policy on a resource not marked stateful",
                        ));
                    }
                }
                (None, false) => {}
            }
        }
        violations
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Tagging Compliance
//!
//! Every resource must carry the mandatory tag keys with non-empty values.
//! A non-compliant resource yields exactly one violation listing every
//! missing key.

use crate::domain::{missing_mandatory_tags, Resource};

use super::{Policy, Violation};

pub const POLICY_NAME: &str = "ResourceTaggingCompliance";

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceTaggingCompliance;

impl Policy for ResourceTaggingCompliance {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn evaluate(&self, resources: &[Resource]) -> Vec<Violation> {
        resources
            .iter()
            .filter_map(|resource| {
                let missing = missing_mandatory_tags(&resource.tags);
                if missing.is_empty() {
                    None
                } else {
                    Some(Violation::blocking(
                        POLICY_NAME,
                        resource.id(),
                        format!("Missing or empty mandatory tags: {}", missing.join(", ")),
                    ))
                }
            })
            .collect()
    }
}

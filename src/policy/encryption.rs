// Copyright (c) 2025 - Cowboy AI, Inc.
//! Encryption At Rest
//!
//! Resources that store data must declare encryption, either with
//! `encrypted = true` or an `encryption` mode other than `none`.

use crate::domain::Resource;

use super::{Policy, Violation};

pub const POLICY_NAME: &str = "EncryptionAtRestRequired";

/// Attribute holding a boolean encryption flag
pub const ATTR_ENCRYPTED: &str = "encrypted";
/// Attribute naming the encryption mode (`sse_s3`, `sse_kms`, `none`)
pub const ATTR_ENCRYPTION: &str = "encryption";

#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptionAtRestRequired;

/// Whether the resource declares encryption at rest
pub fn is_encrypted(resource: &Resource) -> bool {
    resource.attr_bool(ATTR_ENCRYPTED) == Some(true)
        || resource
            .attr_str(ATTR_ENCRYPTION)
            .is_some_and(|mode| !mode.eq_ignore_ascii_case("none") && !mode.is_empty())
}

impl Policy for EncryptionAtRestRequired {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn evaluate(&self, resources: &[Resource]) -> Vec<Violation> {
        resources
            .iter()
            .filter(|r| r.kind.stores_data_at_rest() && !is_encrypted(r))
            .map(|r| {
                Violation::blocking(
                    POLICY_NAME,
                    r.id(),
                    format!("{} stores data at rest without encryption", r.kind),
                )
            })
            .collect()
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Model Construction Invariants
//!
//! Structural checks over a declared stack set. These run before the
//! resolver and never touch a provider. Policy-level rules (tagging, network
//! exposure, encryption) live in the policy engine instead, because they
//! produce violations rather than hard errors.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{ResourceId, Stack, StackName};
use crate::errors::{ProvisioningError, ProvisioningResult};

/// Validate stack names are unique and non-empty
pub fn validate_stack_names(stacks: &[Stack]) -> ProvisioningResult<()> {
    let mut seen = BTreeSet::new();
    for stack in stacks {
        if stack.name.as_str().trim().is_empty() {
            return Err(ProvisioningError::InvalidModel(
                "Stack name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(&stack.name) {
            return Err(ProvisioningError::DuplicateStack(stack.name.clone()));
        }
    }
    Ok(())
}

/// Validate each resource is owned by exactly the stack that declares it
///
/// # Rules
/// - Resource identities are unique across the whole set
/// - `resource.stack` equals the declaring stack
/// - Resource names are non-empty
pub fn validate_resource_ownership(stacks: &[Stack]) -> ProvisioningResult<()> {
    let mut owners: BTreeMap<ResourceId, &StackName> = BTreeMap::new();

    for stack in stacks {
        for resource in &stack.resources {
            if resource.name.trim().is_empty() {
                return Err(ProvisioningError::InvalidModel(format!(
                    "Resource of kind {} in stack {} has an empty name",
                    resource.kind, stack.name
                )));
            }
            if resource.stack != stack.name {
                return Err(ProvisioningError::InvalidModel(format!(
                    "Resource {} is declared in stack {} but owned by {}",
                    resource.id(),
                    stack.name,
                    resource.stack
                )));
            }
            if owners.insert(resource.id(), &stack.name).is_some() {
                return Err(ProvisioningError::DuplicateResource(resource.id()));
            }
        }
    }
    Ok(())
}

/// Composite validation for a declared model
pub fn validate_model(stacks: &[Stack]) -> ProvisioningResult<()> {
    validate_stack_names(stacks)?;
    validate_resource_ownership(stacks)?;
    Ok(())
}

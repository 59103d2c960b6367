// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Entity
//!
//! A stack is the atomic unit of apply and rollback: a named collection of
//! resources plus the names of the stacks it depends on.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::resource::{Resource, ResourceId};

/// Stack name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackName(String);

impl StackName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StackName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StackName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&StackName> for StackName {
    fn from(value: &StackName) -> Self {
        value.clone()
    }
}

impl AsRef<str> for StackName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Named collection of resources with declared dependencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: StackName,
    #[serde(default)]
    pub depends_on: Vec<StackName>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Stack {
    pub fn new(name: impl Into<StackName>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Add a dependency on another stack
    pub fn depends_on(mut self, dependency: impl Into<StackName>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }

    /// Add a resource, taking ownership of it
    pub fn with_resource(mut self, mut resource: Resource) -> Self {
        resource.stack = self.name.clone();
        self.resources.push(resource);
        self
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().map(Resource::id)
    }

    pub fn find(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.kind == id.kind && r.name == id.name)
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Entity
//!
//! A [`Resource`] is the unit the provider creates. Identity is the pair
//! (`kind`, `name`); everything else is declared configuration that the
//! owning stack may change on a later apply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::backup_policy::BackupPolicy;
use super::network::NetworkRule;
use super::resource_kind::{ResourceKind, UnknownResourceKind};
use super::stack::StackName;

/// Resource identity, rendered as `kind/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Error parsing a `kind/name` identity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceIdError {
    #[error("Resource id must be kind/name, got {0}")]
    Malformed(String),

    #[error(transparent)]
    Kind(#[from] UnknownResourceKind),
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('/')
            .ok_or_else(|| ResourceIdError::Malformed(s.to_string()))?;
        if name.is_empty() {
            return Err(ResourceIdError::Malformed(s.to_string()));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ResourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.to_string()
    }
}

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A provisionable unit owned by exactly one stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub name: String,
    pub stack: StackName,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub network_rules: Vec<NetworkRule>,
    #[serde(default)]
    pub stateful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupPolicy>,
}

impl Resource {
    /// Start building a resource. `stateful` defaults from the kind.
    pub fn builder(kind: ResourceKind, name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(kind, name)
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.kind, self.name.clone())
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(AttributeValue::as_str)
    }

    pub fn attr_int(&self, key: &str) -> Option<i64> {
        self.attribute(key).and_then(AttributeValue::as_int)
    }

    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attribute(key).and_then(AttributeValue::as_f64)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attribute(key).and_then(AttributeValue::as_bool)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Same declared configuration, ignoring which stack is recorded as owner
    pub fn same_configuration(&self, other: &Resource) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.attributes == other.attributes
            && self.tags == other.tags
            && self.network_rules == other.network_rules
            && self.stateful == other.stateful
            && self.backup == other.backup
    }
}

/// Builder for [`Resource`]
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            resource: Resource {
                kind,
                name: name.into(),
                stack: StackName::default(),
                attributes: BTreeMap::new(),
                tags: BTreeMap::new(),
                network_rules: Vec::new(),
                stateful: kind.is_stateful_by_default(),
                backup: None,
            },
        }
    }

    pub fn stack(mut self, stack: impl Into<StackName>) -> Self {
        self.resource.stack = stack.into();
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.resource.attributes.insert(key.into(), value.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.resource.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.resource
            .tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn rule(mut self, rule: NetworkRule) -> Self {
        self.resource.network_rules.push(rule);
        self
    }

    pub fn stateful(mut self, stateful: bool) -> Self {
        self.resource.stateful = stateful;
        self
    }

    pub fn backup(mut self, policy: BackupPolicy) -> Self {
        self.resource.backup = Some(policy);
        self
    }

    pub fn build(self) -> Resource {
        self.resource
    }
}

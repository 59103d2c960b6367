// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisionable Resource Kind Taxonomy
//!
//! Defines the closed set of resource kinds a stack may declare. Pricing,
//! policy, and backup rules all dispatch on this enum, which keeps them total.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provisionable resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    // Network
    /// Virtual private network
    Vpc,
    /// Subnet within a VPC
    Subnet,
    /// Stateful firewall boundary
    SecurityGroup,
    /// Private service endpoint (gateway or interface)
    VpcEndpoint,
    /// Managed NAT gateway
    NatGateway,

    // Compute and data
    /// Virtual machine instance
    Instance,
    /// Managed relational database instance
    DatabaseInstance,
    /// Managed in-memory cache cluster
    CacheCluster,

    // Storage and delivery
    /// Object storage bucket
    Bucket,
    /// CDN distribution
    Distribution,

    // Observability
    /// Metric alarm
    Alarm,
    /// Notification topic
    Topic,
    /// Log group
    LogGroup,
    /// Audit trail
    Trail,

    // Backup
    /// Backup vault
    BackupVault,
    /// Backup plan
    BackupPlan,
}

/// High-level grouping of resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    Network,
    Compute,
    Data,
    Storage,
    Observability,
    Backup,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 16] = [
        Self::Vpc,
        Self::Subnet,
        Self::SecurityGroup,
        Self::VpcEndpoint,
        Self::NatGateway,
        Self::Instance,
        Self::DatabaseInstance,
        Self::CacheCluster,
        Self::Bucket,
        Self::Distribution,
        Self::Alarm,
        Self::Topic,
        Self::LogGroup,
        Self::Trail,
        Self::BackupVault,
        Self::BackupPlan,
    ];

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::SecurityGroup => "security_group",
            Self::VpcEndpoint => "vpc_endpoint",
            Self::NatGateway => "nat_gateway",
            Self::Instance => "instance",
            Self::DatabaseInstance => "database_instance",
            Self::CacheCluster => "cache_cluster",
            Self::Bucket => "bucket",
            Self::Distribution => "distribution",
            Self::Alarm => "alarm",
            Self::Topic => "topic",
            Self::LogGroup => "log_group",
            Self::Trail => "trail",
            Self::BackupVault => "backup_vault",
            Self::BackupPlan => "backup_plan",
        }
    }

    /// Get the primary category for this kind
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc
            | Self::Subnet
            | Self::SecurityGroup
            | Self::VpcEndpoint
            | Self::NatGateway => ResourceCategory::Network,

            Self::Instance => ResourceCategory::Compute,

            Self::DatabaseInstance | Self::CacheCluster => ResourceCategory::Data,

            Self::Bucket | Self::Distribution => ResourceCategory::Storage,

            Self::Alarm | Self::Topic | Self::LogGroup | Self::Trail => {
                ResourceCategory::Observability
            }

            Self::BackupVault | Self::BackupPlan => ResourceCategory::Backup,
        }
    }

    /// Kinds that hold data and therefore need a backup policy by default
    pub fn is_stateful_by_default(&self) -> bool {
        matches!(self, Self::DatabaseInstance | Self::CacheCluster)
    }

    /// Kinds that store data at rest and must be encrypted
    pub fn stores_data_at_rest(&self) -> bool {
        matches!(
            self,
            Self::DatabaseInstance
                | Self::CacheCluster
                | Self::Bucket
                | Self::BackupVault
                | Self::LogGroup
                | Self::Topic
        )
    }

    /// Kinds that may carry network rules
    pub fn has_security_boundary(&self) -> bool {
        matches!(
            self,
            Self::SecurityGroup
                | Self::Instance
                | Self::DatabaseInstance
                | Self::CacheCluster
                | Self::VpcEndpoint
        )
    }
}

/// Error returned when parsing an unknown kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resource kind: {0}")]
pub struct UnknownResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or(UnknownResourceKind(s.to_string()))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert!("mainframe".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ResourceKind::Subnet.category(), ResourceCategory::Network);
        assert_eq!(ResourceKind::DatabaseInstance.category(), ResourceCategory::Data);
        assert_eq!(ResourceKind::Alarm.category(), ResourceCategory::Observability);
    }

    #[test]
    fn test_stateful_defaults() {
        assert!(ResourceKind::DatabaseInstance.is_stateful_by_default());
        assert!(ResourceKind::CacheCluster.is_stateful_by_default());
        assert!(!ResourceKind::Bucket.is_stateful_by_default());
    }
}

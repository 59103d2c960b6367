// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pricing Table and Free-Tier Catalog
//!
//! On-demand rates in USD for a single region. Monthly figures assume
//! 730 hours per month.

use crate::domain::{Resource, ResourceKind};

pub const HOURS_PER_MONTH: f64 = 730.0;

/// Attribute keys the estimator reads
pub mod attr {
    pub const INSTANCE_CLASS: &str = "instance_class";
    pub const STORAGE_GB: &str = "storage_gb";
    pub const MULTI_AZ: &str = "multi_az";
    pub const NUM_NODES: &str = "num_nodes";
    pub const ENDPOINT_TYPE: &str = "endpoint_type";
    pub const AZ_COUNT: &str = "az_count";
    pub const DATA_PROCESSED_GB: &str = "data_processed_gb";
    pub const TRANSFER_GB: &str = "transfer_gb";
    pub const PRICE_CLASS: &str = "price_class";
    pub const INGESTED_GB: &str = "ingested_gb";
    pub const ENCRYPTION: &str = "encryption";
}

pub const DB_STORAGE_PER_GB: f64 = 0.115;
pub const BUCKET_STORAGE_PER_GB: f64 = 0.023;
pub const BACKUP_STORAGE_PER_GB: f64 = 0.095;
pub const INTERFACE_ENDPOINT_HOURLY_PER_AZ: f64 = 0.01;
pub const INTERFACE_ENDPOINT_PER_GB: f64 = 0.01;
pub const NAT_GATEWAY_HOURLY: f64 = 0.045;
pub const NAT_GATEWAY_PER_GB: f64 = 0.045;
pub const ALARM_MONTHLY: f64 = 0.10;
pub const LOG_INGEST_PER_GB: f64 = 0.50;
pub const LOG_STORAGE_PER_GB: f64 = 0.03;
pub const TRAIL_MONTHLY: f64 = 2.0;
pub const KMS_KEY_MONTHLY: f64 = 1.0;

pub const DEFAULT_PRICE_CLASS: &str = "PriceClass_100";

/// Hourly rate for an instance class of the given kind
pub fn instance_hourly(kind: ResourceKind, class: &str) -> Option<f64> {
    let rate = match (kind, class) {
        (ResourceKind::DatabaseInstance, "db.t3.micro") => 0.017,
        (ResourceKind::DatabaseInstance, "db.t3.small") => 0.034,
        (ResourceKind::DatabaseInstance, "db.t3.medium") => 0.068,
        (ResourceKind::DatabaseInstance, "db.m5.large") => 0.171,
        (ResourceKind::CacheCluster, "cache.t3.micro") => 0.017,
        (ResourceKind::CacheCluster, "cache.t3.small") => 0.034,
        (ResourceKind::CacheCluster, "cache.t3.medium") => 0.068,
        (ResourceKind::CacheCluster, "cache.m5.large") => 0.156,
        (ResourceKind::Instance, "t3.micro") => 0.0104,
        (ResourceKind::Instance, "t3.small") => 0.0208,
        (ResourceKind::Instance, "t3.medium") => 0.0416,
        _ => return None,
    };
    Some(rate)
}

/// Default (cheapest) instance class per kind
pub fn default_instance_class(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::DatabaseInstance => Some("db.t3.micro"),
        ResourceKind::CacheCluster => Some("cache.t3.micro"),
        ResourceKind::Instance => Some("t3.micro"),
        _ => None,
    }
}

/// Declared instance class, falling back to the kind's default
pub fn instance_class(resource: &Resource) -> Option<&str> {
    resource
        .attr_str(attr::INSTANCE_CLASS)
        .or_else(|| default_instance_class(resource.kind))
}

/// Per-GB transfer rate for a distribution price class
pub fn price_class_rate(class: &str) -> Option<f64> {
    match class {
        "PriceClass_100" => Some(0.085),
        "PriceClass_200" => Some(0.12),
        "PriceClass_All" => Some(0.17),
        _ => None,
    }
}

/// Whether the resource matches a free-tier catalog entry
///
/// Catalog:
/// - database: `db.t3.micro`, single-AZ, at most 20 GB
/// - cache: `cache.t3.micro`
/// - instance: `t3.micro`
/// - bucket: at most 5 GB
/// - distribution: `PriceClass_100`, at most 1024 GB transfer
pub fn free_tier_match(resource: &Resource) -> bool {
    let class = instance_class(resource);
    let storage = resource.attr_f64(attr::STORAGE_GB).unwrap_or(0.0);

    match resource.kind {
        ResourceKind::DatabaseInstance => {
            class == Some("db.t3.micro")
                && !resource.attr_bool(attr::MULTI_AZ).unwrap_or(false)
                && storage <= 20.0
        }
        ResourceKind::CacheCluster => {
            class == Some("cache.t3.micro") && resource.attr_int(attr::NUM_NODES).unwrap_or(1) <= 1
        }
        ResourceKind::Instance => class == Some("t3.micro"),
        ResourceKind::Bucket => storage <= 5.0,
        ResourceKind::Distribution => {
            resource
                .attr_str(attr::PRICE_CLASS)
                .unwrap_or(DEFAULT_PRICE_CLASS)
                == DEFAULT_PRICE_CLASS
                && resource.attr_f64(attr::TRANSFER_GB).unwrap_or(0.0) <= 1024.0
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_rates() {
        assert_eq!(instance_hourly(ResourceKind::DatabaseInstance, "db.t3.micro"), Some(0.017));
        assert_eq!(instance_hourly(ResourceKind::CacheCluster, "db.t3.micro"), None);
        assert_eq!(instance_hourly(ResourceKind::Instance, "x1e.32xlarge"), None);
    }

    #[test]
    fn test_free_tier_catalog() {
        let micro = Resource::builder(ResourceKind::DatabaseInstance, "db")
            .attribute(attr::INSTANCE_CLASS, "db.t3.micro")
            .attribute(attr::STORAGE_GB, 20i64)
            .build();
        assert!(free_tier_match(&micro));

        let large_disk = Resource::builder(ResourceKind::DatabaseInstance, "db")
            .attribute(attr::INSTANCE_CLASS, "db.t3.micro")
            .attribute(attr::STORAGE_GB, 100i64)
            .build();
        assert!(!free_tier_match(&large_disk));

        let multi_az = Resource::builder(ResourceKind::DatabaseInstance, "db")
            .attribute(attr::INSTANCE_CLASS, "db.t3.micro")
            .attribute(attr::MULTI_AZ, true)
            .build();
        assert!(!free_tier_match(&multi_az));

        let vpc = Resource::builder(ResourceKind::Vpc, "main").build();
        assert!(!free_tier_match(&vpc));
    }

    #[test]
    fn test_missing_class_uses_default() {
        let implicit = Resource::builder(ResourceKind::CacheCluster, "cache").build();
        assert_eq!(instance_class(&implicit), Some("cache.t3.micro"));
        assert!(free_tier_match(&implicit));

        let bucket = Resource::builder(ResourceKind::Bucket, "assets").build();
        assert_eq!(instance_class(&bucket), None);
    }
}

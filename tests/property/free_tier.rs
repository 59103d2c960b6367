// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Free-Tier Expiry
//!
//! Catalog items are free through month twelve and charged at their
//! standard price afterwards. The price components never move with time.

use cim_provisioning::cost::estimate;
use cim_provisioning::domain::{Resource, ResourceKind};
use proptest::prelude::*;

fn catalog_item() -> impl Strategy<Value = Resource> {
    prop_oneof![
        (1i64..=20).prop_map(|gb| {
            Resource::builder(ResourceKind::DatabaseInstance, "db")
                .attribute("instance_class", "db.t3.micro")
                .attribute("storage_gb", gb)
                .build()
        }),
        Just(
            Resource::builder(ResourceKind::CacheCluster, "cache")
                .attribute("instance_class", "cache.t3.micro")
                .build()
        ),
        Just(
            Resource::builder(ResourceKind::Instance, "bastion")
                .attribute("instance_class", "t3.micro")
                .build()
        ),
        (0i64..=5).prop_map(|gb| {
            Resource::builder(ResourceKind::Bucket, "assets")
                .attribute("storage_gb", gb)
                .build()
        }),
    ]
}

proptest! {
    /// Eligible iff still inside the window; estimate follows eligibility
    #[test]
    fn prop_free_tier_window(resource in catalog_item(), elapsed in 0u32..120) {
        let report = estimate(std::slice::from_ref(&resource), elapsed);
        let entry = report.entry(&resource.id()).unwrap();

        prop_assert_eq!(entry.free_tier_eligible, elapsed <= 12);
        prop_assert_eq!(entry.free_tier_expires_after_months, Some(12));
        if entry.free_tier_eligible {
            prop_assert_eq!(entry.monthly_estimate, 0.0);
        } else {
            prop_assert!((entry.monthly_estimate - entry.standard_monthly()).abs() < 1e-9);
        }
    }

    /// Only the estimate changes across the boundary
    #[test]
    fn prop_components_do_not_depend_on_elapsed(
        resource in catalog_item(),
        a in 0u32..120,
        b in 0u32..120,
    ) {
        let first = estimate(std::slice::from_ref(&resource), a);
        let second = estimate(std::slice::from_ref(&resource), b);
        let (x, y) = (first.entry(&resource.id()).unwrap(), second.entry(&resource.id()).unwrap());

        prop_assert_eq!(x.fixed_monthly, y.fixed_monthly);
        prop_assert_eq!(x.variable_monthly, y.variable_monthly);
    }

    /// Totals never shrink as time passes
    #[test]
    fn prop_total_is_monotonic(resource in catalog_item(), elapsed in 0u32..119) {
        let now = estimate(std::slice::from_ref(&resource), elapsed);
        let later = estimate(std::slice::from_ref(&resource), elapsed + 1);
        prop_assert!(later.total_monthly >= now.total_monthly);
    }
}

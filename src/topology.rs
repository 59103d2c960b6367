// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reference Topology
//!
//! The eight-stack layout of the Phase 1 deployment: a two-AZ VPC without
//! NAT gateways, security groups chained by reference, a single-AZ
//! PostgreSQL instance and Redis node on free-tier classes, SSE-S3 buckets
//! behind a `PriceClass_100` distribution, and daily backups.
//!
//! ```text
//! network
//! security    <- network
//! monitoring
//! database    <- network, security
//! cache       <- network, security
//! storage
//! cdn         <- storage
//! backup      <- monitoring, database, cache
//! ```

use crate::cost::pricing::attr;
use crate::domain::{
    BackupPolicy, Cidr, NetworkRule, Peer, Resource, ResourceBuilder, ResourceId, ResourceKind, Stack,
    StandardTags,
};
use crate::policy::encryption::{ATTR_ENCRYPTED, ATTR_ENCRYPTION};

pub const NETWORK: &str = "network";
pub const SECURITY: &str = "security";
pub const MONITORING: &str = "monitoring";
pub const DATABASE: &str = "database";
pub const CACHE: &str = "cache";
pub const STORAGE: &str = "storage";
pub const CDN: &str = "cdn";
pub const BACKUP: &str = "backup";

const APP_SG: &str = "showcore-app-sg";
const RDS_SG: &str = "showcore-rds-sg";
const CACHE_SG: &str = "showcore-elasticache-sg";

/// The reference stacks with the default tag values
pub fn reference_stacks() -> Vec<Stack> {
    reference_stacks_with(&StandardTags::default())
}

/// The reference stacks tagged with `tags`
pub fn reference_stacks_with(tags: &StandardTags) -> Vec<Stack> {
    vec![
        network(tags),
        security(tags),
        monitoring(tags),
        database(tags),
        cache(tags),
        storage(tags),
        cdn(tags),
        backup(tags),
    ]
}

fn build(kind: ResourceKind, name: &str, tags: &StandardTags, component: &str) -> ResourceBuilder {
    Resource::builder(kind, name).tags(tags.for_component(component))
}

fn boundary(name: &str) -> Peer {
    Peer::SecurityBoundary(ResourceId::new(ResourceKind::SecurityGroup, name))
}

fn network(tags: &StandardTags) -> Stack {
    let mut stack = Stack::new(NETWORK).with_resource(
        build(ResourceKind::Vpc, "showcore-vpc", tags, NETWORK)
            .attribute("cidr_block", "10.0.0.0/16")
            .attribute(attr::AZ_COUNT, 2i64)
            .attribute("nat_gateways", 0i64)
            .build(),
    );

    for (name, cidr, public) in [
        ("public-1a", "10.0.0.0/24", true),
        ("public-1b", "10.0.1.0/24", true),
        ("private-1a", "10.0.2.0/24", false),
        ("private-1b", "10.0.3.0/24", false),
    ] {
        stack = stack.with_resource(
            build(ResourceKind::Subnet, name, tags, NETWORK)
                .attribute("cidr_block", cidr)
                .attribute("public", public)
                .build(),
        );
    }

    for service in ["s3", "dynamodb"] {
        stack = stack.with_resource(
            build(ResourceKind::VpcEndpoint, &format!("{}-gateway", service), tags, NETWORK)
                .attribute(attr::ENDPOINT_TYPE, "gateway")
                .attribute("service", service)
                .build(),
        );
    }

    for service in ["secretsmanager", "logs"] {
        stack = stack.with_resource(
            build(ResourceKind::VpcEndpoint, &format!("{}-interface", service), tags, NETWORK)
                .attribute(attr::ENDPOINT_TYPE, "interface")
                .attribute(attr::AZ_COUNT, 2i64)
                .attribute("service", service)
                .build(),
        );
    }

    stack
}

fn security(tags: &StandardTags) -> Stack {
    Stack::new(SECURITY)
        .depends_on(NETWORK)
        .with_resource(
            build(ResourceKind::SecurityGroup, APP_SG, tags, SECURITY)
                .rule(NetworkRule::inbound_tcp(443, Peer::Cidr(Cidr::anyone_v4())).with_description("HTTPS"))
                .rule(NetworkRule::outbound_all(Peer::Cidr(Cidr::anyone_v4())))
                .build(),
        )
        .with_resource(
            build(ResourceKind::SecurityGroup, RDS_SG, tags, SECURITY)
                .rule(NetworkRule::inbound_tcp(5432, boundary(APP_SG)).with_description("PostgreSQL from application"))
                .build(),
        )
        .with_resource(
            build(ResourceKind::SecurityGroup, CACHE_SG, tags, SECURITY)
                .rule(NetworkRule::inbound_tcp(6379, boundary(APP_SG)).with_description("Redis from application"))
                .build(),
        )
        .with_resource(
            build(ResourceKind::Bucket, "showcore-cloudtrail-logs", tags, SECURITY)
                .attribute(ATTR_ENCRYPTION, "sse_s3")
                .attribute("versioning", true)
                .attribute(attr::STORAGE_GB, 1i64)
                .build(),
        )
        .with_resource(
            build(ResourceKind::Trail, "showcore-audit-trail", tags, SECURITY)
                .attribute("multi_region", true)
                .build(),
        )
}

fn monitoring(tags: &StandardTags) -> Stack {
    let mut stack = Stack::new(MONITORING);

    for topic in ["showcore-critical-alerts", "showcore-warning-alerts", "showcore-billing-alerts"] {
        stack = stack.with_resource(
            build(ResourceKind::Topic, topic, tags, MONITORING)
                .attribute(ATTR_ENCRYPTED, true)
                .build(),
        );
    }

    for threshold in [50i64, 100] {
        stack = stack.with_resource(
            build(ResourceKind::Alarm, &format!("showcore-billing-{}", threshold), tags, MONITORING)
                .attribute("metric", "EstimatedCharges")
                .attribute("threshold", threshold)
                .build(),
        );
    }

    stack.with_resource(
        build(ResourceKind::LogGroup, "showcore-application", tags, MONITORING)
            .attribute(ATTR_ENCRYPTED, true)
            .attribute("retention_days", 7i64)
            .attribute(attr::INGESTED_GB, 1i64)
            .build(),
    )
}

fn database(tags: &StandardTags) -> Stack {
    Stack::new(DATABASE)
        .depends_on(NETWORK)
        .depends_on(SECURITY)
        .with_resource(
            build(ResourceKind::DatabaseInstance, "showcore-db", tags, DATABASE)
                .attribute("engine", "postgres")
                .attribute(attr::INSTANCE_CLASS, "db.t3.micro")
                .attribute(attr::STORAGE_GB, 20i64)
                .attribute(attr::MULTI_AZ, false)
                .attribute(ATTR_ENCRYPTED, true)
                .rule(NetworkRule::inbound_tcp(5432, boundary(RDS_SG)))
                .backup(BackupPolicy::daily_standard())
                .build(),
        )
        .with_resource(
            build(ResourceKind::Alarm, "showcore-rds-cpu-high", tags, DATABASE)
                .attribute("threshold", 80i64)
                .build(),
        )
}

fn cache(tags: &StandardTags) -> Stack {
    Stack::new(CACHE)
        .depends_on(NETWORK)
        .depends_on(SECURITY)
        .with_resource(
            build(ResourceKind::CacheCluster, "showcore-redis", tags, CACHE)
                .attribute("engine", "redis")
                .attribute(attr::INSTANCE_CLASS, "cache.t3.micro")
                .attribute(attr::NUM_NODES, 1i64)
                .attribute(ATTR_ENCRYPTED, true)
                .rule(NetworkRule::inbound_tcp(6379, boundary(CACHE_SG)))
                .backup(BackupPolicy::daily_standard())
                .build(),
        )
        .with_resource(
            build(ResourceKind::Alarm, "showcore-elasticache-cpu-high", tags, CACHE)
                .attribute("threshold", 75i64)
                .build(),
        )
}

fn storage(tags: &StandardTags) -> Stack {
    Stack::new(STORAGE)
        .with_resource(
            build(ResourceKind::Bucket, "showcore-static-assets", tags, STORAGE)
                .attribute(ATTR_ENCRYPTION, "sse_s3")
                .attribute("versioning", true)
                .attribute(attr::STORAGE_GB, 5i64)
                .build(),
        )
        .with_resource(
            build(ResourceKind::Bucket, "showcore-backups", tags, STORAGE)
                .attribute(ATTR_ENCRYPTION, "sse_s3")
                .attribute("versioning", true)
                .attribute("expire_after_days", 90i64)
                .attribute(attr::STORAGE_GB, 10i64)
                .build(),
        )
}

fn cdn(tags: &StandardTags) -> Stack {
    Stack::new(CDN).depends_on(STORAGE).with_resource(
        build(ResourceKind::Distribution, "showcore-static-cdn", tags, CDN)
            .attribute("origin", "showcore-static-assets")
            .attribute(attr::PRICE_CLASS, "PriceClass_100")
            .attribute(attr::TRANSFER_GB, 10i64)
            .attribute("minimum_tls", "TLSv1.2_2021")
            .build(),
    )
}

fn backup(tags: &StandardTags) -> Stack {
    let mut stack = Stack::new(BACKUP)
        .depends_on(MONITORING)
        .depends_on(DATABASE)
        .depends_on(CACHE)
        .with_resource(
            build(ResourceKind::BackupVault, "showcore-backup-vault", tags, BACKUP)
                .attribute(ATTR_ENCRYPTED, true)
                .attribute(attr::STORAGE_GB, 20i64)
                .build(),
        );

    for (plan, target) in [("rds", "showcore-db"), ("elasticache", "showcore-redis")] {
        stack = stack
            .with_resource(
                build(ResourceKind::BackupPlan, &format!("showcore-{}-backup-plan", plan), tags, BACKUP)
                    .attribute("schedule", "0 3 * * *")
                    .attribute("delete_after_days", 7i64)
                    .attribute("target", target)
                    .build(),
            )
            .with_resource(
                build(ResourceKind::Alarm, &format!("showcore-{}-backup-failure", plan), tags, BACKUP)
                    .attribute("threshold", 1i64)
                    .build(),
            );
    }

    stack
}

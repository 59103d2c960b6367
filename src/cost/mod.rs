// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cost Estimator
//!
//! Prices a resource snapshot against the table in [`pricing`]. Each
//! [`CostEntry`] keeps its standard fixed and variable components; the
//! free tier only changes what the entry is expected to cost this month.
//!
//! ```text
//! elapsed_months <= 12 && catalog match  →  monthly_estimate = not_covered
//! otherwise                              →  monthly_estimate = fixed + variable
//! ```
//!
//! `not_covered` is the part of the fixed charge the free tier never pays
//! for, such as a customer managed KMS key on a free bucket.
//!
//! Cost findings are always advisory. They travel through the same
//! [`Violation`] channel as policy results but never block a deployment.

pub mod pricing;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Resource, ResourceId, ResourceKind, StackName};
use crate::policy::{EvaluationPhase, Severity, Violation};
use pricing::attr;

pub const COST_OPTIMIZATION: &str = "CostOptimization";
pub const UNPRICED: &str = "Unpriced";
pub const BUDGET_THRESHOLD: &str = "BudgetThreshold";

/// Estimator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Months after first apply during which the free tier applies
    pub free_tier_months: u32,
    /// Monthly total that raises a warning
    pub warning_threshold: f64,
    /// Monthly total that raises a critical alert
    pub critical_threshold: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            free_tier_months: 12,
            warning_threshold: 50.0,
            critical_threshold: 100.0,
        }
    }
}

/// Priced resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub resource: ResourceId,
    pub stack: StackName,
    pub kind: ResourceKind,
    /// Standard hourly and flat charges per month
    pub fixed_monthly: f64,
    /// Standard usage-driven charges per month
    pub variable_monthly: f64,
    /// Part of `fixed_monthly` billed even inside the free tier
    #[serde(default)]
    pub not_covered_monthly: f64,
    pub free_tier_eligible: bool,
    /// Set when the resource matches a free-tier catalog entry
    pub free_tier_expires_after_months: Option<u32>,
    pub monthly_estimate: f64,
}

impl CostEntry {
    pub fn standard_monthly(&self) -> f64 {
        self.fixed_monthly + self.variable_monthly
    }
}

/// Position of the monthly total against budget thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Within,
    Warning,
    Critical,
}

impl BudgetStatus {
    pub fn evaluate(total: f64, config: &CostConfig) -> Self {
        if total >= config.critical_threshold {
            BudgetStatus::Critical
        } else if total >= config.warning_threshold {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Within
        }
    }
}

/// Result of an estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub elapsed_months: u32,
    pub entries: Vec<CostEntry>,
    pub per_stack: BTreeMap<StackName, f64>,
    pub total_monthly: f64,
    pub budget: BudgetStatus,
    /// Advisory findings only
    pub warnings: Vec<Violation>,
}

impl CostReport {
    pub fn entry(&self, resource: &ResourceId) -> Option<&CostEntry> {
        self.entries.iter().find(|e| &e.resource == resource)
    }

    pub fn stack_total(&self, stack: &StackName) -> f64 {
        self.per_stack.get(stack).copied().unwrap_or(0.0)
    }
}

/// Estimate with the default configuration
pub fn estimate(resources: &[Resource], elapsed_months: u32) -> CostReport {
    estimate_with(resources, elapsed_months, &CostConfig::default())
}

/// Estimate monthly cost of `resources`, `elapsed_months` after first apply
pub fn estimate_with(resources: &[Resource], elapsed_months: u32, config: &CostConfig) -> CostReport {
    let free_trail = resources
        .iter()
        .filter(|r| r.kind == ResourceKind::Trail)
        .map(Resource::id)
        .min();

    let mut entries = Vec::with_capacity(resources.len());
    let mut warnings = Vec::new();
    let mut per_stack: BTreeMap<StackName, f64> = BTreeMap::new();

    for resource in resources {
        let priced = price(resource, free_trail.as_ref());
        warnings.extend(priced.warnings);

        let in_catalog = pricing::free_tier_match(resource);
        let eligible = in_catalog && elapsed_months <= config.free_tier_months;
        let standard = priced.fixed + priced.variable;

        let entry = CostEntry {
            resource: resource.id(),
            stack: resource.stack.clone(),
            kind: resource.kind,
            fixed_monthly: priced.fixed,
            variable_monthly: priced.variable,
            not_covered_monthly: priced.not_covered,
            free_tier_eligible: eligible,
            free_tier_expires_after_months: in_catalog.then_some(config.free_tier_months),
            monthly_estimate: if eligible { priced.not_covered } else { standard },
        };

        *per_stack.entry(entry.stack.clone()).or_default() += entry.monthly_estimate;
        entries.push(entry);
    }

    let total_monthly: f64 = entries.iter().map(|e| e.monthly_estimate).sum();
    let budget = BudgetStatus::evaluate(total_monthly, config);
    match budget {
        BudgetStatus::Within => {}
        BudgetStatus::Warning => warnings.push(Violation::aggregate(
            BUDGET_THRESHOLD,
            format!(
                "Estimated ${:.2}/month reaches the ${:.2} warning threshold",
                total_monthly, config.warning_threshold
            ),
            Severity::Advisory,
        )),
        BudgetStatus::Critical => warnings.push(Violation::aggregate(
            BUDGET_THRESHOLD,
            format!(
                "Estimated ${:.2}/month reaches the ${:.2} critical threshold",
                total_monthly, config.critical_threshold
            ),
            Severity::Advisory,
        )),
    }

    CostReport {
        elapsed_months,
        entries,
        per_stack,
        total_monthly,
        budget,
        warnings,
    }
}

/// Whole calendar months from `from` to `to`
///
/// A month counts once the same day-of-month and time have been reached.
pub fn elapsed_months(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    let to_key = (to.day(), to.num_seconds_from_midnight());
    let from_key = (from.day(), from.num_seconds_from_midnight());
    if to_key < from_key {
        months -= 1;
    }
    u32::try_from(months.max(0)).unwrap_or(0)
}

struct Priced {
    fixed: f64,
    variable: f64,
    not_covered: f64,
    warnings: Vec<Violation>,
}

fn advise(resource: &Resource, policy: &str, reason: String) -> Violation {
    Violation::advisory(policy, resource.id(), reason).in_phase(EvaluationPhase::Cost)
}

fn price(resource: &Resource, free_trail: Option<&ResourceId>) -> Priced {
    let mut warnings = Vec::new();
    let gb = |key: &str| resource.attr_f64(key).unwrap_or(0.0).max(0.0);

    let (fixed, variable) = match resource.kind {
        ResourceKind::DatabaseInstance | ResourceKind::CacheCluster | ResourceKind::Instance => {
            let hourly = instance_rate(resource, &mut warnings);
            let multiplier = if resource.kind == ResourceKind::CacheCluster {
                resource.attr_int(attr::NUM_NODES).unwrap_or(1).max(1) as f64
            } else if resource.attr_bool(attr::MULTI_AZ).unwrap_or(false) {
                warnings.push(advise(
                    resource,
                    COST_OPTIMIZATION,
                    "Multi-AZ doubles instance cost".to_string(),
                ));
                2.0
            } else {
                1.0
            };
            let storage = if resource.kind == ResourceKind::DatabaseInstance {
                gb(attr::STORAGE_GB) * pricing::DB_STORAGE_PER_GB
            } else {
                0.0
            };
            (hourly * pricing::HOURS_PER_MONTH * multiplier, storage)
        }
        ResourceKind::Bucket => {
            if resource.attr_str(attr::ENCRYPTION) != Some("sse_s3") {
                warnings.push(advise(
                    resource,
                    COST_OPTIMIZATION,
                    "Bucket does not use SSE-S3 encryption".to_string(),
                ));
            }
            (0.0, gb(attr::STORAGE_GB) * pricing::BUCKET_STORAGE_PER_GB)
        }
        ResourceKind::BackupVault => (0.0, gb(attr::STORAGE_GB) * pricing::BACKUP_STORAGE_PER_GB),
        ResourceKind::VpcEndpoint => match resource.attr_str(attr::ENDPOINT_TYPE) {
            Some("interface") => {
                let azs = resource.attr_int(attr::AZ_COUNT).unwrap_or(1).max(1) as f64;
                (
                    pricing::INTERFACE_ENDPOINT_HOURLY_PER_AZ * pricing::HOURS_PER_MONTH * azs,
                    gb(attr::DATA_PROCESSED_GB) * pricing::INTERFACE_ENDPOINT_PER_GB,
                )
            }
            _ => (0.0, 0.0),
        },
        ResourceKind::NatGateway => {
            let fixed = pricing::NAT_GATEWAY_HOURLY * pricing::HOURS_PER_MONTH;
            warnings.push(advise(
                resource,
                COST_OPTIMIZATION,
                format!(
                    "NAT gateway costs ${:.2}/month before data processing; prefer VPC endpoints",
                    fixed
                ),
            ));
            (fixed, gb(attr::DATA_PROCESSED_GB) * pricing::NAT_GATEWAY_PER_GB)
        }
        ResourceKind::Distribution => {
            let class = resource
                .attr_str(attr::PRICE_CLASS)
                .unwrap_or(pricing::DEFAULT_PRICE_CLASS);
            if class != pricing::DEFAULT_PRICE_CLASS {
                warnings.push(advise(
                    resource,
                    COST_OPTIMIZATION,
                    format!("Distribution uses {} instead of {}", class, pricing::DEFAULT_PRICE_CLASS),
                ));
            }
            let rate = match pricing::price_class_rate(class) {
                Some(rate) => rate,
                None => {
                    warnings.push(advise(
                        resource,
                        UNPRICED,
                        format!("No transfer rate for price class {}", class),
                    ));
                    0.0
                }
            };
            (0.0, gb(attr::TRANSFER_GB) * rate)
        }
        ResourceKind::Alarm => (pricing::ALARM_MONTHLY, 0.0),
        ResourceKind::LogGroup => (
            0.0,
            gb(attr::INGESTED_GB) * pricing::LOG_INGEST_PER_GB
                + gb(attr::STORAGE_GB) * pricing::LOG_STORAGE_PER_GB,
        ),
        ResourceKind::Trail => {
            if free_trail == Some(&resource.id()) {
                (0.0, 0.0)
            } else {
                (pricing::TRAIL_MONTHLY, 0.0)
            }
        }
        ResourceKind::Vpc
        | ResourceKind::Subnet
        | ResourceKind::SecurityGroup
        | ResourceKind::Topic
        | ResourceKind::BackupPlan => (0.0, 0.0),
    };

    let kms = if resource.attr_str(attr::ENCRYPTION) == Some("sse_kms") {
        warnings.push(advise(
            resource,
            COST_OPTIMIZATION,
            format!("Customer managed KMS key adds ${:.2}/month", pricing::KMS_KEY_MONTHLY),
        ));
        pricing::KMS_KEY_MONTHLY
    } else {
        0.0
    };

    Priced {
        fixed: fixed + kms,
        not_covered: kms,
        variable,
        warnings,
    }
}

fn instance_rate(resource: &Resource, warnings: &mut Vec<Violation>) -> f64 {
    let default_class = pricing::default_instance_class(resource.kind).unwrap_or_default();
    let class = pricing::instance_class(resource).unwrap_or(default_class);

    if class != default_class {
        warnings.push(advise(
            resource,
            COST_OPTIMIZATION,
            format!("Instance class {} is larger than {}", class, default_class),
        ));
    }

    match pricing::instance_hourly(resource.kind, class) {
        Some(rate) => rate,
        None => {
            warnings.push(advise(
                resource,
                UNPRICED,
                format!("No rate for instance class {}; priced at zero", class),
            ));
            0.0
        }
    }
}

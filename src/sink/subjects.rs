// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for provisioning alerts
//!
//! # Subject Pattern
//!
//! ```text
//! provisioning.violations.{severity}.{policy}
//! provisioning.backup.{compliant|noncompliant}
//! ```
//!
//! This allows for:
//! - Blocking-only subscriptions (`provisioning.violations.blocking.>`)
//! - Per-policy subscriptions (`provisioning.violations.*.ResourceTaggingCompliance`)
//! - Global subscriptions (`provisioning.>`)
//!
//! # Examples
//!
//! ```rust
//! use cim_provisioning::policy::Severity;
//! use cim_provisioning::sink::subjects;
//!
//! assert_eq!(
//!     subjects::violation(Severity::Blocking, "SecurityGroupLeastPrivilege"),
//!     "provisioning.violations.blocking.SecurityGroupLeastPrivilege"
//! );
//! assert_eq!(subjects::backup(false), "provisioning.backup.noncompliant");
//! ```

use crate::policy::Severity;

/// Root namespace for all provisioning subjects
pub const PROVISIONING_ROOT: &str = "provisioning";

pub const VIOLATIONS: &str = "violations";
pub const BACKUP: &str = "backup";

/// Subject for a violation of `policy` at `severity`
pub fn violation(severity: Severity, policy: &str) -> String {
    format!(
        "{}.{}.{}.{}",
        PROVISIONING_ROOT,
        VIOLATIONS,
        severity,
        token(policy)
    )
}

/// Subject for a backup compliance result
pub fn backup(compliant: bool) -> String {
    let state = if compliant { "compliant" } else { "noncompliant" };
    format!("{}.{}.{}", PROVISIONING_ROOT, BACKUP, state)
}

/// Wildcard covering every violation
pub fn violations_wildcard() -> String {
    format!("{}.{}.>", PROVISIONING_ROOT, VIOLATIONS)
}

/// Make a string safe to use as a single subject token
///
/// Separators, wildcards and whitespace become `_`.
pub fn token(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

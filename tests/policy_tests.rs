// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy Engine Tests
//!
//! Each built-in policy against small resource sets, plus the baseline
//! rule that keeps newly introduced policies from blocking resources that
//! already exist.

mod fixtures;

use std::collections::BTreeSet;

use cim_provisioning::domain::{
    Cidr, Direction, NetworkRule, Peer, PortRange, Protocol, ResourceId, ResourceKind, MANDATORY_TAGS,
};
use cim_provisioning::policy::{
    backup_presence, blocking, boundary_reference, encryption, least_privilege, tagging, EvaluationPhase,
    PolicyEngine, Severity, Violation,
};
use fixtures::{security_group, tagged};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn evaluate(resources: &[cim_provisioning::Resource]) -> Vec<Violation> {
    PolicyEngine::standard().evaluate(resources, EvaluationPhase::PreDeployment)
}

fn anyone() -> Peer {
    Peer::Cidr(Cidr::anyone_v4())
}

#[test]
fn test_database_port_open_to_anyone_is_blocked() {
    // Given: a security group opening 5432 to 0.0.0.0/0
    let sg = security_group("db-sg", vec![NetworkRule::inbound_tcp(5432, anyone())]);

    // When: evaluating
    let violations = evaluate(&[sg.clone()]);

    // Then: exactly one blocking least-privilege violation on that group
    assert_eq!(violations.len(), 1);
    let violation = &violations[0];
    assert_eq!(violation.policy, least_privilege::POLICY_NAME);
    assert_eq!(violation.severity, Severity::Blocking);
    assert_eq!(violation.resource, Some(sg.id()));
    assert!(violation.reason.contains("5432"), "{}", violation.reason);
}

#[test]
fn test_database_port_from_private_range_passes() {
    let sg = security_group(
        "db-sg",
        vec![NetworkRule::inbound_tcp(5432, Peer::Cidr(Cidr::new("10.0.0.0/16").unwrap()))],
    );
    assert!(evaluate(&[sg]).is_empty());
}

#[test]
fn test_database_port_from_boundary_passes() {
    let app = security_group("app-sg", vec![NetworkRule::inbound_tcp(443, anyone())]);
    let db = security_group(
        "db-sg",
        vec![NetworkRule::inbound_tcp(5432, Peer::SecurityBoundary(app.id()))],
    );
    assert!(evaluate(&[app, db]).is_empty());
}

#[test_case(22 ; "ssh")]
#[test_case(3389 ; "rdp")]
#[test_case(3306 ; "mysql")]
#[test_case(6379 ; "redis")]
#[test_case(27017 ; "mongodb")]
fn test_every_sensitive_port_is_guarded(port: u16) {
    let sg = security_group("sg", vec![NetworkRule::inbound_tcp(port, anyone())]);
    let violations = blocking(&evaluate(&[sg]));
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy, least_privilege::POLICY_NAME);
}

#[test]
fn test_ipv6_anyone_is_also_anyone() {
    let sg = security_group("sg", vec![NetworkRule::inbound_tcp(22, Peer::Cidr(Cidr::anyone_v6()))]);
    assert_eq!(blocking(&evaluate(&[sg])).len(), 1);
}

#[test]
fn test_range_covering_sensitive_port_is_blocked() {
    let rule = NetworkRule {
        direction: Direction::Inbound,
        protocol: Protocol::Tcp,
        ports: Some(PortRange::new(3000, 4000).unwrap()),
        peer: anyone(),
        description: None,
    };
    let violations = evaluate(&[security_group("sg", vec![rule])]);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].reason.contains("3306"));
    assert!(violations[0].reason.contains("3389"));
}

#[test]
fn test_all_protocol_inbound_from_anyone_is_blocked() {
    let rule = NetworkRule {
        direction: Direction::Inbound,
        protocol: Protocol::All,
        ports: None,
        peer: anyone(),
        description: None,
    };
    assert_eq!(blocking(&evaluate(&[security_group("sg", vec![rule])])).len(), 1);
}

#[test]
fn test_outbound_to_anyone_is_not_flagged() {
    let sg = security_group("sg", vec![NetworkRule::outbound_all(anyone())]);
    assert!(evaluate(&[sg]).is_empty());
}

#[test]
fn test_https_to_anyone_is_allowed() {
    let sg = security_group("web-sg", vec![NetworkRule::inbound_tcp(443, anyone())]);
    assert!(evaluate(&[sg]).is_empty());
}

#[test]
fn test_missing_tag_yields_one_violation() {
    // Given: a resource with two mandatory tags removed
    let mut bucket = fixtures::bucket("assets");
    bucket.tags.remove("phase");
    bucket.tags.remove("cost_center");

    // When: evaluating
    let violations = evaluate(&[bucket]);

    // Then: one violation naming both keys
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy, tagging::POLICY_NAME);
    assert!(violations[0].reason.contains("phase"));
    assert!(violations[0].reason.contains("cost_center"));
}

#[test]
fn test_blank_tag_counts_as_missing() {
    let mut bucket = fixtures::bucket("assets");
    bucket.tags.insert("environment".to_string(), "   ".to_string());

    let violations = evaluate(&[bucket]);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy, tagging::POLICY_NAME);
}

#[test]
fn test_every_mandatory_key_is_enforced() {
    for key in MANDATORY_TAGS {
        let mut bucket = fixtures::bucket("assets");
        bucket.tags.remove(key);
        let violations = evaluate(&[bucket]);
        assert_eq!(violations.len(), 1, "removing {} must violate", key);
    }
}

#[test]
fn test_extra_tags_are_fine() {
    let bucket = tagged(ResourceKind::Bucket, "assets")
        .attribute("encryption", "sse_s3")
        .tag("owner", "platform")
        .build();
    assert!(evaluate(&[bucket]).is_empty());
}

#[test]
fn test_unencrypted_data_store_is_blocked() {
    let bucket = tagged(ResourceKind::Bucket, "plain").build();
    let topic = tagged(ResourceKind::Topic, "alerts").attribute("encrypted", false).build();
    let vpc = tagged(ResourceKind::Vpc, "vpc").build();

    let violations = evaluate(&[bucket.clone(), topic.clone(), vpc]);
    let flagged: BTreeSet<ResourceId> = violations
        .iter()
        .filter(|v| v.policy == encryption::POLICY_NAME)
        .filter_map(|v| v.resource.clone())
        .collect();
    assert_eq!(flagged, BTreeSet::from([bucket.id(), topic.id()]));
}

#[test]
fn test_encryption_mode_none_is_unencrypted() {
    let bucket = tagged(ResourceKind::Bucket, "plain").attribute("encryption", "none").build();
    assert_eq!(blocking(&evaluate(&[bucket])).len(), 1);
}

#[test]
fn test_stateful_without_backup_is_blocked() {
    let db = tagged(ResourceKind::DatabaseInstance, "db").attribute("encrypted", true).build();

    let violations = evaluate(&[db]);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy, backup_presence::POLICY_NAME);
    assert!(violations[0].is_blocking());
}

#[test]
fn test_stateful_with_backup_passes() {
    assert!(evaluate(&[fixtures::database_instance("db")]).is_empty());
}

#[test]
fn test_dangling_boundary_reference_is_blocked() {
    let ghost = ResourceId::new(ResourceKind::SecurityGroup, "ghost-sg");
    let db = security_group("db-sg", vec![NetworkRule::inbound_tcp(5432, Peer::SecurityBoundary(ghost))]);

    let violations = evaluate(&[db]);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy, boundary_reference::POLICY_NAME);
}

#[test]
fn test_mandatory_engine_has_two_policies() {
    let names = PolicyEngine::mandatory().policy_names();
    assert_eq!(
        names,
        BTreeSet::from([
            least_privilege::POLICY_NAME.to_string(),
            tagging::POLICY_NAME.to_string()
        ])
    );
}

#[test]
fn test_new_policy_is_advisory_on_existing_resources() {
    // Given: a baseline where only the mandatory policies were evaluated,
    //        and an existing unencrypted bucket
    let existing = tagged(ResourceKind::Bucket, "legacy").build();
    let fresh = tagged(ResourceKind::Bucket, "fresh").build();
    let known = PolicyEngine::mandatory().policy_names();
    let existing_ids = BTreeSet::from([existing.id()]);

    // When: the standard engine adds the encryption policy
    let violations = PolicyEngine::standard().evaluate_with_baseline(
        &[existing.clone(), fresh.clone()],
        EvaluationPhase::PreDeployment,
        &known,
        &existing_ids,
    );

    // Then: the legacy bucket is advisory, the new one still blocks
    let severity_of = |id: &ResourceId| {
        violations
            .iter()
            .find(|v| v.policy == encryption::POLICY_NAME && v.resource.as_ref() == Some(id))
            .map(|v| v.severity)
    };
    assert_eq!(severity_of(&existing.id()), Some(Severity::Advisory));
    assert_eq!(severity_of(&fresh.id()), Some(Severity::Blocking));
}

#[test]
fn test_known_policy_still_blocks_existing_resources() {
    let existing = security_group("sg", vec![NetworkRule::inbound_tcp(22, anyone())]);
    let known = PolicyEngine::standard().policy_names();

    let violations = PolicyEngine::standard().evaluate_with_baseline(
        &[existing.clone()],
        EvaluationPhase::StackGate,
        &known,
        &BTreeSet::from([existing.id()]),
    );
    assert_eq!(blocking(&violations).len(), 1);
    assert_eq!(violations[0].phase, EvaluationPhase::StackGate);
}

#[test]
fn test_custom_policy_registration() {
    let engine = PolicyEngine::empty().register_fn("NoNatGateways", |resources| {
        resources
            .iter()
            .filter(|r| r.kind == ResourceKind::NatGateway)
            .map(|r| Violation::blocking("NoNatGateways", r.id(), "NAT gateways are not allowed"))
            .collect()
    });

    let nat = tagged(ResourceKind::NatGateway, "nat-a").build();
    let violations = engine.evaluate(&[nat], EvaluationPhase::PreDeployment);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy, "NoNatGateways");
}

#[test]
fn test_violation_display() {
    let violation = Violation::blocking(
        least_privilege::POLICY_NAME,
        ResourceId::new(ResourceKind::SecurityGroup, "db-sg"),
        "port 5432 open",
    );
    assert_eq!(
        violation.to_string(),
        "[blocking] SecurityGroupLeastPrivilege on security_group/db-sg: port 5432 open"
    );
}

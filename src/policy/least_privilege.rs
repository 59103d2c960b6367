// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Group Least Privilege
//!
//! Blocks any inbound rule that opens a sensitive port to the whole
//! internet. Rules scoped to a CIDR with a non-zero prefix, or to another
//! security boundary, are never flagged.

use crate::domain::{Direction, NetworkRule, Peer, Resource, SENSITIVE_PORTS};

use super::{Policy, Violation};

pub const POLICY_NAME: &str = "SecurityGroupLeastPrivilege";

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityGroupLeastPrivilege;

/// Sensitive ports an inbound rule exposes to anyone, if any
pub fn exposed_sensitive_ports(rule: &NetworkRule) -> Vec<u16> {
    if rule.direction != Direction::Inbound {
        return Vec::new();
    }
    let Peer::Cidr(cidr) = &rule.peer else {
        return Vec::new();
    };
    if !cidr.is_anyone() {
        return Vec::new();
    }
    rule.effective_ports()
        .map(|range| range.intersecting(&SENSITIVE_PORTS).collect())
        .unwrap_or_default()
}

impl Policy for SecurityGroupLeastPrivilege {
    fn name(&self) -> &str {
        POLICY_NAME
    }

    fn evaluate(&self, resources: &[Resource]) -> Vec<Violation> {
        resources
            .iter()
            .flat_map(|resource| {
                resource.network_rules.iter().filter_map(move |rule| {
                    let ports = exposed_sensitive_ports(rule);
                    if ports.is_empty() {
                        return None;
                    }
                    let ports = ports
                        .iter()
                        .map(u16::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    Some(Violation::blocking(
                        POLICY_NAME,
                        resource.id(),
                        format!(
                            "Inbound {:?} rule from {} exposes sensitive port(s) {}",
                            rule.protocol, rule.peer, ports
                        ),
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cidr, PortRange, Protocol, ResourceId, ResourceKind};
    use test_case::test_case;

    fn group(rule: NetworkRule) -> Resource {
        Resource::builder(ResourceKind::SecurityGroup, "db-sg")
            .rule(rule)
            .build()
    }

    fn inbound(protocol: Protocol, ports: Option<PortRange>, cidr: &str) -> NetworkRule {
        NetworkRule {
            direction: Direction::Inbound,
            protocol,
            ports,
            peer: Peer::Cidr(Cidr::new(cidr).unwrap()),
            description: None,
        }
    }

    #[test_case(inbound(Protocol::Tcp, Some(PortRange::single(5432)), "0.0.0.0/0"), 1 ; "postgres from anywhere")]
    #[test_case(inbound(Protocol::Tcp, Some(PortRange::single(5432)), "::/0"), 1 ; "postgres from anywhere v6")]
    #[test_case(inbound(Protocol::Tcp, Some(PortRange::single(5432)), "10.0.0.0/16"), 0 ; "postgres from vpc")]
    #[test_case(inbound(Protocol::Tcp, Some(PortRange::single(443)), "0.0.0.0/0"), 0 ; "https from anywhere")]
    #[test_case(inbound(Protocol::Tcp, Some(PortRange::new(1, 1024).unwrap()), "0.0.0.0/0"), 1 ; "range covering ssh")]
    #[test_case(inbound(Protocol::All, None, "0.0.0.0/0"), 1 ; "all protocols from anywhere")]
    #[test_case(inbound(Protocol::Icmp, None, "0.0.0.0/0"), 0 ; "icmp from anywhere")]
    fn test_inbound_rules(rule: NetworkRule, expected: usize) {
        let violations = SecurityGroupLeastPrivilege.evaluate(&[group(rule)]);
        assert_eq!(violations.len(), expected);
        assert!(violations.iter().all(Violation::is_blocking));
    }

    #[test]
    fn test_outbound_all_is_not_flagged() {
        let rule = NetworkRule::outbound_all(Peer::Cidr(Cidr::anyone_v4()));
        assert!(SecurityGroupLeastPrivilege.evaluate(&[group(rule)]).is_empty());
    }

    #[test]
    fn test_boundary_peer_is_not_flagged() {
        let app = ResourceId::new(ResourceKind::SecurityGroup, "app-sg");
        let rule = NetworkRule::inbound_tcp(5432, Peer::SecurityBoundary(app));
        assert!(SecurityGroupLeastPrivilege.evaluate(&[group(rule)]).is_empty());
    }

    #[test]
    fn test_exposed_ports_listed_in_reason() {
        let rule = inbound(Protocol::Tcp, Some(PortRange::new(3300, 5500).unwrap()), "0.0.0.0/0");
        assert_eq!(exposed_sensitive_ports(&rule), vec![3389, 5432, 3306]);

        let violations = SecurityGroupLeastPrivilege.evaluate(&[group(rule)]);
        assert!(violations[0].reason.contains("3389, 5432, 3306"));
        assert_eq!(violations[0].policy, POLICY_NAME);
    }
}

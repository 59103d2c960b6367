// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Security Group Least Privilege
//!
//! An inbound rule is blocked exactly when its peer is the whole internet
//! and its ports cover a sensitive port. Scoped peers and outbound rules
//! are never blocked.

use cim_provisioning::domain::{
    Cidr, Direction, NetworkRule, Peer, PortRange, Protocol, Resource, ResourceKind, StandardTags,
    SENSITIVE_PORTS,
};
use cim_provisioning::policy::{least_privilege, EvaluationPhase, PolicyEngine};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn port_range() -> impl Strategy<Value = PortRange> {
    prop_oneof![
        prop::sample::select(SENSITIVE_PORTS.to_vec()).prop_map(PortRange::single),
        any::<u16>().prop_map(PortRange::single),
        (any::<u16>(), any::<u16>()).prop_map(|(a, b)| PortRange::new(a.min(b), a.max(b)).unwrap()),
    ]
}

fn scoped_cidr() -> impl Strategy<Value = Cidr> {
    (any::<[u8; 4]>(), 1u8..=32).prop_map(|(o, prefix)| {
        Cidr::new(format!("{}.{}.{}.{}/{}", o[0], o[1], o[2], o[3], prefix)).unwrap()
    })
}

fn any_peer() -> impl Strategy<Value = Peer> {
    prop_oneof![
        Just(Peer::Cidr(Cidr::anyone_v4())),
        Just(Peer::Cidr(Cidr::anyone_v6())),
        scoped_cidr().prop_map(Peer::Cidr),
    ]
}

fn rule(direction: Direction, ports: PortRange, peer: Peer) -> NetworkRule {
    NetworkRule {
        direction,
        protocol: Protocol::Tcp,
        ports: Some(ports),
        peer,
        description: None,
    }
}

fn least_privilege_violations(rule: NetworkRule) -> usize {
    let group = Resource::builder(ResourceKind::SecurityGroup, "sg")
        .tags(StandardTags::default().to_map())
        .rule(rule)
        .build();
    PolicyEngine::mandatory()
        .evaluate(&[group], EvaluationPhase::PreDeployment)
        .iter()
        .filter(|v| v.policy == least_privilege::POLICY_NAME)
        .count()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Open to anyone: blocked iff a sensitive port is covered
    #[test]
    fn prop_anyone_blocked_iff_sensitive(ports in port_range()) {
        let exposes = SENSITIVE_PORTS.iter().any(|p| ports.contains(*p));
        let count = least_privilege_violations(rule(
            Direction::Inbound,
            ports,
            Peer::Cidr(Cidr::anyone_v4()),
        ));

        prop_assert!(count <= 1);
        prop_assert_eq!(count == 1, exposes);
    }

    /// A non-zero prefix is never "anyone"
    #[test]
    fn prop_scoped_peer_never_blocked(cidr in scoped_cidr(), ports in port_range()) {
        let count = least_privilege_violations(rule(Direction::Inbound, ports, Peer::Cidr(cidr)));
        prop_assert_eq!(count, 0);
    }

    /// Egress is out of scope whatever the peer
    #[test]
    fn prop_outbound_never_blocked(peer in any_peer(), ports in port_range()) {
        let count = least_privilege_violations(rule(Direction::Outbound, ports, peer));
        prop_assert_eq!(count, 0);
    }

    /// Rules pointing at another boundary are never blocked
    #[test]
    fn prop_boundary_peer_never_blocked(ports in port_range()) {
        let app = Resource::builder(ResourceKind::SecurityGroup, "app-sg").build();
        let count = least_privilege_violations(rule(
            Direction::Inbound,
            ports,
            Peer::SecurityBoundary(app.id()),
        ));
        prop_assert_eq!(count, 0);
    }
}

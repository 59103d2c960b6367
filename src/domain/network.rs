// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Rule Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

use super::resource::ResourceId;

/// Ports that must never be reachable from anywhere.
///
/// SSH, RDP, PostgreSQL, MySQL, Redis, MongoDB.
pub const SENSITIVE_PORTS: [u16; 6] = [22, 3389, 5432, 3306, 6379, 27017];

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),

    #[error("Invalid port range: {from}-{to}")]
    InvalidPortRange { from: u16, to: u16 },
}

/// CIDR block value object
///
/// Invariants:
/// - Valid IP address format
/// - Prefix length within range for the address family
///
/// # Examples
///
/// ```rust
/// use cim_provisioning::domain::Cidr;
///
/// let cidr = Cidr::new("10.0.0.0/16").unwrap();
/// assert!(cidr.is_private());
/// assert!(!cidr.is_anyone());
/// assert!(Cidr::new("0.0.0.0/0").unwrap().is_anyone());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    address: IpAddr,
    prefix_length: u8,
}

impl Cidr {
    /// Parse CIDR notation. A bare address is treated as a host route.
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref().trim();

        let (addr_str, prefix) = match cidr.split_once('/') {
            Some((addr, prefix)) => {
                let prefix = prefix
                    .parse::<u8>()
                    .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;
                (addr, Some(prefix))
            }
            None => (cidr, None),
        };

        let address = IpAddr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let max_prefix = max_prefix(&address);
        let prefix_length = prefix.unwrap_or(max_prefix);

        if prefix_length > max_prefix {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    /// IPv4 "anyone" block
    pub fn anyone_v4() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            prefix_length: 0,
        }
    }

    /// IPv6 "anyone" block
    pub fn anyone_v6() -> Self {
        Self {
            address: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            prefix_length: 0,
        }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// True for `0.0.0.0/0`, `::/0`, or any zero-length prefix
    pub fn is_anyone(&self) -> bool {
        self.prefix_length == 0
    }

    /// True when the whole block sits inside private address space.
    ///
    /// Covers RFC 1918, RFC 6598 shared space, loopback, IPv6 unique-local
    /// and link-local ranges.
    pub fn is_private(&self) -> bool {
        match self.address {
            IpAddr::V4(v4) => {
                let o = v4.octets();
                let (block_prefix, inside) = if o[0] == 10 {
                    (8, true)
                } else if o[0] == 172 && (16..=31).contains(&o[1]) {
                    (12, true)
                } else if o[0] == 192 && o[1] == 168 {
                    (16, true)
                } else if o[0] == 100 && (64..=127).contains(&o[1]) {
                    (10, true)
                } else if o[0] == 127 {
                    (8, true)
                } else {
                    (0, false)
                };
                inside && self.prefix_length >= block_prefix
            }
            IpAddr::V6(v6) => {
                let first = v6.segments()[0];
                if first & 0xfe00 == 0xfc00 {
                    self.prefix_length >= 7
                } else if first & 0xffc0 == 0xfe80 {
                    self.prefix_length >= 10
                } else {
                    v6.is_loopback()
                }
            }
        }
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.address, IpAddr::V6(_))
    }
}

fn max_prefix(address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_length)
    }
}

impl FromStr for Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cidr> for String {
    fn from(value: Cidr) -> Self {
        value.to_string()
    }
}

/// Traffic direction relative to the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// IP protocol of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// Every protocol and every port
    All,
}

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u16, u16)", into = "(u16, u16)")]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    pub fn new(from: u16, to: u16) -> Result<Self, NetworkError> {
        if from > to {
            return Err(NetworkError::InvalidPortRange { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn single(port: u16) -> Self {
        Self { from: port, to: port }
    }

    pub fn all() -> Self {
        Self {
            from: 0,
            to: u16::MAX,
        }
    }

    pub fn from_port(&self) -> u16 {
        self.from
    }

    pub fn to_port(&self) -> u16 {
        self.to
    }

    pub fn contains(&self, port: u16) -> bool {
        self.from <= port && port <= self.to
    }

    /// Ports of `set` that fall inside this range
    pub fn intersecting<'a>(&'a self, set: &'a [u16]) -> impl Iterator<Item = u16> + 'a {
        set.iter().copied().filter(move |p| self.contains(*p))
    }
}

impl TryFrom<(u16, u16)> for PortRange {
    type Error = NetworkError;

    fn try_from((from, to): (u16, u16)) -> Result<Self, Self::Error> {
        Self::new(from, to)
    }
}

impl From<PortRange> for (u16, u16) {
    fn from(value: PortRange) -> Self {
        (value.from, value.to)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// The other side of a network rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    /// Address block
    Cidr(Cidr),
    /// Another resource's security boundary (security group reference)
    SecurityBoundary(ResourceId),
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Cidr(cidr) => write!(f, "{}", cidr),
            Peer::SecurityBoundary(id) => write!(f, "boundary:{}", id),
        }
    }
}

/// A single network access rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRule {
    pub direction: Direction,
    pub protocol: Protocol,
    /// `None` for protocols without ports (ICMP)
    pub ports: Option<PortRange>,
    pub peer: Peer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NetworkRule {
    /// Inbound TCP rule for a single port
    pub fn inbound_tcp(port: u16, peer: Peer) -> Self {
        Self {
            direction: Direction::Inbound,
            protocol: Protocol::Tcp,
            ports: Some(PortRange::single(port)),
            peer,
            description: None,
        }
    }

    /// Outbound rule allowing all traffic
    pub fn outbound_all(peer: Peer) -> Self {
        Self {
            direction: Direction::Outbound,
            protocol: Protocol::All,
            ports: None,
            peer,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Ports effectively opened by this rule
    ///
    /// `All` opens every port regardless of the declared range; ICMP opens none.
    pub fn effective_ports(&self) -> Option<PortRange> {
        match self.protocol {
            Protocol::All => Some(PortRange::all()),
            Protocol::Icmp => None,
            Protocol::Tcp | Protocol::Udp => self.ports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr_parsing() {
        let cidr = Cidr::new("10.0.0.0/16").unwrap();
        assert_eq!(cidr.prefix_length(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");

        let host = Cidr::new("192.168.1.10").unwrap();
        assert_eq!(host.prefix_length(), 32);

        assert!(Cidr::new("10.0.0.0/33").is_err());
        assert!(Cidr::new("not-an-ip/8").is_err());
        assert!(Cidr::new("10.0.0.0/x").is_err());
    }

    #[test]
    fn test_anyone_blocks() {
        assert!(Cidr::new("0.0.0.0/0").unwrap().is_anyone());
        assert!(Cidr::new("::/0").unwrap().is_anyone());
        assert!(!Cidr::new("10.0.0.0/8").unwrap().is_anyone());
    }

    #[test]
    fn test_private_classification() {
        assert!(Cidr::new("10.0.0.0/16").unwrap().is_private());
        assert!(Cidr::new("172.20.0.0/16").unwrap().is_private());
        assert!(Cidr::new("192.168.0.0/24").unwrap().is_private());
        assert!(Cidr::new("fd00::/8").unwrap().is_private());

        // Wider than the private block
        assert!(!Cidr::new("10.0.0.0/7").unwrap().is_private());
        assert!(!Cidr::new("203.0.113.0/24").unwrap().is_private());
        assert!(!Cidr::new("0.0.0.0/0").unwrap().is_private());
    }

    #[test]
    fn test_port_range() {
        let range = PortRange::new(5000, 6000).unwrap();
        assert!(range.contains(5432));
        assert!(!range.contains(6379));
        assert_eq!(range.intersecting(&SENSITIVE_PORTS).collect::<Vec<_>>(), vec![5432]);
        assert!(PortRange::new(10, 1).is_err());
    }

    #[test]
    fn test_effective_ports() {
        let all = NetworkRule {
            direction: Direction::Inbound,
            protocol: Protocol::All,
            ports: None,
            peer: Peer::Cidr(Cidr::anyone_v4()),
            description: None,
        };
        assert_eq!(all.effective_ports(), Some(PortRange::all()));

        let icmp = NetworkRule {
            protocol: Protocol::Icmp,
            ports: Some(PortRange::single(22)),
            ..all
        };
        assert_eq!(icmp.effective_ports(), None);
    }

    #[test]
    fn test_cidr_serde_as_string() {
        let cidr = Cidr::new("10.0.0.0/16").unwrap();
        let json = serde_json::to_string(&cidr).unwrap();
        assert_eq!(json, "\"10.0.0.0/16\"");
        let back: Cidr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cidr);
    }
}

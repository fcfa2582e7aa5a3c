//! # Candidate Subnets
//!
//! A [`Subnet`] is a CIDR string tagged with the discovery source that first
//! produced it. [`SubnetSet`] enforces the "first seen wins" rule that keeps
//! the discovery output free of duplicates while preserving source priority.

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;

/// Where a candidate range was learned from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubnetSource {
    Interface,
    Route,
    NeighborCache,
    HeuristicProbe,
    Virtualization,
    ConnectionPeer,
    LeaseFile,
    Fallback,
}

impl SubnetSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Route => "route",
            Self::NeighborCache => "neighbor-cache",
            Self::HeuristicProbe => "heuristic-probe",
            Self::Virtualization => "virtualization-catalogue",
            Self::ConnectionPeer => "connection-peer",
            Self::LeaseFile => "lease-file",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SubnetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubnetSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Interface,
            Self::Route,
            Self::NeighborCache,
            Self::HeuristicProbe,
            Self::Virtualization,
            Self::ConnectionPeer,
            Self::LeaseFile,
            Self::Fallback,
        ]
        .into_iter()
        .find(|source| source.as_str() == s)
        .ok_or_else(|| format!("unknown subnet source '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub cidr: String,
    pub source: SubnetSource,
}

impl Subnet {
    pub fn new(cidr: impl Into<String>, source: SubnetSource) -> Self {
        Self {
            cidr: cidr.into(),
            source,
        }
    }

    /// `cidr|source`, the format of the subnet scratch file.
    pub fn to_line(&self) -> String {
        format!("{}|{}", self.cidr, self.source)
    }
}

impl FromStr for Subnet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cidr, source) = s
            .trim()
            .split_once('|')
            .ok_or_else(|| format!("malformed subnet line '{s}'"))?;
        Ok(Self::new(cidr, source.parse()?))
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cidr)
    }
}

/// Ordered, deduplicated collection of subnets.
#[derive(Debug, Default)]
pub struct SubnetSet {
    seen: HashSet<String>,
    items: Vec<Subnet>,
}

impl SubnetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `cidr` unless an identical CIDR string is already present.
    /// Returns whether the entry was new.
    pub fn insert(&mut self, cidr: impl Into<String>, source: SubnetSource) -> bool {
        let cidr: String = cidr.into();
        if !self.seen.insert(cidr.clone()) {
            return false;
        }
        self.items.push(Subnet::new(cidr, source));
        true
    }

    pub fn contains(&self, cidr: &str) -> bool {
        self.seen.contains(cidr)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Subnet> {
        self.items
    }
}

/// The /24 that `addr` falls in, with the last octet zeroed.
///
/// This ignores the real prefix length on purpose: interfaces, neighbors,
/// peers and leases are all mapped onto /24 candidates.
pub fn slash24(addr: Ipv4Addr) -> String {
    let [a, b, c, _] = addr.octets();
    format!("{a}.{b}.{c}.0/24")
}

/// Validates a CIDR string and returns it in canonical `network/prefix` form.
pub fn normalize_cidr(cidr: &str) -> Option<String> {
    let network: Ipv4Network = cidr.trim().parse().ok()?;
    if !cidr.contains('/') {
        return None;
    }
    Some(format!("{}/{}", network.network(), network.prefix()))
}

/// 169.254.0.0/16.
pub fn is_link_local(cidr: &str) -> bool {
    cidr.parse::<Ipv4Network>()
        .map(|net| net.ip().is_link_local())
        .unwrap_or(false)
}

/// First usable address of a range, used as the probe target for a subnet.
pub fn probe_address(cidr: &str) -> Option<Ipv4Addr> {
    let network: Ipv4Network = cidr.parse().ok()?;
    let base: u32 = network.network().into();
    Some(Ipv4Addr::from(base.saturating_add(1)))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

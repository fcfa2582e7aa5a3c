//! # Subnet Discovery Engine
//!
//! Produces an ordered, duplicate-free list of candidate subnets by consulting
//! a fixed sequence of sources. Earlier sources win: a CIDR that was already
//! reported keeps its first source tag.
//!
//! All system access goes through [`NetworkIntrospector`], so the engine
//! itself performs no I/O. Sources that find nothing, or whose tools are
//! missing, contribute nothing. Only the fallback list guarantees a non-empty
//! answer.
//!
//! Progress narration is emitted through `tracing`; the returned vector is
//! the only data output.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use sweepr_common::network::interface::{self, InterfaceAddr};
use sweepr_common::network::subnet::{self, Subnet, SubnetSet, SubnetSource};
use sweepr_common::status;

pub mod sources;
pub mod system;

pub use system::SystemIntrospector;

pub const NEIGHBOR_SAMPLE: usize = 20;
pub const PEER_SAMPLE: usize = 5;
pub const LEASE_SAMPLE: usize = 10;

/// Third octets tried inside the primary interface's /16.
pub const SWEEP_THIRD_OCTETS: [u8; 8] = [0, 1, 2, 10, 20, 50, 100, 254];

/// Default ranges of common container and hypervisor networks.
pub const VIRTUALIZATION_RANGES: [&str; 7] = [
    "172.17.0.0/16",    // docker0
    "172.18.0.0/16",    // first user-defined docker bridge
    "192.168.122.0/24", // libvirt default
    "192.168.56.0/24",  // VirtualBox host-only
    "10.0.2.0/24",      // VirtualBox/QEMU NAT
    "192.168.49.0/24",  // minikube
    "10.244.0.0/16",    // flannel pod network
];

pub const LEASE_FILES: [&str; 4] = [
    "/var/lib/dhcp/dhclient.leases",
    "/var/lib/dhclient/dhclient.leases",
    "/var/lib/misc/dnsmasq.leases",
    "/var/db/dhcpd_leases",
];

/// Returned verbatim when every other source came up empty.
pub const FALLBACK_SUBNETS: [&str; 5] = [
    "192.168.1.0/24",
    "192.168.0.0/24",
    "10.0.0.0/24",
    "172.16.0.0/24",
    "10.0.1.0/24",
];

/// Read-only view of the local system used by the engine.
#[async_trait]
pub trait NetworkIntrospector: Send + Sync {
    /// IPv4 addresses of all local interfaces, including down ones.
    fn interfaces(&self) -> Vec<InterfaceAddr>;
    /// Raw routing table text, `None` when no tool could produce it.
    async fn route_table(&self) -> Option<String>;
    async fn neighbor_cache(&self) -> Option<String>;
    async fn established_connections(&self) -> Option<String>;
    fn read_lease_file(&self, path: &Path) -> Option<String>;
    /// Whether at least one host in `cidr` answered a short, bounded probe.
    async fn probe(&self, cidr: &str) -> bool;
}

pub struct SubnetDiscovery {
    introspector: Box<dyn NetworkIntrospector>,
}

impl SubnetDiscovery {
    pub fn new(introspector: Box<dyn NetworkIntrospector>) -> Self {
        Self { introspector }
    }

    pub async fn discover(&self) -> Vec<Subnet> {
        let mut found = SubnetSet::new();
        let interfaces = self.introspector.interfaces();

        self.from_interfaces(&interfaces, &mut found);
        self.from_routes(&mut found).await;
        self.from_neighbors(&mut found).await;
        self.from_sweep(&interfaces, &mut found).await;
        self.from_virtualization(&mut found).await;
        self.from_peers(&mut found).await;
        self.from_leases(&mut found);

        if found.is_empty() {
            status!("No live sources, using the built-in private ranges");
            return fallback();
        }

        status!("Discovered {} candidate subnet(s)", found.len());
        found.into_vec()
    }

    fn from_interfaces(&self, interfaces: &[InterfaceAddr], found: &mut SubnetSet) {
        let candidates = sources::interface_subnets(interfaces);
        let added = add_all(found, candidates, SubnetSource::Interface);
        report("interfaces", added);
    }

    async fn from_routes(&self, found: &mut SubnetSet) {
        let Some(table) = self.introspector.route_table().await else {
            debug!("routing table unavailable");
            return;
        };
        let added = add_all(found, sources::parse_routes(&table), SubnetSource::Route);
        report("routing table", added);
    }

    async fn from_neighbors(&self, found: &mut SubnetSet) {
        let Some(cache) = self.introspector.neighbor_cache().await else {
            debug!("neighbor cache unavailable");
            return;
        };
        let candidates = sources::parse_neighbors(&cache, NEIGHBOR_SAMPLE)
            .into_iter()
            .map(subnet::slash24);
        let added = add_all(found, candidates, SubnetSource::NeighborCache);
        report("neighbor cache", added);
    }

    async fn from_sweep(&self, interfaces: &[InterfaceAddr], found: &mut SubnetSet) {
        let Some(primary) = interface::primary(interfaces) else {
            debug!("no primary interface, skipping heuristic sweep");
            return;
        };
        let [a, b, _, _] = primary.addr.octets();
        status!("Sweeping likely ranges inside {a}.{b}.0.0/16");

        let mut added = 0;
        for third in SWEEP_THIRD_OCTETS {
            let cidr = format!("{a}.{b}.{third}.0/24");
            if found.contains(&cidr) {
                continue;
            }
            if self.introspector.probe(&cidr).await && found.insert(cidr, SubnetSource::HeuristicProbe) {
                added += 1;
            }
        }
        report("heuristic sweep", added);
    }

    async fn from_virtualization(&self, found: &mut SubnetSet) {
        let mut added = 0;
        for cidr in VIRTUALIZATION_RANGES {
            if found.contains(cidr) {
                continue;
            }
            if self.introspector.probe(cidr).await && found.insert(cidr, SubnetSource::Virtualization) {
                added += 1;
            }
        }
        report("virtualization catalogue", added);
    }

    async fn from_peers(&self, found: &mut SubnetSet) {
        let Some(connections) = self.introspector.established_connections().await else {
            debug!("socket table unavailable");
            return;
        };
        let candidates = sources::parse_established_peers(&connections, PEER_SAMPLE)
            .into_iter()
            .map(subnet::slash24);
        let added = add_all(found, candidates, SubnetSource::ConnectionPeer);
        report("connection peers", added);
    }

    fn from_leases(&self, found: &mut SubnetSet) {
        let mut added = 0;
        for path in LEASE_FILES {
            let Some(body) = self.introspector.read_lease_file(Path::new(path)) else {
                continue;
            };
            let candidates = sources::parse_lease_addresses(&body, LEASE_SAMPLE)
                .into_iter()
                .map(subnet::slash24);
            added += add_all(found, candidates, SubnetSource::LeaseFile);
        }
        report("lease files", added);
    }
}

pub fn fallback() -> Vec<Subnet> {
    FALLBACK_SUBNETS
        .iter()
        .map(|cidr| Subnet::new(*cidr, SubnetSource::Fallback))
        .collect()
}

fn add_all(found: &mut SubnetSet, candidates: impl IntoIterator<Item = String>, source: SubnetSource) -> usize {
    candidates
        .into_iter()
        .filter(|cidr| found.insert(cidr.clone(), source))
        .count()
}

fn report(source: &str, added: usize) {
    if added > 0 {
        status!("{source}: {added} new subnet(s)");
    } else {
        debug!("{source}: nothing new");
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

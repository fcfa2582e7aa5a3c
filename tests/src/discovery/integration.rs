use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use async_trait::async_trait;

use sweepr_common::network::host::HostRecord;
use sweepr_common::network::interface::InterfaceAddr;
use sweepr_common::network::subnet::{Subnet, SubnetSource};
use sweepr_core::discovery::{FALLBACK_SUBNETS, NetworkIntrospector, SubnetDiscovery};

use crate::util::session_in;

/// A host with a docker bridge, a VPN route and a couple of neighbours.
#[derive(Default)]
struct Workstation {
    live: HashSet<String>,
    silent: bool,
}

#[async_trait]
impl NetworkIntrospector for Workstation {
    fn interfaces(&self) -> Vec<InterfaceAddr> {
        if self.silent {
            return Vec::new();
        }
        vec![
            InterfaceAddr::new("lo", Ipv4Addr::LOCALHOST, 8),
            InterfaceAddr::new("wlan0", Ipv4Addr::new(192, 168, 1, 34), 24),
            InterfaceAddr::new("docker0", Ipv4Addr::new(172, 17, 0, 1), 16),
        ]
    }

    async fn route_table(&self) -> Option<String> {
        if self.silent {
            return None;
        }
        Some(
            "default via 192.168.1.1 dev wlan0 proto dhcp metric 600\n\
             10.8.0.0/24 dev tun0 proto kernel scope link src 10.8.0.6\n\
             172.17.0.0/16 dev docker0 proto kernel scope link src 172.17.0.1\n\
             192.168.1.0/24 dev wlan0 proto kernel scope link src 192.168.1.34\n"
                .to_string(),
        )
    }

    async fn neighbor_cache(&self) -> Option<String> {
        if self.silent {
            return None;
        }
        Some(
            "192.168.1.1 dev wlan0 lladdr 10:20:30:40:50:60 REACHABLE\n\
             192.168.5.9 dev wlan0 lladdr 10:20:30:40:50:61 STALE\n\
             192.168.7.2 dev wlan0  FAILED\n"
                .to_string(),
        )
    }

    async fn established_connections(&self) -> Option<String> {
        None
    }

    fn read_lease_file(&self, _path: &Path) -> Option<String> {
        None
    }

    async fn probe(&self, cidr: &str) -> bool {
        self.live.contains(cidr)
    }
}

fn cidrs(subnets: &[Subnet]) -> Vec<&str> {
    subnets.iter().map(|s| s.cidr.as_str()).collect()
}

#[tokio::test]
async fn workstation_subnets_in_priority_order() {
    let workstation = Workstation {
        live: HashSet::from(["192.168.122.0/24".to_string()]),
        ..Default::default()
    };
    let subnets = SubnetDiscovery::new(Box::new(workstation)).discover().await;

    assert_eq!(
        cidrs(&subnets),
        vec![
            "192.168.1.0/24",
            "172.17.0.0/24",
            "10.8.0.0/24",
            "172.17.0.0/16",
            "192.168.5.0/24",
            "192.168.122.0/24",
        ]
    );
    assert_eq!(subnets[2].source, SubnetSource::Route);
    assert_eq!(subnets[4].source, SubnetSource::NeighborCache);
    assert_eq!(subnets[5].source, SubnetSource::Virtualization);

    let unique: HashSet<&str> = cidrs(&subnets).into_iter().collect();
    assert_eq!(unique.len(), subnets.len());
}

#[tokio::test]
async fn silent_system_falls_back() {
    let workstation = Workstation {
        silent: true,
        ..Default::default()
    };
    let subnets = SubnetDiscovery::new(Box::new(workstation)).discover().await;
    assert_eq!(cidrs(&subnets), FALLBACK_SUBNETS.to_vec());
}

#[tokio::test]
async fn discovered_subnets_survive_in_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_in(dir.path());
    assert!(session.load_subnets().is_empty());

    let subnets = SubnetDiscovery::new(Box::new(Workstation::default())).discover().await;
    session.save_subnets(&subnets).unwrap();

    assert_eq!(session.load_subnets(), subnets);
}

#[test]
fn registry_ordinals_follow_append_order() {
    let dir = tempfile::tempdir().unwrap();
    let registry = session_in(dir.path()).registry();
    registry.reset().unwrap();

    let first = HostRecord::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))).with_hostname("router.lan");
    let second = HostRecord::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))).with_info("Linux 5.X");
    registry.append(&first).unwrap();
    registry.append(&second).unwrap();

    assert_eq!(registry.len().unwrap(), 2);
    assert_eq!(registry.by_ordinal(2).unwrap(), Some(second.clone()));
    assert_eq!(registry.by_ordinal(3).unwrap(), None);
    assert_eq!(
        registry.by_address(second.ip).unwrap().map(|host| host.info),
        Some("Linux 5.X".to_string())
    );

    registry.reset().unwrap();
    assert!(registry.is_empty().unwrap());
}

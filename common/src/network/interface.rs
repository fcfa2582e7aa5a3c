use std::net::Ipv4Addr;

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

/// One IPv4 address bound to a local interface, flattened out of pnet's model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub name: String,
    pub addr: Ipv4Addr,
    pub prefix: u8,
    pub is_up: bool,
    pub is_loopback: bool,
}

impl InterfaceAddr {
    pub fn new(name: &str, addr: Ipv4Addr, prefix: u8) -> Self {
        Self {
            name: name.to_string(),
            addr,
            prefix,
            is_up: true,
            is_loopback: addr.is_loopback(),
        }
    }

    pub fn down(mut self) -> Self {
        self.is_up = false;
        self
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is administratively down.
    IsDown,
    /// Loopback never describes a reachable network.
    IsLoopback,
    /// Unspecified or link-local address; not a real network.
    NoUsableAddress,
}

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn to_interface_addrs(&self) -> Vec<InterfaceAddr>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    fn to_interface_addrs(&self) -> Vec<InterfaceAddr> {
        self.get_ipv4_nets()
            .into_iter()
            .map(|net| InterfaceAddr {
                name: self.name.clone(),
                addr: net.ip(),
                prefix: net.prefix(),
                is_up: self.is_up(),
                is_loopback: self.is_loopback() || net.ip().is_loopback(),
            })
            .collect()
    }
}

/// Every IPv4 address on every local interface, up or down.
pub fn list_interface_addrs() -> Vec<InterfaceAddr> {
    datalink::interfaces()
        .iter()
        .flat_map(|intf| intf.to_interface_addrs())
        .collect()
}

pub fn check_viability(intf: &InterfaceAddr) -> Result<(), ViabilityError> {
    if !intf.is_up {
        return Err(ViabilityError::IsDown);
    }
    if intf.is_loopback {
        return Err(ViabilityError::IsLoopback);
    }
    if intf.addr.is_unspecified() || intf.addr.is_link_local() {
        return Err(ViabilityError::NoUsableAddress);
    }
    Ok(())
}

/// Picks the interface whose /16 the heuristic sweep explores.
///
/// Wired names (`e*`) win over everything else, otherwise the first viable entry.
pub fn primary(addrs: &[InterfaceAddr]) -> Option<&InterfaceAddr> {
    let viable: Vec<&InterfaceAddr> = addrs
        .iter()
        .filter(|intf| check_viability(intf).is_ok())
        .collect();

    viable
        .iter()
        .find(|intf| intf.name.starts_with('e'))
        .or_else(|| viable.first())
        .copied()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::util::MacAddr;

    const IFF_UP: u32 = 1;
    const IFF_BROADCAST: u32 = 1 << 1;
    const IFF_LOOPBACK: u32 = 1 << 3;

    fn create_mock_interface(name: &str, ips: Vec<IpNetwork>, flags: u32) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: "An interface".to_string(),
            index: 0,
            mac: Some(MacAddr(0x1, 0x2, 0x3, 0x4, 0x5, 0x6)),
            ips,
            flags,
        }
    }

    #[test]
    fn to_interface_addrs_keeps_only_ipv4() {
        let intf = create_mock_interface(
            "eth0",
            vec![
                IpNetwork::V4("192.168.1.100/24".parse().unwrap()),
                IpNetwork::V6("fe80::1/64".parse().unwrap()),
            ],
            IFF_UP | IFF_BROADCAST,
        );
        let addrs = intf.to_interface_addrs();
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].addr, Ipv4Addr::new(192, 168, 1, 100));
        assert_eq!(addrs[0].prefix, 24);
        assert!(addrs[0].is_up);
    }

    #[test]
    fn down_interface_is_reported_down() {
        let intf = create_mock_interface(
            "wlan0",
            vec![IpNetwork::V4("10.0.0.2/8".parse().unwrap())],
            IFF_BROADCAST,
        );
        let addrs = intf.to_interface_addrs();
        assert_eq!(check_viability(&addrs[0]), Err(ViabilityError::IsDown));
    }

    #[test]
    fn loopback_is_not_viable() {
        let intf = create_mock_interface(
            "lo",
            vec![IpNetwork::V4("127.0.0.1/8".parse().unwrap())],
            IFF_UP | IFF_LOOPBACK,
        );
        let addrs = intf.to_interface_addrs();
        assert_eq!(check_viability(&addrs[0]), Err(ViabilityError::IsLoopback));
    }

    #[test]
    fn link_local_is_not_viable() {
        let intf = InterfaceAddr::new("eth0", Ipv4Addr::new(169, 254, 3, 4), 16);
        assert_eq!(check_viability(&intf), Err(ViabilityError::NoUsableAddress));
    }

    #[test]
    fn primary_prefers_wired() {
        let addrs = vec![
            InterfaceAddr::new("lo", Ipv4Addr::LOCALHOST, 8),
            InterfaceAddr::new("wlan0", Ipv4Addr::new(192, 168, 1, 42), 24),
            InterfaceAddr::new("enp9s0", Ipv4Addr::new(192, 168, 0, 32), 24),
        ];
        assert_eq!(primary(&addrs).map(|i| i.name.as_str()), Some("enp9s0"));
    }

    #[test]
    fn primary_skips_down_interfaces() {
        let addrs = vec![
            InterfaceAddr::new("eth0", Ipv4Addr::new(10, 0, 0, 15), 24).down(),
            InterfaceAddr::new("wlan0", Ipv4Addr::new(192, 168, 1, 42), 24),
        ];
        assert_eq!(primary(&addrs).map(|i| i.name.as_str()), Some("wlan0"));
    }

    #[test]
    fn primary_returns_none_without_candidates() {
        let addrs = vec![InterfaceAddr::new("lo", Ipv4Addr::LOCALHOST, 8)];
        assert!(primary(&addrs).is_none());
    }
}

//! Parsers that turn raw system-tool output into subnet candidates.
//!
//! Everything here is pure so the engine can be tested against captured
//! output. Unparseable lines are skipped silently.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use pnet::ipnetwork::Ipv4Network;
use regex::Regex;

use sweepr_common::network::interface::{InterfaceAddr, check_viability};
use sweepr_common::network::subnet::{self, is_link_local, normalize_cidr};

/// Route types `ip route` prints in front of the destination.
const ROUTE_TYPES: &[&str] = &["unicast", "local", "broadcast", "multicast", "unreachable", "blackhole", "prohibit", "throw"];

static IPV4: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3})\b").ok());

/// One /24 per viable interface address, in interface order.
pub fn interface_subnets(interfaces: &[InterfaceAddr]) -> Vec<String> {
    interfaces
        .iter()
        .filter(|intf| check_viability(intf).is_ok())
        .map(|intf| subnet::slash24(intf.addr))
        .collect()
}

/// Destinations from `ip route` or `route -n` output.
///
/// Default routes, host routes and link-local ranges are dropped.
pub fn parse_routes(table: &str) -> Vec<String> {
    table.lines().filter_map(parse_route_line).collect()
}

fn parse_route_line(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut first = *tokens.first()?;
    if ROUTE_TYPES.contains(&first) {
        first = tokens.get(1)?;
    }
    if first == "default" {
        return None;
    }

    let cidr = match normalize_cidr(first) {
        Some(cidr) => cidr,
        None => netstat_route(&tokens)?,
    };
    let network: Ipv4Network = cidr.parse().ok()?;
    if network.prefix() == 0 || network.prefix() == 32 || is_link_local(&cidr) {
        return None;
    }
    Some(cidr)
}

/// `Destination Gateway Genmask ...` rows of `route -n`.
fn netstat_route(tokens: &[&str]) -> Option<String> {
    let dest: Ipv4Addr = tokens.first()?.parse().ok()?;
    let _gateway: Ipv4Addr = tokens.get(1)?.parse().ok()?;
    let mask: u32 = tokens.get(2)?.parse::<Ipv4Addr>().ok()?.into();
    if mask.leading_ones() != mask.count_ones() {
        return None;
    }
    let network = Ipv4Network::new(dest, mask.count_ones() as u8).ok()?;
    Some(format!("{}/{}", network.network(), network.prefix()))
}

/// Neighbor addresses from `ip neigh` or `arp -an`, at most `limit`.
///
/// Entries whose resolution failed are not neighbors and are skipped.
pub fn parse_neighbors(cache: &str, limit: usize) -> Vec<Ipv4Addr> {
    cache
        .lines()
        .filter(|line| {
            let upper = line.to_ascii_uppercase();
            !upper.contains("FAILED") && !upper.contains("INCOMPLETE")
        })
        .filter_map(|line| {
            line.split_whitespace()
                .map(|token| token.trim_matches(|c| c == '(' || c == ')'))
                .find_map(|token| token.parse::<Ipv4Addr>().ok())
        })
        .filter(|addr| !addr.is_loopback() && !addr.is_unspecified())
        .take(limit)
        .collect()
}

/// Remote endpoints of established TCP connections from `ss -tn` or
/// `netstat -tn`: the first `limit` distinct non-loopback IPv4 peers.
pub fn parse_established_peers(sockets: &str, limit: usize) -> Vec<Ipv4Addr> {
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();
    sockets
        .lines()
        .filter(|line| {
            let upper = line.to_ascii_uppercase();
            // ss with a state filter omits the state column
            upper.contains("ESTAB") || !upper.contains("LISTEN") && !upper.contains("WAIT")
        })
        .filter_map(|line| {
            line.split_whitespace()
                .filter_map(endpoint_addr)
                .last()
        })
        .filter(|addr| !addr.is_loopback() && !addr.is_unspecified() && !addr.is_link_local())
        .filter(|addr| seen.insert(*addr))
        .take(limit)
        .collect()
}

/// Address part of `a.b.c.d:port`, including the `[::ffff:a.b.c.d]:port` form.
fn endpoint_addr(token: &str) -> Option<Ipv4Addr> {
    let (host, port) = token.rsplit_once(':')?;
    port.parse::<u16>().ok()?;
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_start_matches("::ffff:");
    host.parse().ok()
}

/// Distinct usable IPv4 addresses seen in a lease file, at most `limit`.
pub fn parse_lease_addresses(body: &str, limit: usize) -> Vec<Ipv4Addr> {
    let Some(re) = IPV4.as_ref() else {
        return Vec::new();
    };
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();
    re.captures_iter(body)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<Ipv4Addr>().ok())
        .filter(|addr| is_usable_host(*addr))
        .filter(|addr| seen.insert(*addr))
        .take(limit)
        .collect()
}

/// Masks and broadcasts show up in lease files next to real addresses.
fn is_usable_host(addr: Ipv4Addr) -> bool {
    let [first, .., last] = addr.octets();
    !addr.is_unspecified()
        && !addr.is_loopback()
        && !addr.is_broadcast()
        && !addr.is_link_local()
        && first != 255
        && last != 255
        && last != 0
}

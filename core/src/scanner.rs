//! Scan adapter between a selected subnet and the [`HostRegistry`].
//!
//! The actual probing is delegated to nmap. This module only decides which
//! nmap invocation to run, supervises it, and folds its normal (human
//! readable) output into [`HostRecord`]s.
//!
//! [`HostRegistry`]: crate::registry::HostRegistry

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::warn;

use sweepr_common::error::ReconError;
use sweepr_common::network::host::HostRecord;
use sweepr_common::network::subnet::normalize_cidr;
use sweepr_common::scan::privilege::Privilege;
use sweepr_common::success;
use sweepr_common::utils::time::scale_duration;

use crate::session::Session;
use crate::supervisor::{CommandSpec, UnitStatus};

pub const PING_SWEEP_BUDGET: Duration = Duration::from_secs(300);
pub const DETAILED_SWEEP_BUDGET: Duration = Duration::from_secs(900);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// Liveness only (`nmap -sn`).
    #[default]
    PingSweep,
    /// Fast port scan, plus OS detection when privileged.
    Detailed,
}

impl SweepMode {
    fn budget(&self) -> Duration {
        match self {
            Self::PingSweep => PING_SWEEP_BUDGET,
            Self::Detailed => DETAILED_SWEEP_BUDGET,
        }
    }
}

pub struct HostSweep<'a> {
    session: &'a Session,
    mode: SweepMode,
}

impl<'a> HostSweep<'a> {
    pub fn new(session: &'a Session, mode: SweepMode) -> Self {
        Self { session, mode }
    }

    pub fn command(&self, target: &str) -> CommandSpec {
        sweep_command(self.mode, target, self.session.privilege(), self.session.config().no_dns)
    }

    /// Rebuilds the registry from a sweep of `target` (a CIDR or a single
    /// address) and returns the recorded hosts in discovery order.
    pub async fn run(&self, target: &str) -> anyhow::Result<Vec<HostRecord>> {
        let target = validate_target(target)?;
        let registry = self.session.registry();
        registry.reset()?;

        let spec = self.command(&target);
        let budget = scale_duration(self.mode.budget(), self.session.config().timeout_scale);
        let outcome = self.session.supervisor().run(&spec, budget).await;

        match outcome.status {
            UnitStatus::SpawnFailed => return Err(spawn_failure(&spec).into()),
            UnitStatus::TimedOut => warn!("sweep of {target} timed out, keeping the hosts seen so far"),
            UnitStatus::Exited(Some(0)) => {}
            UnitStatus::Exited(code) => warn!("nmap exited with {code:?} while sweeping {target}"),
        }

        let hosts = parse_nmap_hosts(&outcome.output);
        for host in &hosts {
            registry
                .append(host)
                .with_context(|| format!("recording {}", host.ip))?;
        }

        success!("{} host(s) up in {target}", hosts.len());
        Ok(hosts)
    }
}

pub fn sweep_command(mode: SweepMode, target: &str, privilege: Privilege, no_dns: bool) -> CommandSpec {
    let mut args: Vec<&str> = match mode {
        SweepMode::PingSweep => vec!["-sn"],
        SweepMode::Detailed if privilege.is_privileged() => vec!["-F", "-O"],
        SweepMode::Detailed => vec!["-F"],
    };
    if no_dns {
        args.push("-n");
    }
    args.push(target);
    CommandSpec::new("nmap", args)
        .labeled(&format!("sweep {target}"))
        .elevate(privilege)
}

/// The program that could not be started; `sudo` when the sweep was elevated.
fn spawn_failure(spec: &CommandSpec) -> ReconError {
    ReconError::MissingTool(spec.program.clone())
}

/// Accepts a CIDR (normalized to its network address) or a single address.
pub fn validate_target(target: &str) -> Result<String, ReconError> {
    let target = target.trim();
    if let Some(cidr) = normalize_cidr(target) {
        return Ok(cidr);
    }
    target
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| ReconError::InvalidTarget(target.to_string()))
}

#[derive(Default)]
struct PendingHost {
    ip: Option<IpAddr>,
    hostname: String,
    up: bool,
    os: Option<String>,
    open_ports: usize,
    vendor: Option<String>,
}

impl PendingHost {
    fn finish(self) -> Option<HostRecord> {
        if !self.up {
            return None;
        }
        let info = match (self.os, self.open_ports, self.vendor) {
            (Some(os), _, _) => os,
            (None, n, _) if n > 0 => format!("{n} open ports"),
            (None, _, Some(vendor)) => vendor,
            _ => String::from("-"),
        };
        Some(
            HostRecord::new(self.ip?)
                .with_hostname(&self.hostname)
                .with_status("up")
                .with_info(&info),
        )
    }
}

/// Folds nmap's normal output into records, one per host reported up.
pub fn parse_nmap_hosts(output: &str) -> Vec<HostRecord> {
    let mut hosts: Vec<HostRecord> = Vec::new();
    let mut current: Option<PendingHost> = None;

    for line in output.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("Nmap scan report for ") {
            if let Some(done) = current.take().and_then(PendingHost::finish) {
                hosts.push(done);
            }
            current = Some(report_header(rest));
            continue;
        }
        let Some(host) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Host is up") {
            host.up = true;
        } else if let Some(os) = line.strip_prefix("OS details: ") {
            host.os = Some(os.to_string());
        } else if let Some(os) = line.strip_prefix("Running: ") {
            host.os.get_or_insert_with(|| os.to_string());
        } else if let Some(mac) = line.strip_prefix("MAC Address: ") {
            host.vendor = mac_vendor(mac);
        } else if is_open_port_line(line) {
            host.open_ports += 1;
        }
    }

    if let Some(done) = current.and_then(PendingHost::finish) {
        hosts.push(done);
    }
    hosts
}

/// `name (ip)` or a bare `ip`; `[host down]` suffixes are ignored.
fn report_header(rest: &str) -> PendingHost {
    let rest = rest.trim_end_matches("[host down]").trim();
    let (hostname, ip) = match rest.rsplit_once(" (") {
        Some((name, ip)) => (name.to_string(), ip.trim_end_matches(')').parse().ok()),
        None => (String::new(), rest.parse().ok()),
    };
    PendingHost {
        ip,
        hostname,
        ..PendingHost::default()
    }
}

/// `00:11:22:33:44:55 (Vendor)` yields the vendor unless nmap did not know it.
fn mac_vendor(mac: &str) -> Option<String> {
    let (_, vendor) = mac.split_once(" (")?;
    let vendor = vendor.trim_end_matches(')');
    (vendor != "Unknown").then(|| vendor.to_string())
}

fn is_open_port_line(line: &str) -> bool {
    let mut fields = line.split_whitespace();
    let port = fields.next().unwrap_or_default();
    let state = fields.next().unwrap_or_default();
    port.contains('/') && port.split('/').next().is_some_and(|n| n.parse::<u16>().is_ok()) && state == "open"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const PING_SWEEP: &str = "\
Starting Nmap 7.94 ( https://nmap.org ) at 2026-10-16 10:00 UTC
Nmap scan report for router.lan (192.168.1.1)
Host is up (0.0020s latency).
MAC Address: 00:11:22:33:44:55 (Netgear)
Nmap scan report for 192.168.1.20
Host is up (0.00031s latency).
MAC Address: 66:77:88:99:AA:BB (Unknown)
Nmap done: 256 IP addresses (2 hosts up) scanned in 2.31 seconds
";

    const DETAILED: &str = "\
Nmap scan report for nas.lan (192.168.1.5)
Host is up (0.0010s latency).
Not shown: 97 closed tcp ports (reset)
PORT    STATE SERVICE
22/tcp  open  ssh
80/tcp  open  http
445/tcp open  microsoft-ds
Running: Linux 4.X|5.X
OS details: Linux 4.15 - 5.8
Nmap scan report for 192.168.1.6
Host is up (0.0030s latency).
PORT   STATE    SERVICE
22/tcp filtered ssh
443/tcp open  https
Nmap scan report for 192.168.1.7 [host down]
";

    #[test]
    fn ping_sweep_records_in_order() {
        let hosts = parse_nmap_hosts(PING_SWEEP);
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].ip, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(hosts[0].hostname, "router.lan");
        assert_eq!(hosts[0].info, "Netgear");
        assert_eq!(hosts[1].hostname, "Unknown");
        assert_eq!(hosts[1].info, "-");
    }

    #[test]
    fn os_details_win_over_port_counts() {
        let hosts = parse_nmap_hosts(DETAILED);
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].info, "Linux 4.15 - 5.8");
        assert_eq!(hosts[1].info, "1 open ports");
    }

    #[test]
    fn sweep_commands_follow_privilege() {
        let ping = sweep_command(SweepMode::PingSweep, "10.0.0.0/24", Privilege::Unprivileged, true);
        assert_eq!(ping.command_line(), "nmap -sn -n 10.0.0.0/24");

        let detailed = sweep_command(SweepMode::Detailed, "10.0.0.0/24", Privilege::Elevated, false);
        assert_eq!(detailed.command_line(), "sudo -n nmap -F -O 10.0.0.0/24");

        let degraded = sweep_command(SweepMode::Detailed, "10.0.0.0/24", Privilege::Unprivileged, false);
        assert_eq!(degraded.command_line(), "nmap -F 10.0.0.0/24");
    }

    #[test]
    fn targets_are_validated() {
        assert_eq!(validate_target("10.0.0.7/24").unwrap(), "10.0.0.0/24");
        assert_eq!(validate_target(" 10.0.0.7 ").unwrap(), "10.0.0.7");
        assert!(matches!(validate_target("10.0.0.0/24; rm -rf /"), Err(ReconError::InvalidTarget(_))));
    }

    #[test]
    fn spawn_failure_names_the_program_started() {
        let elevated = sweep_command(SweepMode::PingSweep, "10.0.0.0/24", Privilege::Elevated, false);
        assert!(matches!(spawn_failure(&elevated), ReconError::MissingTool(tool) if tool == "sudo"));

        let plain = sweep_command(SweepMode::PingSweep, "10.0.0.0/24", Privilege::Root, false);
        assert!(matches!(spawn_failure(&plain), ReconError::MissingTool(tool) if tool == "nmap"));
    }
}

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use sweepr_common::network::interface::{self, InterfaceAddr};
use sweepr_common::network::subnet;

use crate::supervisor::{CommandSpec, Supervisor};
use crate::system::has_tool;

use super::NetworkIntrospector;

/// Upper bound for a single liveness probe.
pub const PROBE_BUDGET: Duration = Duration::from_millis(900);
/// Upper bound for read-only table queries (`ip route`, `ss`, ...).
pub const QUERY_BUDGET: Duration = Duration::from_secs(5);

/// Introspects the machine the process runs on.
pub struct SystemIntrospector {
    supervisor: Supervisor,
}

impl SystemIntrospector {
    pub fn new(supervisor: Supervisor) -> Self {
        Self { supervisor }
    }

    /// Runs the first installed alternative and returns its output if it
    /// exited cleanly.
    async fn query(&self, alternatives: &[(&str, &[&str])]) -> Option<String> {
        let (program, args) = alternatives.iter().find(|(program, _)| has_tool(program))?;
        let spec = CommandSpec::new(program, args.iter().copied());
        let outcome = self.supervisor.run(&spec, QUERY_BUDGET).await;
        if outcome.succeeded() {
            Some(outcome.output)
        } else {
            debug!("{} returned {:?}", spec.command_line(), outcome.status);
            None
        }
    }
}

#[async_trait]
impl NetworkIntrospector for SystemIntrospector {
    fn interfaces(&self) -> Vec<InterfaceAddr> {
        interface::list_interface_addrs()
    }

    async fn route_table(&self) -> Option<String> {
        self.query(&[("ip", &["-4", "route", "show"]), ("route", &["-n"])]).await
    }

    async fn neighbor_cache(&self) -> Option<String> {
        self.query(&[("ip", &["-4", "neigh", "show"]), ("arp", &["-an"])]).await
    }

    async fn established_connections(&self) -> Option<String> {
        self.query(&[("ss", &["-tn", "state", "established"]), ("netstat", &["-tn"])])
            .await
    }

    fn read_lease_file(&self, path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }

    /// Ping-sweeps the first /24 of `cidr`. Wider ranges are not swept whole:
    /// one answering host near the start is taken as proof of life.
    async fn probe(&self, cidr: &str) -> bool {
        if !has_tool("nmap") {
            return false;
        }
        let Some(first) = subnet::probe_address(cidr) else {
            return false;
        };
        let range = subnet::slash24(first);
        let spec = CommandSpec::new(
            "nmap",
            ["-sn", "-n", "-T5", "--max-retries", "0", "--host-timeout", "500ms", range.as_str()],
        )
        .labeled(&format!("probe {cidr}"));

        let outcome = self.supervisor.run(&spec, PROBE_BUDGET).await;
        is_live(&outcome.output)
    }
}

/// Partial output counts: a host reported before the budget ran out is live.
fn is_live(nmap_output: &str) -> bool {
    nmap_output.contains("Host is up")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_from_nmap_output() {
        assert!(is_live("Nmap scan report for 10.0.2.2\nHost is up (0.00041s latency).\n"));
        assert!(!is_live("Nmap done: 256 IP addresses (0 hosts up) scanned in 0.80 seconds\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_lease_file_reads_as_none() {
        let introspector = SystemIntrospector::new(Supervisor::silent());
        assert!(introspector
            .read_lease_file(Path::new("/nonexistent/sweepr/dhclient.leases"))
            .is_none());
    }
}

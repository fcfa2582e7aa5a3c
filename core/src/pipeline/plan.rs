use std::collections::BTreeSet;

use sweepr_common::scan::phase::{PhaseId, PhaseStatus};

use super::{PhaseCommands, PhaseContext, PhasePlan};
use crate::supervisor::CommandSpec;
use crate::system::first_available;

/// Probed by service enumeration when the port scan found nothing to go on.
pub const LIKELY_PORTS: &str = "21,22,23,25,53,80,110,139,143,443,445,993,995,1433,3306,3389,5432,5900,8080,8443";

const TRACERS: &[&str] = &["traceroute", "tracepath"];
const RESOLVERS: &[&str] = &["host", "nslookup"];

/// Commands built around nmap, `ping` and the local path-trace and lookup
/// utilities.
#[derive(Debug, Clone, Default)]
pub struct NmapPlan {
    tracer: Option<&'static str>,
    resolver: Option<&'static str>,
}

impl NmapPlan {
    /// Picks the installed path-trace and lookup utilities.
    pub fn detect() -> Self {
        Self {
            tracer: first_available(TRACERS),
            resolver: first_available(RESOLVERS),
        }
    }

    pub fn with_tools(tracer: Option<&'static str>, resolver: Option<&'static str>) -> Self {
        Self { tracer, resolver }
    }

    fn nmap(&self, ctx: &PhaseContext<'_>, args: &[&str], needs_privilege: bool) -> CommandSpec {
        let mut all: Vec<&str> = args.to_vec();
        if ctx.no_dns {
            all.push("-n");
        }
        all.push(ctx.target);
        let spec = CommandSpec::new("nmap", all);
        if needs_privilege {
            spec.elevate(ctx.privilege)
        } else {
            spec
        }
    }

    fn path_trace(&self, ctx: &PhaseContext<'_>) -> Option<CommandSpec> {
        let tracer = self.tracer?;
        let mut args: Vec<&str> = vec!["-m", "20"];
        if tracer == "traceroute" {
            args.extend(["-w", "2"]);
        }
        if ctx.no_dns {
            args.push("-n");
        }
        args.push(ctx.target);
        Some(CommandSpec::new(tracer, args))
    }

    fn lookup(&self, ctx: &PhaseContext<'_>) -> Option<CommandSpec> {
        let resolver = self.resolver?;
        Some(CommandSpec::new(resolver, [ctx.target]))
    }
}

impl PhasePlan for NmapPlan {
    fn commands(&self, phase: PhaseId, ctx: &PhaseContext<'_>) -> PhaseCommands {
        let privileged = ctx.privilege.is_privileged();
        let spec = match phase {
            PhaseId::Connectivity => CommandSpec::new("ping", ["-c", "4", "-W", "2", ctx.target]),
            PhaseId::Fingerprint if privileged => self.nmap(ctx, &["-O", "-sV", "--osscan-guess"], true),
            PhaseId::Fingerprint => self.nmap(ctx, &["-sV", "--version-light"], false),
            PhaseId::PortScan if privileged => self.nmap(ctx, &["-sS", "--top-ports", "1000"], true),
            PhaseId::PortScan => self.nmap(ctx, &["-sT", "--top-ports", "1000"], false),
            PhaseId::ServiceEnumeration => {
                let ports = likely_ports(ctx);
                self.nmap(ctx, &["-sV", "-sC", "-p", ports.as_str()], false)
            }
            PhaseId::Vulnerability if privileged => self.nmap(ctx, &["-sS", "-sV", "--script", "vuln"], true),
            PhaseId::Vulnerability => self.nmap(ctx, &["-sT", "--script", "vuln and safe"], false),
            PhaseId::PathAnalysis => {
                return match (self.path_trace(ctx), self.lookup(ctx)) {
                    (Some(trace), Some(lookup)) => PhaseCommands::Pair(trace, lookup),
                    (Some(only), None) | (None, Some(only)) => PhaseCommands::Single(only),
                    (None, None) => PhaseCommands::Unavailable(String::from(
                        "no path-trace or name-lookup utility installed",
                    )),
                };
            }
        };
        PhaseCommands::Single(spec)
    }
}

/// Open ports found by a completed port scan, or [`LIKELY_PORTS`].
fn likely_ports(ctx: &PhaseContext<'_>) -> String {
    let found: BTreeSet<u16> = ctx
        .previous
        .iter()
        .filter(|result| result.phase == PhaseId::PortScan && result.status != PhaseStatus::Skipped)
        .flat_map(|result| open_ports(&result.output))
        .collect();

    if found.is_empty() {
        LIKELY_PORTS.to_string()
    } else {
        found.iter().map(u16::to_string).collect::<Vec<String>>().join(",")
    }
}

/// Port numbers of `N/proto open ...` lines in nmap output.
pub fn open_ports(output: &str) -> Vec<u16> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let port = fields.next()?;
            (fields.next()? == "open").then_some(())?;
            port.split_once('/')?.0.parse().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use sweepr_common::scan::phase::PhaseResult;
    use sweepr_common::scan::privilege::Privilege;

    fn ctx<'a>(privilege: Privilege, previous: &'a [PhaseResult]) -> PhaseContext<'a> {
        PhaseContext {
            target: "10.0.0.5",
            privilege,
            no_dns: false,
            previous,
        }
    }

    fn line(commands: PhaseCommands) -> String {
        match commands {
            PhaseCommands::Single(spec) => spec.command_line(),
            other => panic!("expected a single command, got {other:?}"),
        }
    }

    #[test]
    fn fingerprint_depends_on_privilege() {
        let plan = NmapPlan::default();
        assert_eq!(
            line(plan.commands(PhaseId::Fingerprint, &ctx(Privilege::Unprivileged, &[]))),
            "nmap -sV --version-light 10.0.0.5"
        );
        assert_eq!(
            line(plan.commands(PhaseId::Fingerprint, &ctx(Privilege::Root, &[]))),
            "nmap -O -sV --osscan-guess 10.0.0.5"
        );
        assert_eq!(
            line(plan.commands(PhaseId::Fingerprint, &ctx(Privilege::Elevated, &[]))),
            "sudo -n nmap -O -sV --osscan-guess 10.0.0.5"
        );
    }

    #[test]
    fn port_and_vuln_scans_degrade_to_connect_scans() {
        let plan = NmapPlan::default();
        let unprivileged = ctx(Privilege::Unprivileged, &[]);
        assert_eq!(
            line(plan.commands(PhaseId::PortScan, &unprivileged)),
            "nmap -sT --top-ports 1000 10.0.0.5"
        );
        assert_eq!(
            line(plan.commands(PhaseId::Vulnerability, &unprivileged)),
            "nmap -sT --script vuln and safe 10.0.0.5"
        );
        assert_eq!(
            line(plan.commands(PhaseId::Vulnerability, &ctx(Privilege::Root, &[]))),
            "nmap -sS -sV --script vuln 10.0.0.5"
        );
    }

    #[test]
    fn enumeration_reuses_open_ports() {
        let plan = NmapPlan::default();
        let scan = PhaseResult {
            phase: PhaseId::PortScan,
            status: PhaseStatus::Done,
            elapsed: Duration::from_secs(3),
            output: "PORT    STATE  SERVICE\n22/tcp  open   ssh\n80/tcp  closed http\n443/tcp open   https\n".into(),
            budget: Duration::from_secs(300),
            exit_code: Some(0),
        };
        let previous = [scan];
        assert_eq!(
            line(plan.commands(PhaseId::ServiceEnumeration, &ctx(Privilege::Unprivileged, &previous))),
            "nmap -sV -sC -p 22,443 10.0.0.5"
        );
        assert_eq!(
            line(plan.commands(PhaseId::ServiceEnumeration, &ctx(Privilege::Unprivileged, &[]))),
            format!("nmap -sV -sC -p {LIKELY_PORTS} 10.0.0.5")
        );
    }

    #[test]
    fn path_analysis_pairs_available_tools() {
        let both = NmapPlan::with_tools(Some("traceroute"), Some("host"));
        match both.commands(PhaseId::PathAnalysis, &ctx(Privilege::Unprivileged, &[])) {
            PhaseCommands::Pair(trace, lookup) => {
                assert_eq!(trace.command_line(), "traceroute -m 20 -w 2 10.0.0.5");
                assert_eq!(lookup.command_line(), "host 10.0.0.5");
            }
            other => panic!("expected a pair, got {other:?}"),
        }

        let none = NmapPlan::with_tools(None, None);
        assert!(matches!(
            none.commands(PhaseId::PathAnalysis, &ctx(Privilege::Unprivileged, &[])),
            PhaseCommands::Unavailable(_)
        ));
    }
}

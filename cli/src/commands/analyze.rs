use colored::*;

use sweepr_common::error::ReconError;
use sweepr_common::scan::phase::{PhaseSelection, PhaseStatus};
use sweepr_common::success;
use sweepr_common::utils::time::clock;
use sweepr_core::pipeline::{self, AnalysisReport, Pipeline};
use sweepr_core::report::Report;
use sweepr_core::session::Session;

use crate::mprint;
use crate::terminal::{colors, print};

/// Report type recorded in saved report names.
pub const SCAN_TYPE: &str = "analysis";

pub async fn analyze(session: &Session, target: &str, phases: &str, save: bool) -> anyhow::Result<()> {
    let selection: PhaseSelection = phases.parse()?;
    let target = resolve_target(session, target)?;
    let report = run(session, &target, &selection).await?;

    print!("{}", report.render());
    if save {
        store(session, &report)?;
    }
    Ok(())
}

/// A bare number picks that host from the registry; anything else must be
/// a plausible address or hostname.
pub fn resolve_target(session: &Session, target: &str) -> anyhow::Result<String> {
    let target = target.trim();
    match target.parse::<usize>() {
        Ok(ordinal) => {
            let host = session
                .registry()
                .by_ordinal(ordinal)?
                .ok_or(ReconError::UnknownOrdinal(ordinal))?;
            Ok(host.ip.to_string())
        }
        Err(_) => Ok(pipeline::validate_target(target)?),
    }
}

pub async fn run(session: &Session, target: &str, selection: &PhaseSelection) -> anyhow::Result<AnalysisReport> {
    let report = Pipeline::for_session(session).run(target, selection).await?;
    show(&report, session.config().quiet);
    Ok(report)
}

pub fn store(session: &Session, report: &AnalysisReport) -> anyhow::Result<Report> {
    let saved = session.reports().save(SCAN_TYPE, &report.target, &report.render())?;
    success!("report saved as {}", saved.info.name);
    Ok(saved)
}

fn show(report: &AnalysisReport, q_level: u8) {
    if q_level > 1 {
        return;
    }
    mprint!();
    print::header("analysis summary", q_level);
    for result in report.executed() {
        let status = match result.status {
            PhaseStatus::TimedOut => result.status.to_string().color(colors::HIGHLIGHT),
            _ => result.status.to_string().color(colors::SUCCESS),
        };
        print::tree_head(result.phase, result.phase.title());
        print::as_tree_one_level(vec![
            (String::from("Status"), status),
            (String::from("Elapsed"), clock(result.elapsed).normal()),
        ]);
    }
    print::fat_separator();
    let timed_out = report.timed_out();
    let line = format!(
        "Analysis of {} complete: {} phase(s), {} timed out",
        report.target.color(colors::IPV4_ADDR),
        report.executed().count().to_string().bold().green(),
        timed_out.to_string().bold().yellow()
    );
    print::centerln(&line.color(colors::TEXT_DEFAULT).to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use sweepr_common::config::Config;
    use sweepr_common::network::host::HostRecord;
    use sweepr_common::scan::privilege::Privilege;
    use sweepr_core::supervisor::Supervisor;

    fn session_in(dir: &std::path::Path) -> Session {
        let config = Config {
            work_dir: Some(dir.to_path_buf()),
            ..Config::default()
        };
        Session::open(config, Privilege::Unprivileged, Supervisor::silent())
    }

    #[test]
    fn targets_resolve_by_ordinal_or_name() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        let registry = session.registry();
        registry.reset().unwrap();
        registry
            .append(&HostRecord::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))))
            .unwrap();

        assert_eq!(resolve_target(&session, " 1 ").unwrap(), "192.168.1.20");
        assert!(resolve_target(&session, "2").is_err());
        assert_eq!(resolve_target(&session, "router.lan").unwrap(), "router.lan");
        assert!(resolve_target(&session, "").is_err());
        assert!(resolve_target(&session, "-oN /tmp/x").is_err());
        assert!(resolve_target(&session, "host;reboot").is_err());
    }
}

use std::time::Instant;

use colored::*;

use sweepr_common::network::host::HostRecord;
use sweepr_common::success;
use sweepr_core::scanner::{HostSweep, SweepMode};
use sweepr_core::session::Session;

use crate::mprint;
use crate::terminal::{colors, format, print};

/// Sweeps `target`, rebuilds the registry and prints its lines on stdout.
pub async fn sweep(session: &Session, target: &str, detailed: bool) -> anyhow::Result<()> {
    let mode = match detailed {
        true => SweepMode::Detailed,
        false => SweepMode::PingSweep,
    };
    for host in &run(session, target, mode).await? {
        println!("{}", host.to_line());
    }
    Ok(())
}

pub async fn run(session: &Session, target: &str, mode: SweepMode) -> anyhow::Result<Vec<HostRecord>> {
    let start = Instant::now();
    let hosts = HostSweep::new(session, mode).run(target).await?;
    show(&hosts, start, session.config().quiet);
    Ok(hosts)
}

fn show(hosts: &[HostRecord], start: Instant, q_level: u8) {
    if hosts.is_empty() {
        print::header("zero hosts detected", q_level);
        print::no_results();
        return;
    }
    if q_level > 1 {
        return;
    }

    mprint!();
    print::header("live hosts", q_level);
    format::print_hosts(hosts);

    let count = format!("{} active host(s)", hosts.len()).bold().green();
    let elapsed = format!("{:.2}s", start.elapsed().as_secs_f64()).bold().yellow();
    let line = format!("Sweep Complete: {count} identified in {elapsed}");
    match q_level {
        0 => {
            print::fat_separator();
            print::centerln(&line.color(colors::TEXT_DEFAULT).to_string());
        }
        _ => success!("{line}"),
    }
}

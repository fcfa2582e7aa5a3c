use std::time::Instant;

use colored::*;
use tracing::warn;

use sweepr_common::network::subnet::Subnet;
use sweepr_common::success;
use sweepr_core::discovery::{SubnetDiscovery, SystemIntrospector};
use sweepr_core::session::Session;

use crate::mprint;
use crate::terminal::{colors, format, print};

/// Prints one CIDR per line on stdout.
pub async fn discover(session: &Session, with_sources: bool) -> anyhow::Result<()> {
    for subnet in &find(session).await {
        match with_sources {
            true => println!("{}", subnet.to_line()),
            false => println!("{}", subnet.cidr),
        }
    }
    Ok(())
}

/// Runs every discovery source, saves the result and shows it on stderr.
pub async fn find(session: &Session) -> Vec<Subnet> {
    let start = Instant::now();
    let introspector = SystemIntrospector::new(session.supervisor().clone());
    let subnets = SubnetDiscovery::new(Box::new(introspector)).discover().await;

    if let Err(e) = session.save_subnets(&subnets) {
        warn!("could not remember discovered subnets: {e:#}");
    }
    show(&subnets, start, session.config().quiet);
    subnets
}

fn show(subnets: &[Subnet], start: Instant, q_level: u8) {
    if q_level > 1 {
        return;
    }
    mprint!();
    print::header("candidate subnets", q_level);
    format::print_subnets(subnets);

    let count = format!("{} subnet(s)", subnets.len()).bold().green();
    let elapsed = format!("{:.2}s", start.elapsed().as_secs_f64()).bold().yellow();
    match q_level {
        0 => {
            print::fat_separator();
            print::centerln(&format!("Discovery Complete: {count} in {elapsed}").color(colors::TEXT_DEFAULT).to_string());
        }
        _ => success!("Discovery Complete: {count} in {elapsed}"),
    }
}

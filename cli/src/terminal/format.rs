use colored::*;

use sweepr_common::network::host::HostRecord;
use sweepr_common::network::subnet::Subnet;
use sweepr_common::utils::time::HUMAN_STAMP;
use sweepr_core::report::{ReportInfo, ReportStats};

use crate::mprint;
use crate::terminal::{colors, print};

type Detail = (String, ColoredString);

fn detail(key: &str, value: ColoredString) -> Detail {
    (key.to_string(), value)
}

pub fn print_subnets(subnets: &[Subnet]) {
    for (idx, subnet) in subnets.iter().enumerate() {
        let (network, prefix) = subnet.cidr.split_once('/').unwrap_or((subnet.cidr.as_str(), "32"));
        print::tree_head(idx + 1, network);
        print::as_tree_one_level(vec![
            detail("Prefix", format!("/{prefix}").color(colors::IPV4_PREFIX)),
            detail("Source", subnet.source.as_str().normal()),
        ]);
    }
}

pub fn print_hosts(hosts: &[HostRecord]) {
    for (idx, host) in hosts.iter().enumerate() {
        print::tree_head(idx + 1, &host.hostname);
        print::as_tree_one_level(host_details(host));
        if idx + 1 != hosts.len() {
            mprint!();
        }
    }
}

fn host_details(host: &HostRecord) -> Vec<Detail> {
    vec![
        detail("IPv4", host.ip.to_string().color(colors::IPV4_ADDR)),
        detail("Status", host.status.as_str().color(colors::SUCCESS)),
        detail("Info", host.info.as_str().normal()),
    ]
}

pub fn print_reports(reports: &[ReportInfo]) {
    for (idx, report) in reports.iter().enumerate() {
        print::tree_head(idx + 1, &report.name);
        print::as_tree_one_level(vec![
            detail("Type", report.scan_type.as_str().normal()),
            detail("Target", report.target.as_str().color(colors::IPV4_ADDR)),
            detail("Time", report.timestamp.format(HUMAN_STAMP).to_string().normal()),
        ]);
    }
}

pub fn print_stats(stats: &ReportStats) {
    print::as_tree_one_level(vec![
        detail("Ports", count(stats.open_ports)),
        detail("Vulns", highlight_if_any(stats.vulnerabilities)),
        detail("Services", count(stats.services)),
        detail("Errors", count(stats.errors)),
    ]);
}

fn count(n: usize) -> ColoredString {
    n.to_string().color(colors::ACCENT)
}

fn highlight_if_any(n: usize) -> ColoredString {
    if n > 0 {
        n.to_string().color(colors::HIGHLIGHT).bold()
    } else {
        count(n)
    }
}

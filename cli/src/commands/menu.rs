//! Interactive main menu. This loop is the only place that recovers from
//! errors: a failed action is reported and the menu comes back.

use std::str::FromStr;

use colored::*;
use tracing::{error, warn};

use sweepr_common::scan::phase::PhaseSelection;
use sweepr_core::report::Document;
use sweepr_common::network::subnet::Subnet;
use sweepr_core::scanner::{self, SweepMode};
use sweepr_core::session::Session;

use crate::commands::{analyze, discover, reports, sweep};
use crate::mprint;
use crate::terminal::viewer::{Origin, Viewer};
use crate::terminal::{colors, format, print, prompt};

const ENTRIES: [(MenuEntry, &str); 5] = [
    (MenuEntry::Discover, "Discover subnets"),
    (MenuEntry::Sweep, "Sweep a subnet for live hosts"),
    (MenuEntry::Analyze, "Analyze a host"),
    (MenuEntry::Browse, "Browse reports"),
    (MenuEntry::Purge, "Purge old reports"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuEntry {
    Discover,
    Sweep,
    Analyze,
    Browse,
    Purge,
}

impl FromStr for MenuEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(n) = prompt::parse_index(&s, ENTRIES.len()) {
            return Ok(ENTRIES[n - 1].0);
        }
        match s.as_str() {
            "d" | "discover" => Ok(Self::Discover),
            "s" | "sweep" => Ok(Self::Sweep),
            "a" | "analyze" => Ok(Self::Analyze),
            "b" | "r" | "reports" => Ok(Self::Browse),
            "p" | "purge" => Ok(Self::Purge),
            other => Err(format!("unknown choice '{other}'")),
        }
    }
}

pub async fn run(session: &Session) -> anyhow::Result<()> {
    loop {
        show_menu(session);
        let Some(entry) = prompt::ask("Choice (q to quit)", |answer| answer.parse::<MenuEntry>())? else {
            break;
        };

        let outcome = match entry {
            MenuEntry::Discover => discover_subnets(session).await,
            MenuEntry::Sweep => sweep_subnet(session).await,
            MenuEntry::Analyze => analyze_host(session).await,
            MenuEntry::Browse => browse_reports(session),
            MenuEntry::Purge => purge_reports(session),
        };
        if let Err(e) = outcome {
            error!("{e:#}");
        }
    }

    print::end_of_program();
    Ok(())
}

fn show_menu(session: &Session) {
    let q_level = session.config().quiet;
    mprint!();
    print::header("main menu", q_level);
    for (idx, (_, label)) in ENTRIES.iter().enumerate() {
        print::tree_head(idx + 1, label);
    }
    if q_level == 0 {
        print::thin_separator();
        print::print_status(format!(
            "{} as {}",
            session.work_dir().display(),
            session.privilege().to_string().color(colors::ACCENT)
        ));
    }
}

async fn discover_subnets(session: &Session) -> anyhow::Result<()> {
    print::header("subnet discovery", session.config().quiet);
    discover::find(session).await;
    Ok(())
}

async fn sweep_subnet(session: &Session) -> anyhow::Result<()> {
    print::header("host sweep", session.config().quiet);
    let mut subnets = session.load_subnets();
    if subnets.is_empty() {
        warn!("no subnets discovered yet, running discovery first");
        subnets = discover::find(session).await;
    } else {
        format::print_subnets(&subnets);
    }

    let Some(target) = prompt::ask("Subnet number or CIDR", |answer| parse_sweep_target(answer, &subnets))? else {
        return Ok(());
    };

    let Some(mode) = prompt::ask_or("Sweep type: [p]ing or [d]etailed", "p", parse_sweep_mode)? else {
        return Ok(());
    };

    sweep::run(session, &target, mode).await?;
    Ok(())
}

fn parse_sweep_mode(answer: &str) -> Result<SweepMode, String> {
    match answer.to_ascii_lowercase().as_str() {
        "p" | "ping" => Ok(SweepMode::PingSweep),
        "d" | "detailed" => Ok(SweepMode::Detailed),
        _ => Err(String::from("answer p or d")),
    }
}

async fn analyze_host(session: &Session) -> anyhow::Result<()> {
    print::header("host analysis", session.config().quiet);
    let hosts = session.registry().all()?;
    let question = match hosts.is_empty() {
        true => "Host address",
        false => {
            format::print_hosts(&hosts);
            "Host number or address"
        }
    };

    let Some(target) = prompt::ask(question, |answer| {
        if answer.is_empty() {
            return Err(String::from("enter a host"));
        }
        analyze::resolve_target(session, answer).map_err(|e| e.to_string())
    })?
    else {
        return Ok(());
    };

    let Some(selection) = prompt::ask_or(
        "Phases (all, fast, security-focus, or a list like 1,3,5)",
        "fast",
        |answer| answer.parse::<PhaseSelection>(),
    )?
    else {
        return Ok(());
    };

    let report = analyze::run(session, &target, &selection).await?;

    if prompt::confirm("Save the report?", true)? {
        let saved = analyze::store(session, &report)?;
        if prompt::confirm("Open it in the viewer?", true)? {
            reports::view(session, &saved)?;
        }
    } else if prompt::confirm("Open it in the viewer?", true)? {
        let document = Document::from_text(&format!("analysis of {}", report.target), &report.render());
        let store = session.reports();
        Viewer::new(&store, session.config().page_size).open(&document, Origin::Report)?;
    }
    Ok(())
}

fn browse_reports(session: &Session) -> anyhow::Result<()> {
    let reports = reports::list(session)?;
    if reports.is_empty() {
        return Ok(());
    }
    let Some(choice) = prompt::choose_index("Report number", reports.len())? else {
        return Ok(());
    };
    let report = session.reports().load(&reports[choice - 1].name)?;
    reports::view(session, &report)
}

/// A listed subnet by number, or a CIDR or address typed out.
fn parse_sweep_target(answer: &str, subnets: &[Subnet]) -> Result<String, String> {
    match prompt::parse_index(answer, subnets.len()) {
        Ok(n) => Ok(subnets[n - 1].cidr.clone()),
        Err(_) if answer.parse::<usize>().is_ok() => Err(format!("no subnet number {answer}")),
        Err(_) if answer.is_empty() => Err(String::from("enter a number or a CIDR")),
        Err(_) => scanner::validate_target(answer).map_err(|e| e.to_string()),
    }
}

fn purge_reports(session: &Session) -> anyhow::Result<()> {
    let days = session.config().retention_days;
    if prompt::confirm(&format!("Remove reports older than {days} day(s)?"), false)? {
        reports::purge(session)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use sweepr_common::network::subnet::SubnetSource;

    #[test]
    fn menu_accepts_numbers_and_letters() {
        assert_eq!("1".parse::<MenuEntry>(), Ok(MenuEntry::Discover));
        assert_eq!("3".parse::<MenuEntry>(), Ok(MenuEntry::Analyze));
        assert_eq!("B".parse::<MenuEntry>(), Ok(MenuEntry::Browse));
        assert!("9".parse::<MenuEntry>().is_err());
        assert!("x".parse::<MenuEntry>().is_err());
    }

    #[test]
    fn sweep_modes() {
        assert_eq!(parse_sweep_mode("P"), Ok(SweepMode::PingSweep));
        assert_eq!(parse_sweep_mode("detailed"), Ok(SweepMode::Detailed));
        assert!(parse_sweep_mode("fast").is_err());
    }

    #[test]
    fn sweep_target_is_checked_before_use() {
        let subnets = [
            Subnet::new("192.168.1.0/24", SubnetSource::Interface),
            Subnet::new("10.8.0.0/24", SubnetSource::Route),
        ];
        assert_eq!(parse_sweep_target("2", &subnets), Ok(String::from("10.8.0.0/24")));
        assert_eq!(parse_sweep_target("172.17.4.9/16", &subnets), Ok(String::from("172.17.0.0/16")));
        assert_eq!(parse_sweep_target("10.0.0.7", &subnets), Ok(String::from("10.0.0.7")));
        assert!(parse_sweep_target("3", &subnets).is_err());
        assert!(parse_sweep_target("", &subnets).is_err());
        assert!(parse_sweep_target("not-a-subnet", &subnets).is_err());
        assert!(parse_sweep_target("10.0.0.0/24; id", &subnets).is_err());
    }
}

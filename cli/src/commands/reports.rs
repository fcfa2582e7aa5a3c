use std::time::Duration;

use tracing::warn;

use sweepr_common::success;
use sweepr_core::report::{Report, ReportInfo, ReportStore};
use sweepr_core::session::Session;

use crate::commands::ReportAction;
use crate::mprint;
use crate::terminal::viewer::{self, Origin, Viewer};
use crate::terminal::{format, print, prompt};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

pub fn run(session: &Session, action: ReportAction) -> anyhow::Result<()> {
    let q_level = session.config().quiet;
    match action {
        ReportAction::List => {
            let reports = list(session)?;
            for info in &reports {
                println!("{}", info.name);
            }
            Ok(())
        }
        ReportAction::View { report } => {
            print::header("report viewer", q_level);
            let report = load(&session.reports(), &report)?;
            view(session, &report)
        }
        ReportAction::Purge => purge(session).map(|_| ()),
    }
}

/// Lists stored reports, newest first, as a tree on stderr.
pub fn list(session: &Session) -> anyhow::Result<Vec<ReportInfo>> {
    let reports = session.reports().list()?;
    if reports.is_empty() {
        warn!("no reports in {}", session.work_dir().display());
        return Ok(reports);
    }
    if session.config().quiet < 2 {
        print::header("stored reports", session.config().quiet);
        format::print_reports(&reports);
    }
    Ok(reports)
}

/// Loads by file name, or by position in the newest-first listing.
pub fn load(store: &ReportStore, key: &str) -> anyhow::Result<Report> {
    let key = key.trim();
    if key.chars().all(|c| c.is_ascii_digit()) {
        let reports = store.list()?;
        let position = prompt::parse_index(key, reports.len()).map_err(anyhow::Error::msg)?;
        return store.load(&reports[position - 1].name);
    }
    store.load(key)
}

/// Statistics first, then the pager when a terminal is attached; otherwise
/// the report goes to stdout whole.
pub fn view(session: &Session, report: &Report) -> anyhow::Result<()> {
    let document = report.document();
    if session.config().quiet < 2 {
        print::tree_head(&report.info.scan_type, &report.info.target);
        format::print_stats(&report.stats());
        mprint!();
    }

    if !prompt::interactive() {
        viewer::dump(&document);
        return Ok(());
    }
    let store = session.reports();
    Viewer::new(&store, session.config().page_size).open(&document, Origin::Report)
}

/// Removes reports older than the configured retention.
pub fn purge(session: &Session) -> anyhow::Result<usize> {
    let days = session.config().retention_days;
    let removed = session.reports().purge_older_than(Duration::from_secs(days.saturating_mul(SECS_PER_DAY)))?;
    match removed {
        0 => warn!("no reports older than {days} day(s)"),
        n => success!("removed {n} report(s) older than {days} day(s)"),
    }
    Ok(removed)
}

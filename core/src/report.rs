//! # Report Store
//!
//! Reports are plain text files in the working directory, named
//! `<scan-type>_<target>_<YYYYMMDD_HHMMSS>.txt`. The name carries all the
//! metadata; derived counts are recomputed from the text on demand.
//!
//! Derived views (search results, category filters) and exports live next to
//! the reports but are never listed as reports.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use tracing::{debug, warn};

use sweepr_common::error::ReconError;
use sweepr_common::utils::time::{file_stamp, parse_file_stamp};

use crate::session::{REGISTRY_FILE, SUBNETS_FILE, write_atomic};

pub mod category;
pub mod export;
pub mod pager;

pub use category::{Category, ReportStats, search};
pub use export::ExportKind;
pub use pager::{Pager, PagerError};

pub const SEARCH_FILE: &str = "search_results.txt";
pub const EXPORT_PREFIX: &str = "export_";
const FILTER_PREFIX: &str = "filter_";

static REPORT_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[a-z0-9-]+)_(?P<target>.+)_(?P<stamp>\d{8}_\d{6})(?:_\d+)?\.txt$").ok()
});

/// An in-memory list of lines with a title, the unit the viewer pages over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub lines: Vec<String>,
}

impl Document {
    pub fn new(title: &str, lines: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            lines,
        }
    }

    pub fn from_text(title: &str, text: &str) -> Self {
        Self::new(title, text.lines().map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_text(&self) -> String {
        self.lines.iter().map(|line| format!("{line}\n")).collect()
    }
}

/// Metadata parsed from a report's file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportInfo {
    pub name: String,
    pub scan_type: String,
    pub target: String,
    pub timestamp: NaiveDateTime,
}

impl ReportInfo {
    pub fn parse(name: &str) -> Option<Self> {
        let caps = REPORT_NAME.as_ref()?.captures(name)?;
        Some(Self {
            name: name.to_string(),
            scan_type: caps.name("kind")?.as_str().to_string(),
            target: caps.name("target")?.as_str().to_string(),
            timestamp: parse_file_stamp(caps.name("stamp")?.as_str())?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub info: ReportInfo,
    pub text: String,
}

impl Report {
    pub fn document(&self) -> Document {
        Document::from_text(&self.info.name, &self.text)
    }

    pub fn stats(&self) -> ReportStats {
        ReportStats::of(&self.document())
    }
}

pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, scan_type: &str, target: &str, text: &str) -> anyhow::Result<Report> {
        let stem = format!(
            "{}_{}_{}",
            sanitize_scan_type(scan_type),
            sanitize_target(target),
            file_stamp(&Local::now())
        );
        let path = self.unused_path(&stem);
        let name = file_name(&path)?;
        fs::write(&path, text).with_context(|| format!("writing report {}", path.display()))?;
        debug!("saved report {name}");

        let info = ReportInfo::parse(&name).with_context(|| format!("report name '{name}' does not parse"))?;
        Ok(Report {
            info,
            text: text.to_string(),
        })
    }

    /// Every report in the directory, newest first.
    pub fn list(&self) -> anyhow::Result<Vec<ReportInfo>> {
        let entries = fs::read_dir(&self.dir).with_context(|| format!("listing {}", self.dir.display()))?;
        let mut reports: Vec<ReportInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_report_name(name))
            .filter_map(|name| ReportInfo::parse(&name))
            .collect();

        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.name.cmp(&a.name)));
        Ok(reports)
    }

    pub fn load(&self, name: &str) -> anyhow::Result<Report> {
        let info = ReportInfo::parse(name)
            .filter(|_| is_report_name(name) && !name.contains(['/', '\\']))
            .ok_or_else(|| ReconError::UnknownReport(name.to_string()))?;
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(ReconError::UnknownReport(name.to_string()).into());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Report { info, text })
    }

    /// Deletes reports and exports last modified at least `age` ago and
    /// returns how many were removed.
    pub fn purge_older_than(&self, age: Duration) -> anyhow::Result<usize> {
        let now = SystemTime::now();
        let entries = fs::read_dir(&self.dir).with_context(|| format!("listing {}", self.dir.display()))?;

        let mut removed = 0;
        for entry in entries.filter_map(|entry| entry.ok()) {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let purgeable = (is_report_name(&name) && ReportInfo::parse(&name).is_some())
                || (name.starts_with(EXPORT_PREFIX) && name.ends_with(".txt"));
            if !purgeable {
                continue;
            }

            let modified = entry.metadata().and_then(|meta| meta.modified());
            let expired = match modified {
                Ok(modified) => now.duration_since(modified).map(|d| d >= age).unwrap_or(false),
                Err(e) => {
                    warn!("cannot read age of {name}: {e}");
                    false
                }
            };
            if expired {
                fs::remove_file(entry.path()).with_context(|| format!("removing {name}"))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Replaces a derived view file with exactly the document's lines.
    pub fn write_view(&self, file: &str, document: &Document) -> anyhow::Result<PathBuf> {
        let path = self.dir.join(file);
        write_atomic(&path, &document.to_text())?;
        Ok(path)
    }

    /// `<stem>.txt`, or `<stem>_2.txt`, `<stem>_3.txt`... if taken.
    pub(crate) fn unused_path(&self, stem: &str) -> PathBuf {
        let first = self.dir.join(format!("{stem}.txt"));
        if !first.exists() {
            return first;
        }
        (2..)
            .map(|n| self.dir.join(format!("{stem}_{n}.txt")))
            .find(|path| !path.exists())
            .unwrap_or(first)
    }
}

pub fn filter_file(category: Category) -> String {
    format!("{FILTER_PREFIX}{}.txt", category.slug())
}

/// Targets end up in file names; path separators and colons are replaced.
pub fn sanitize_target(target: &str) -> String {
    target
        .trim()
        .chars()
        .map(|c| match c {
            '/' | ':' | '\\' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect()
}

fn sanitize_scan_type(scan_type: &str) -> String {
    scan_type
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn is_report_name(name: &str) -> bool {
    name.ends_with(".txt")
        && !name.starts_with(EXPORT_PREFIX)
        && !name.starts_with(FILTER_PREFIX)
        && !name.starts_with('.')
        && ![REGISTRY_FILE, SUBNETS_FILE, SEARCH_FILE].contains(&name)
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no file name", path.display()))
}

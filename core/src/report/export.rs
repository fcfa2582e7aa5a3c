use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;

use sweepr_common::utils::time::{file_stamp, human_stamp};

use super::category::{Category, ReportStats};
use super::{Document, EXPORT_PREFIX, ReportStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// The document as it is.
    Full,
    /// An already filtered document; `expression` is recorded in the header.
    Filtered { expression: String },
    /// Category counts followed by the open-port lines.
    Summary,
}

impl ReportStore {
    /// Writes `export_<YYYYMMDD_HHMMSS>.txt` and returns its path.
    pub fn export(&self, document: &Document, kind: &ExportKind) -> anyhow::Result<PathBuf> {
        let now = Local::now();
        let mut out = String::new();
        out.push_str(&format!("Title: {}\n", document.title));
        out.push_str(&format!("Generated: {}\n", human_stamp(&now)));
        if let ExportKind::Filtered { expression } = kind {
            out.push_str(&format!("Filter: {expression}\n"));
        }
        out.push_str(&"=".repeat(64));
        out.push('\n');

        match kind {
            ExportKind::Full | ExportKind::Filtered { .. } => out.push_str(&document.to_text()),
            ExportKind::Summary => out.push_str(&summary(document)),
        }

        let path = self.unused_path(&format!("{EXPORT_PREFIX}{}", file_stamp(&now)));
        fs::write(&path, out).with_context(|| format!("writing export {}", path.display()))?;
        Ok(path)
    }
}

fn summary(document: &Document) -> String {
    let stats = ReportStats::of(document);
    let mut out = String::new();
    for category in Category::ALL {
        out.push_str(&format!("{:<16} {}\n", format!("{}:", category.name()), stats.get(category)));
    }
    out.push('\n');
    out.push_str("Open ports:\n");
    out.push_str(&Category::OpenPorts.filter(document).to_text());
    out
}

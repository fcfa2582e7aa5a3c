//! Interactive pager over a [`Document`].
//!
//! Search results and category filters are written to their scratch files and
//! opened in a nested viewer; quitting the nested viewer returns to the page
//! the operator came from.

use std::path::PathBuf;
use std::str::FromStr;

use colored::*;
use tracing::{error, warn};

use sweepr_common::success;
use sweepr_core::report::{
    Category, Document, ExportKind, Pager, ReportStats, ReportStore, SEARCH_FILE, filter_file, search,
};

use crate::mprint;
use crate::terminal::{colors, print, prompt};

const COMMANDS: &str = "[n]ext [p]rev [f]irst [l]ast [g]oto [s]earch [c]ategory [e]xport [q]uit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    Next,
    Prev,
    First,
    Last,
    Goto(usize),
    Search(String),
    Filter,
    Export,
    Quit,
}

impl FromStr for ViewerCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, rest) = match s.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (s, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            "" | "n" | "next" => Ok(Self::Next),
            "p" | "prev" => Ok(Self::Prev),
            "f" | "first" => Ok(Self::First),
            "l" | "last" => Ok(Self::Last),
            "g" | "goto" => rest
                .parse()
                .map(Self::Goto)
                .map_err(|_| String::from("usage: g <page>")),
            "s" | "/" | "search" if !rest.is_empty() => Ok(Self::Search(rest.to_string())),
            "s" | "/" | "search" => Err(String::from("usage: s <term>")),
            "c" | "category" => Ok(Self::Filter),
            "e" | "export" => Ok(Self::Export),
            "q" | "quit" => Ok(Self::Quit),
            other => match other.parse::<usize>() {
                Ok(page) => Ok(Self::Goto(page)),
                Err(_) => Err(format!("unknown command '{other}'")),
            },
        }
    }
}

/// Where a document came from; decides how it is exported.
#[derive(Debug, Clone)]
pub enum Origin {
    Report,
    Derived { expression: String },
}

pub struct Viewer<'a> {
    store: &'a ReportStore,
    page_size: usize,
}

impl<'a> Viewer<'a> {
    pub fn new(store: &'a ReportStore, page_size: usize) -> Self {
        Self { store, page_size }
    }

    pub fn open(&self, document: &Document, origin: Origin) -> anyhow::Result<()> {
        let mut pager = Pager::new(document.len(), self.page_size);
        loop {
            render_page(document, &pager);

            let Some(command) = prompt::ask(COMMANDS, |answer| answer.parse::<ViewerCommand>())? else {
                return Ok(());
            };

            match command {
                ViewerCommand::Next => {
                    if !pager.next() {
                        warn!("already on the last page");
                    }
                }
                ViewerCommand::Prev => {
                    if !pager.prev() {
                        warn!("already on the first page");
                    }
                }
                ViewerCommand::First => pager.first(),
                ViewerCommand::Last => pager.last(),
                ViewerCommand::Goto(page) => {
                    if let Err(e) = pager.goto(page) {
                        error!("{e}");
                    }
                }
                ViewerCommand::Search(term) => self.search(document, &term)?,
                ViewerCommand::Filter => self.filter(document)?,
                ViewerCommand::Export => self.export(document, &origin)?,
                ViewerCommand::Quit => return Ok(()),
            }
        }
    }

    fn search(&self, document: &Document, term: &str) -> anyhow::Result<()> {
        let results = search(document, term);
        if results.is_empty() {
            warn!("no lines match '{term}'");
            return Ok(());
        }
        let path = self.store.write_view(SEARCH_FILE, &results)?;
        success!("{} matching line(s) written to {}", results.len(), path.display());
        self.open(
            &results,
            Origin::Derived {
                expression: format!("search: {term}"),
            },
        )
    }

    fn filter(&self, document: &Document) -> anyhow::Result<()> {
        let stats = ReportStats::of(document);
        print::header("categories", 0);
        for (idx, category) in Category::ALL.iter().enumerate() {
            print::tree_head(idx + 1, &format!("{category} ({})", stats.get(*category)));
        }

        let Some(choice) = prompt::choose_index("Category", Category::ALL.len())? else {
            return Ok(());
        };
        let category = Category::ALL[choice - 1];
        let Some((filtered, path)) = write_filtered(self.store, document, category)? else {
            warn!("no {category} in this document, nothing to show");
            return Ok(());
        };
        success!("{} line(s) written to {}", filtered.len(), path.display());
        self.open(
            &filtered,
            Origin::Derived {
                expression: format!("category: {category}"),
            },
        )
    }

    fn export(&self, document: &Document, origin: &Origin) -> anyhow::Result<()> {
        let kind = match origin {
            Origin::Derived { expression } => ExportKind::Filtered {
                expression: expression.clone(),
            },
            Origin::Report => {
                let Some(kind) = prompt::ask_or("Export [f]ull or [s]ummary", "f", parse_export_kind)? else {
                    return Ok(());
                };
                kind
            }
        };
        let path = self.store.export(document, &kind)?;
        success!("exported to {}", path.display());
        Ok(())
    }
}

/// Writes the `category` lines of `document` to their scratch file. A category
/// with no matching lines writes nothing.
fn write_filtered(
    store: &ReportStore,
    document: &Document,
    category: Category,
) -> anyhow::Result<Option<(Document, PathBuf)>> {
    if ReportStats::of(document).get(category) == 0 {
        return Ok(None);
    }
    let filtered = category.filter(document);
    let path = store.write_view(&filter_file(category), &filtered)?;
    Ok(Some((filtered, path)))
}

fn parse_export_kind(answer: &str) -> Result<ExportKind, String> {
    match answer.to_ascii_lowercase().as_str() {
        "f" | "full" => Ok(ExportKind::Full),
        "s" | "summary" => Ok(ExportKind::Summary),
        _ => Err(String::from("answer f or s")),
    }
}

fn render_page(document: &Document, pager: &Pager) {
    mprint!();
    print::header(&document.title, 0);

    let range = pager.range();
    let number_width = document.len().max(1).to_string().len();
    if range.is_empty() {
        print::centerln(&"(empty document)".color(colors::SEPARATOR).to_string());
    }
    for idx in range {
        let number = format!("{:>number_width$}", idx + 1);
        print::print(&format!(
            "{} {}",
            number.color(colors::SEPARATOR),
            document.lines[idx]
        ));
    }

    print::thin_separator();
    print::centerln(&format!(
        "page {} of {} ({} lines)",
        pager.page().to_string().color(colors::ACCENT),
        pager.total_pages().to_string().color(colors::ACCENT),
        pager.total_lines()
    ));
}

/// Prints the whole document, for non-interactive use.
pub fn dump(document: &Document) {
    for line in &document.lines {
        println!("{line}");
    }
}

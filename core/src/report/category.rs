//! Line classification shared by the counts shown to the operator and the
//! filtered views written to disk. Both go through [`Category::matches`], so
//! a count always equals the number of lines in the matching view.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use sweepr_common::error::ReconError;

use super::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    OpenPorts,
    Vulnerabilities,
    Services,
    Errors,
}

static PATTERNS: LazyLock<[Option<Regex>; 4]> = LazyLock::new(|| {
    [
        r"(?i)^\s*\d+/(tcp|udp|sctp)\s+open\b",
        r"(?i)(state:\s*(likely\s+)?vulnerable|\bvulnerable:|\bcve-\d{4}-\d{4,})",
        r"(?i)(^\s*\d+/(tcp|udp|sctp)\s+open\s+\S+\s+\S+|\bservice info:)",
        r"(?i)\b(error|failed|failure|unreachable|timed out|denied|refused)\b",
    ]
    .map(|pattern| Regex::new(pattern).ok())
});

impl Category {
    pub const ALL: [Category; 4] = [Self::OpenPorts, Self::Vulnerabilities, Self::Services, Self::Errors];

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenPorts => "open ports",
            Self::Vulnerabilities => "vulnerabilities",
            Self::Services => "services",
            Self::Errors => "errors",
        }
    }

    /// File-name friendly form, used for `filter_<slug>.txt`.
    pub fn slug(self) -> &'static str {
        match self {
            Self::OpenPorts => "open_ports",
            Self::Vulnerabilities => "vulnerabilities",
            Self::Services => "services",
            Self::Errors => "errors",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::OpenPorts => 0,
            Self::Vulnerabilities => 1,
            Self::Services => 2,
            Self::Errors => 3,
        }
    }

    pub fn matches(self, line: &str) -> bool {
        PATTERNS[self.index()]
            .as_ref()
            .is_some_and(|re| re.is_match(line))
    }

    pub fn count(self, document: &Document) -> usize {
        document.lines.iter().filter(|line| self.matches(line)).count()
    }

    pub fn filter(self, document: &Document) -> Document {
        let lines = document
            .lines
            .iter()
            .filter(|line| self.matches(line))
            .cloned()
            .collect();
        Document::new(&format!("{} [{}]", document.title, self.name()), lines)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "open_ports" | "ports" | "open" => Ok(Self::OpenPorts),
            "vulnerabilities" | "vulns" | "vuln" => Ok(Self::Vulnerabilities),
            "services" | "service" => Ok(Self::Services),
            "errors" | "error" => Ok(Self::Errors),
            _ => Err(ReconError::InvalidSelection(s.to_string())),
        }
    }
}

/// Lines containing `term`, compared case-insensitively.
pub fn search(document: &Document, term: &str) -> Document {
    let needle = term.trim().to_lowercase();
    let lines = document
        .lines
        .iter()
        .filter(|line| !needle.is_empty() && line.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    Document::new(&format!("{} [search: {}]", document.title, term.trim()), lines)
}

/// Category counts of one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub open_ports: usize,
    pub vulnerabilities: usize,
    pub services: usize,
    pub errors: usize,
}

impl ReportStats {
    pub fn of(document: &Document) -> Self {
        Self {
            open_ports: Category::OpenPorts.count(document),
            vulnerabilities: Category::Vulnerabilities.count(document),
            services: Category::Services.count(document),
            errors: Category::Errors.count(document),
        }
    }

    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::OpenPorts => self.open_ports,
            Category::Vulnerabilities => self.vulnerabilities,
            Category::Services => self.services,
            Category::Errors => self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN: &str = "\
PORT     STATE    SERVICE  VERSION
22/tcp   open     ssh      OpenSSH 8.9p1 Ubuntu
80/tcp   open     http
443/tcp  closed   https
3306/tcp filtered mysql
Service Info: OS: Linux; CPE: cpe:/o:linux:linux_kernel
| ssl-heartbleed:
|   VULNERABLE:
|   State: VULNERABLE
|     References: https://cve.mitre.org/cgi-bin/cvename.cgi?name=CVE-2014-0160
traceroute: connect: Network is unreachable
";

    fn doc() -> Document {
        Document::from_text("scan", SCAN)
    }

    #[test]
    fn counts_per_category() {
        let stats = ReportStats::of(&doc());
        assert_eq!(stats.open_ports, 2);
        assert_eq!(stats.services, 2);
        assert_eq!(stats.vulnerabilities, 3);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn filtered_view_has_exactly_the_counted_lines() {
        let doc = doc();
        for category in Category::ALL {
            assert_eq!(category.filter(&doc).len(), category.count(&doc), "{category}");
        }
    }

    #[test]
    fn search_is_case_insensitive() {
        let hits = search(&doc(), "OPENSSH");
        assert_eq!(hits.lines, vec!["22/tcp   open     ssh      OpenSSH 8.9p1 Ubuntu"]);
        assert!(search(&doc(), "   ").is_empty());
    }

    #[test]
    fn category_names_parse() {
        assert_eq!("open-ports".parse::<Category>().unwrap(), Category::OpenPorts);
        assert_eq!("Vulns".parse::<Category>().unwrap(), Category::Vulnerabilities);
        assert!("stuff".parse::<Category>().is_err());
    }
}

//! # Analysis Phases
//!
//! The six phases of host analysis, the ways an operator can select them and
//! the per-phase result the pipeline produces.
//!
//! A phase that was not selected is [`PhaseStatus::Skipped`] and contributes
//! nothing to a report. A phase that ran out of time is
//! [`PhaseStatus::TimedOut`] and still gets a section with whatever output it
//! produced. The two states are never merged.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ReconError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseId {
    Connectivity = 1,
    Fingerprint = 2,
    PortScan = 3,
    ServiceEnumeration = 4,
    Vulnerability = 5,
    PathAnalysis = 6,
}

impl PhaseId {
    pub const ALL: [PhaseId; 6] = [
        PhaseId::Connectivity,
        PhaseId::Fingerprint,
        PhaseId::PortScan,
        PhaseId::ServiceEnumeration,
        PhaseId::Vulnerability,
        PhaseId::PathAnalysis,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.number() == n)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Connectivity => "Connectivity probe",
            Self::Fingerprint => "OS/service fingerprint",
            Self::PortScan => "Port scan",
            Self::ServiceEnumeration => "Service enumeration",
            Self::Vulnerability => "Vulnerability assessment",
            Self::PathAnalysis => "Network path analysis",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    All,
    Fast,
    SecurityFocus,
}

impl Preset {
    pub fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Fast => "fast",
            Self::SecurityFocus => "security-focus",
        }
    }

    pub fn phases(self) -> BTreeSet<PhaseId> {
        use PhaseId::*;
        match self {
            Self::All => PhaseId::ALL.into_iter().collect(),
            Self::Fast => [Connectivity, Fingerprint, PortScan].into_iter().collect(),
            Self::SecurityFocus => [Connectivity, PortScan, Vulnerability].into_iter().collect(),
        }
    }
}

impl FromStr for Preset {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "full" => Ok(Self::All),
            "fast" | "quick" => Ok(Self::Fast),
            "security-focus" | "security" | "sec" => Ok(Self::SecurityFocus),
            other => Err(ReconError::InvalidSelection(other.to_string())),
        }
    }
}

/// The phases an operator asked for, plus a label describing the depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSelection {
    phases: BTreeSet<PhaseId>,
    depth: String,
}

impl PhaseSelection {
    pub fn preset(preset: Preset) -> Self {
        Self {
            phases: preset.phases(),
            depth: preset.name().to_string(),
        }
    }

    pub fn custom(phases: impl IntoIterator<Item = PhaseId>) -> Result<Self, ReconError> {
        let phases: BTreeSet<PhaseId> = phases.into_iter().collect();
        if phases.is_empty() {
            return Err(ReconError::InvalidSelection(String::new()));
        }
        Ok(Self {
            phases,
            depth: "custom".to_string(),
        })
    }

    pub fn contains(&self, phase: PhaseId) -> bool {
        self.phases.contains(&phase)
    }

    /// Selected phases in ascending id order.
    pub fn phases(&self) -> impl Iterator<Item = PhaseId> + '_ {
        self.phases.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// `fast (phases 1,2,3)`
    pub fn describe(&self) -> String {
        let ids: Vec<String> = self.phases.iter().map(|p| p.to_string()).collect();
        format!("{} (phases {})", self.depth, ids.join(","))
    }
}

impl FromStr for PhaseSelection {
    type Err = ReconError;

    /// Accepts a preset name, or ids and ranges such as `1,3,5` or `1-3 6`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(preset) = s.parse::<Preset>() {
            return Ok(Self::preset(preset));
        }

        let invalid = || ReconError::InvalidSelection(s.to_string());
        let mut phases: Vec<PhaseId> = Vec::new();

        for token in s.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
            match token.split_once('-') {
                Some((start, end)) => {
                    let start: u8 = start.trim().parse().map_err(|_| invalid())?;
                    let end: u8 = end.trim().parse().map_err(|_| invalid())?;
                    if start > end {
                        return Err(invalid());
                    }
                    for n in start..=end {
                        phases.push(PhaseId::from_number(n).ok_or_else(invalid)?);
                    }
                }
                None => {
                    let n: u8 = token.parse().map_err(|_| invalid())?;
                    phases.push(PhaseId::from_number(n).ok_or_else(invalid)?);
                }
            }
        }

        Self::custom(phases).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Skipped,
    Done,
    TimedOut,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skipped => "skipped",
            Self::Done => "done",
            Self::TimedOut => "timed out",
        })
    }
}

#[derive(Debug, Clone)]
pub struct PhaseResult {
    pub phase: PhaseId,
    pub status: PhaseStatus,
    pub elapsed: Duration,
    pub output: String,
    pub budget: Duration,
    /// `None` when the process was killed or never started.
    pub exit_code: Option<i32>,
}

impl PhaseResult {
    pub fn skipped(phase: PhaseId, budget: Duration) -> Self {
        Self {
            phase,
            status: PhaseStatus::Skipped,
            elapsed: Duration::ZERO,
            output: String::new(),
            budget,
            exit_code: None,
        }
    }

    pub fn was_executed(&self) -> bool {
        self.status != PhaseStatus::Skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(selection: &PhaseSelection) -> Vec<u8> {
        selection.phases().map(PhaseId::number).collect()
    }

    #[test]
    fn presets_select_documented_phases() {
        assert_eq!(ids(&"all".parse().unwrap()), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(ids(&"fast".parse().unwrap()), vec![1, 2, 3]);
        assert_eq!(ids(&"security-focus".parse().unwrap()), vec![1, 3, 5]);
    }

    #[test]
    fn explicit_selection_is_sorted_and_deduplicated() {
        let selection: PhaseSelection = "5, 1 3,1".parse().unwrap();
        assert_eq!(ids(&selection), vec![1, 3, 5]);
        assert_eq!(selection.describe(), "custom (phases 1,3,5)");
    }

    #[test]
    fn ranges_expand() {
        let selection: PhaseSelection = "2-4,6".parse().unwrap();
        assert_eq!(ids(&selection), vec![2, 3, 4, 6]);
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        assert!("0".parse::<PhaseSelection>().is_err());
        assert!("7".parse::<PhaseSelection>().is_err());
        assert!("4-2".parse::<PhaseSelection>().is_err());
        assert!("".parse::<PhaseSelection>().is_err());
        assert!("fastest".parse::<PhaseSelection>().is_err());
    }

    #[test]
    fn skipped_result_is_not_executed() {
        let result = PhaseResult::skipped(PhaseId::Vulnerability, Duration::from_secs(1));
        assert!(!result.was_executed());
        assert_eq!(result.status.to_string(), "skipped");
    }
}

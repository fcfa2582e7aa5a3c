use chrono::{DateTime, Local};

use sweepr_common::scan::phase::{PhaseResult, PhaseStatus};
use sweepr_common::scan::privilege::Privilege;
use sweepr_common::utils::time::{clock, human_stamp};

const RULE_WIDTH: usize = 64;
pub const TIMEOUT_PLACEHOLDER: &str = "(no output captured before timeout)";

/// Aggregated result of one pipeline run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub target: String,
    pub started: DateTime<Local>,
    pub scanning_host: String,
    pub privilege: Privilege,
    /// Human description of the selection, e.g. `fast (phases 1,2,3)`.
    pub depth: String,
    /// One entry per phase in id order, skipped ones included.
    pub results: Vec<PhaseResult>,
}

impl AnalysisReport {
    pub fn executed(&self) -> impl Iterator<Item = &PhaseResult> {
        self.results.iter().filter(|result| result.was_executed())
    }

    pub fn timed_out(&self) -> usize {
        self.executed()
            .filter(|result| result.status == PhaseStatus::TimedOut)
            .count()
    }

    /// Plain-text report: a section per executed phase, then the summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for result in self.executed() {
            render_section(&mut out, result);
        }
        self.render_summary(&mut out);
        out
    }

    fn render_summary(&self, out: &mut String) {
        let phases: Vec<String> = self.executed().map(|r| r.phase.to_string()).collect();
        out.push_str(&"=".repeat(RULE_WIDTH));
        out.push_str("\nSUMMARY\n");
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');
        out.push_str(&format!("Target:        {}\n", self.target));
        out.push_str(&format!("Timestamp:     {}\n", human_stamp(&self.started)));
        out.push_str(&format!("Scanning host: {}\n", self.scanning_host));
        out.push_str(&format!("Privilege:     {}\n", self.privilege));
        out.push_str(&format!("Depth:         {}\n", self.depth));
        out.push_str(&format!(
            "Phases run:    {} ({} timed out)\n",
            phases.join(","),
            self.timed_out()
        ));
    }
}

fn render_section(out: &mut String, result: &PhaseResult) {
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push_str(&format!("\nPHASE {}: {}\n", result.phase, result.phase.title().to_uppercase()));

    let exit = result
        .exit_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| String::from("-"));
    out.push_str(&format!(
        "Status: {} | Elapsed: {} | Budget: {} | Exit: {exit}\n",
        result.status,
        clock(result.elapsed),
        clock(result.budget)
    ));
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    let body = result.output.trim_end();
    if body.is_empty() {
        match result.status {
            PhaseStatus::TimedOut => out.push_str(TIMEOUT_PLACEHOLDER),
            _ => out.push_str("(no output)"),
        }
    } else {
        out.push_str(body);
    }
    out.push_str("\n\n");
}

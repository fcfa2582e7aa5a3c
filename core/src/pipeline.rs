//! # Phased Host-Analysis Pipeline
//!
//! Runs the selected analysis phases against one target, strictly in
//! ascending phase order and one at a time. Every phase goes through the
//! [`Supervisor`] with its own budget. A phase that times out keeps its
//! partial output and the pipeline moves on, so no single phase can fail
//! the whole analysis.
//!
//! Which commands a phase runs is decided by a [`PhasePlan`]; the default
//! [`NmapPlan`] picks them from the session's [`Privilege`].

use std::time::Duration;

use chrono::Local;
use tracing::warn;

use sweepr_common::error::ReconError;
use sweepr_common::scan::phase::{PhaseId, PhaseResult, PhaseSelection, PhaseStatus};
use sweepr_common::scan::privilege::Privilege;
use sweepr_common::utils::time::{clock, scale_duration};
use sweepr_common::{status, success};

use crate::session::Session;
use crate::supervisor::{CommandSpec, Supervisor, UnitOutcome, UnitStatus};
use crate::system;

pub mod plan;
pub mod report;

pub use plan::NmapPlan;
pub use report::AnalysisReport;

/// What a phase needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseCommands {
    Single(CommandSpec),
    /// Two units started together and awaited as one phase.
    Pair(CommandSpec, CommandSpec),
    /// Nothing can run; the message goes into the report instead.
    Unavailable(String),
}

/// Inputs a plan may consult when building a phase's commands.
pub struct PhaseContext<'a> {
    pub target: &'a str,
    pub privilege: Privilege,
    pub no_dns: bool,
    /// Results of the phases that already ran (or were skipped).
    pub previous: &'a [PhaseResult],
}

pub trait PhasePlan: Send + Sync {
    fn commands(&self, phase: PhaseId, ctx: &PhaseContext<'_>) -> PhaseCommands;
}

/// Per-phase time budgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseBudget {
    budgets: [Duration; 6],
}

impl Default for PhaseBudget {
    fn default() -> Self {
        Self {
            budgets: [30, 180, 300, 300, 600, 120].map(Duration::from_secs),
        }
    }
}

impl PhaseBudget {
    /// Default budgets multiplied by `scale`. Scales that are non-positive or
    /// too large to represent leave a budget at its default.
    pub fn scaled(scale: f64) -> Self {
        Self {
            budgets: Self::default().budgets.map(|budget| scale_duration(budget, scale)),
        }
    }

    pub fn uniform(budget: Duration) -> Self {
        Self { budgets: [budget; 6] }
    }

    pub fn with(mut self, phase: PhaseId, budget: Duration) -> Self {
        self.budgets[index(phase)] = budget;
        self
    }

    pub fn of(&self, phase: PhaseId) -> Duration {
        self.budgets[index(phase)]
    }
}

fn index(phase: PhaseId) -> usize {
    usize::from(phase.number()) - 1
}

pub struct Pipeline {
    supervisor: Supervisor,
    plan: Box<dyn PhasePlan>,
    privilege: Privilege,
    budgets: PhaseBudget,
    no_dns: bool,
    scanning_host: String,
}

impl Pipeline {
    /// Pipeline for a live session, using the nmap plan and the session's
    /// privilege and timeout scale.
    pub fn for_session(session: &Session) -> Self {
        Self {
            supervisor: session.supervisor().clone(),
            plan: Box::new(NmapPlan::detect()),
            privilege: session.privilege(),
            budgets: PhaseBudget::scaled(session.config().timeout_scale),
            no_dns: session.config().no_dns,
            scanning_host: system::scanning_host(),
        }
    }

    pub fn new(supervisor: Supervisor, plan: Box<dyn PhasePlan>, privilege: Privilege) -> Self {
        Self {
            supervisor,
            plan,
            privilege,
            budgets: PhaseBudget::default(),
            no_dns: false,
            scanning_host: system::scanning_host(),
        }
    }

    pub fn with_budgets(mut self, budgets: PhaseBudget) -> Self {
        self.budgets = budgets;
        self
    }

    pub async fn run(&self, target: &str, selection: &PhaseSelection) -> Result<AnalysisReport, ReconError> {
        let target = validate_target(target)?;
        let started = Local::now();
        status!("Analyzing {target} at depth {}", selection.describe());

        let mut results: Vec<PhaseResult> = Vec::with_capacity(PhaseId::ALL.len());
        for phase in PhaseId::ALL {
            let budget = self.budgets.of(phase);
            if !selection.contains(phase) {
                results.push(PhaseResult::skipped(phase, budget));
                continue;
            }

            let commands = self.plan.commands(
                phase,
                &PhaseContext {
                    target: &target,
                    privilege: self.privilege,
                    no_dns: self.no_dns,
                    previous: &results,
                },
            );
            let result = self.execute(phase, commands, budget).await;
            match result.status {
                PhaseStatus::TimedOut => warn!(
                    "Phase {phase} ({}) timed out after {}",
                    phase.title(),
                    clock(result.elapsed)
                ),
                _ => success!("Phase {phase} ({}) finished in {}", phase.title(), clock(result.elapsed)),
            }
            results.push(result);
        }

        Ok(AnalysisReport {
            target,
            started,
            scanning_host: self.scanning_host.clone(),
            privilege: self.privilege,
            depth: selection.describe(),
            results,
        })
    }

    async fn execute(&self, phase: PhaseId, commands: PhaseCommands, budget: Duration) -> PhaseResult {
        let label = format!("Phase {phase}: {}", phase.title());
        match commands {
            PhaseCommands::Single(spec) => {
                let outcome = self.supervisor.run(&spec.labeled(&label), budget).await;
                single_result(phase, outcome)
            }
            PhaseCommands::Pair(first, second) => {
                let (a, b) = self.supervisor.run_pair(&label, &first, &second, budget).await;
                paired_result(phase, a, b)
            }
            PhaseCommands::Unavailable(reason) => {
                warn!("Phase {phase} cannot run: {reason}");
                PhaseResult {
                    phase,
                    status: PhaseStatus::Done,
                    elapsed: Duration::ZERO,
                    output: reason,
                    budget,
                    exit_code: None,
                }
            }
        }
    }
}

fn single_result(phase: PhaseId, outcome: UnitOutcome) -> PhaseResult {
    PhaseResult {
        phase,
        status: phase_status(&outcome),
        elapsed: outcome.elapsed,
        exit_code: outcome.exit_code(),
        budget: outcome.budget,
        output: outcome.output,
    }
}

fn paired_result(phase: PhaseId, a: UnitOutcome, b: UnitOutcome) -> PhaseResult {
    let status = if a.timed_out() || b.timed_out() {
        PhaseStatus::TimedOut
    } else {
        PhaseStatus::Done
    };
    let exit_code = match (a.exit_code(), b.exit_code()) {
        (Some(0), other) | (other, Some(0)) => other,
        (first, _) => first,
    };
    PhaseResult {
        phase,
        status,
        elapsed: a.elapsed.max(b.elapsed),
        exit_code,
        budget: a.budget,
        output: format!(
            "[{}]\n{}\n[{}]\n{}",
            a.label,
            a.output.trim_end(),
            b.label,
            b.output.trim_end()
        ),
    }
}

fn phase_status(outcome: &UnitOutcome) -> PhaseStatus {
    match outcome.status {
        UnitStatus::TimedOut => PhaseStatus::TimedOut,
        UnitStatus::Exited(_) | UnitStatus::SpawnFailed => PhaseStatus::Done,
    }
}

/// Hostnames and addresses only; anything else would end up on a command line.
pub fn validate_target(target: &str) -> Result<String, ReconError> {
    let target = target.trim();
    let valid = !target.is_empty()
        && !target.starts_with('-')
        && target
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'));
    if valid {
        Ok(target.to_string())
    } else {
        Err(ReconError::InvalidTarget(target.to_string()))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use sweepr_common::scan::phase::Preset;

    /// Each phase echoes its own number; phase 2 hangs.
    struct ScriptedPlan;

    impl PhasePlan for ScriptedPlan {
        fn commands(&self, phase: PhaseId, ctx: &PhaseContext<'_>) -> PhaseCommands {
            match phase {
                PhaseId::Fingerprint => PhaseCommands::Single(CommandSpec::shell("echo fingerprint started; sleep 5")),
                PhaseId::PathAnalysis => PhaseCommands::Pair(
                    CommandSpec::shell(&format!("echo trace {}", ctx.target)),
                    CommandSpec::shell(&format!("echo lookup {}", ctx.target)),
                ),
                PhaseId::ServiceEnumeration => PhaseCommands::Single(CommandSpec::shell(&format!(
                    "echo previous {}",
                    ctx.previous.len()
                ))),
                other => PhaseCommands::Single(CommandSpec::shell(&format!("echo phase {other}"))),
            }
        }
    }

    fn pipeline() -> Pipeline {
        let supervisor = Supervisor::silent().with_poll_interval(Duration::from_millis(20));
        Pipeline::new(supervisor, Box::new(ScriptedPlan), Privilege::Unprivileged)
            .with_budgets(PhaseBudget::uniform(Duration::from_secs(5)).with(PhaseId::Fingerprint, Duration::from_millis(300)))
    }

    #[tokio::test]
    async fn fast_preset_with_timed_out_fingerprint() {
        let report = pipeline()
            .run("10.0.0.5", &PhaseSelection::preset(Preset::Fast))
            .await
            .unwrap();

        let executed: Vec<&PhaseResult> = report.executed().collect();
        assert_eq!(executed.len(), 3);
        assert_eq!(
            executed.iter().map(|r| r.phase.number()).collect::<Vec<u8>>(),
            vec![1, 2, 3]
        );
        assert_eq!(executed[1].status, PhaseStatus::TimedOut);
        assert!(executed[1].output.contains("fingerprint started"));
        assert_eq!(executed[2].status, PhaseStatus::Done);

        let text = report.render();
        assert!(text.contains("PHASE 2"));
        assert!(!text.contains("PHASE 4"));
        assert!(!text.contains("PHASE 6"));
        assert!(text.contains("timed out"));
        assert!(text.contains("SUMMARY"));
    }

    #[tokio::test]
    async fn plan_sees_earlier_results() {
        let selection: PhaseSelection = "4".parse().unwrap();
        let report = pipeline().run("10.0.0.5", &selection).await.unwrap();
        let enumeration = report.executed().next().unwrap();
        assert_eq!(enumeration.output.trim(), "previous 3");
    }

    #[tokio::test]
    async fn path_analysis_runs_a_pair() {
        let selection: PhaseSelection = "6".parse().unwrap();
        let report = pipeline().run("gateway.lan", &selection).await.unwrap();
        let path = report.executed().next().unwrap();
        assert_eq!(path.phase, PhaseId::PathAnalysis);
        assert!(path.output.contains("trace gateway.lan"));
        assert!(path.output.contains("lookup gateway.lan"));
    }

    #[tokio::test]
    async fn hostile_targets_are_rejected() {
        let result = pipeline()
            .run("10.0.0.5; reboot", &PhaseSelection::preset(Preset::Fast))
            .await;
        assert!(matches!(result, Err(ReconError::InvalidTarget(_))));
    }

    #[test]
    fn budgets_scale() {
        let budgets = PhaseBudget::scaled(0.5);
        assert_eq!(budgets.of(PhaseId::Connectivity), Duration::from_secs(15));
        assert_eq!(budgets.of(PhaseId::Vulnerability), Duration::from_secs(300));
        assert_eq!(PhaseBudget::scaled(-1.0), PhaseBudget::default());
        assert_eq!(PhaseBudget::scaled(1e20), PhaseBudget::default());
    }
}

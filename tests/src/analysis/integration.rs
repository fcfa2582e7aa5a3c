use std::time::{Duration, Instant};

use sweepr_common::scan::phase::{PhaseId, PhaseSelection, PhaseStatus, Preset};
use sweepr_common::scan::privilege::Privilege;
use sweepr_core::pipeline::{PhaseBudget, PhaseCommands, PhaseContext, PhasePlan, Pipeline};
use sweepr_core::report::{Category, ReportStats};
use sweepr_core::supervisor::{CommandSpec, Supervisor};

use crate::util::session_in;

const PORT_SCAN: &str = "printf 'PORT   STATE SERVICE\\n22/tcp open  ssh\\n80/tcp open  http\\n443/tcp closed https\\n'";
const VULN_SCAN: &str = "printf '80/tcp open  http\\n| http-vuln-cve2017-5638:\\n|   VULNERABLE:\\n|     State: VULNERABLE\\n'";

/// Stands in for nmap with canned output; fingerprinting never finishes.
struct CannedPlan;

impl PhasePlan for CannedPlan {
    fn commands(&self, phase: PhaseId, ctx: &PhaseContext<'_>) -> PhaseCommands {
        let script = match phase {
            PhaseId::Connectivity => format!("echo 'Host {} is up (0.0012s latency).'", ctx.target),
            PhaseId::Fingerprint => String::from("echo 'Starting OS detection'; sleep 30"),
            PhaseId::PortScan => PORT_SCAN.to_string(),
            PhaseId::Vulnerability => VULN_SCAN.to_string(),
            PhaseId::ServiceEnumeration => return PhaseCommands::Unavailable(String::from("no scripts")),
            PhaseId::PathAnalysis => {
                return PhaseCommands::Pair(
                    CommandSpec::shell("echo ' 1  0.40 ms  gateway'").labeled("traceroute"),
                    CommandSpec::shell("echo 'name = host.lan.'").labeled("lookup"),
                );
            }
        };
        PhaseCommands::Single(CommandSpec::shell(&script))
    }
}

fn pipeline(fingerprint_budget: Duration) -> Pipeline {
    let supervisor = Supervisor::silent().with_poll_interval(Duration::from_millis(20));
    Pipeline::new(supervisor, Box::new(CannedPlan), Privilege::Unprivileged).with_budgets(
        PhaseBudget::uniform(Duration::from_secs(10)).with(PhaseId::Fingerprint, fingerprint_budget),
    )
}

#[tokio::test]
async fn overrunning_phase_is_cut_at_its_budget() {
    let budget = Duration::from_millis(500);
    let started = Instant::now();
    let report = pipeline(budget)
        .run("10.0.0.5", &PhaseSelection::preset(Preset::Fast))
        .await
        .unwrap();

    assert!(started.elapsed() < budget + Duration::from_secs(5));
    let fingerprint = report.executed().nth(1).unwrap();
    assert_eq!(fingerprint.status, PhaseStatus::TimedOut);
    assert!(fingerprint.output.contains("Starting OS detection"));
    assert_eq!(report.timed_out(), 1);
}

#[tokio::test]
async fn saved_analysis_reloads_with_category_counts() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_in(dir.path());

    let selection: PhaseSelection = "1,3,5".parse().unwrap();
    let report = pipeline(Duration::from_millis(500))
        .run("10.0.0.5", &selection)
        .await
        .unwrap();
    let store = session.reports();
    let saved = store.save("analysis", &report.target, &report.render()).unwrap();

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].target, "10.0.0.5");

    let loaded = store.load(&saved.info.name).unwrap();
    let stats: ReportStats = loaded.stats();
    assert_eq!(stats.open_ports, 3);
    assert!(stats.vulnerabilities >= 2);

    let document = loaded.document();
    for category in Category::ALL {
        let view = category.filter(&document);
        assert_eq!(view.len(), stats.get(category), "{category}");
    }
}

#[tokio::test]
async fn every_phase_gets_a_section() {
    let report = pipeline(Duration::from_millis(300))
        .run("10.0.0.5", &PhaseSelection::preset(Preset::All))
        .await
        .unwrap();
    let text = report.render();

    for phase in PhaseId::ALL {
        assert!(text.contains(&format!("PHASE {phase}:")), "phase {phase} missing");
    }
    assert!(text.contains("no scripts"));
    assert!(text.contains("[traceroute]"));
    assert!(text.contains("[lookup]"));
}

mod commands;
mod terminal;

use std::sync::Arc;

use tracing::warn;

use commands::{CommandLine, Commands, analyze, discover, menu, reports, sweep};
use sweepr_common::config::{Config, ElevationPolicy};
use sweepr_common::scan::privilege::Privilege;
use sweepr_common::success;
use sweepr_core::session::Session;
use sweepr_core::supervisor::Supervisor;
use sweepr_core::system;
use terminal::spinner::SpinnerProgress;
use terminal::{logging, print, prompt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    let cfg = commands.config();

    logging::init_logging(cfg.quiet);
    print::banner(cfg.quiet);

    let privilege = if commands.needs_scanner() {
        system::require_tools()?;
        decide_privilege(&cfg).await?
    } else {
        Privilege::Unprivileged
    };

    let supervisor = Supervisor::new(Arc::new(SpinnerProgress::new()));
    let session = Session::open(cfg, privilege, supervisor);

    match commands.command.unwrap_or(Commands::Menu) {
        Commands::Menu => menu::run(&session).await,
        Commands::Discover { sources } => {
            print::header("subnet discovery", session.config().quiet);
            discover::discover(&session, sources).await
        }
        Commands::Sweep { target, detailed } => {
            print::header("host sweep", session.config().quiet);
            sweep::sweep(&session, &target, detailed).await
        }
        Commands::Analyze { target, phases, save } => {
            print::header("host analysis", session.config().quiet);
            analyze::analyze(&session, &target, &phases, save).await
        }
        Commands::Reports { action } => reports::run(&session, action),
    }
}

/// Settles the privilege level once for the whole session.
async fn decide_privilege(cfg: &Config) -> anyhow::Result<Privilege> {
    let detected = system::detect_privilege();
    if detected.is_privileged() {
        return Ok(detected);
    }

    let wanted = match cfg.elevate {
        ElevationPolicy::Never => false,
        ElevationPolicy::Always => true,
        ElevationPolicy::Ask => {
            warn!("not running as root: OS fingerprinting and SYN scans are unavailable");
            prompt::confirm("Elevate with sudo for this session?", false)?
        }
    };

    if wanted && system::prime_sudo().await {
        success!("elevated through sudo");
        return Ok(Privilege::Elevated);
    }
    if wanted {
        warn!("elevation failed; phases will run in degraded mode");
    }
    Ok(Privilege::Unprivileged)
}

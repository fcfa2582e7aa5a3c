pub mod analyze;
pub mod discover;
pub mod menu;
pub mod reports;
pub mod sweep;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use sweepr_common::config::{Config, DEFAULT_PAGE_SIZE, DEFAULT_RETENTION_DAYS, ElevationPolicy, MAX_TIMEOUT_SCALE};

#[derive(Parser)]
#[command(name = "sweepr")]
#[command(about = "Network reconnaissance orchestrator: subnet discovery, phased host analysis and report browsing.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Never resolve hostnames during sweeps and scans
    #[arg(short = 'n', long, global = true)]
    pub no_dns: bool,

    /// Less output; repeat for even less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Lines per page in the report viewer
    #[arg(long, global = true, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Working directory for the registry, reports and scratch files
    #[arg(long, global = true, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Multiplier applied to every phase budget
    #[arg(long, global = true, default_value_t = 1.0, value_parser = parse_scale)]
    pub timeout_scale: f64,

    /// Elevation when not running as root: ask, always or never
    #[arg(long, global = true, default_value = "ask")]
    pub elevate: ElevationPolicy,

    /// Age in days after which `reports purge` removes reports
    #[arg(long, global = true, default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive menu (the default)
    #[command(alias = "m")]
    Menu,
    /// List candidate subnets, one CIDR per line on stdout
    #[command(alias = "d")]
    Discover {
        /// Print `cidr|source` instead of the bare CIDR
        #[arg(long)]
        sources: bool,
    },
    /// Find live hosts in a subnet and rebuild the host registry
    #[command(alias = "s")]
    Sweep {
        /// CIDR or single address
        target: String,
        /// Fast port scan (and OS detection when privileged) instead of a ping sweep
        #[arg(long)]
        detailed: bool,
    },
    /// Run analysis phases against one host
    #[command(alias = "a")]
    Analyze {
        /// Address, hostname, or the registry number of a swept host
        target: String,
        /// Phase list or preset: `all`, `fast`, `security-focus`, `1,3,5`, `1-3`
        #[arg(short, long, default_value = "fast")]
        phases: String,
        /// Store the report in the working directory
        #[arg(long)]
        save: bool,
    },
    /// Browse stored reports
    #[command(alias = "r")]
    Reports {
        #[command(subcommand)]
        action: ReportAction,
    },
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// Stored reports, newest first
    #[command(alias = "ls")]
    List,
    /// Open a report by name or list number
    View { report: String },
    /// Remove reports older than the retention period
    Purge,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        Config {
            no_dns: self.no_dns,
            quiet: self.quiet,
            page_size: self.page_size.max(1),
            retention_days: self.retention_days,
            work_dir: self.work_dir.clone(),
            timeout_scale: self.timeout_scale,
            elevate: self.elevate,
        }
    }

    /// Whether the chosen command drives the external scanner.
    pub fn needs_scanner(&self) -> bool {
        !matches!(self.command, Some(Commands::Reports { .. }))
    }
}

fn parse_scale(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(scale) if scale.is_finite() && scale > 0.0 && scale <= MAX_TIMEOUT_SCALE => Ok(scale),
        Ok(scale) if scale > MAX_TIMEOUT_SCALE => Err(format!("'{s}' exceeds the maximum of {MAX_TIMEOUT_SCALE}")),
        _ => Err(format!("'{s}' is not a positive number")),
    }
}

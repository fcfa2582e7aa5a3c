use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_RETENTION_DAYS: u64 = 7;
/// Upper bound accepted for `--timeout-scale`.
pub const MAX_TIMEOUT_SCALE: f64 = 100.0;

/// How the session reacts when it is not running as root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElevationPolicy {
    /// Offer elevation to the operator once at startup.
    #[default]
    Ask,
    /// Prime `sudo` without asking.
    Always,
    /// Stay unprivileged; phases degrade.
    Never,
}

impl FromStr for ElevationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ask" => Ok(Self::Ask),
            "always" | "yes" => Ok(Self::Always),
            "never" | "no" => Ok(Self::Never),
            other => Err(format!("unknown elevation policy '{other}' (ask, always, never)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Passes `-n` to every nmap sweep so no reverse DNS traffic is generated.
    ///
    /// Phase 6 still performs its explicit reverse lookup.
    pub no_dns: bool,
    pub quiet: u8,
    /// Lines per page in the report viewer.
    pub page_size: usize,
    /// Reports older than this are removed by the purge operation.
    pub retention_days: u64,
    /// Overrides the scoped working directory.
    pub work_dir: Option<PathBuf>,
    /// Multiplier applied to every phase timeout band.
    pub timeout_scale: f64,
    pub elevate: ElevationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            no_dns: false,
            quiet: 0,
            page_size: DEFAULT_PAGE_SIZE,
            retention_days: DEFAULT_RETENTION_DAYS,
            work_dir: None,
            timeout_scale: 1.0,
            elevate: ElevationPolicy::Ask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_policy_parses_aliases() {
        assert_eq!("ASK".parse::<ElevationPolicy>(), Ok(ElevationPolicy::Ask));
        assert_eq!("yes".parse::<ElevationPolicy>(), Ok(ElevationPolicy::Always));
        assert_eq!("never".parse::<ElevationPolicy>(), Ok(ElevationPolicy::Never));
        assert!("sometimes".parse::<ElevationPolicy>().is_err());
    }

    #[test]
    fn default_config_uses_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.page_size, 20);
        assert_eq!(cfg.retention_days, 7);
        assert!(cfg.work_dir.is_none());
        assert_eq!(cfg.timeout_scale, 1.0);
    }
}

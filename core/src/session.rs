//! # Session Context
//!
//! A [`Session`] is built once at startup and handed to every component. It
//! owns the scoped working directory, the privilege level and the supervisor,
//! so nothing in the crate reaches for global paths.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use sweepr_common::config::Config;
use sweepr_common::error::ReconError;
use sweepr_common::network::subnet::Subnet;
use sweepr_common::scan::privilege::Privilege;

use crate::registry::HostRegistry;
use crate::report::ReportStore;
use crate::supervisor::Supervisor;

pub const REGISTRY_FILE: &str = "hosts.txt";
pub const SUBNETS_FILE: &str = "subnets.txt";

pub struct Session {
    config: Config,
    work_dir: PathBuf,
    privilege: Privilege,
    supervisor: Supervisor,
}

impl Session {
    pub fn open(config: Config, privilege: Privilege, supervisor: Supervisor) -> Self {
        let work_dir = resolve_work_dir(config.work_dir.as_deref());
        debug!("working directory: {}", work_dir.display());
        Self {
            config,
            work_dir,
            privilege,
            supervisor,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn registry(&self) -> HostRegistry {
        HostRegistry::new(self.work_dir.join(REGISTRY_FILE))
    }

    pub fn reports(&self) -> ReportStore {
        ReportStore::new(&self.work_dir)
    }

    /// Replaces the subnet scratch file with the latest discovery result.
    pub fn save_subnets(&self, subnets: &[Subnet]) -> anyhow::Result<()> {
        let body: String = subnets.iter().map(|s| s.to_line() + "\n").collect();
        write_atomic(&self.work_dir.join(SUBNETS_FILE), &body)
    }

    /// Subnets from the last discovery run, empty when there was none.
    pub fn load_subnets(&self) -> Vec<Subnet> {
        fs::read_to_string(self.work_dir.join(SUBNETS_FILE))
            .map(|body| body.lines().filter_map(|line| line.parse().ok()).collect())
            .unwrap_or_default()
    }
}

/// Picks the working directory, falling back to the current directory when the
/// requested (or default) location cannot be created or written.
pub fn resolve_work_dir(requested: Option<&Path>) -> PathBuf {
    let candidate: PathBuf = requested.map(Path::to_path_buf).unwrap_or_else(default_work_dir);
    match prepare(&candidate) {
        Ok(()) => candidate,
        Err(e) => {
            warn!("{e}; falling back to the current directory");
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

fn default_work_dir() -> PathBuf {
    let user: String = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "session".to_string());
    std::env::temp_dir().join(format!("sweepr-{user}"))
}

fn prepare(dir: &Path) -> Result<(), ReconError> {
    let fail = |reason: String| ReconError::WorkDir {
        path: dir.to_path_buf(),
        reason,
    };
    fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;

    let probe = dir.join(".sweepr-write-test");
    fs::write(&probe, b"ok").map_err(|e| fail(e.to_string()))?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

/// Writes `contents` to a temporary sibling and renames it over `path`, so
/// readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("atomic write target has no file name")?;
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

    let mut file = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path).with_context(|| format!("committing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepr_common::network::subnet::SubnetSource;

    #[test]
    fn requested_directory_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let wanted = tmp.path().join("nested").join("work");
        assert_eq!(resolve_work_dir(Some(&wanted)), wanted);
        assert!(wanted.is_dir());
    }

    #[test]
    fn unusable_directory_falls_back_to_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "not a dir").unwrap();

        let resolved = resolve_work_dir(Some(&blocker.join("work")));
        assert_eq!(resolved, std::env::current_dir().unwrap());
    }

    #[test]
    fn write_atomic_replaces_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scratch.txt");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        let leftovers = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn subnets_survive_a_save_load_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            work_dir: Some(tmp.path().to_path_buf()),
            ..Config::default()
        };
        let session = Session::open(config, Privilege::Unprivileged, Supervisor::silent());
        let subnets = vec![
            Subnet::new("10.0.0.0/24", SubnetSource::Interface),
            Subnet::new("172.17.0.0/16", SubnetSource::Virtualization),
        ];
        session.save_subnets(&subnets).unwrap();
        assert_eq!(session.load_subnets(), subnets);
    }
}

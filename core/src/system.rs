use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use is_root::is_root;
use tracing::{debug, warn};

use sweepr_common::error::ReconError;
use sweepr_common::scan::privilege::Privilege;

/// Tools the session refuses to start without.
pub const REQUIRED_TOOLS: &[&str] = &["nmap"];

/// Resolves `name` against `PATH` the way a shell would.
pub fn find_tool(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = Path::new(name);
        return is_executable(path).then(|| path.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

pub fn has_tool(name: &str) -> bool {
    find_tool(name).is_some()
}

/// First of `candidates` that is installed.
pub fn first_available<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|tool| has_tool(tool))
}

pub fn require_tools() -> Result<(), ReconError> {
    for tool in REQUIRED_TOOLS {
        if !has_tool(tool) {
            return Err(ReconError::MissingTool(tool.to_string()));
        }
    }
    Ok(())
}

pub fn detect_privilege() -> Privilege {
    if is_root() {
        Privilege::Root
    } else {
        Privilege::Unprivileged
    }
}

/// Runs `sudo -v` in the foreground so later `sudo -n` calls do not prompt.
///
/// Returns whether the operator authenticated successfully.
pub async fn prime_sudo() -> bool {
    if !has_tool("sudo") {
        warn!("sudo is not installed; continuing unprivileged");
        return false;
    }
    match tokio::process::Command::new("sudo")
        .arg("-v")
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
    {
        Ok(status) => status.success(),
        Err(e) => {
            debug!("sudo -v failed to run: {e}");
            false
        }
    }
}

/// Name of the machine running the scan, for report summaries.
pub fn scanning_host() -> String {
    sys_info::hostname().unwrap_or_else(|_| String::from("unknown"))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

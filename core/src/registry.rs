//! # Host Registry
//!
//! Ordered store of the hosts found by the last discovery run, kept as a flat
//! file of `ip|hostname|status|info` lines in the working directory. Ordinals
//! are 1-indexed and stay stable until the next [`HostRegistry::reset`].

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use sweepr_common::network::host::HostRecord;

use crate::session::write_atomic;

pub struct HostRegistry {
    path: PathBuf,
}

impl HostRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncates the registry. Called at the start of every discovery run.
    pub fn reset(&self) -> anyhow::Result<()> {
        write_atomic(&self.path, "")
    }

    pub fn append(&self, record: &HostRecord) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening registry {}", self.path.display()))?;
        writeln!(file, "{}", record.to_line())?;
        Ok(())
    }

    pub fn append_fields(&self, ip: IpAddr, hostname: &str, status: &str, info: &str) -> anyhow::Result<()> {
        let record = HostRecord::new(ip)
            .with_hostname(hostname)
            .with_status(status)
            .with_info(info);
        self.append(&record)
    }

    /// Every record in discovery order. A missing file is an empty registry.
    pub fn all(&self) -> anyhow::Result<Vec<HostRecord>> {
        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", self.path.display())),
        };

        let records = body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match line.parse::<HostRecord>() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("skipping malformed registry line '{line}': {e}");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    pub fn len(&self) -> anyhow::Result<usize> {
        Ok(self.all()?.len())
    }

    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// 1-indexed lookup.
    pub fn by_ordinal(&self, ordinal: usize) -> anyhow::Result<Option<HostRecord>> {
        if ordinal == 0 {
            return Ok(None);
        }
        Ok(self.all()?.into_iter().nth(ordinal - 1))
    }

    pub fn by_address(&self, ip: IpAddr) -> anyhow::Result<Option<HostRecord>> {
        Ok(self.all()?.into_iter().find(|record| record.ip == ip))
    }
}

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

pub const UNKNOWN_HOSTNAME: &str = "Unknown";
const FIELD_SEPARATOR: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error("'{0}' is not an IP address")]
    BadAddress(String),
}

/// One line of the host registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub ip: IpAddr,
    pub hostname: String,
    pub status: String,
    /// OS guess, open port count or vendor, whichever the scan produced.
    pub info: String,
}

impl HostRecord {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            hostname: UNKNOWN_HOSTNAME.to_string(),
            status: "up".to_string(),
            info: "-".to_string(),
        }
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        let hostname = sanitize(hostname);
        self.hostname = if hostname.is_empty() {
            UNKNOWN_HOSTNAME.to_string()
        } else {
            hostname
        };
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = sanitize(status);
        self
    }

    pub fn with_info(mut self, info: &str) -> Self {
        let info = sanitize(info);
        self.info = if info.is_empty() { "-".to_string() } else { info };
        self
    }

    pub fn has_hostname(&self) -> bool {
        self.hostname != UNKNOWN_HOSTNAME
    }

    /// `ip|hostname|status|info`
    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.ip,
            self.hostname,
            self.status,
            self.info,
            sep = FIELD_SEPARATOR
        )
    }
}

impl FromStr for HostRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(FIELD_SEPARATOR).collect();
        if fields.len() != 4 {
            return Err(RecordError::FieldCount(fields.len()));
        }
        let ip: IpAddr = fields[0]
            .trim()
            .parse()
            .map_err(|_| RecordError::BadAddress(fields[0].to_string()))?;

        Ok(HostRecord::new(ip)
            .with_hostname(fields[1])
            .with_status(fields[2])
            .with_info(fields[3]))
    }
}

impl fmt::Display for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ip, self.hostname)
    }
}

/// Field values must never break the line format.
fn sanitize(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            FIELD_SEPARATOR => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

use std::fmt;

/// Privilege level decided once per session and handed to every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Unprivileged,
    /// The process itself runs as root.
    Root,
    /// The operator agreed to elevation; privileged commands go through `sudo -n`.
    Elevated,
}

impl Privilege {
    /// Raw sockets and OS fingerprinting are available.
    pub fn is_privileged(self) -> bool {
        !matches!(self, Self::Unprivileged)
    }

    /// Commands that need privilege must be wrapped with `sudo`.
    pub fn needs_sudo(self) -> bool {
        matches!(self, Self::Elevated)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unprivileged => "unprivileged",
            Self::Root => "root",
            Self::Elevated => "elevated (sudo)",
        })
    }
}

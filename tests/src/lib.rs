//! Cross-crate scenarios. Everything runs against a scratch working
//! directory and scripted collaborators, so no scanner needs to be installed.

#[cfg(test)]
mod discovery {
    mod integration;
}

#[cfg(all(test, unix))]
mod analysis {
    mod integration;
}

#[cfg(test)]
mod reports {
    mod integration;
}

#[cfg(test)]
pub(crate) mod util {
    use std::path::Path;

    use sweepr_common::config::Config;
    use sweepr_common::scan::privilege::Privilege;
    use sweepr_core::session::Session;
    use sweepr_core::supervisor::Supervisor;

    /// Unprivileged session rooted in `dir`, with no progress rendering.
    pub fn session_in(dir: &Path) -> Session {
        let config = Config {
            work_dir: Some(dir.to_path_buf()),
            no_dns: true,
            ..Config::default()
        };
        Session::open(config, Privilege::Unprivileged, Supervisor::silent())
    }
}

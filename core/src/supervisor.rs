//! # Supervised Units of Work
//!
//! Every slow external operation runs through the [`Supervisor`]. A unit is a
//! child process whose liveness is polled at a short fixed interval, so the
//! caller can keep a progress indicator moving while it waits, and whose
//! lifetime is bounded by a budget. When the budget runs out the unit's whole
//! process group is killed and the output captured so far is returned.
//!
//! Two units can be supervised together ([`Supervisor::run_pair`]); they are
//! polled in the same loop and finish as one logical unit.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sweepr_common::scan::privilege::Privilege;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long reader tasks may keep draining pipes after the unit ended.
const READ_GRACE: Duration = Duration::from_millis(250);
/// Time between the polite and the forced termination signal.
const TERM_GRACE: Duration = Duration::from_millis(200);
const REAP_GRACE: Duration = Duration::from_millis(500);

/// An external command plus the label shown while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub label: String,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            label: program.to_string(),
        }
    }

    /// Runs `script` through `sh -c`.
    pub fn shell(script: &str) -> Self {
        Self::new("sh", ["-c", script]).labeled("shell")
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Prefixes the command with `sudo -n` when the session was elevated.
    ///
    /// `-n` never prompts: credentials were primed once at startup.
    pub fn elevate(self, privilege: Privilege) -> Self {
        if !privilege.needs_sudo() {
            return self;
        }
        let mut args: Vec<String> = vec!["-n".to_string(), self.program];
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            label: self.label,
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// The process ended on its own; `None` when it was killed by a signal.
    Exited(Option<i32>),
    /// The budget ran out and the process was terminated.
    TimedOut,
    SpawnFailed,
}

#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub label: String,
    pub status: UnitStatus,
    pub elapsed: Duration,
    pub budget: Duration,
    /// Combined stdout and stderr, partial when the unit timed out.
    pub output: String,
}

impl UnitOutcome {
    pub fn timed_out(&self) -> bool {
        self.status == UnitStatus::TimedOut
    }

    pub fn succeeded(&self) -> bool {
        self.status == UnitStatus::Exited(Some(0))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            UnitStatus::Exited(code) => code,
            _ => None,
        }
    }
}

/// Receives lifecycle notifications so a front end can render progress.
pub trait ProgressSink: Send + Sync {
    fn started(&self, label: &str, budget: Duration);
    fn tick(&self, label: &str, elapsed: Duration, budget: Duration);
    fn finished(&self, label: &str, elapsed: Duration, timed_out: bool);
}

/// Logs start and end at debug level and renders nothing.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn started(&self, label: &str, budget: Duration) {
        debug!("{label}: started (budget {}s)", budget.as_secs_f64());
    }

    fn tick(&self, _label: &str, _elapsed: Duration, _budget: Duration) {}

    fn finished(&self, label: &str, elapsed: Duration, timed_out: bool) {
        debug!("{label}: finished after {:.2}s (timed out: {timed_out})", elapsed.as_secs_f64());
    }
}

#[derive(Clone)]
pub struct Supervisor {
    poll_interval: Duration,
    progress: Arc<dyn ProgressSink>,
}

impl Supervisor {
    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            progress,
        }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(SilentProgress))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn progress(&self) -> Arc<dyn ProgressSink> {
        self.progress.clone()
    }

    /// Runs one command for at most `budget`.
    pub async fn run(&self, spec: &CommandSpec, budget: Duration) -> UnitOutcome {
        let [outcome] = self.supervise(&spec.label, [spec], budget).await;
        outcome
    }

    /// Starts both commands together and waits for both as one unit.
    pub async fn run_pair(
        &self,
        label: &str,
        first: &CommandSpec,
        second: &CommandSpec,
        budget: Duration,
    ) -> (UnitOutcome, UnitOutcome) {
        let [a, b] = self.supervise(label, [first, second], budget).await;
        (a, b)
    }

    async fn supervise<const N: usize>(
        &self,
        label: &str,
        specs: [&CommandSpec; N],
        budget: Duration,
    ) -> [UnitOutcome; N] {
        let started = Instant::now();
        let mut units: [Unit; N] = specs.map(Unit::spawn);
        self.progress.started(label, budget);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut timed_out = false;
        loop {
            ticker.tick().await;
            let elapsed = started.elapsed();

            for unit in units.iter_mut() {
                unit.poll(elapsed);
            }
            if units.iter().all(|unit| !unit.is_running()) {
                break;
            }
            if elapsed >= budget {
                timed_out = true;
                for unit in units.iter_mut().filter(|unit| unit.is_running()) {
                    unit.terminate(elapsed).await;
                }
                break;
            }

            self.progress.tick(label, elapsed, budget);
        }

        for unit in units.iter_mut() {
            unit.drain().await;
        }

        let elapsed = started.elapsed();
        self.progress.finished(label, elapsed, timed_out);
        if timed_out {
            warn!("{label} exceeded its {}s budget and was terminated", budget.as_secs());
        }

        units.map(|unit| unit.into_outcome(budget))
    }
}

struct Unit {
    label: String,
    child: Option<Child>,
    output: Arc<Mutex<Vec<u8>>>,
    readers: Vec<JoinHandle<()>>,
    status: Option<UnitStatus>,
    elapsed: Duration,
}

impl Unit {
    fn spawn(spec: &CommandSpec) -> Self {
        let output: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        match command.spawn() {
            Ok(mut child) => {
                let mut readers = Vec::with_capacity(2);
                if let Some(stdout) = child.stdout.take() {
                    readers.push(spawn_reader(stdout, output.clone()));
                }
                if let Some(stderr) = child.stderr.take() {
                    readers.push(spawn_reader(stderr, output.clone()));
                }
                debug!("spawned: {}", spec.command_line());
                Self {
                    label: spec.label.clone(),
                    child: Some(child),
                    output,
                    readers,
                    status: None,
                    elapsed: Duration::ZERO,
                }
            }
            Err(e) => {
                debug!("could not spawn {}: {e}", spec.program);
                if let Ok(mut buf) = output.lock() {
                    buf.extend_from_slice(format!("failed to start '{}': {e}\n", spec.program).as_bytes());
                }
                Self {
                    label: spec.label.clone(),
                    child: None,
                    output,
                    readers: Vec::new(),
                    status: Some(UnitStatus::SpawnFailed),
                    elapsed: Duration::ZERO,
                }
            }
        }
    }

    fn is_running(&self) -> bool {
        self.status.is_none()
    }

    fn poll(&mut self, elapsed: Duration) {
        if !self.is_running() {
            return;
        }
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(exit)) => {
                self.status = Some(UnitStatus::Exited(exit.code()));
                self.elapsed = elapsed;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("lost track of {}: {e}", self.label);
                self.status = Some(UnitStatus::Exited(None));
                self.elapsed = elapsed;
            }
        }
    }

    async fn terminate(&mut self, elapsed: Duration) {
        if let Some(child) = self.child.as_mut() {
            // SIGTERM first: sudo relays it to a root child we cannot signal directly.
            signal_group(child, Signal::Terminate);
            if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_err() {
                signal_group(child, Signal::Kill);
                let _ = child.start_kill();
                let _ = tokio::time::timeout(REAP_GRACE, child.wait()).await;
            }
        }
        self.status = Some(UnitStatus::TimedOut);
        self.elapsed = elapsed;
    }

    async fn drain(&mut self) {
        for reader in self.readers.drain(..) {
            let abort = reader.abort_handle();
            if tokio::time::timeout(READ_GRACE, reader).await.is_err() {
                // A grandchild still holds the pipe open.
                abort.abort();
            }
        }
    }

    fn into_outcome(self, budget: Duration) -> UnitOutcome {
        let output: String = match self.output.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        };
        UnitOutcome {
            label: self.label,
            status: self.status.unwrap_or(UnitStatus::TimedOut),
            elapsed: self.elapsed,
            budget,
            output,
        }
    }
}

fn spawn_reader<R>(mut source: R, sink: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match source.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut out) = sink.lock() {
                        out.extend_from_slice(&buf[..n]);
                    }
                }
            }
        }
    })
}

#[derive(Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: Signal) {
    let Some(pid) = child.id() else {
        return;
    };
    let signal = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: `killpg` only reads its two integer arguments. `pid` comes from
    // `Child::id`, which is `Some` only while the child has not been reaped,
    // so the id still names our child; it was spawned with `process_group(0)`
    // and therefore leads a group with the same id.
    unsafe {
        libc::killpg(pid as libc::pid_t, signal);
    }
}

#[cfg(not(unix))]
fn signal_group(child: &mut Child, signal: Signal) {
    if let Signal::Kill = signal {
        let _ = child.start_kill();
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

//! Opening commands in a terminal emulator on the host.

use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

use crate::config::TerminalConfig;
use crate::shell::quote;

/// Tried in order after the configured terminal.
pub const FALLBACK_TERMINALS: [&str; 3] = ["konsole", "gnome-terminal", "xterm"];

/// Called once with whether the terminal exited normally with status 0.
pub type OnFinished = Box<dyn FnOnce(bool) + Send + 'static>;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("no usable terminal emulator found (tried {0})")]
    NoTerminal(String),

    #[error("starting `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

pub trait Launcher {
    /// Start `command` in a terminal. Returns false, after calling `on_finished(false)`,
    /// when nothing could be started.
    fn launch(&self, command: &str, working_dir: &Path, on_finished: Option<OnFinished>) -> bool;

    /// Block until every terminal started so far has exited.
    fn wait(&self) {}
}

impl<T: Launcher + ?Sized> Launcher for &T {
    fn launch(&self, command: &str, working_dir: &Path, on_finished: Option<OnFinished>) -> bool {
        (**self).launch(command, working_dir, on_finished)
    }

    fn wait(&self) {
        (**self).wait()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerminalKind {
    Konsole,
    GnomeTerminal,
    Xterm,
    Other,
}

impl TerminalKind {
    fn of(program: &str) -> Self {
        let name = Path::new(program).file_name().and_then(|n| n.to_str()).unwrap_or(program);
        if name.starts_with("konsole") {
            Self::Konsole
        } else if name == "gnome-terminal" {
            Self::GnomeTerminal
        } else if name == "xterm" {
            Self::Xterm
        } else {
            Self::Other
        }
    }
}

/// Command line that opens `terminal` in `working_dir` running `command`.
pub fn build_command_line(terminal: &str, command: &str, working_dir: &Path, sandboxed: bool) -> Option<String> {
    let parts = shlex::split(terminal)?;
    let kind = TerminalKind::of(parts.first()?);
    let mut line = terminal.trim().to_string();
    // gnome-terminal returns at once unless told to wait for its window
    if kind == TerminalKind::GnomeTerminal && !parts.iter().any(|p| p == "--wait") {
        line.push_str(" --wait");
    }

    let dir = working_dir.to_string_lossy();
    if !dir.is_empty() {
        match kind {
            TerminalKind::Konsole => line.push_str(&format!(" --workdir {}", quote(&dir))),
            TerminalKind::GnomeTerminal => line.push_str(&format!(" --working-directory={}", quote(&dir))),
            TerminalKind::Xterm | TerminalKind::Other => {}
        }
    }

    if !command.is_empty() {
        match kind {
            // xterm closes as soon as the command ends
            TerminalKind::Xterm => line.push_str(" -hold -e "),
            TerminalKind::GnomeTerminal => line.push_str(" -- "),
            TerminalKind::Konsole | TerminalKind::Other => line.push_str(" -e "),
        }
        line.push_str(command);
    }

    Some(if sandboxed { format!("flatpak-spawn --host -- {line}") } else { line })
}

fn program_of(terminal: &str) -> Option<String> {
    shlex::split(terminal)?.into_iter().next()
}

/// Finds a terminal on the host and starts commands in it, one watcher thread per window.
#[derive(Debug)]
pub struct TerminalLauncher {
    candidates: Vec<String>,
    sandboxed: bool,
    probe_timeout: Duration,
    sessions: Mutex<Vec<JoinHandle<()>>>,
}

impl TerminalLauncher {
    pub fn new(config: &TerminalConfig, sandboxed: bool) -> Self {
        let configured = config
            .application
            .clone()
            .or_else(|| std::env::var("TERMINAL").ok())
            .filter(|t| !t.trim().is_empty());
        let candidates = configured
            .into_iter()
            .chain(FALLBACK_TERMINALS.iter().map(|t| t.to_string()))
            .collect();
        Self::with_candidates(candidates, sandboxed, config.probe_timeout())
    }

    pub fn with_candidates(candidates: Vec<String>, sandboxed: bool, probe_timeout: Duration) -> Self {
        Self { candidates, sandboxed, probe_timeout, sessions: Mutex::new(Vec::new()) }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// First candidate whose program exists where it would run.
    pub fn discover(&self) -> Option<&str> {
        self.candidates
            .iter()
            .find(|c| program_of(c).is_some_and(|p| self.is_available(&p)))
            .map(String::as_str)
    }

    fn is_available(&self, program: &str) -> bool {
        if self.sandboxed {
            host_has_executable(program, self.probe_timeout)
        } else {
            which::which(program).is_ok()
        }
    }

    pub fn start(&self, command: &str, working_dir: &Path) -> Result<Child, LaunchError> {
        let terminal = self
            .discover()
            .ok_or_else(|| LaunchError::NoTerminal(self.candidates.join(", ")))?;
        let line = build_command_line(terminal, command, working_dir, self.sandboxed)
            .ok_or_else(|| LaunchError::NoTerminal(terminal.to_string()))?;
        log::debug!("terminal: {}", line);

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&line).stdin(Stdio::null());
        if working_dir.is_dir() {
            cmd.current_dir(working_dir);
        }
        cmd.spawn().map_err(|source| LaunchError::Spawn { command: line, source })
    }
}

impl Launcher for TerminalLauncher {
    fn launch(&self, command: &str, working_dir: &Path, on_finished: Option<OnFinished>) -> bool {
        let mut child = match self.start(command, working_dir) {
            Ok(child) => child,
            Err(err) => {
                log::warn!("{}", err);
                if let Some(done) = on_finished {
                    done(false);
                }
                return false;
            }
        };
        let watcher = thread::spawn(move || {
            let ok = match child.wait() {
                Ok(status) => status.success(),
                Err(err) => {
                    log::warn!("waiting for terminal: {}", err);
                    false
                }
            };
            log::debug!("terminal exited, success={}", ok);
            if let Some(done) = on_finished {
                done(ok);
            }
        });
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).push(watcher);
        true
    }

    fn wait(&self) {
        let sessions: Vec<_> = self.sessions.lock().unwrap_or_else(|e| e.into_inner()).drain(..).collect();
        for session in sessions {
            let _ = session.join();
        }
    }
}

/// `flatpak-spawn --host which <program>`, given at most `timeout` to answer.
fn host_has_executable(program: &str, timeout: Duration) -> bool {
    if which::which("flatpak-spawn").is_err() {
        return false;
    }
    let child = match Command::new("flatpak-spawn")
        .args(["--host", "which", program])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(_) => return false,
    };
    exited_ok_within(child, timeout, program)
}

/// Whether `child` exits successfully within `timeout`; killed and reaped otherwise.
fn exited_ok_within(mut child: Child, timeout: Duration, what: &str) -> bool {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => status.success(),
        Ok(None) => {
            log::debug!("{} timed out", what);
            let _ = child.kill();
            let _ = child.wait();
            false
        }
        Err(err) => {
            log::debug!("{}: {}", what, err);
            false
        }
    }
}

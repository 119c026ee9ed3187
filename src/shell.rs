use std::borrow::Cow;
use std::process::{Command, Stdio};

/// Captured stdout of a finished shell command and whether it exited with 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn failed() -> Self {
        Self { stdout: String::new(), success: false }
    }
}

/// Runs a shell command line to completion.
pub trait CommandRunner {
    fn run(&self, command: &str) -> CommandOutput;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, command: &str) -> CommandOutput {
        (**self).run(command)
    }
}

/// Runs commands through `sh -c`, routed to the host with `flatpak-spawn` when sandboxed.
#[derive(Debug, Clone, Copy)]
pub struct HostShell {
    sandboxed: bool,
}

impl HostShell {
    pub fn new(sandboxed: bool) -> Self {
        Self { sandboxed }
    }

    pub fn wrap(&self, command: &str) -> String {
        if self.sandboxed {
            format!("flatpak-spawn --host {command}")
        } else {
            format!("/usr/bin/env {command}")
        }
    }
}

impl CommandRunner for HostShell {
    fn run(&self, command: &str) -> CommandOutput {
        let actual = self.wrap(command);
        log::debug!("run: {}", actual);
        let out = match Command::new("sh")
            .arg("-c")
            .arg(&actual)
            .stdin(Stdio::null())
            .output()
        {
            Ok(out) => out,
            Err(err) => {
                log::warn!("failed to start sh for `{}`: {}", command, err);
                return CommandOutput::failed();
            }
        };
        if !out.stderr.is_empty() {
            log::trace!("stderr: {}", String::from_utf8_lossy(&out.stderr).trim_end());
        }
        CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            success: out.status.success(),
        }
    }
}

/// Quote one word for a POSIX shell.
pub fn quote(s: &str) -> Cow<'_, str> {
    shell_escape::unix::escape(Cow::Borrowed(s))
}

/// `distrobox enter <container> -- sh -c <script>`
pub fn in_container(container: &str, script: &str) -> String {
    format!("distrobox enter {} -- sh -c {}", quote(container), quote(script))
}

/// `/usr/bin/env bash -c <script>`, for scripts handed to a terminal.
pub fn bash(script: &str) -> String {
    format!("/usr/bin/env bash -c {}", quote(script))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_for_host_or_sandbox() {
        assert_eq!(HostShell::new(false).wrap("distrobox list"), "/usr/bin/env distrobox list");
        assert_eq!(HostShell::new(true).wrap("distrobox list"), "flatpak-spawn --host distrobox list");
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(quote("plain-name"), "plain-name");
        assert_eq!(quote("/tmp/pkg.rpm"), "/tmp/pkg.rpm");
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote("x; rm -rf ~"), "'x; rm -rf ~'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn container_script_is_a_single_word() {
        assert_eq!(
            in_container("box", "cat /etc/os-release"),
            "distrobox enter box -- sh -c 'cat /etc/os-release'"
        );
    }

    #[test]
    fn host_shell_reports_exit_status() {
        let shell = HostShell::new(false);
        let ok = shell.run("printf hello");
        assert!(ok.success);
        assert_eq!(ok.stdout, "hello");
        assert!(!shell.run("false").success);
    }
}

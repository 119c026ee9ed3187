//! Scripted stand-ins for the shell and the terminal.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::shell::{CommandOutput, CommandRunner};
use crate::terminal::{Launcher, OnFinished};

/// Answers commands by the first rule whose needle occurs in the command line.
/// Unmatched commands fail with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, CommandOutput)>,
    log: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, stdout: &str) -> Self {
        self.rules.push((needle.into(), CommandOutput { stdout: stdout.into(), success: true }));
        self
    }

    pub fn fail(mut self, needle: &str) -> Self {
        self.rules.push((needle.into(), CommandOutput::failed()));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.log.borrow().iter().filter(|c| c.contains(needle)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str) -> CommandOutput {
        self.log.borrow_mut().push(command.to_string());
        self.rules
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_else(CommandOutput::failed)
    }
}

/// Records launches and finishes them immediately with a fixed outcome.
pub struct RecordingLauncher {
    pub outcome: bool,
    launches: RefCell<Vec<(String, PathBuf)>>,
}

impl RecordingLauncher {
    pub fn new(outcome: bool) -> Self {
        Self { outcome, launches: RefCell::new(Vec::new()) }
    }

    pub fn launches(&self) -> Vec<(String, PathBuf)> {
        self.launches.borrow().clone()
    }

    pub fn last_command(&self) -> Option<String> {
        self.launches.borrow().last().map(|(c, _)| c.clone())
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, command: &str, working_dir: &Path, on_finished: Option<OnFinished>) -> bool {
        self.launches.borrow_mut().push((command.to_string(), working_dir.to_path_buf()));
        if let Some(done) = on_finished {
            done(self.outcome);
        }
        self.outcome
    }
}

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use crate::pipeline::Step;
use crate::runtime::{ExecEnv, Result};
use crate::utils::command_to_string;

/// Where the tool's standard output goes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StdoutTarget {
    Inherit,
    Null,
    File(PathBuf),
}

/// One fully specified external tool call
#[derive(Clone, Debug)]
pub struct Invocation {
    pub step: Step,
    pub program: String,
    pub args: Vec<OsString>,
    pub env: ExecEnv,
    pub stdout: StdoutTarget,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new<S: Into<String>>(step: Step, program: S, env: ExecEnv) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
            env,
            stdout: StdoutTarget::Inherit,
            timeout: None,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn stdout(mut self, target: StdoutTarget) -> Self {
        self.stdout = target;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Build the process command. Only the child sees the execution environment
    pub fn to_command(&self) -> Result<Command> {
        let mut cmd = Command::new(self.env.program_path(&self.program));
        cmd.args(&self.args);
        if let Some(path) = self.env.child_path_var()? {
            cmd.env("PATH", path);
        }
        Ok(cmd)
    }

    /// Command line as it would be typed, including the stdout redirect
    pub fn command_line(&self) -> String {
        let mut cmd = Command::new(self.env.program_path(&self.program));
        cmd.args(&self.args);
        let line = command_to_string(&cmd);
        match &self.stdout {
            StdoutTarget::File(p) => format!("{} > {}", line, p.display()),
            StdoutTarget::Null => format!("{} > /dev/null", line),
            StdoutTarget::Inherit => line,
        }
    }
}

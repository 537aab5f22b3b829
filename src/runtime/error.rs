use std::process::ExitStatus;

use thiserror::Error;

use crate::pipeline::Step;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_FILESYSTEM: u8 = 3;
pub const EXIT_NOT_EXECUTABLE: u8 = 4;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {msg}")]
    Config { msg: String },

    #[error(
        "Step '{}' failed: '{}' {}{}",
        step,
        cmd,
        Error::format_status(status),
        Error::format_msg_as_detail(stderr_tail)
    )]
    StepFailure {
        step: Step,
        cmd: String,
        status: Option<ExitStatus>,
        stderr_tail: Option<String>,
    },

    #[error("Step '{step}' did not finish within {seconds}s and was killed")]
    StepTimeout { step: Step, seconds: u64 },

    #[error("Step '{step}' reported success but did not produce {:?}", path)]
    MissingOutput {
        step: Step,
        path: std::path::PathBuf,
    },

    #[error(
        "Failed trying to execute utility '{utility}' ({env}). Make sure it is installed there and you have execution permissions."
    )]
    UtilityNotExecutable { utility: String, env: String },

    #[error("Filesystem operation on {:?} failed: {source}", path)]
    Filesystem {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    #[cold]
    pub fn config<M: Into<String>>(msg: M) -> Self {
        Error::Config { msg: msg.into() }
    }

    #[cold]
    pub fn step_failure<C: Into<String>>(
        step: Step,
        cmd: C,
        status: Option<ExitStatus>,
        stderr_tail: Option<String>,
    ) -> Self {
        Error::StepFailure {
            step,
            cmd: cmd.into(),
            status,
            stderr_tail,
        }
    }

    #[cold]
    pub fn step_timeout(step: Step, seconds: u64) -> Self {
        Error::StepTimeout { step, seconds }
    }

    #[cold]
    pub fn missing_output<P: AsRef<std::path::Path>>(step: Step, path: P) -> Self {
        Error::MissingOutput {
            step,
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cold]
    pub fn utility_not_executable<U: Into<String>, E: Into<String>>(utility: U, env: E) -> Self {
        Error::UtilityNotExecutable {
            utility: utility.into(),
            env: env.into(),
        }
    }

    #[cold]
    pub fn filesystem<P: AsRef<std::path::Path>>(path: P, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Process exit code reported to the shell for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config { .. } => EXIT_CONFIG,
            Error::Filesystem { .. } => EXIT_FILESYSTEM,
            Error::UtilityNotExecutable { .. } => EXIT_NOT_EXECUTABLE,
            Error::StepFailure { step, .. }
            | Error::StepTimeout { step, .. }
            | Error::MissingOutput { step, .. } => step.exit_code(),
        }
    }

    /// The step this error belongs to, if any
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::StepFailure { step, .. }
            | Error::StepTimeout { step, .. }
            | Error::MissingOutput { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }

    pub fn format_status(status: &Option<ExitStatus>) -> String {
        match status {
            Some(status) => match status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "was terminated by a signal".to_string(),
            },
            None => "could not be waited on".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_step() {
        let mut codes: Vec<u8> = Step::ALL
            .iter()
            .map(|step| Error::step_timeout(*step, 1).exit_code())
            .collect();
        codes.push(Error::config("x").exit_code());
        codes.push(
            Error::filesystem("/x", std::io::Error::from(std::io::ErrorKind::NotFound)).exit_code(),
        );
        codes.push(Error::utility_not_executable("fastp", "PATH").exit_code());

        let n = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), n);
        assert!(codes.iter().all(|c| *c != 0));
    }

    #[test]
    fn test_step_failure_message_names_step_and_detail() {
        let e = Error::step_failure(
            Step::Assemble,
            "shovill --R1 a --R2 b",
            None,
            Some("spades crashed".to_string()),
        );
        let msg = e.to_string();
        assert!(msg.contains("assemble"));
        assert!(msg.contains("shovill --R1 a --R2 b"));
        assert!(msg.ends_with("(spades crashed)"));
        assert_eq!(e.step(), Some(Step::Assemble));
    }
}

use std::fs::File;
use std::io::Read;
use std::process::{ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::pipeline::{Invocation, StdoutTarget};
use crate::runtime::{Error, Result};

const STDERR_TAIL_LINES: usize = 5;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What a finished tool call left behind
#[derive(Debug, Clone)]
pub struct Execution {
    /// None when nothing was executed (dry run)
    pub status: Option<ExitStatus>,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Executes invocations. A non-zero exit must be reported as an error
pub trait Runner {
    fn run(&mut self, invocation: &Invocation) -> Result<Execution>;
}

/// Last few non-empty lines of a tool's stderr, joined into one line
pub fn stderr_tail(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    Some(lines[start..].join(" | "))
}

///////////////////////////////
/// Runs each invocation as a blocking child process
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Runner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<Execution> {
        let step = invocation.step;
        let cmd_line = invocation.command_line();
        let mut cmd = invocation.to_command()?;

        cmd.stdin(Stdio::null()).stderr(Stdio::piped());
        match &invocation.stdout {
            StdoutTarget::Inherit => {
                cmd.stdout(Stdio::inherit());
            }
            StdoutTarget::Null => {
                cmd.stdout(Stdio::null());
            }
            StdoutTarget::File(p) => {
                let file = File::create(p).map_err(|e| Error::filesystem(p, e))?;
                cmd.stdout(Stdio::from(file));
            }
        }

        info!("Running {}: {}", step, cmd_line);
        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            debug!("Spawning {} failed: {}", invocation.program, e);
            Error::utility_not_executable(&invocation.program, invocation.env.to_string())
        })?;

        // Drain stderr on the side so a chatty tool never blocks on a full pipe
        let stderr_pipe = child.stderr.take();
        let drain = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf);
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let status = match invocation.timeout {
            None => child.wait(),
            Some(limit) => loop {
                match child.try_wait() {
                    Ok(Some(status)) => break Ok(status),
                    Ok(None) if start.elapsed() >= limit => {
                        let _ = child.kill();
                        let _ = child.wait();
                        // The drain thread is left behind; grandchildren may still hold the pipe
                        return Err(Error::step_timeout(step, limit.as_secs()));
                    }
                    Ok(None) => thread::sleep(self.poll_interval),
                    Err(e) => break Err(e),
                }
            },
        };

        let status = status.map_err(|e| {
            Error::step_failure(step, cmd_line.clone(), None, Some(e.to_string()))
        })?;
        let stderr = drain.join().unwrap_or_default();
        let elapsed = start.elapsed();

        for line in stderr.lines() {
            debug!("[{}] {}", step, line);
        }

        if !status.success() {
            return Err(Error::step_failure(
                step,
                cmd_line,
                Some(status),
                stderr_tail(&stderr),
            ));
        }

        info!("Finished {} in {:.1}s", step, elapsed.as_secs_f64());
        Ok(Execution {
            status: Some(status),
            stderr,
            elapsed,
        })
    }
}

///////////////////////////////
/// Logs each invocation instead of executing it
#[derive(Default)]
pub struct DryRunner {
    pub planned: Vec<String>,
}

impl Runner for DryRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<Execution> {
        let line = invocation.command_line();
        info!("[dry-run] {}: {}", invocation.step, line);
        self.planned.push(line);
        Ok(Execution {
            status: None,
            stderr: String::new(),
            elapsed: Duration::ZERO,
        })
    }
}

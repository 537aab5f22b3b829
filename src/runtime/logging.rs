use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use env_logger::{Env, Target, WriteStyle};
use log::LevelFilter;

use crate::utils::expand_and_resolve_path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogLevel(pub LevelFilter);
impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" | "warning" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" | "none" => LevelFilter::Off,
            _ => return Err(format!("Invalid log level: {}", s)),
        };
        Ok(LogLevel(level))
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    Both,
    Path,
    Terminal,
    Discard,
}
impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.to_lowercase().as_str() {
            "both" => LogMode::Both,
            "path" | "file" => LogMode::Path,
            "terminal" | "term" | "cli" => LogMode::Terminal,
            "discard" | "none" => LogMode::Discard,
            _ => return Err(format!("Invalid log mode: {}", s)),
        };
        Ok(mode)
    }
}

enum SinkState {
    /// No file yet; lines are held until the run is known to be valid
    Pending(Vec<u8>),
    File(File),
    Terminal,
}

struct LogSink {
    tee: bool,
    state: SinkState,
}

fn lock_sink(sink: &Mutex<LogSink>) -> MutexGuard<'_, LogSink> {
    sink.lock().unwrap_or_else(|e| e.into_inner())
}

/// Writer handed to env_logger for the path and both modes
struct SinkWriter(Arc<Mutex<LogSink>>);

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut sink = lock_sink(&self.0);
        let tee = sink.tee;
        if tee {
            std::io::stderr().write_all(buf)?;
        }
        match &mut sink.state {
            SinkState::Pending(pending) => pending.extend_from_slice(buf),
            SinkState::File(file) => file.write_all(buf)?,
            SinkState::Terminal if !tee => std::io::stderr().write_all(buf)?,
            SinkState::Terminal => {}
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut sink = lock_sink(&self.0);
        std::io::stderr().flush()?;
        match &mut sink.state {
            SinkState::File(file) => file.flush(),
            _ => Ok(()),
        }
    }
}

/// The log file of the path and both modes. Nothing touches the filesystem until `attach`
#[derive(Clone)]
pub struct LogFile {
    sink: Arc<Mutex<LogSink>>,
    explicit_path: Option<PathBuf>,
}

impl LogFile {
    /// Open the log file, creating its directory, and write out everything logged so far.
    /// `default_path` is used when no --log-path was given
    pub fn attach(&self, default_path: &Path) -> anyhow::Result<()> {
        let path = self
            .explicit_path
            .clone()
            .unwrap_or_else(|| default_path.to_path_buf());
        let mut file = open_log_file(path)?;

        let mut sink = lock_sink(&self.sink);
        if let SinkState::Pending(pending) = &mut sink.state {
            file.write_all(&std::mem::take(pending))
                .context("Failed to write log file")?;
        }
        sink.state = SinkState::File(file);
        Ok(())
    }

    /// Give up on the file and send held and future lines to the terminal. No-op once attached
    pub fn fall_back_to_terminal(&self) {
        let mut sink = lock_sink(&self.sink);
        let held = match &mut sink.state {
            SinkState::Pending(pending) => std::mem::take(pending),
            _ => return,
        };
        if !sink.tee {
            let _ = std::io::stderr().write_all(&held);
        }
        sink.state = SinkState::Terminal;
    }

    pub fn is_attached(&self) -> bool {
        matches!(lock_sink(&self.sink).state, SinkState::File(_))
    }

    /// Whether log lines currently show up on the terminal
    pub fn writes_to_terminal(&self) -> bool {
        let sink = lock_sink(&self.sink);
        sink.tee || matches!(sink.state, SinkState::Terminal)
    }
}

fn open_log_file(log_path: PathBuf) -> anyhow::Result<File> {
    let path = expand_and_resolve_path(log_path)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {:?}", path))
}

/// Install the global logger. Without an explicit level, RUST_LOG decides, falling back to info.
/// For the path and both modes the returned handle must be attached (or fall back to the terminal)
/// once the run is known to be valid
pub fn setup_global_logger(
    log_level: Option<LogLevel>,
    log_mode: LogMode,
    log_path: Option<PathBuf>,
) -> anyhow::Result<Option<LogFile>> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = log_level {
        builder.filter_level(level.0);
    }

    let log_file = match log_mode {
        LogMode::Discard => {
            builder.filter_level(LevelFilter::Off);
            None
        }
        LogMode::Terminal => {
            builder.target(Target::Stderr);
            None
        }
        LogMode::Path | LogMode::Both => {
            let sink = Arc::new(Mutex::new(LogSink {
                tee: log_mode == LogMode::Both,
                state: SinkState::Pending(Vec::new()),
            }));
            builder
                .target(Target::Pipe(Box::new(SinkWriter(Arc::clone(&sink)))))
                .write_style(WriteStyle::Never);
            Some(LogFile {
                sink,
                explicit_path: log_path,
            })
        }
    };

    builder
        .format_timestamp_secs()
        .try_init()
        .context("Logger was already initialized")?;
    Ok(log_file)
}

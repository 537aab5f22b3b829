mod config;
mod environment;
mod error;
mod logging;

pub use config::Config;
pub use environment::{ExecEnv, ToolEnvironments, ToolSetting};
pub use error::{Error, Result, EXIT_CONFIG, EXIT_FILESYSTEM, EXIT_NOT_EXECUTABLE};
pub use logging::{setup_global_logger, LogFile, LogLevel, LogMode};

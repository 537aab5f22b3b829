use std::path::PathBuf;
use std::process::ExitCode;

use bacpipe::command;
use bacpipe::command::constants::PIPELINE_DEFAULT_LOG_MODE;
use bacpipe::runtime::{self, LogLevel, LogMode};
use clap::Parser;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    pipeline: command::PipelineCMD,

    /// trace, debug, info, warn or error. RUST_LOG is used when not given
    #[arg(long = "log-level")]
    log_level: Option<LogLevel>,

    /// terminal, path, both or discard
    #[arg(long = "log-mode", default_value = PIPELINE_DEFAULT_LOG_MODE)]
    log_mode: LogMode,

    /// Log file for the path and both modes. Defaults to <out>/bacpipe.log
    #[arg(long = "log-path", value_parser = clap::value_parser!(PathBuf))]
    log_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let mut cli = Cli::parse();

    let log_file =
        match runtime::setup_global_logger(cli.log_level, cli.log_mode, cli.log_path.clone()) {
            Ok(log_file) => log_file,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return ExitCode::from(runtime::EXIT_CONFIG);
            }
        };

    if let Err(e) = cli.pipeline.try_execute(log_file.as_ref()) {
        if let Some(log_file) = &log_file {
            log_file.fall_back_to_terminal();
        }
        log::error!("{:#}", e);

        let on_terminal = match &log_file {
            Some(log_file) => log_file.writes_to_terminal(),
            None => cli.log_mode == LogMode::Terminal,
        };
        if !on_terminal {
            eprintln!("Error: {:#}", e);
        }

        let code = e
            .downcast_ref::<runtime::Error>()
            .map(|e| e.exit_code())
            .unwrap_or(1);
        return ExitCode::from(code);
    }
    ExitCode::SUCCESS
}

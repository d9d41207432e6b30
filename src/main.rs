use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use nextcloud_version_check::config::{BASE_DIR_ENV, DEFAULT_BASE_DIR, LOG_FILE_ENV};
use nextcloud_version_check::probe;

#[derive(Parser, Debug)]
#[command(name = "nextcloud-version-check")]
#[command(version, about = "Monitoring check reporting pending Nextcloud updates")]
struct Cli {
    /// Nextcloud installation directory
    #[arg(long, env = BASE_DIR_ENV, default_value = DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, env = LOG_FILE_ENV)]
    log_file: Option<PathBuf>,
}

/// Initialize logging. Standard output is reserved for the status line.
///
/// `--debug` forces debug level, otherwise `RUST_LOG` applies, defaulting
/// to warnings only.
fn init_tracing(debug: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = if debug {
        EnvFilter::new("nextcloud_version_check=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("nextcloud_version_check=warn"))
    };

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(false),
            )
            .try_init()?;
        return Ok(None);
    };

    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path {:?} has no file name", path))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .with_context(|| format!("Failed to open log file {:?}", path))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    Ok(Some(guard))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging problems must not suppress the status line
    let _guard = init_tracing(cli.debug, cli.log_file.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to initialize logging: {:#}", e);
        None
    });

    tracing::debug!("Starting with args: {:?}", cli);

    let report = probe::run(&cli.base_dir);
    println!("{}", report);

    ExitCode::from(report.status.code())
}

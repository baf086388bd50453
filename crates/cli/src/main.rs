//! treemirror: Keep a replica directory identical to a source directory
//!
//! Runs one sync cycle at startup and then one per interval:
//! - Replica entries missing from the source are deleted
//! - New and changed files are copied (MD5 comparison, not timestamps)
//! - Symbolic links are replicated, broken ones skipped
//! - Every action is logged to the console and a log file

mod bootstrap;
mod logging;
mod schedule;
mod settings;
mod status;

use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use color_eyre::Result;
use color_eyre::eyre::bail;
use tracing::info;

use treemirror_core::{CycleOutcome, Mirror, MirrorOptions};

use crate::settings::Settings;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser, Debug)]
#[command(name = "treemirror")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Periodically mirror a source directory onto a replica")]
#[command(long_about = r#"
treemirror keeps a replica directory identical to a source directory.

After each cycle the replica holds exactly the source's files, directories
and symbolic links. Unchanged files are left alone.

Examples:
  treemirror /data/src /backup/src /var/log/treemirror.log 60
  treemirror --config mirror.toml
  treemirror --once /data/src /backup/src /tmp/treemirror.log 1
"#)]
pub struct Cli {
    /// Absolute path of the directory to mirror from
    #[arg(value_name = "SOURCE_PATH")]
    source: Option<PathBuf>,

    /// Absolute path of the directory to mirror into
    #[arg(value_name = "REPLICA_PATH")]
    replica: Option<PathBuf>,

    /// Absolute path of the log file
    #[arg(value_name = "LOG_FILE_PATH")]
    log_file: Option<PathBuf>,

    /// Seconds between two synchronizations
    #[arg(value_name = "SYNC_INTERVAL")]
    interval: Option<u64>,

    /// TOML file providing any of the values above
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Compare entry names case-insensitively and lower-case the paths
    #[arg(long, conflicts_with = "exact_case")]
    ignore_case: bool,

    /// Compare entry names exactly
    #[arg(long)]
    exact_case: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;

    let (log_file, log_created) = bootstrap::open_log_file(&settings.log_file)?;
    let _log_guard = logging::init(log_file, settings.verbose);
    if log_created {
        info!("Log file created.");
    }

    bootstrap::ensure_source_directory(&settings.source, || {
        let term = console::Term::stderr();
        bootstrap::confirm(
            "Create source directory?",
            &mut BufReader::new(term.clone()),
            &mut term.clone(),
        )
    })?;
    bootstrap::ensure_replica_directory(&settings.replica)?;

    status::ready(&settings);

    let mirror = Arc::new(Mirror::new(
        MirrorOptions::new(&settings.source, &settings.replica)
            .name_matching(settings.name_matching),
    ));

    if settings.once {
        if let CycleOutcome::Failed(reason) = mirror.sync() {
            bail!("Synchronization failed: {reason}");
        }
        return Ok(());
    }

    let cycles = schedule::run_until(mirror, settings.interval, schedule::ctrl_c()).await;
    info!("Stopped after {cycles} synchronization cycles.");

    Ok(())
}

//! Validated run settings, merged from the command line and an optional config file

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{bail, eyre};
use treemirror_core::{MirrorConfig, NameMatching};

use crate::Cli;

/// Everything needed to start mirroring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
    pub name_matching: NameMatching,
    pub once: bool,
    pub verbose: bool,
}

impl Settings {
    /// Merge command-line values over the config file (if any) and validate.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be loaded, a required value
    /// is missing, or any value is invalid.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => MirrorConfig::load(path)?,
            None => MirrorConfig::default(),
        };
        Self::merge(cli, config)
    }

    fn merge(cli: &Cli, config: MirrorConfig) -> Result<Self> {
        let name_matching = if cli.ignore_case {
            NameMatching::IgnoreCase
        } else if cli.exact_case {
            NameMatching::Exact
        } else {
            config.name_matching.unwrap_or_default()
        };

        let source = cli
            .source
            .clone()
            .or(config.source)
            .ok_or_else(|| eyre!("missing source_path"))?;
        let replica = cli
            .replica
            .clone()
            .or(config.replica)
            .ok_or_else(|| eyre!("missing replica_path"))?;
        let log_file = cli
            .log_file
            .clone()
            .or(config.log_file)
            .ok_or_else(|| eyre!("missing log_file_path"))?;
        let interval_secs = cli
            .interval
            .or(config.interval_secs)
            .ok_or_else(|| eyre!("missing sync_interval"))?;

        let source = validate_path(&source, "source_path", name_matching)?;
        let replica = validate_path(&replica, "replica_path", name_matching)?;
        let log_file = validate_log_file(&log_file, name_matching)?;
        let interval = validate_interval(interval_secs)?;

        validate_layout(&source, &replica, &log_file)?;

        Ok(Self {
            source,
            replica,
            log_file,
            interval,
            name_matching,
            once: cli.once,
            verbose: cli.verbose,
        })
    }
}

/// Check that `path` is absolute and free of NUL bytes, then normalize it
/// under the session's name matching policy.
fn validate_path(path: &Path, param: &str, matching: NameMatching) -> Result<PathBuf> {
    let text = path.to_string_lossy();

    if text.contains('\0') {
        bail!("Path ({param}) has invalid characters.");
    }
    if !path.is_absolute() {
        bail!("Path ({param}) isn't absolute.");
    }

    Ok(match matching {
        NameMatching::Exact => path.to_path_buf(),
        NameMatching::IgnoreCase => PathBuf::from(matching.normalize(&text)),
    })
}

fn validate_log_file(path: &Path, matching: NameMatching) -> Result<PathBuf> {
    let path = validate_path(path, "log_file_path", matching)?;
    if path.file_name().is_none() {
        bail!(
            "Path (log_file_path) {} doesn't name a file.",
            path.display()
        );
    }
    Ok(path)
}

fn validate_interval(secs: u64) -> Result<Duration> {
    if secs == 0 {
        bail!("The syncing interval must be given in seconds and be a positive integer.");
    }
    Ok(Duration::from_secs(secs))
}

/// Reject layouts where one cycle would destroy or endlessly grow its own inputs.
fn validate_layout(source: &Path, replica: &Path, log_file: &Path) -> Result<()> {
    if source == replica {
        bail!("The source and replica paths must differ.");
    }
    if replica.starts_with(source) {
        bail!("The replica directory can't be inside the source directory.");
    }
    if source.starts_with(replica) {
        bail!("The source directory can't be inside the replica directory.");
    }
    if log_file.starts_with(replica) {
        bail!("The log file can't be inside the replica directory.");
    }
    Ok(())
}

//! Top-level sync orchestration with a reentrancy guard

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use color_eyre::Result;
use color_eyre::eyre::{WrapErr as _, bail};
use tracing::{error, info, warn};

use crate::config::NameMatching;
use crate::propagate::copy_new;
use crate::prune::delete_obsolete;

/// Counters for one sync cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files_deleted: u64,
    pub directories_deleted: u64,
    pub files_copied: u64,
    pub links_created: u64,
    pub directories_created: u64,
    /// Files and links already up to date
    pub unchanged: u64,
    /// Broken links and unsupported entry types
    pub skipped: u64,
}

impl SyncStats {
    /// Number of filesystem changes made to the replica
    #[must_use]
    pub fn mutations(&self) -> u64 {
        self.files_deleted
            + self.directories_deleted
            + self.files_copied
            + self.links_created
            + self.directories_created
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} linked, {} directories created, {} files and {} directories deleted, {} unchanged, {} skipped",
            self.files_copied,
            self.links_created,
            self.directories_created,
            self.files_deleted,
            self.directories_deleted,
            self.unchanged,
            self.skipped
        )
    }
}

/// Result of one call to [`Mirror::sync`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to the end
    Completed(SyncStats),
    /// A previous cycle was still running, nothing was done
    Skipped,
    /// The cycle stopped at the first error, rendered here
    Failed(String),
}

impl CycleOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Settings for a mirror session
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Directory to mirror from
    pub source: PathBuf,
    /// Directory kept identical to `source`
    pub replica: PathBuf,
    pub name_matching: NameMatching,
}

impl MirrorOptions {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            name_matching: NameMatching::platform_default(),
        }
    }

    #[must_use]
    pub fn name_matching(mut self, name_matching: NameMatching) -> Self {
        self.name_matching = name_matching;
        self
    }
}

/// A configured source → replica mirror.
///
/// `sync` may be called from several threads; only one cycle mutates the
/// replica at a time and overlapping calls return [`CycleOutcome::Skipped`].
#[derive(Debug)]
pub struct Mirror {
    options: MirrorOptions,
    syncing: AtomicBool,
}

impl Mirror {
    #[must_use]
    pub fn new(options: MirrorOptions) -> Self {
        Self {
            options,
            syncing: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.options.source
    }

    #[must_use]
    pub fn replica(&self) -> &Path {
        &self.options.replica
    }

    #[must_use]
    pub fn name_matching(&self) -> NameMatching {
        self.options.name_matching
    }

    /// Whether a cycle is currently running
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Run one sync cycle: prune obsolete replica content, then propagate new
    /// and changed source content.
    ///
    /// Never fails; errors end the cycle early and are logged and reported in
    /// the returned outcome.
    pub fn sync(&self) -> CycleOutcome {
        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            warn!("Synchronization skipped because the previous one is still in progress.");
            return CycleOutcome::Skipped;
        };

        info!("Synchronization started.");
        let start = Instant::now();

        match self.run_cycle() {
            Ok(stats) => {
                info!("Synchronization completed in {:?}: {stats}", start.elapsed());
                CycleOutcome::Completed(stats)
            }
            Err(e) => {
                error!("Error during synchronization: {e:#}");
                CycleOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    fn run_cycle(&self) -> Result<SyncStats> {
        self.ensure_roots()?;

        let mut stats = SyncStats::default();
        let matching = self.options.name_matching;
        delete_obsolete(&self.options.source, &self.options.replica, matching, &mut stats)?;
        copy_new(&self.options.source, &self.options.replica, matching, &mut stats)?;
        Ok(stats)
    }

    fn ensure_roots(&self) -> Result<()> {
        let source = &self.options.source;
        if !source.is_dir() {
            bail!("source directory {} does not exist", source.display());
        }

        let replica = &self.options.replica;
        if !replica.is_dir() {
            std::fs::create_dir_all(replica).wrap_err_with(|| {
                format!("failed to create replica directory {}", replica.display())
            })?;
            info!("The replica directory ({}) has been created.", replica.display());
        }

        Ok(())
    }
}

/// Holds the syncing flag for the lifetime of a cycle, releasing it on drop
/// (including unwinding).
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

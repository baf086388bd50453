//! treemirror-core: One-way directory mirroring engine
//!
//! Makes a replica directory tree identical to a source tree. Each cycle first
//! prunes replica entries missing from the source, then copies new and changed
//! files (compared by MD5 digest), replicates symbolic links and creates
//! missing directories.

pub mod config;
pub mod entry;
pub mod hash;
pub mod mirror;
pub mod propagate;
pub mod prune;

pub use config::{MirrorConfig, NameMatching};
pub use entry::{Entry, EntryKind, Listing};
pub use hash::{ContentHash, files_are_equal};
pub use mirror::{CycleOutcome, Mirror, MirrorOptions, SyncStats};

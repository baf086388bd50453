//! Single-directory listings with name lookup

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr as _;

use crate::config::NameMatching;

/// What kind of filesystem object an entry is.
///
/// Symbolic links are never followed while classifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, devices
    Other,
}

/// A direct child of a listed directory
#[derive(Debug, Clone)]
pub struct Entry {
    /// File name within the parent directory
    pub name: OsString,
    /// Full path
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    /// Whether this entry occupies the "file" namespace (anything but a directory)
    #[must_use]
    pub fn is_file_like(&self) -> bool {
        self.kind != EntryKind::Directory
    }
}

/// The direct children of one directory, indexed by name.
///
/// Files and directories live in separate indexes, so a file in one tree
/// never matches a same-named directory in the other.
#[derive(Debug)]
pub struct Listing {
    entries: Vec<Entry>,
    files: HashMap<OsString, usize>,
    directories: HashMap<OsString, usize>,
    matching: NameMatching,
}

impl Listing {
    /// List a directory. Entries are sorted by name.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be enumerated
    pub fn read(dir: &Path, matching: NameMatching) -> Result<Self> {
        let mut entries = Vec::new();

        let read_dir = std::fs::read_dir(dir)
            .wrap_err_with(|| format!("failed to list directory {}", dir.display()))?;
        for result in read_dir {
            let dir_entry =
                result.wrap_err_with(|| format!("failed to list directory {}", dir.display()))?;
            let file_type = dir_entry
                .file_type()
                .wrap_err_with(|| format!("failed to stat {}", dir_entry.path().display()))?;

            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            entries.push(Entry {
                name: dir_entry.file_name(),
                path: dir_entry.path(),
                kind,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self::from_entries(entries, matching))
    }

    fn from_entries(entries: Vec<Entry>, matching: NameMatching) -> Self {
        let mut files = HashMap::new();
        let mut directories = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            let index = if entry.is_file_like() {
                &mut files
            } else {
                &mut directories
            };
            // Under IgnoreCase two names may fold together; the first one wins.
            index.entry(name_key(&entry.name, matching)).or_insert(idx);
        }

        Self {
            entries,
            files,
            directories,
            matching,
        }
    }

    /// All entries, sorted by name
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// All non-directory entries
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_file_like())
    }

    /// All directory entries
    pub fn directories(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_file_like())
    }

    /// Find a non-directory entry with a matching name
    #[must_use]
    pub fn find_file(&self, name: &OsStr) -> Option<&Entry> {
        self.files
            .get(&name_key(name, self.matching))
            .map(|&idx| &self.entries[idx])
    }

    /// Find a directory entry with a matching name
    #[must_use]
    pub fn find_directory(&self, name: &OsStr) -> Option<&Entry> {
        self.directories
            .get(&name_key(name, self.matching))
            .map(|&idx| &self.entries[idx])
    }

    /// Whether another entry of this listing owns `entry`'s name.
    ///
    /// Only possible under `IgnoreCase`, when two names fold together; the
    /// first in sorted order owns the name and the others are shadowed.
    #[must_use]
    pub fn is_shadowed(&self, entry: &Entry) -> bool {
        let owner = if entry.is_file_like() {
            self.find_file(&entry.name)
        } else {
            self.find_directory(&entry.name)
        };
        owner.is_some_and(|owner| owner.path != entry.path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Remove a non-directory entry without following it if it is a link.
pub(crate) fn remove_file_like(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        // Directory links on Windows are removed like directories.
        #[cfg(windows)]
        Err(_) if path.is_dir() => std::fs::remove_dir(path),
        result => result,
    }
}

/// Names that are not valid Unicode are never folded and match byte for byte.
fn name_key(name: &OsStr, matching: NameMatching) -> OsString {
    match (matching, name.to_str()) {
        (NameMatching::IgnoreCase, Some(name)) => OsString::from(matching.normalize(name)),
        _ => name.to_os_string(),
    }
}

//! Entry roles and the suffix contract of a SigMF archive.
//!
//! A `.sigmf` archive is a plain tar stream.  The role of each member is
//! decided by its name alone:
//!
//! | Suffix              | Role         |
//! |---------------------|--------------|
//! | `.sigmf-meta`       | Metadata     |
//! | `.sigmf-data`       | Dataset      |
//! | `.sigmf-collection` | Collection   |
//!
//! Directory members are skipped; every other member is `Unknown` and only
//! reported.

use std::fmt;

pub const SIGMF_ARCHIVE_EXT:    &str = "sigmf";
pub const SIGMF_METADATA_EXT:   &str = ".sigmf-meta";
pub const SIGMF_DATASET_EXT:    &str = ".sigmf-data";
pub const SIGMF_COLLECTION_EXT: &str = ".sigmf-collection";

// ── EntryKind ────────────────────────────────────────────────────────────────

/// Container-level type of a member, independent of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Any other tar type flag (symlink, fifo, PAX global header, ...).
    Other(u8),
}

impl From<tar::EntryType> for EntryKind {
    fn from(t: tar::EntryType) -> Self {
        if t.is_file() || t == tar::EntryType::Continuous {
            EntryKind::File
        } else if t.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other(t.as_byte())
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File      => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
            EntryKind::Other(b)  => write!(f, "type '{}'", *b as char),
        }
    }
}

// ── EntryRole ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    Metadata,
    Dataset,
    Collection,
    Directory,
    Unknown,
}

/// Role of a member given its path and container-level kind.
pub fn classify(path: &str, kind: EntryKind) -> EntryRole {
    match kind {
        EntryKind::Directory => EntryRole::Directory,
        EntryKind::File      => classify_path(path),
        EntryKind::Other(_)  => EntryRole::Unknown,
    }
}

/// Suffix rule alone, for a member already known to be a regular file.
pub fn classify_path(path: &str) -> EntryRole {
    if path.ends_with(SIGMF_METADATA_EXT) {
        EntryRole::Metadata
    } else if path.ends_with(SIGMF_DATASET_EXT) {
        EntryRole::Dataset
    } else if path.ends_with(SIGMF_COLLECTION_EXT) {
        EntryRole::Collection
    } else {
        EntryRole::Unknown
    }
}

/// Logical recording name of a metadata member: last path component with
/// the metadata suffix stripped.
///
/// `"capture/capture.sigmf-meta"` and `"capture.sigmf-meta"` both yield
/// `"capture"`.
pub fn recording_name(metadata_path: &str) -> String {
    let trimmed = metadata_path.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    base.strip_suffix(SIGMF_METADATA_EXT).unwrap_or(base).to_owned()
}

// ── ContainerEntry ───────────────────────────────────────────────────────────

/// One member of the container as seen during the single iteration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    pub path:   String,
    pub kind:   EntryKind,
    pub role:   EntryRole,
    /// Absolute position of the member's payload in the container.
    pub offset: u64,
    pub size:   u64,
}

impl ContainerEntry {
    pub fn new(path: String, kind: EntryKind, offset: u64, size: u64) -> Self {
        let role = classify(&path, kind);
        Self { path, kind, role, offset, size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_map_to_roles() {
        assert_eq!(classify_path("a/a.sigmf-meta"), EntryRole::Metadata);
        assert_eq!(classify_path("a/a.sigmf-data"), EntryRole::Dataset);
        assert_eq!(classify_path("set.sigmf-collection"), EntryRole::Collection);
        assert_eq!(classify_path("README.md"), EntryRole::Unknown);
        assert_eq!(classify_path("archive.sigmf"), EntryRole::Unknown);
    }

    #[test]
    fn directories_and_special_members_are_not_recordings() {
        assert_eq!(classify("rec.sigmf-meta", EntryKind::Directory), EntryRole::Directory);
        assert_eq!(classify("rec.sigmf-meta", EntryKind::Other(b'2')), EntryRole::Unknown);
        assert_eq!(classify("rec.sigmf-meta", EntryKind::File), EntryRole::Metadata);
    }

    #[test]
    fn recording_name_strips_suffix_and_directories() {
        assert_eq!(recording_name("rec1.sigmf-meta"), "rec1");
        assert_eq!(recording_name("test1/test1.sigmf-meta"), "test1");
        assert_eq!(recording_name("a/b/c.sigmf-meta"), "c");
    }

    #[test]
    fn tar_entry_types_map_to_kinds() {
        assert_eq!(EntryKind::from(tar::EntryType::Regular), EntryKind::File);
        assert_eq!(EntryKind::from(tar::EntryType::Directory), EntryKind::Directory);
        assert_eq!(EntryKind::from(tar::EntryType::Symlink), EntryKind::Other(b'2'));
    }
}

//! High-level [`ArchiveReader`] API, the primary embedding surface.
//!
//! ```no_run
//! use sigmf_archive::archive::{ArchiveReader, RecordingSet};
//!
//! // Defaults: checksums verified, read-only maps.
//! let set = RecordingSet::open("capture.sigmf")?;
//! for rec in &set {
//!     println!("{} {:?}", rec.name(), rec.dataset().map(|d| d.size()));
//! }
//!
//! // In-memory archive, checksum verification off.
//! let bytes = std::fs::read("capture.sigmf")?;
//! let set = ArchiveReader::new().buffer(bytes).skip_checksum(true).open()?;
//! if let Some(samples) = set[0].data()? {
//!     assert_eq!(samples.len() as u64, set[0].dataset().unwrap().size());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::ffi::OsStr;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::container::ArchiveContainer;
use crate::dataset::{self, DatasetBacking, DatasetRef, DatasetView};
use crate::entry::{ContainerEntry, EntryKind, EntryRole, SIGMF_ARCHIVE_EXT, SIGMF_DATASET_EXT};
use crate::error::{Result, SigmfError};
use crate::grouping::{Grouper, PendingRecording};
use crate::metadata::MetadataDocument;

// ── ReadOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`ArchiveReader::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Do not verify `core:sha512` when a dataset is realized.
    pub skip_checksum: bool,
    /// Realized file-backed views are read-only maps.  When off they are
    /// private copy-on-write maps.
    pub map_readonly:  bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            skip_checksum: false,
            map_readonly:  true,
        }
    }
}

// ── ArchiveWarning ───────────────────────────────────────────────────────────

/// Non-fatal conditions noticed while opening an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveWarning {
    /// No recording in the archive has a dataset.
    NoDatasets,
    UnhandledCollection { path: String },
    /// A regular file with no SigMF suffix.
    IgnoredFile { path: String },
    /// A member that is neither a regular file nor a directory.
    UnhandledEntry { path: String, kind: EntryKind },
}

impl fmt::Display for ArchiveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveWarning::NoDatasets =>
                write!(f, "no file with {SIGMF_DATASET_EXT} extension found in archive"),
            ArchiveWarning::UnhandledCollection { path } =>
                write!(f, "SigMF collection {path} was found but not handled"),
            ArchiveWarning::IgnoredFile { path } =>
                write!(f, "regular file {path} was found but ignored"),
            ArchiveWarning::UnhandledEntry { path, kind } =>
                write!(f, "member {path} of {kind} was found but not handled"),
        }
    }
}

// ── Recording ────────────────────────────────────────────────────────────────

/// One metadata document and at most one dataset.
#[derive(Debug)]
pub struct Recording {
    name:          String,
    metadata_path: String,
    metadata:      MetadataDocument,
    dataset:       Option<DatasetRef>,
    view:          OnceLock<DatasetView>,
    realizing:     Mutex<()>,
}

impl Recording {
    pub fn name(&self) -> &str { &self.name }
    pub fn metadata_path(&self) -> &str { &self.metadata_path }
    pub fn metadata(&self) -> &MetadataDocument { &self.metadata }
    pub fn dataset(&self) -> Option<&DatasetRef> { self.dataset.as_ref() }
    pub fn has_dataset(&self) -> bool { self.dataset.is_some() }

    /// The dataset payload, realized on first call and cached afterwards.
    /// `Ok(None)` for metadata-only recordings.
    ///
    /// Concurrent first calls realize once; the others wait for the result.
    /// A failed realization is not cached, so the next call retries.
    pub fn data(&self) -> Result<Option<&DatasetView>> {
        let Some(reference) = &self.dataset else { return Ok(None) };
        if let Some(view) = self.view.get() {
            return Ok(Some(view));
        }
        let _guard = self.realizing.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(view) = self.view.get() {
            return Ok(Some(view));
        }
        let view = reference.realize()?;
        Ok(Some(self.view.get_or_init(|| view)))
    }

    /// Samples per channel in the dataset, from its size and datatype.
    pub fn sample_count(&self) -> Option<u64> {
        let size     = self.dataset.as_ref()?.size();
        let datatype = self.metadata.datatype().ok()?;
        let per      = (datatype.sample_size() as u64).checked_mul(self.metadata.num_channels())?;
        Some(size / per)
    }
}

// ── RecordingSet ─────────────────────────────────────────────────────────────

/// Recordings of one archive, in the order their metadata was stored.
///
/// Dereferences to `[Recording]` for length, iteration and indexing.
#[derive(Debug)]
pub struct RecordingSet {
    path:       Option<PathBuf>,
    recordings: Vec<Recording>,
    warnings:   Vec<ArchiveWarning>,
}

impl RecordingSet {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        ArchiveReader::new().path(path).open()
    }

    pub fn from_buffer<B: Into<Bytes>>(buffer: B) -> Result<Self> {
        ArchiveReader::new().buffer(buffer).open()
    }

    /// Archive path, `None` for buffer-backed sets.
    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn warnings(&self) -> &[ArchiveWarning] { &self.warnings }

    pub fn get_by_name(&self, name: &str) -> Option<&Recording> {
        self.recordings.iter().find(|r| r.name == name)
    }
}

impl Deref for RecordingSet {
    type Target = [Recording];
    fn deref(&self) -> &[Recording] { &self.recordings }
}

impl<'a> IntoIterator for &'a RecordingSet {
    type Item     = &'a Recording;
    type IntoIter = std::slice::Iter<'a, Recording>;
    fn into_iter(self) -> Self::IntoIter { self.recordings.iter() }
}

impl IntoIterator for RecordingSet {
    type Item     = Recording;
    type IntoIter = std::vec::IntoIter<Recording>;
    fn into_iter(self) -> Self::IntoIter { self.recordings.into_iter() }
}

// ── ArchiveReader ────────────────────────────────────────────────────────────

/// Builder for opening an archive from exactly one of a path or a buffer.
#[derive(Debug, Clone, Default)]
pub struct ArchiveReader {
    path:    Option<PathBuf>,
    buffer:  Option<Bytes>,
    options: ReadOptions,
}

impl ArchiveReader {
    pub fn new() -> Self { Self::default() }

    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_owned());
        self
    }

    pub fn buffer<B: Into<Bytes>>(mut self, buffer: B) -> Self {
        self.buffer = Some(buffer.into());
        self
    }

    pub fn options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn skip_checksum(mut self, skip: bool) -> Self {
        self.options.skip_checksum = skip;
        self
    }

    pub fn map_readonly(mut self, readonly: bool) -> Self {
        self.options.map_readonly = readonly;
        self
    }

    /// Classify, group, load and bind every recording in one pass.
    ///
    /// Fails before any I/O when no source (or both) was given, and before
    /// the file is opened when the path lacks the `.sigmf` extension.  Any
    /// metadata failure fails the whole call; the container is released on
    /// every path out of this function.
    pub fn open(self) -> Result<RecordingSet> {
        let options = self.options;
        match (self.path, self.buffer) {
            (None, None) => {
                Err(SigmfError::Usage("either `path` or `buffer` must be provided"))
            }
            (Some(_), Some(_)) => {
                Err(SigmfError::Usage("`path` and `buffer` are mutually exclusive"))
            }
            (Some(path), None) => {
                if path.extension().and_then(OsStr::to_str) != Some(SIGMF_ARCHIVE_EXT) {
                    return Err(SigmfError::Format { path, expected: SIGMF_ARCHIVE_EXT });
                }
                let container = ArchiveContainer::open_file(&path)?;
                let backing   = DatasetBacking::File(Arc::new(path.clone()));
                let (recordings, warnings) = read_recordings(container, &backing, options)?;
                Ok(RecordingSet { path: Some(path), recordings, warnings })
            }
            (None, Some(buffer)) => {
                let container = ArchiveContainer::from_buffer(buffer.clone());
                let backing   = DatasetBacking::Buffer(buffer);
                let (recordings, warnings) = read_recordings(container, &backing, options)?;
                Ok(RecordingSet { path: None, recordings, warnings })
            }
        }
    }
}

// ── Parse pass ───────────────────────────────────────────────────────────────

fn read_recordings(
    mut container: ArchiveContainer,
    backing:       &DatasetBacking,
    options:       ReadOptions,
) -> Result<(Vec<Recording>, Vec<ArchiveWarning>)> {
    let mut warnings = Vec::new();
    let mut grouper  = Grouper::default();

    container.for_each_entry(|entry| {
        debug!(path = %entry.path, role = ?entry.role, offset = entry.offset, size = entry.size,
               "archive member");
        match entry.role {
            EntryRole::Collection => {
                note(&mut warnings, ArchiveWarning::UnhandledCollection { path: entry.path.clone() });
            }
            EntryRole::Unknown if entry.kind == EntryKind::File => {
                note(&mut warnings, ArchiveWarning::IgnoredFile { path: entry.path.clone() });
            }
            EntryRole::Unknown => {
                note(&mut warnings, ArchiveWarning::UnhandledEntry {
                    path: entry.path.clone(),
                    kind: entry.kind,
                });
            }
            EntryRole::Metadata | EntryRole::Dataset | EntryRole::Directory => {}
        }
        grouper.push(entry)?;
        Ok(())
    })?;
    let groups = grouper.finish();

    let mut recordings = Vec::with_capacity(groups.len());
    for group in groups {
        let metadata = load_metadata(&mut container, &group.metadata, &group.name)?;
        let dataset  = group.dataset.as_ref()
            .map(|d| dataset::bind(&group.name, backing, d, metadata.sha512(), options));
        info!(
            recording = %group.name,
            dataset   = ?dataset.as_ref().map(DatasetRef::size),
            "loaded recording"
        );
        recordings.push(Recording::new(group, metadata, dataset));
    }

    if !recordings.iter().any(Recording::has_dataset) {
        note(&mut warnings, ArchiveWarning::NoDatasets);
    }
    Ok((recordings, warnings))
}

/// Read a metadata member's bytes and hand them to the document parser.
fn load_metadata(
    container: &mut ArchiveContainer,
    entry:     &ContainerEntry,
    recording: &str,
) -> Result<MetadataDocument> {
    let bytes = container.read_range(entry.offset, entry.size)?;
    MetadataDocument::from_slice(&bytes).map_err(|source| SigmfError::Validation {
        recording: recording.to_owned(),
        source,
    })
}

fn note(warnings: &mut Vec<ArchiveWarning>, warning: ArchiveWarning) {
    warn!("{warning}");
    warnings.push(warning);
}

impl Recording {
    fn new(group: PendingRecording, metadata: MetadataDocument, dataset: Option<DatasetRef>) -> Self {
        Self {
            name:          group.name,
            metadata_path: group.metadata.path,
            metadata,
            dataset,
            view:          OnceLock::new(),
            realizing:     Mutex::new(()),
        }
    }
}

//! Lazy dataset binding.
//!
//! Binding a dataset entry records where its payload lives and nothing
//! else: a [`DatasetRef`] is an unrealized `(offset, size)` range plus the
//! backing needed to reach it.  [`DatasetRef::realize`] turns it into a
//! [`DatasetView`]:
//!
//! - file-backed archives are memory-mapped (read-only, or private
//!   copy-on-write when `map_readonly` is off);
//! - buffer-backed archives yield a zero-copy [`Bytes`] slice, always
//!   read-only.
//!
//! Unless `skip_checksum` is set, a view is checked against the recording's
//! `core:sha512` before it is returned.

use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use memmap2::{Mmap, MmapMut, MmapOptions};
use tracing::debug;

use crate::archive::ReadOptions;
use crate::checksum;
use crate::entry::ContainerEntry;
use crate::error::{Result, SigmfError};

#[derive(Debug, Clone)]
pub enum DatasetBacking {
    /// Archive on disk; reopened on realize.
    File(Arc<PathBuf>),
    Buffer(Bytes),
}

// ── DatasetRef ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DatasetRef {
    recording:       String,
    backing:         DatasetBacking,
    offset:          u64,
    size:            u64,
    expected_sha512: Option<String>,
    options:         ReadOptions,
}

/// Bind a dataset entry to its recording.  Reads nothing.
pub fn bind(
    recording:       &str,
    backing:         &DatasetBacking,
    entry:           &ContainerEntry,
    expected_sha512: Option<&str>,
    options:         ReadOptions,
) -> DatasetRef {
    DatasetRef {
        recording:       recording.to_owned(),
        backing:         backing.clone(),
        offset:          entry.offset,
        size:            entry.size,
        expected_sha512: expected_sha512.map(str::to_owned),
        options,
    }
}

impl DatasetRef {
    pub fn offset(&self) -> u64 { self.offset }
    pub fn size(&self) -> u64 { self.size }
    pub fn is_empty(&self) -> bool { self.size == 0 }
    pub fn backing(&self) -> &DatasetBacking { &self.backing }

    /// Produce a view of the payload, verifying its checksum unless skipped.
    pub fn realize(&self) -> Result<DatasetView> {
        let view = match &self.backing {
            _ if self.size == 0             => DatasetView::Shared(Bytes::new()),
            DatasetBacking::File(path)      => self.map_file(path)?,
            DatasetBacking::Buffer(buffer)  => self.slice_buffer(buffer)?,
        };
        debug!(
            recording = %self.recording,
            offset    = self.offset,
            size      = self.size,
            writable  = view.is_writable(),
            "realized dataset"
        );

        if !self.options.skip_checksum {
            if let Some(expected) = &self.expected_sha512 {
                checksum::verify(&view, expected).map_err(|e| SigmfError::ChecksumMismatch {
                    recording: self.recording.clone(),
                    expected:  e.expected,
                    actual:    e.actual,
                })?;
            }
        }
        Ok(view)
    }

    fn end_within(&self, len: u64) -> Result<usize> {
        self.offset.checked_add(self.size)
            .filter(|&end| end <= len)
            .and_then(|end| usize::try_from(end).ok())
            .ok_or_else(|| SigmfError::Malformed(format!(
                "dataset of `{}` at {}+{} lies outside a {len}-byte container",
                self.recording, self.offset, self.size
            )))
    }

    fn map_file(&self, path: &Path) -> Result<DatasetView> {
        let file = File::open(path)?;
        let end  = self.end_within(file.metadata()?.len())?;
        let mut opts = MmapOptions::new();
        opts.offset(self.offset).len(end - self.offset as usize);

        // SAFETY: the archive is opened read-only and nothing in this crate
        // writes to it; the copy-on-write map never writes through to disk.
        let view = if self.options.map_readonly {
            DatasetView::Mapped(unsafe { opts.map(&file)? })
        } else {
            DatasetView::Private(unsafe { opts.map_copy(&file)? })
        };
        Ok(view)
    }

    fn slice_buffer(&self, buffer: &Bytes) -> Result<DatasetView> {
        let end = self.end_within(buffer.len() as u64)?;
        Ok(DatasetView::Shared(buffer.slice(self.offset as usize..end)))
    }
}

// ── DatasetView ──────────────────────────────────────────────────────────────

/// A realized dataset payload.
pub enum DatasetView {
    Mapped(Mmap),
    /// Private copy-on-write mapping; writes stay in this process.
    Private(MmapMut),
    Shared(Bytes),
}

impl DatasetView {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            DatasetView::Mapped(m)  => &m[..],
            DatasetView::Private(m) => &m[..],
            DatasetView::Shared(b)  => &b[..],
        }
    }

    /// Mutable access, available only for copy-on-write maps.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            DatasetView::Private(m) => Some(&mut m[..]),
            _                       => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, DatasetView::Private(_))
    }
}

impl Deref for DatasetView {
    type Target = [u8];
    fn deref(&self) -> &[u8] { self.as_slice() }
}

impl AsRef<[u8]> for DatasetView {
    fn as_ref(&self) -> &[u8] { self.as_slice() }
}

impl fmt::Debug for DatasetView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            DatasetView::Mapped(_)  => "Mapped",
            DatasetView::Private(_) => "Private",
            DatasetView::Shared(_)  => "Shared",
        };
        f.debug_struct("DatasetView").field("kind", &kind).field("len", &self.len()).finish()
    }
}

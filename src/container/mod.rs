//! Container handle: the byte source behind an archive and the tar walk
//! over it.
//!
//! A container is either a file opened read-only or a shared in-memory
//! buffer.  Both are `Read + Seek`, so the walk can skip payloads instead of
//! reading them, and metadata payloads can be fetched afterwards by offset.
//! The handle is released when the container is dropped.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use tracing::trace;

use crate::entry::{ContainerEntry, EntryKind};
use crate::error::{Result, SigmfError};

// ── ContainerSource ──────────────────────────────────────────────────────────

pub enum ContainerSource {
    File(File),
    Buffer(Cursor<Bytes>),
}

impl Read for ContainerSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ContainerSource::File(f)   => f.read(buf),
            ContainerSource::Buffer(c) => c.read(buf),
        }
    }
}

impl Seek for ContainerSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            ContainerSource::File(f)   => f.seek(pos),
            ContainerSource::Buffer(c) => c.seek(pos),
        }
    }
}

// ── ArchiveContainer ─────────────────────────────────────────────────────────

pub struct ArchiveContainer {
    source: ContainerSource,
    len:    u64,
}

impl ArchiveContainer {
    pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len  = file.metadata()?.len();
        Ok(Self { source: ContainerSource::File(file), len })
    }

    pub fn from_buffer(buffer: Bytes) -> Self {
        let len = buffer.len() as u64;
        Self { source: ContainerSource::Buffer(Cursor::new(buffer)), len }
    }

    /// Total size of the underlying byte source.
    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Walk every member in stored order.  Payloads are skipped, not read;
    /// each member is handed to `f` as a [`ContainerEntry`] carrying its
    /// absolute payload offset.  The first error from `f` stops the walk.
    pub fn for_each_entry<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(ContainerEntry) -> Result<()>,
    {
        self.source.seek(SeekFrom::Start(0))?;
        let mut archive = tar::Archive::new(&mut self.source);
        for entry in archive.entries_with_seek()? {
            let entry = entry?;
            let path = String::from_utf8(entry.path_bytes().into_owned())
                .map_err(|e| SigmfError::Malformed(format!(
                    "member name is not UTF-8: {:?}",
                    String::from_utf8_lossy(e.as_bytes())
                )))?;
            let kind   = EntryKind::from(entry.header().entry_type());
            let offset = entry.raw_file_position();
            let size   = entry.size();
            f(ContainerEntry::new(path, kind, offset, size))?;
        }
        Ok(())
    }

    /// Read `size` bytes at absolute `offset`.
    pub fn read_range(&mut self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let end = offset.checked_add(size)
            .filter(|&end| end <= self.len)
            .ok_or_else(|| SigmfError::Malformed(format!(
                "range {offset}+{size} exceeds container size {}", self.len
            )))?;
        let mut buf = vec![0u8; (end - offset) as usize];
        self.source.seek(SeekFrom::Start(offset))?;
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl Drop for ArchiveContainer {
    fn drop(&mut self) {
        trace!(len = self.len, "container released");
    }
}

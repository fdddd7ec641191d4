pub mod error;
pub mod entry;
pub mod container;
pub mod grouping;
pub mod metadata;
pub mod checksum;
pub mod dataset;
pub mod archive;

pub use error::{Result, SigmfError};
pub use entry::{EntryKind, EntryRole, ContainerEntry, classify};
pub use metadata::{DataType, MetadataDocument, MetadataError};
pub use dataset::{DatasetRef, DatasetView};
pub use archive::{ArchiveReader, ArchiveWarning, ReadOptions, Recording, RecordingSet};

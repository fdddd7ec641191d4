//! Grouping of classified entries into recordings.
//!
//! The accumulator is a two-state machine driven by a fold over the
//! container's entries in stored order:
//!
//! | State   | Metadata                  | Dataset                      |
//! |---------|---------------------------|------------------------------|
//! | `Empty` | open a group              | `OrphanDataset`              |
//! | `Open`  | emit group, open new one  | attach, or `DuplicateDataset`|
//!
//! Collection, Directory and Unknown entries never change state.  End of
//! input emits the open group, if any.
//!
//! The greedy pass relies on the writer's ordering: a recording's metadata
//! precedes its dataset, and two recordings never interleave.  Input that
//! breaks that ordering in a detectable way is rejected rather than guessed
//! at; groups emitted before the offending entry are left untouched.

use thiserror::Error;

use crate::entry::{ContainerEntry, EntryRole, recording_name};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupingError {
    #[error("dataset `{path}` is not preceded by a metadata entry")]
    OrphanDataset { path: String },
    #[error("second dataset `{path}` for recording `{recording}`")]
    DuplicateDataset { recording: String, path: String },
}

/// A completed grouping: one metadata entry and at most one dataset entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecording {
    pub name:     String,
    pub metadata: ContainerEntry,
    pub dataset:  Option<ContainerEntry>,
}

impl PendingRecording {
    fn new(metadata: ContainerEntry) -> Self {
        Self { name: recording_name(&metadata.path), metadata, dataset: None }
    }
}

// ── Accumulator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Accumulator {
    #[default]
    Empty,
    Open(PendingRecording),
}

impl Accumulator {
    /// One transition.  Returns the next state and the group completed by
    /// this entry, if any.
    pub fn step(self, entry: ContainerEntry)
        -> Result<(Accumulator, Option<PendingRecording>), GroupingError>
    {
        match (entry.role, self) {
            (EntryRole::Metadata, Accumulator::Empty) => {
                Ok((Accumulator::Open(PendingRecording::new(entry)), None))
            }
            (EntryRole::Metadata, Accumulator::Open(done)) => {
                Ok((Accumulator::Open(PendingRecording::new(entry)), Some(done)))
            }
            (EntryRole::Dataset, Accumulator::Empty) => {
                Err(GroupingError::OrphanDataset { path: entry.path })
            }
            (EntryRole::Dataset, Accumulator::Open(mut group)) => {
                if group.dataset.is_some() {
                    return Err(GroupingError::DuplicateDataset {
                        recording: group.name,
                        path:      entry.path,
                    });
                }
                group.dataset = Some(entry);
                Ok((Accumulator::Open(group), None))
            }
            (EntryRole::Collection | EntryRole::Directory | EntryRole::Unknown, state) => {
                Ok((state, None))
            }
        }
    }

    /// End-of-input transition.
    pub fn finish(self) -> Option<PendingRecording> {
        match self {
            Accumulator::Empty       => None,
            Accumulator::Open(group) => Some(group),
        }
    }
}

// ── Grouper ──────────────────────────────────────────────────────────────────

/// Incremental fold over [`Accumulator::step`], for callers that receive
/// entries one at a time.  After a failed `push` the grouper is spent.
#[derive(Debug, Default)]
pub struct Grouper {
    state: Accumulator,
    done:  Vec<PendingRecording>,
}

impl Grouper {
    pub fn push(&mut self, entry: ContainerEntry) -> Result<(), GroupingError> {
        let (next, done) = std::mem::take(&mut self.state).step(entry)?;
        self.state = next;
        self.done.extend(done);
        Ok(())
    }

    /// Completed groups, in metadata order, including the one still open.
    pub fn finish(mut self) -> Vec<PendingRecording> {
        self.done.extend(self.state.finish());
        self.done
    }
}

/// Fold a whole entry sequence into completed groups, in metadata order.
pub fn group_entries<I>(entries: I) -> Result<Vec<PendingRecording>, GroupingError>
where
    I: IntoIterator<Item = ContainerEntry>,
{
    let mut grouper = Grouper::default();
    for entry in entries {
        grouper.push(entry)?;
    }
    Ok(grouper.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;

    fn file(path: &str, offset: u64, size: u64) -> ContainerEntry {
        ContainerEntry::new(path.to_owned(), EntryKind::File, offset, size)
    }

    fn dir(path: &str) -> ContainerEntry {
        ContainerEntry::new(path.to_owned(), EntryKind::Directory, 0, 0)
    }

    #[test]
    fn metadata_opens_a_group() {
        let (state, done) = Accumulator::Empty.step(file("a.sigmf-meta", 512, 10)).unwrap();
        assert!(done.is_none());
        match state {
            Accumulator::Open(g) => {
                assert_eq!(g.name, "a");
                assert!(g.dataset.is_none());
            }
            Accumulator::Empty => panic!("expected an open group"),
        }
    }

    #[test]
    fn second_metadata_flushes_first_group() {
        let (state, _) = Accumulator::Empty.step(file("a.sigmf-meta", 512, 10)).unwrap();
        let (state, done) = state.step(file("b.sigmf-meta", 1536, 10)).unwrap();
        let done = done.expect("first group flushed");
        assert_eq!(done.name, "a");
        assert!(done.dataset.is_none());
        assert_eq!(state.finish().map(|g| g.name), Some("b".to_owned()));
    }

    #[test]
    fn dataset_attaches_to_open_group() {
        let (state, _) = Accumulator::Empty.step(file("a.sigmf-meta", 512, 10)).unwrap();
        let (state, done) = state.step(file("a.sigmf-data", 1536, 40)).unwrap();
        assert!(done.is_none());
        let group = state.finish().unwrap();
        assert_eq!(group.dataset.map(|d| (d.offset, d.size)), Some((1536, 40)));
    }

    #[test]
    fn orphan_dataset_is_rejected() {
        let err = Accumulator::Empty.step(file("a.sigmf-data", 512, 40)).unwrap_err();
        assert_eq!(err, GroupingError::OrphanDataset { path: "a.sigmf-data".into() });
    }

    #[test]
    fn duplicate_dataset_is_rejected() {
        let err = group_entries(vec![
            file("a.sigmf-meta", 512, 10),
            file("a.sigmf-data", 1536, 40),
            file("b.sigmf-data", 2560, 40),
        ])
        .unwrap_err();
        assert_eq!(err, GroupingError::DuplicateDataset {
            recording: "a".into(),
            path:      "b.sigmf-data".into(),
        });
    }

    #[test]
    fn non_recording_entries_do_not_change_state() {
        let groups = group_entries(vec![
            dir("rec1/"),
            file("rec1/rec1.sigmf-meta", 1024, 10),
            file("notes.txt", 2048, 3),
            file("all.sigmf-collection", 3072, 5),
            file("rec1/rec1.sigmf-data", 4096, 8),
        ])
        .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "rec1");
        assert_eq!(groups[0].dataset.as_ref().map(|d| d.size), Some(8));
    }

    #[test]
    fn grouping_follows_metadata_order() {
        let groups = group_entries(vec![
            file("rec1.sigmf-meta", 512, 1),
            file("rec2.sigmf-meta", 1536, 1),
            file("rec2.sigmf-data", 2560, 16),
        ])
        .unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["rec1", "rec2"]);
        assert!(groups[0].dataset.is_none());
        assert!(groups[1].dataset.is_some());
    }

    #[test]
    fn grouper_flushes_open_group_on_finish() {
        let mut grouper = Grouper::default();
        grouper.push(file("a.sigmf-meta", 512, 1)).unwrap();
        grouper.push(file("a.sigmf-data", 1536, 4)).unwrap();
        grouper.push(file("b.sigmf-meta", 2560, 1)).unwrap();
        let names: Vec<_> = grouper.finish().into_iter().map(|g| g.name).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(group_entries(Vec::new()).unwrap().is_empty());
        assert!(group_entries(vec![dir("x/")]).unwrap().is_empty());
    }
}

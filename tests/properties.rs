mod common;

use common::{build_tar, metadata, samples, Member};
use proptest::prelude::*;
use sigmf_archive::archive::{ArchiveWarning, RecordingSet};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// N metadata entries, each optionally followed by its dataset, always
    /// give N recordings in stored order with matching dataset presence.
    #[test]
    fn recordings_follow_metadata_order(layout in prop::collection::vec(prop::option::of(0usize..64), 0..12)) {
        let names: Vec<String> = (0..layout.len()).map(|i| format!("rec{i}")).collect();
        let meta_paths: Vec<String> = names.iter().map(|n| format!("{n}/{n}.sigmf-meta")).collect();
        let data_paths: Vec<String> = names.iter().map(|n| format!("{n}/{n}.sigmf-data")).collect();

        let mut members = Vec::new();
        for (i, data) in layout.iter().enumerate() {
            members.push(Member::File(&meta_paths[i], metadata(None)));
            if let Some(n) = data {
                members.push(Member::File(&data_paths[i], samples(*n)));
            }
        }

        let set = RecordingSet::from_buffer(build_tar(&members)).unwrap();
        prop_assert_eq!(set.len(), layout.len());
        for (rec, (name, data)) in set.iter().zip(names.iter().zip(&layout)) {
            prop_assert_eq!(rec.name(), name.as_str());
            prop_assert_eq!(rec.dataset().map(|d| d.size()), data.map(|n| 4 * n as u64));
        }

        let no_data = layout.iter().all(Option::is_none);
        let warned = set.warnings().iter().filter(|w| **w == ArchiveWarning::NoDatasets).count();
        prop_assert_eq!(warned, usize::from(no_data));
    }
}

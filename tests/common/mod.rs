#![allow(dead_code)]

use serde_json::json;

pub enum Member<'a> {
    File(&'a str, Vec<u8>),
    Dir(&'a str),
    /// Path, link target.
    Symlink(&'a str, &'a str),
}

/// Metadata JSON for a `rf32_le` recording, with an optional checksum.
pub fn metadata(sha512: Option<&str>) -> Vec<u8> {
    let mut global = json!({
        "core:datatype":    "rf32_le",
        "core:version":     "1.0.0",
        "core:sample_rate": 48000,
    });
    if let Some(digest) = sha512 {
        global["core:sha512"] = json!(digest);
    }
    serde_json::to_vec(&json!({
        "global": global,
        "captures": [ { "core:sample_start": 0 } ],
        "annotations": [],
    }))
    .unwrap()
}

/// Little-endian f32 samples `0.0, 1.0, ...`.
pub fn samples(n: usize) -> Vec<u8> {
    (0..n).flat_map(|i| (i as f32).to_le_bytes()).collect()
}

pub fn build_tar(members: &[Member]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for member in members {
        let mut header = tar::Header::new_gnu();
        match member {
            Member::File(path, data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                builder.append_data(&mut header, path, data.as_slice()).unwrap();
            }
            Member::Dir(path) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder.append_data(&mut header, path, std::io::empty()).unwrap();
            }
            Member::Symlink(path, target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                header.set_link_name(target).unwrap();
                builder.append_data(&mut header, path, std::io::empty()).unwrap();
            }
        }
    }
    builder.into_inner().unwrap()
}

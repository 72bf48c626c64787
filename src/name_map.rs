//! Mapping from garbled internal names to readable ones.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use log::warn;

use crate::encoding::NameEncoding;
use crate::entry::ArchiveEntry;

/// Internal name → corrected name, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    names: IndexMap<String, String>,
}

impl NameMap {
    pub fn get(&self, internal_name: &str) -> Option<&str> {
        self.names.get(internal_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(internal, corrected)` pairs in archive order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn corrected_names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    /// Corrected names claimed by more than one internal name.
    ///
    /// Extraction does not deduplicate these: the later entry overwrites
    /// the earlier one's output.
    pub fn collisions(&self) -> Vec<&str> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut collisions = Vec::new();
        for corrected in self.corrected_names() {
            let count = seen.entry(corrected).or_insert(0);
            *count += 1;
            if *count == 2 {
                collisions.push(corrected);
            }
        }
        collisions
    }
}

impl FromIterator<(String, String)> for NameMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Build the name map of `entries` under `encoding`.
///
/// Flagged entries keep their internal name verbatim. The mapping is total:
/// undecodable bytes become U+FFFD.
pub fn build_name_map(entries: &[ArchiveEntry], encoding: NameEncoding) -> NameMap {
    let map: NameMap = entries
        .iter()
        .map(|entry| {
            let corrected = match entry.byte_name() {
                (true, _) => entry.internal_name.clone(),
                (false, raw) => encoding.decode(raw),
            };
            (entry.internal_name.clone(), corrected)
        })
        .collect();

    for name in map.collisions() {
        warn!("Several entries decode to '{}', only the last one is kept", name);
    }

    map
}

/// Whether every entry lives under one folder named after the archive.
///
/// The lexicographically first corrected name is the candidate root. An
/// archive with a shorter unrelated entry at the top level is not detected.
pub fn has_duplicated_root_name(name_map: &NameMap, archive_path: &Path) -> bool {
    let Some(root) = name_map.corrected_names().min() else {
        return false;
    };

    if !name_map.corrected_names().all(|name| name.starts_with(root)) {
        return false;
    }

    match archive_path.file_stem() {
        Some(stem) => format!("{}/", stem.to_string_lossy()) == root,
        None => false,
    }
}

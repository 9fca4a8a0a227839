use crate::types::{BookEntry, RemoteEntry};
use std::collections::{HashMap, HashSet};

/// Join the local rows onto the remote list by push key.
///
/// Remote order and remote fields win; a matching local row lends its row id.
/// Local rows without a key, or whose key the remote list does not know, are
/// kept after the remote entries. A key appearing twice is kept once.
pub fn merge_by_key(user_id: i64, local: &[BookEntry], remote: Vec<RemoteEntry>) -> Vec<BookEntry> {
    let local_ids: HashMap<&str, i64> = local
        .iter()
        .filter_map(|e| Some((e.remote_key.as_deref()?, e.local_id?)))
        .collect();

    let mut seen: HashSet<String> = HashSet::with_capacity(remote.len());
    let mut merged = Vec::with_capacity(remote.len() + local.len());
    for entry in remote {
        if !seen.insert(entry.key.clone()) {
            continue;
        }
        let local_id = local_ids.get(entry.key.as_str()).copied();
        let mut book = BookEntry::from_remote(user_id, entry);
        book.local_id = local_id;
        merged.push(book);
    }

    merged.extend(
        local
            .iter()
            .filter(|e| e.remote_key.as_ref().is_none_or(|k| !seen.contains(k)))
            .cloned(),
    );
    merged
}

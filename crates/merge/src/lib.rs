//! # Overview
//!
//! `merge` is the pure three-way reconciliation algorithm (spec §4.5,
//! component `C5`): given a common ancestor snapshot and two descendants,
//! decide what survives into the new server snapshot and which server-side
//! items were displaced and need a conflict rename.
//!
//! The decision table below is a literal translation of the original
//! `calculate_merge` (see spec §4.5); nothing here depends on iteration
//! order of the input sets, which is what makes the merge-determinism
//! property (spec §8) hold by construction.

use std::collections::{BTreeMap, HashMap, HashSet};

use wire::{FileItem, SyncError, SyncResult};

/// Output of [`merge`]: the reconciled path -> item mapping, plus the
/// server-side items that were displaced by a conflicting client change and
/// still need renaming (spec §4.5's "keep both" cases).
#[derive(Debug, PartialEq, Eq)]
pub struct MergeResult {
    pub new_tree: BTreeMap<String, FileItem>,
    pub conflict: Vec<FileItem>,
}

fn tree(bag: &HashSet<FileItem>) -> SyncResult<HashMap<String, &FileItem>> {
    let mut map = HashMap::with_capacity(bag.len());
    for item in bag {
        if map.insert(item.path.clone(), item).is_some() {
            return Err(SyncError::InvariantViolation(format!(
                "duplicate path in bag: {}",
                item.path
            )));
        }
    }
    Ok(map)
}

/// Reconciles `client` and `server` against their common ancestor `old`.
pub fn merge(
    old: &HashSet<FileItem>,
    client: &HashSet<FileItem>,
    server: &HashSet<FileItem>,
) -> SyncResult<MergeResult> {
    let client_tree = tree(client)?;
    let old_tree = tree(old)?;
    let server_tree = tree(server)?;

    let mut new_tree = BTreeMap::new();
    let mut conflict_set: HashSet<FileItem> = HashSet::new();

    // Paths not in `old`.
    for (path, item) in &client_tree {
        if old_tree.contains_key(path) {
            continue;
        }
        match server_tree.get(path) {
            None => {
                new_tree.insert(path.clone(), (*item).clone());
            }
            Some(server_item) => {
                // Created on both sides: keep client, server's version conflicts.
                new_tree.insert(path.clone(), (*item).clone());
                conflict_set.insert((*server_item).clone());
            }
        }
    }
    for (path, item) in &server_tree {
        if old_tree.contains_key(path) || client_tree.contains_key(path) {
            continue;
        }
        new_tree.insert(path.clone(), (*item).clone());
    }

    // Paths present in `old`.
    for (path, old_item) in &old_tree {
        let client_item = client_tree.get(path);
        let server_item = server_tree.get(path);

        match client_item {
            Some(c) if c.content_eq(old_item) => match server_item {
                Some(s) if s.content_eq(old_item) => {
                    new_tree.insert(path.clone(), (*old_item).clone());
                }
                None => { /* removed on server */ }
                Some(s) => {
                    new_tree.insert(path.clone(), (*s).clone());
                }
            },
            None => match server_item {
                Some(s) if s.content_eq(old_item) => { /* removed on client */ }
                None => { /* removed on both */ }
                Some(s) => {
                    new_tree.insert(path.clone(), (*s).clone());
                }
            },
            Some(c) => match server_item {
                Some(s) if s.content_eq(old_item) => {
                    new_tree.insert(path.clone(), (*c).clone());
                }
                None => {
                    new_tree.insert(path.clone(), (*c).clone());
                }
                Some(s) => {
                    new_tree.insert(path.clone(), (*c).clone());
                    conflict_set.insert((*s).clone());
                }
            },
        }
    }

    let mut conflict: Vec<FileItem> = conflict_set.into_iter().collect();
    conflict.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(MergeResult { new_tree, conflict })
}

/// Renames each conflicting item to the smallest-numbered `.1`, `.2`, ...
/// suffix that doesn't collide with a live path in `new_tree`, then
/// inserts it. `conflict` must already be sorted by path (spec's
/// "Conflict rename determinism" design note) so the assignment of
/// suffixes is reproducible run to run.
pub fn rename_conflicts(new_tree: &mut BTreeMap<String, FileItem>, conflict: &[FileItem]) {
    for item in conflict {
        let mut suffix = 1u64;
        let renamed_path = loop {
            let candidate = format!("{}.{suffix}", item.path);
            if !new_tree.contains_key(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        let renamed = FileItem {
            path: renamed_path.clone(),
            ..item.clone()
        };
        new_tree.insert(renamed_path, renamed);
    }
}

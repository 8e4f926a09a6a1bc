use std::collections::BTreeSet;

use crate::build::{ProjectSummary, TreeSummary};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Added(String),
    Removed(String),
    Modified(String),
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Added(p) | Change::Removed(p) | Change::Modified(p) => p,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Change::Added(_) => "added",
            Change::Removed(_) => "removed",
            Change::Modified(_) => "modified",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeDiff {
    pub changes: Vec<Change>,
    /// Projects skipped because their checksums matched.
    pub unchanged_projects: usize,
    /// Documents compared inside changed projects whose checksums matched.
    pub unchanged_documents: usize,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compare two summaries top down, descending only where checksums differ.
pub fn diff_trees(old: &TreeSummary, new: &TreeSummary) -> TreeDiff {
    let mut diff = TreeDiff::default();
    if old.solution == new.solution {
        diff.unchanged_projects = new.projects.len();
        return diff;
    }

    let names: BTreeSet<&String> = old.projects.keys().chain(new.projects.keys()).collect();
    for name in names {
        match (old.projects.get(name), new.projects.get(name)) {
            (Some(a), Some(b)) if a.checksum == b.checksum => diff.unchanged_projects += 1,
            (a, b) => diff_documents(a, b, &mut diff),
        }
    }
    diff
}

fn diff_documents(old: Option<&ProjectSummary>, new: Option<&ProjectSummary>, diff: &mut TreeDiff) {
    let old_docs = old.map(|p| &p.documents);
    let new_docs = new.map(|p| &p.documents);
    let paths: BTreeSet<&String> = old_docs
        .into_iter()
        .flat_map(|d| d.keys())
        .chain(new_docs.into_iter().flat_map(|d| d.keys()))
        .collect();

    for path in paths {
        let before = old_docs.and_then(|d| d.get(path));
        let after = new_docs.and_then(|d| d.get(path));
        match (before, after) {
            (Some(a), Some(b)) if a == b => diff.unchanged_documents += 1,
            (Some(_), Some(_)) => diff.changes.push(Change::Modified(path.clone())),
            (None, Some(_)) => diff.changes.push(Change::Added(path.clone())),
            (Some(_), None) => diff.changes.push(Change::Removed(path.clone())),
            (None, None) => {}
        }
    }
}

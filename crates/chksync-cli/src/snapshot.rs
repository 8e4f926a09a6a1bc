//! Directory snapshots.
//!
//! Every top-level directory is a project and every file below it a
//! document. Files directly in the root form the `.` project. Hidden entries
//! are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use walkdir::{DirEntry, WalkDir};

pub const ROOT_PROJECT: &str = ".";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    pub project: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Project {
    pub documents: BTreeMap<String, Document>,
}

/// Immutable view of a directory tree at load time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub root: PathBuf,
    pub projects: BTreeMap<String, Project>,
}

impl Solution {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }
        let mut projects: BTreeMap<String, Project> = BTreeMap::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walker {
            let entry = entry.with_context(|| format!("walking {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root)?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let project = match path.split_once('/') {
                Some((dir, _)) => dir.to_string(),
                None => ROOT_PROJECT.to_string(),
            };
            let bytes = fs::read(entry.path())
                .with_context(|| format!("reading {}", entry.path().display()))?;
            let document = Document {
                id: DocumentId {
                    project: project.clone(),
                    path: path.clone(),
                },
                text: String::from_utf8_lossy(&bytes).into_owned(),
            };
            projects.entry(project).or_default().documents.insert(path, document);
        }

        Ok(Self {
            root: root.to_path_buf(),
            projects,
        })
    }

    pub fn document_count(&self) -> usize {
        self.projects.values().map(|p| p.documents.len()).sum()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

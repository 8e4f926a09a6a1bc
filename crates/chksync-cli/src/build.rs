//! Checksum trees for directory snapshots.
//!
//! Layout, top down: `SolutionState -> Projects -> ProjectState ->
//! Documents -> DocumentState -> SourceText`. Projects and documents carry a
//! small attributes asset next to their content so that a rename changes the
//! checksum even when the text does not.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::Arc;

use anyhow::Context;
use chksync_crypto::JsonSerializer;
use chksync_store::{Asset, ChecksumObjectWithChildren, StoreResult};
use chksync_tree::{CancellationToken, ChecksumTreeNode, RootChecksumTreeNode, TreeConfig, TreeResult};
use chksync_types::{Checksum, Kind};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::debug;

use crate::snapshot::{Document, DocumentId, Project, ProjectId, Solution};

pub const PROJECT_ATTRIBUTES: Kind = Kind::from_static("ProjectAttributes");
pub const DOCUMENT_ATTRIBUTES: Kind = Kind::from_static("DocumentAttributes");

/// Result key for solution-level objects on the root node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SolutionKey;

#[derive(Serialize)]
struct ProjectAttributes<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct DocumentAttributes<'a> {
    path: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectSummary {
    pub checksum: Checksum,
    pub documents: BTreeMap<String, Checksum>,
}

/// Checksums of every project and document, keyed by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeSummary {
    pub solution: Checksum,
    pub projects: BTreeMap<String, ProjectSummary>,
}

impl TreeSummary {
    pub fn document_count(&self) -> usize {
        self.projects.values().map(|p| p.documents.len()).sum()
    }
}

pub struct BuiltTree {
    pub tree: Arc<RootChecksumTreeNode<Solution>>,
    pub summary: TreeSummary,
}

fn composite<K>(
    _: K,
    children: Vec<Checksum>,
    kind: Kind,
    _: CancellationToken,
) -> Ready<Result<ChecksumObjectWithChildren, Infallible>> {
    ready(Ok(ChecksumObjectWithChildren::new(kind, children)))
}

fn attributes<K, T: Serialize>(
    _: K,
    value: T,
    kind: Kind,
    _: CancellationToken,
) -> Ready<StoreResult<Asset>> {
    ready(Asset::from_value(&JsonSerializer, kind, &value))
}

/// Build the full tree for `solution`. Documents of a project are built
/// concurrently.
pub async fn build_tree(
    solution: Solution,
    config: TreeConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<BuiltTree> {
    let tree = Arc::new(RootChecksumTreeNode::with_config(Arc::new(solution), config));
    let snapshot = Arc::clone(tree.snapshot());

    let mut projects = BTreeMap::new();
    for (name, project) in &snapshot.projects {
        let summary = build_project(&tree, name, project, cancel)
            .await
            .with_context(|| format!("building project {name}"))?;
        projects.insert(name.clone(), summary);
    }

    let project_states: Vec<Checksum> = projects.values().map(|p| p.checksum).collect();
    let all_projects = tree
        .get_or_create_checksum_object_with_children(
            SolutionKey,
            project_states,
            Kind::PROJECTS,
            composite,
            cancel,
        )
        .await?;
    let solution = tree
        .get_or_create_checksum_object_with_children(
            SolutionKey,
            vec![all_projects.checksum()],
            Kind::SOLUTION_STATE,
            composite,
            cancel,
        )
        .await?;

    debug!(
        solution = %solution.checksum().short_hex(),
        projects = projects.len(),
        "built checksum tree"
    );
    Ok(BuiltTree {
        tree,
        summary: TreeSummary {
            solution: solution.checksum(),
            projects,
        },
    })
}

async fn build_project(
    tree: &RootChecksumTreeNode<Solution>,
    name: &str,
    project: &Project,
    cancel: &CancellationToken,
) -> anyhow::Result<ProjectSummary> {
    let id = ProjectId(name.to_string());
    let node = tree.get_or_create_sub_tree_node(id.clone());

    let mut tasks = JoinSet::new();
    for document in project.documents.values() {
        let node = Arc::clone(&node);
        let document = document.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let checksum = document_state(&node, &document, &cancel).await?;
            Ok::<_, chksync_tree::TreeError>((document.id.path, checksum))
        });
    }
    let mut documents = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (path, checksum) = joined.context("document task failed")??;
        documents.insert(path, checksum);
    }

    let document_states: Vec<Checksum> = documents.values().copied().collect();
    let all_documents = node
        .get_or_create_checksum_object_with_children(
            id.clone(),
            document_states,
            Kind::DOCUMENTS,
            composite,
            cancel,
        )
        .await?;
    let attrs = node
        .get_or_create_asset(
            id.clone(),
            ProjectAttributes { name },
            PROJECT_ATTRIBUTES,
            attributes,
            cancel,
        )
        .await?;
    let state = node
        .get_or_create_checksum_object_with_children(
            id,
            vec![attrs.checksum(), all_documents.checksum()],
            Kind::PROJECT_STATE,
            composite,
            cancel,
        )
        .await?;

    Ok(ProjectSummary {
        checksum: state.checksum(),
        documents,
    })
}

async fn document_state(
    project: &ChecksumTreeNode,
    document: &Document,
    cancel: &CancellationToken,
) -> TreeResult<Checksum> {
    let id: &DocumentId = &document.id;
    let node = project.get_or_create_sub_tree_node(id.clone());

    let attrs = node
        .get_or_create_asset(
            id.clone(),
            DocumentAttributes { path: &id.path },
            DOCUMENT_ATTRIBUTES,
            attributes,
            cancel,
        )
        .await?;
    let text = node
        .get_or_create_asset(
            id.clone(),
            document.text.clone(),
            Kind::SOURCE_TEXT,
            |_, text: String, kind, _| ready(Ok::<_, Infallible>(Asset::new(kind, text.into_bytes()))),
            cancel,
        )
        .await?;
    let state = node
        .get_or_create_checksum_object_with_children(
            id.clone(),
            vec![attrs.checksum(), text.checksum()],
            Kind::DOCUMENT_STATE,
            composite,
            cancel,
        )
        .await?;
    Ok(state.checksum())
}

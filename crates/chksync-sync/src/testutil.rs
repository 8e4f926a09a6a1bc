use std::sync::Arc;

use chksync_store::{Asset, ChecksumObjectWithChildren};
use chksync_tree::{CancellationToken, RootChecksumTreeNode};
use chksync_types::{Checksum, Kind};

pub(crate) type Files = Vec<(String, String)>;

pub(crate) struct Host {
    pub(crate) tree: Arc<RootChecksumTreeNode<Files>>,
    pub(crate) root: Checksum,
}

/// A one-project tree: a `DOCUMENTS` composite over one `SOURCE_TEXT`
/// asset per file.
pub(crate) async fn build_host(files: &[(&str, &str)]) -> Host {
    let files: Files = files
        .iter()
        .map(|(name, text)| (name.to_string(), text.to_string()))
        .collect();
    let tree = Arc::new(RootChecksumTreeNode::new(Arc::new(files)));
    let cancel = CancellationToken::new();

    let mut children = Vec::new();
    for (name, text) in tree.snapshot().iter() {
        let asset = tree
            .get_or_create_sub_tree_node(name.clone())
            .get_or_create_asset(
                name.clone(),
                text.clone(),
                Kind::SOURCE_TEXT,
                |_, text: String, kind, _| async move {
                    Ok::<_, String>(Asset::new(kind, text.into_bytes()))
                },
                &cancel,
            )
            .await
            .unwrap();
        children.push(asset.checksum());
    }

    let root = tree
        .get_or_create_checksum_object_with_children(
            "documents",
            children,
            Kind::DOCUMENTS,
            |_, children: Vec<Checksum>, kind, _| async move {
                Ok::<_, String>(ChecksumObjectWithChildren::new(kind, children))
            },
            &cancel,
        )
        .await
        .unwrap()
        .checksum();

    Host { tree, root }
}

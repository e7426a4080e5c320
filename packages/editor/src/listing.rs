//! Document list grouped by collection

use hugocms_common::{CmsConfig, DocumentSummary};
use serde::Serialize;

/// Label of the group holding files outside every collection folder
pub const OTHERS_LABEL: &str = "Others";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentGroup {
    /// Collection name, `None` for the "Others" group
    pub collection: Option<String>,
    pub label: String,
    pub documents: Vec<DocumentSummary>,
}

/// Group summaries by collection, in schema order, with unmatched files
/// last. Empty groups are left out.
pub fn group_documents(summaries: &[DocumentSummary], config: &CmsConfig) -> Vec<DocumentGroup> {
    let mut groups: Vec<DocumentGroup> = config
        .collections
        .iter()
        .map(|collection| DocumentGroup {
            collection: Some(collection.name.clone()),
            label: collection.display_label().to_string(),
            documents: Vec::new(),
        })
        .collect();
    let mut others = Vec::new();

    for summary in summaries {
        match config
            .collections
            .iter()
            .position(|c| c.contains(&summary.path))
        {
            Some(index) => groups[index].documents.push(summary.clone()),
            None => others.push(summary.clone()),
        }
    }

    groups.push(DocumentGroup {
        collection: None,
        label: OTHERS_LABEL.to_string(),
        documents: others,
    });
    groups.retain(|g| !g.documents.is_empty());
    groups
}

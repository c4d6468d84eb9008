use chrono::{DateTime, Utc};
use serde::Serialize;

use super::preview::PreviewCategory;
use super::request::ListQuery;
use super::{access, labels, namespace as namespaces};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{File, Label, LabelKind, Namespace, User};

pub const VERBOSE_MIME: u8 = 1;
pub const VERBOSE_LABELS: u8 = 2;
pub const VERBOSE_NAMESPACE: u8 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub id: i64,
    pub name: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SummaryAttributes>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryAttributes {
    pub tags: Vec<String>,
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

fn label_names(labels: &[Label]) -> Vec<String> {
    labels.iter().map(|l| l.name.clone()).collect()
}

fn summarize(file: File, namespace: &Namespace, verbosity: u8) -> FileSummary {
    let mut summary = FileSummary {
        id: file.id,
        size: file.size,
        created_at: file.created_at,
        is_public: file.is_shared(),
        public_name: file.public_name().map(str::to_string),
        mime_type: None,
        preview: None,
        attributes: None,
        name: file.name,
    };

    if verbosity >= VERBOSE_MIME {
        summary.preview = Some(PreviewCategory::from_mime(&file.mime_type));
        summary.mime_type = Some(file.mime_type);
    }
    if verbosity >= VERBOSE_LABELS {
        summary.attributes = Some(SummaryAttributes {
            tags: label_names(&file.tags),
            groups: label_names(&file.groups),
            namespace: (verbosity >= VERBOSE_NAMESPACE).then(|| namespace.name.clone()),
        });
    }
    summary
}

/// Resolves filter names to existing labels. Naming labels of which none
/// exist is an error rather than an empty result.
fn resolve_filter(
    store: &dyn Store,
    kind: LabelKind,
    namespace: &Namespace,
    names: &[String],
) -> Result<Vec<Label>> {
    if labels::normalize(names).is_empty() {
        return Ok(Vec::new());
    }
    let found = labels::find_existing(store, kind, namespace, names)?;
    if found.is_empty() {
        return Err(Error::not_found(format!("no matching {} found", kind.as_str())));
    }
    Ok(found)
}

/// Lists files in a namespace, ordered by id.
///
/// A file must carry at least one of the requested tags and at least one of
/// the requested groups. Higher verbosity attaches more detail to each entry.
pub fn list_files(store: &dyn Store, caller: &User, query: &ListQuery) -> Result<Vec<FileSummary>> {
    let namespace = namespaces::resolve_namespace(store, &query.namespace, caller)?;
    access::require_read(caller, &namespace)?;

    let tags = resolve_filter(store, LabelKind::Tag, &namespace, &query.tags)?;
    let groups = resolve_filter(store, LabelKind::Group, &namespace, &query.groups)?;

    if !namespace.is_persisted() {
        return Ok(Vec::new());
    }

    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let load_tags = !tags.is_empty() || query.verbosity >= VERBOSE_LABELS;
    let load_groups = !groups.is_empty() || query.verbosity >= VERBOSE_LABELS;

    let mut summaries = Vec::new();
    for mut file in store.list_files(namespace.id, name)? {
        if load_tags {
            file.tags = store.list_file_labels(LabelKind::Tag, file.id)?;
        }
        if load_groups {
            file.groups = store.list_file_labels(LabelKind::Group, file.id)?;
        }

        if !tags.is_empty() && !labels::contains_any(&file.tags, &tags) {
            continue;
        }
        if !groups.is_empty() && !labels::contains_any(&file.groups, &groups) {
            continue;
        }
        summaries.push(summarize(file, &namespace, query.verbosity));
    }
    Ok(summaries)
}

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::preview::{PreviewCategory, format_size};
use super::query::{self, FileSummary};
use super::request::{FileSelector, FileUpdate, FlagValue, ListQuery, UploadRequest, UploadSource};
use super::{access, labels, names, namespace as namespaces};
use crate::error::{Error, Result};
use crate::fetch::{RemoteFetcher, media_type, parse_http_url};
use crate::storage::{BlobReader, BlobStorage};
use crate::store::Store;
use crate::types::{File, Label, LabelKind, Namespace, User};
use crate::validation::validate_file_name;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Outcome of addressing a file by name and optional id.
#[derive(Debug)]
pub enum FileLookup {
    Unique(File),
    Ambiguous,
    NotFound,
}

impl FileLookup {
    pub fn into_result(self) -> Result<File> {
        match self {
            FileLookup::Unique(file) => Ok(file),
            FileLookup::Ambiguous => Err(Error::Ambiguous),
            FileLookup::NotFound => Err(Error::not_found("file not found")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NothingToDo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Read,
    Write,
}

/// What the public preview page shows about a shared file.
#[derive(Debug, Clone, Serialize)]
pub struct PublicFileInfo {
    pub name: String,
    pub public_name: String,
    pub size: i64,
    pub size_text: String,
    pub mime_type: String,
    pub preview: PreviewCategory,
    pub created_at: DateTime<Utc>,
}

enum Payload {
    Inline(Vec<u8>),
    Remote(Url),
}

/// Hex SHA-256 of `bytes`, the digest inline uploads are checked against.
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn decode_inline(data: &str, sum: &str) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_| Error::Unprocessable("data is not valid base64".into()))?;
    if !checksum(&bytes).eq_ignore_ascii_case(sum.trim()) {
        return Err(Error::Unprocessable(
            "checksum mismatch, content was not delivered completely".into(),
        ));
    }
    Ok(bytes)
}

fn label_ids(labels: &[Label]) -> BTreeSet<i64> {
    labels.iter().map(|l| l.id).collect()
}

fn inline_mime_type(requested: Option<&str>) -> String {
    requested
        .and_then(media_type)
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

/// Finds the file a selector addresses within `namespace`.
pub fn locate(store: &dyn Store, namespace: &Namespace, selector: &FileSelector) -> Result<FileLookup> {
    let name = selector.name.trim();
    let id = selector.id();
    if name.is_empty() && id.is_none() {
        return Err(Error::BadRequest("file name or id required".into()));
    }
    if !namespace.is_persisted() {
        return Ok(FileLookup::NotFound);
    }

    let count = store.count_files(namespace.id, name, id)?;
    if count == 0 {
        return Ok(FileLookup::NotFound);
    }
    if count > 1 && id.is_none() {
        return Ok(FileLookup::Ambiguous);
    }

    Ok(store
        .find_file(namespace.id, name, id)?
        .map_or(FileLookup::NotFound, FileLookup::Unique))
}

/// Runs every file operation: upload, lookup, update, publish, delete and
/// public access.
#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn Store>,
    storage: BlobStorage,
    fetcher: RemoteFetcher,
}

impl FileService {
    pub fn new(store: Arc<dyn Store>, storage: BlobStorage, fetcher: RemoteFetcher) -> Self {
        Self {
            store,
            storage,
            fetcher,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Stores a new file.
    ///
    /// Every check that can fail cheaply runs before any byte is written. The
    /// record is inserted only once the bytes are committed, and the bytes are
    /// removed again if the insert fails.
    pub async fn upload(&self, caller: &User, request: UploadRequest) -> Result<File> {
        let store = self.store();

        let payload = match &request.source {
            UploadSource::Inline { data, sum } => {
                access::require_upload_files(caller)?;
                Payload::Inline(decode_inline(data, sum)?)
            }
            UploadSource::Url { url } => {
                access::require_upload_urls(caller)?;
                let url = parse_http_url(url)
                    .ok_or_else(|| Error::Unprocessable("missing or malformed url".into()))?;
                Payload::Remote(url)
            }
        };

        let name = match request.name.trim() {
            "" => names::random_name(names::DISPLAY_NAME_LEN),
            name => {
                validate_file_name(name)?;
                name.to_string()
            }
        };

        let namespace =
            namespaces::resolve_namespace(store, &request.attributes.namespace, caller)?;
        access::require_write(caller, &namespace)?;
        let namespace = namespaces::materialize(store, namespace)?;

        let tags =
            labels::resolve_or_create(store, LabelKind::Tag, &namespace, &request.attributes.tags)?;
        let groups = labels::resolve_or_create(
            store,
            LabelKind::Group,
            &namespace,
            &request.attributes.groups,
        )?;

        let local_name = names::allocate_storage_name(store)?;
        let public_alias = if request.public {
            Some(names::allocate_public_alias(
                store,
                request.public_name.as_deref(),
                None,
            )?)
        } else {
            None
        };

        let (size, mime_type) = match payload {
            Payload::Inline(bytes) => {
                let size = self.write_inline(&local_name, &bytes).await?;
                (size, inline_mime_type(request.mime_type.as_deref()))
            }
            Payload::Remote(url) => self.write_remote(&local_name, &url).await?,
        };

        let now = Utc::now();
        let mut file = File {
            id: 0,
            local_name,
            name,
            namespace_id: namespace.id,
            size,
            mime_type,
            is_public: public_alias.is_some(),
            public_alias,
            tags,
            groups,
            created_at: now,
            updated_at: now,
        };

        match store.create_file(&file) {
            Ok(id) => file.id = id,
            Err(e) => {
                self.discard(&file.local_name).await;
                return Err(e);
            }
        }

        tracing::info!(
            "{} uploaded '{}' ({} bytes) to {}",
            caller.username,
            file.name,
            file.size,
            namespace.name
        );
        Ok(file)
    }

    async fn write_inline(&self, local_name: &str, bytes: &[u8]) -> Result<i64> {
        let mut writer = self.storage.create(local_name).await?;
        if let Err(e) = writer.write(bytes).await {
            writer.abort().await;
            return Err(e.into());
        }
        Ok(writer.commit().await?)
    }

    async fn write_remote(&self, local_name: &str, url: &Url) -> Result<(i64, String)> {
        let mut response = self.fetcher.fetch(url).await?;
        if !response.is_success() {
            tracing::debug!("Fetching {url} returned {}", response.status());
            return Err(Error::BadRequest(format!(
                "non ok response: {}",
                response.status()
            )));
        }
        let mime_type = response
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        let mut writer = self.storage.create(local_name).await?;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    writer.abort().await;
                    return Err(e.into());
                }
            };
            if let Err(e) = writer.write(&chunk).await {
                writer.abort().await;
                return Err(e.into());
            }
        }

        let size = writer.commit().await?;
        Ok((size, mime_type))
    }

    async fn discard(&self, local_name: &str) {
        if let Err(e) = self.storage.delete(local_name).await {
            tracing::error!("Failed to remove orphaned blob {local_name}: {e}");
        }
    }

    /// Resolves the selector's namespace, checks the caller may act on it and
    /// locates exactly one file.
    pub fn resolve_target(
        &self,
        caller: &User,
        selector: &FileSelector,
        intent: Intent,
    ) -> Result<(Namespace, File)> {
        let store = self.store();
        let namespace = namespaces::resolve_namespace(store, &selector.namespace, caller)?;
        match intent {
            Intent::Read => access::require_read(caller, &namespace)?,
            Intent::Write => access::require_write(caller, &namespace)?,
        }
        let file = locate(store, &namespace, selector)?.into_result()?;
        Ok((namespace, file))
    }

    pub async fn get(&self, caller: &User, selector: &FileSelector) -> Result<(File, BlobReader)> {
        let (_, file) = self.resolve_target(caller, selector, Intent::Read)?;
        let (reader, _) = self.storage.open(&file.local_name).await?;
        Ok((file, reader))
    }

    pub fn list(&self, caller: &User, query: &ListQuery) -> Result<Vec<FileSummary>> {
        query::list_files(self.store(), caller, query)
    }

    /// Applies every requested change and reports whether anything changed.
    /// Input is validated before anything is written.
    pub fn update(
        &self,
        caller: &User,
        selector: &FileSelector,
        update: &FileUpdate,
    ) -> Result<UpdateOutcome> {
        if update
            .new_namespace
            .as_deref()
            .is_some_and(|ns| !ns.trim().is_empty())
        {
            return Err(Error::Unsupported(
                "moving files between namespaces is not supported".into(),
            ));
        }

        let visibility = update
            .is_public
            .as_ref()
            .map(FlagValue::parse)
            .transpose()?;
        let new_name = match update.new_name.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => {
                validate_file_name(name)?;
                Some(name.to_string())
            }
        };

        let (namespace, mut file) = self.resolve_target(caller, selector, Intent::Write)?;
        if visibility == Some(true) && file.public_name().is_none() {
            return Err(Error::Conflict(
                "file has to be published before it can be made public".into(),
            ));
        }

        let store = self.store();
        let mut dirty = false;
        if let Some(name) = new_name {
            if name != file.name {
                file.name = name;
                dirty = true;
            }
        }
        if let Some(public) = visibility {
            if public != file.is_public {
                file.is_public = public;
                dirty = true;
            }
        }
        if dirty {
            file.updated_at = Utc::now();
            store.update_file(&file)?;
        }

        let mut changed = dirty;
        for (kind, add, remove) in [
            (LabelKind::Tag, &update.add_tags, &update.remove_tags),
            (LabelKind::Group, &update.add_groups, &update.remove_groups),
        ] {
            changed |= self.apply_labels(&namespace, &mut file, kind, add, remove)?;
        }

        if !changed {
            return Ok(UpdateOutcome::NothingToDo);
        }
        tracing::info!("{} updated file {} ({})", caller.username, file.id, file.name);
        Ok(UpdateOutcome::Updated)
    }

    /// Adds then removes labels of one kind. True when the file's label set
    /// differs afterwards, so adding and removing the same name is no change.
    fn apply_labels(
        &self,
        namespace: &Namespace,
        file: &mut File,
        kind: LabelKind,
        add: &[String],
        remove: &[String],
    ) -> Result<bool> {
        let store = self.store();
        let to_add = if labels::normalize(add).is_empty() {
            Vec::new()
        } else {
            labels::resolve_or_create(store, kind, namespace, add)?
        };
        let to_remove = labels::find_existing(store, kind, namespace, remove)?;
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(false);
        }

        let before = label_ids(file.labels(kind));
        for label in &to_add {
            store.add_file_label(file.id, label.id)?;
        }
        for label in &to_remove {
            store.remove_file_label(file.id, label.id)?;
        }
        *file.labels_mut(kind) = store.list_file_labels(kind, file.id)?;
        Ok(label_ids(file.labels(kind)) != before)
    }

    /// Makes a file public and returns its alias. A file that was shared
    /// before keeps its old alias unless a new one is requested.
    pub fn publish(
        &self,
        caller: &User,
        selector: &FileSelector,
        requested: Option<&str>,
    ) -> Result<String> {
        let (_, mut file) = self.resolve_target(caller, selector, Intent::Write)?;
        if file.is_shared() {
            return Err(Error::Conflict("file is already public".into()));
        }

        let store = self.store();
        let requested = requested.map(str::trim).filter(|a| !a.is_empty());
        let alias = match (requested, file.public_name()) {
            (None, Some(reserved)) => reserved.to_string(),
            (requested, _) => names::allocate_public_alias(store, requested, Some(file.id))?,
        };

        file.public_alias = Some(alias.clone());
        file.is_public = true;
        file.updated_at = Utc::now();
        store.update_file(&file)?;

        tracing::info!("{} published file {} as {alias}", caller.username, file.id);
        Ok(alias)
    }

    /// Removes the bytes, then the record. Bytes that are already gone are
    /// not an error; any other storage failure leaves the record in place.
    pub async fn delete(&self, caller: &User, selector: &FileSelector) -> Result<()> {
        let (_, file) = self.resolve_target(caller, selector, Intent::Write)?;

        if !self.storage.delete(&file.local_name).await? {
            tracing::warn!(
                "Bytes for file {} were already missing from storage",
                file.id
            );
        }
        self.store().delete_file(file.id)?;

        tracing::info!("{} deleted file {} ({})", caller.username, file.id, file.name);
        Ok(())
    }

    fn shared_file(&self, alias: &str) -> Result<File> {
        self.store()
            .get_file_by_alias(alias.trim())?
            .filter(File::is_shared)
            .ok_or_else(|| Error::not_found("file not found"))
    }

    pub async fn open_public(&self, alias: &str) -> Result<(File, BlobReader)> {
        let file = self.shared_file(alias)?;
        let (reader, _) = self.storage.open(&file.local_name).await?;
        Ok((file, reader))
    }

    pub fn public_info(&self, alias: &str) -> Result<PublicFileInfo> {
        let file = self.shared_file(alias)?;
        Ok(PublicFileInfo {
            public_name: file.public_name().unwrap_or_default().to_string(),
            size_text: format_size(file.size),
            preview: PreviewCategory::from_mime(&file.mime_type),
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            created_at: file.created_at,
        })
    }
}

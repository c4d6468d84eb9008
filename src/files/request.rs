use serde::Deserialize;

use crate::error::{Error, Result};

/// Where the bytes of an upload come from, selected by `upload_type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "upload_type", rename_all = "lowercase")]
pub enum UploadSource {
    /// Base64 payload plus the hex SHA-256 digest of the decoded bytes.
    #[serde(rename = "file")]
    Inline { data: String, sum: String },
    Url { url: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileAttributes {
    pub namespace: String,
    pub tags: Vec<String>,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(flatten)]
    pub source: UploadSource,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub public_name: Option<String>,
    #[serde(default)]
    pub attributes: FileAttributes,
}

/// Addresses a file by display name, id, or both, within a namespace.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileSelector {
    pub name: String,
    pub id: Option<i64>,
    pub namespace: String,
}

impl FileSelector {
    /// The id, treating zero as absent.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.id.filter(|id| *id > 0)
    }
}

/// A boolean that also accepts the usual textual spellings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FlagValue {
    pub fn parse(&self) -> Result<bool> {
        let invalid = || Error::BadRequest("is_public must be a boolean".into());
        match self {
            FlagValue::Bool(b) => Ok(*b),
            FlagValue::Int(1) => Ok(true),
            FlagValue::Int(0) => Ok(false),
            FlagValue::Int(_) => Err(invalid()),
            FlagValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" => Ok(true),
                "0" | "f" | "false" => Ok(false),
                _ => Err(invalid()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileUpdate {
    pub new_name: Option<String>,
    pub is_public: Option<FlagValue>,
    pub new_namespace: Option<String>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub add_groups: Vec<String>,
    pub remove_groups: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub namespace: String,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub groups: Vec<String>,
    pub verbosity: u8,
}

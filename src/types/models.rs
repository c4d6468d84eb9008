use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Capabilities;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub capabilities: Capabilities,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    /// Zero for a default namespace that has not been persisted yet.
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Namespace {
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// False when either side carries an unset id.
    #[must_use]
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner_id > 0 && self.owner_id == user.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Tag,
    Group,
}

impl LabelKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag",
            LabelKind::Group => "group",
        }
    }
}

/// A namespace-scoped name attached to files. Tags and groups share this
/// shape and are told apart by their [`LabelKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub kind: LabelKind,
    pub namespace_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

pub type Tag = Label;
pub type Group = Label;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: i64,
    #[serde(skip)]
    pub local_name: String,
    pub name: String,
    pub namespace_id: i64,
    pub size: i64,
    pub mime_type: String,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_alias: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub groups: Vec<Group>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// The reserved public alias, if one is set and non-empty.
    #[must_use]
    pub fn public_name(&self) -> Option<&str> {
        self.public_alias.as_deref().filter(|a| !a.is_empty())
    }

    /// A file is shared iff it is marked public and holds a usable alias.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.is_public && self.public_name().is_some()
    }

    #[must_use]
    pub fn labels(&self, kind: LabelKind) -> &[Label] {
        match kind {
            LabelKind::Tag => &self.tags,
            LabelKind::Group => &self.groups,
        }
    }

    pub fn labels_mut(&mut self, kind: LabelKind) -> &mut Vec<Label> {
        match kind {
            LabelKind::Tag => &mut self.tags,
            LabelKind::Group => &mut self.groups,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

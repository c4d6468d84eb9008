use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::files::{FileSelector, FileUpdate, ListQuery};
use crate::types::{Label, Namespace, Token, User};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    /// Capability names; the default user set when omitted.
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub capabilities: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub capabilities: Vec<&'static str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            capabilities: user.capabilities.to_strings(),
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateNamespaceRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct NamespaceResponse {
    #[serde(flatten)]
    pub namespace: Namespace,
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct NamespaceParams {
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Label> for LabelResponse {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            name: label.name,
            created_at: label.created_at,
        }
    }
}

/// Query string of the file listing. Tags and groups are comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilesParams {
    #[serde(default)]
    pub namespace: String,
    pub name: Option<String>,
    pub tags: Option<String>,
    pub groups: Option<String>,
    #[serde(default)]
    pub verbose: u8,
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

impl From<ListFilesParams> for ListQuery {
    fn from(params: ListFilesParams) -> Self {
        Self {
            tags: split_list(params.tags.as_deref()),
            groups: split_list(params.groups.as_deref()),
            namespace: params.namespace,
            name: params.name,
            verbosity: params.verbose,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateFileRequest {
    #[serde(flatten)]
    pub selector: FileSelector,
    #[serde(flatten)]
    pub update: FileUpdate,
}

#[derive(Debug, Deserialize)]
pub struct PublishFileRequest {
    #[serde(flatten)]
    pub selector: FileSelector,
    #[serde(default)]
    pub public_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishFileResponse {
    pub public_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_split() {
        let params = ListFilesParams {
            tags: Some("a,b, c".to_string()),
            verbose: 2,
            ..Default::default()
        };
        let query = ListQuery::from(params);
        assert_eq!(query.tags, vec!["a", "b", " c"]);
        assert!(query.groups.is_empty());
        assert_eq!(query.verbosity, 2);
    }

    #[test]
    fn test_update_request_flattens() {
        let req: UpdateFileRequest = serde_json::from_str(
            r#"{"name":"a.txt","namespace":"docs","new_name":"b.txt","is_public":"t","add_tags":["x"]}"#,
        )
        .unwrap();
        assert_eq!(req.selector.name, "a.txt");
        assert_eq!(req.selector.namespace, "docs");
        assert_eq!(req.update.new_name.as_deref(), Some("b.txt"));
        assert!(req.update.is_public.unwrap().parse().unwrap());
        assert_eq!(req.update.add_tags, vec!["x"]);
    }
}

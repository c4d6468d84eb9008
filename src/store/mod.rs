mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<i64>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn update_user_capabilities(&self, id: i64, capabilities: Capabilities) -> Result<()>;

    // Namespace operations
    fn create_namespace(&self, ns: &Namespace) -> Result<i64>;
    /// Inserts the namespace if no namespace with that name exists, then
    /// returns the stored row.
    fn ensure_namespace(&self, name: &str, owner_id: i64) -> Result<Namespace>;
    fn get_namespace_by_name(&self, name: &str) -> Result<Option<Namespace>>;
    fn list_user_namespaces(&self, owner_id: i64) -> Result<Vec<Namespace>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Tag and group operations
    /// Idempotent upsert by (kind, namespace, name).
    fn ensure_label(&self, kind: LabelKind, namespace_id: i64, name: &str) -> Result<Label>;
    fn get_label_by_name(
        &self,
        kind: LabelKind,
        namespace_id: i64,
        name: &str,
    ) -> Result<Option<Label>>;
    fn list_labels(&self, kind: LabelKind, namespace_id: i64) -> Result<Vec<Label>>;

    // File-label M2M operations
    fn add_file_label(&self, file_id: i64, label_id: i64) -> Result<bool>;
    fn remove_file_label(&self, file_id: i64, label_id: i64) -> Result<bool>;
    fn list_file_labels(&self, kind: LabelKind, file_id: i64) -> Result<Vec<Label>>;

    // File operations
    /// Inserts the file together with its tag and group links.
    fn create_file(&self, file: &File) -> Result<i64>;
    /// Returns the file with tags and groups loaded.
    fn get_file(&self, id: i64) -> Result<Option<File>>;
    /// Counts files in a namespace; an empty name matches any name.
    fn count_files(&self, namespace_id: i64, name: &str, id: Option<i64>) -> Result<i64>;
    /// Returns the first matching file with tags and groups loaded.
    fn find_file(&self, namespace_id: i64, name: &str, id: Option<i64>) -> Result<Option<File>>;
    fn local_name_exists(&self, local_name: &str) -> Result<bool>;
    fn get_file_by_alias(&self, alias: &str) -> Result<Option<File>>;
    /// Lists files without loading tags or groups.
    fn list_files(&self, namespace_id: i64, name_contains: Option<&str>) -> Result<Vec<File>>;
    fn update_file(&self, file: &File) -> Result<()>;
    fn delete_file(&self, id: i64) -> Result<bool>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;
}

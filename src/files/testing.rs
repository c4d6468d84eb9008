use chrono::Utc;
use tempfile::TempDir;

use crate::files::namespace::{default_namespace, materialize};
use crate::store::{SqliteStore, Store};
use crate::types::{Capabilities, File, User};

pub fn test_store() -> (TempDir, SqliteStore) {
    let temp = TempDir::new().unwrap();
    let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
    store.initialize().unwrap();
    (temp, store)
}

pub fn create_user(store: &dyn Store, username: &str, capabilities: Capabilities) -> User {
    let now = Utc::now();
    let mut user = User {
        id: 0,
        username: username.to_string(),
        capabilities,
        created_at: now,
        updated_at: now,
    };
    user.id = store.create_user(&user).unwrap();
    user
}

/// Inserts a record in the owner's default namespace without any bytes.
pub fn insert_file(store: &dyn Store, owner: &User, name: &str, alias: Option<&str>) -> File {
    let ns = materialize(store, default_namespace(owner)).unwrap();
    let now = Utc::now();
    let mut file = File {
        id: 0,
        local_name: crate::files::names::random_name(40),
        name: name.to_string(),
        namespace_id: ns.id,
        size: 0,
        mime_type: "application/octet-stream".to_string(),
        is_public: alias.is_some(),
        public_alias: alias.map(str::to_string),
        tags: Vec::new(),
        groups: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    file.id = store.create_file(&file).unwrap();
    file
}

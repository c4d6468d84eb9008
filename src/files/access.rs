use crate::error::{Error, Result};
use crate::types::{Capabilities, Namespace, User};

#[must_use]
pub fn can_read(user: &User, namespace: &Namespace) -> bool {
    namespace.is_owned_by(user) || user.capabilities.has(Capabilities::READ_FOREIGN)
}

#[must_use]
pub fn can_write(user: &User, namespace: &Namespace) -> bool {
    namespace.is_owned_by(user) || user.capabilities.has(Capabilities::WRITE_FOREIGN)
}

#[must_use]
pub fn can_upload_files(user: &User) -> bool {
    user.capabilities.has(Capabilities::UPLOAD_FILES)
}

#[must_use]
pub fn can_upload_urls(user: &User) -> bool {
    user.capabilities.has(Capabilities::UPLOAD_URLS)
}

pub fn require_read(user: &User, namespace: &Namespace) -> Result<()> {
    if can_read(user, namespace) {
        return Ok(());
    }
    Err(Error::forbidden("read permission denied for foreign namespaces"))
}

pub fn require_write(user: &User, namespace: &Namespace) -> Result<()> {
    if can_write(user, namespace) {
        return Ok(());
    }
    Err(Error::forbidden("write permission denied for foreign namespaces"))
}

pub fn require_upload_files(user: &User) -> Result<()> {
    if can_upload_files(user) {
        return Ok(());
    }
    Err(Error::forbidden("not allowed to upload files"))
}

pub fn require_upload_urls(user: &User) -> Result<()> {
    if can_upload_urls(user) {
        return Ok(());
    }
    Err(Error::forbidden("not allowed to upload urls"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, capabilities: Capabilities) -> User {
        User {
            id,
            username: format!("user{id}"),
            capabilities,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn namespace(owner_id: i64) -> Namespace {
        Namespace {
            id: 10,
            name: format!("user{owner_id}_docs"),
            owner_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_can_read_and_write() {
        let alice = user(1, Capabilities::default());
        let ns = namespace(1);
        assert!(can_read(&alice, &ns));
        assert!(can_write(&alice, &ns));
    }

    #[test]
    fn test_foreign_requires_capabilities() {
        let ns = namespace(2);

        let plain = user(1, Capabilities::default_user());
        assert!(!can_read(&plain, &ns));
        assert!(!can_write(&plain, &ns));
        assert!(matches!(require_read(&plain, &ns), Err(Error::Forbidden(_))));

        let reader = user(1, Capabilities::READ_FOREIGN);
        assert!(can_read(&reader, &ns));
        assert!(!can_write(&reader, &ns));

        let writer = user(1, Capabilities::WRITE_FOREIGN);
        assert!(can_write(&writer, &ns));
        assert!(!can_read(&writer, &ns));
    }

    #[test]
    fn test_unset_ids_own_nothing() {
        let ghost = user(0, Capabilities::default());
        let orphan = namespace(0);
        assert!(!can_read(&ghost, &orphan));
    }

    #[test]
    fn test_upload_capabilities() {
        let files_only = user(1, Capabilities::UPLOAD_FILES);
        assert!(can_upload_files(&files_only));
        assert!(!can_upload_urls(&files_only));
        assert!(require_upload_files(&files_only).is_ok());
        assert!(matches!(
            require_upload_urls(&files_only),
            Err(Error::Forbidden(_))
        ));
    }
}

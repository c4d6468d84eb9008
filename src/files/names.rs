use rand::Rng;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::validation::validate_public_name;

pub const STORAGE_NAME_LEN: usize = 40;
pub const PUBLIC_ALIAS_LEN: usize = 25;
pub const DISPLAY_NAME_LEN: usize = 20;
pub const MAX_ATTEMPTS: usize = 5;

// No 0/O, 1/l/I.
const ALPHABET: &[u8] = b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[must_use]
pub fn random_name(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Draws candidates from `generate` until one is not `taken`, giving up
/// after [`MAX_ATTEMPTS`].
fn allocate_with<G, T>(what: &str, mut generate: G, mut taken: T) -> Result<String>
where
    G: FnMut() -> String,
    T: FnMut(&str) -> Result<bool>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = generate();
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        tracing::warn!("{what} collision, retrying ({attempt}/{MAX_ATTEMPTS})");
    }
    tracing::error!("Could not allocate a unique {what}");
    Err(Error::AllocationExhausted(MAX_ATTEMPTS))
}

pub fn allocate_storage_name(store: &dyn Store) -> Result<String> {
    allocate_with(
        "storage name",
        || random_name(STORAGE_NAME_LEN),
        |name| store.local_name_exists(name),
    )
}

/// Picks a public alias for a file.
///
/// A requested alias is checked once and rejected with a conflict when another
/// file holds it. Without a request a random alias is generated with the same
/// bounded retry as storage names. `file_id` names the file the alias is for,
/// so a file never conflicts with its own reserved alias.
pub fn allocate_public_alias(
    store: &dyn Store,
    requested: Option<&str>,
    file_id: Option<i64>,
) -> Result<String> {
    let taken = |alias: &str| -> Result<bool> {
        Ok(store
            .get_file_by_alias(alias)?
            .is_some_and(|f| Some(f.id) != file_id))
    };

    match requested.map(str::trim).filter(|a| !a.is_empty()) {
        Some(alias) => {
            validate_public_name(alias)?;
            if taken(alias)? {
                return Err(Error::Conflict("public name already exists".into()));
            }
            Ok(alias.to_string())
        }
        None => allocate_with("public alias", || random_name(PUBLIC_ALIAS_LEN), taken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::testing::{create_user, insert_file, test_store};
    use crate::types::Capabilities;

    #[test]
    fn test_random_name() {
        let name = random_name(STORAGE_NAME_LEN);
        assert_eq!(name.len(), STORAGE_NAME_LEN);
        assert!(name.bytes().all(|b| ALPHABET.contains(&b)));
        assert!(!name.contains(['0', 'O', '1', 'l', 'I']));
        assert_ne!(random_name(PUBLIC_ALIAS_LEN), random_name(PUBLIC_ALIAS_LEN));
    }

    #[test]
    fn test_allocate_retries_then_succeeds() {
        let mut candidates = vec!["c", "b", "a"];
        let mut checks = 0;
        let name = allocate_with(
            "test name",
            || candidates.pop().unwrap().to_string(),
            |n| {
                checks += 1;
                Ok(n != "c")
            },
        )
        .unwrap();
        assert_eq!(name, "c");
        assert_eq!(checks, 3);
    }

    #[test]
    fn test_allocate_exhausts() {
        let mut generated = 0;
        let result = allocate_with(
            "test name",
            || {
                generated += 1;
                "same".to_string()
            },
            |_| Ok(true),
        );
        assert!(matches!(result, Err(Error::AllocationExhausted(MAX_ATTEMPTS))));
        assert_eq!(generated, MAX_ATTEMPTS);
    }

    #[test]
    fn test_requested_alias_conflicts() {
        let (_temp, store) = test_store();
        let alice = create_user(&store, "alice", Capabilities::default_user());
        let owner = insert_file(&store, &alice, "a.txt", Some("report"));

        assert!(matches!(
            allocate_public_alias(&store, Some("report"), None),
            Err(Error::Conflict(_))
        ));
        assert_eq!(
            allocate_public_alias(&store, Some(" report "), Some(owner.id)).unwrap(),
            "report"
        );
        assert_eq!(
            allocate_public_alias(&store, Some("fresh"), None).unwrap(),
            "fresh"
        );
        assert!(matches!(
            allocate_public_alias(&store, Some("bad name"), None),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_generated_alias() {
        let (_temp, store) = test_store();
        let alias = allocate_public_alias(&store, Some("   "), None).unwrap();
        assert_eq!(alias.len(), PUBLIC_ALIAS_LEN);
        let storage = allocate_storage_name(&store).unwrap();
        assert_eq!(storage.len(), STORAGE_NAME_LEN);
    }
}

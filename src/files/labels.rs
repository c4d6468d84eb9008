use std::collections::HashSet;

use super::{access, namespace as namespaces};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Label, LabelKind, Namespace, User};

/// Trims names, drops empty ones and collapses duplicates, keeping the
/// first occurrence's position.
#[must_use]
pub fn normalize(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && seen.insert(*n))
        .map(str::to_string)
        .collect()
}

/// Resolves names to labels in `namespace`, creating the missing ones.
pub fn resolve_or_create(
    store: &dyn Store,
    kind: LabelKind,
    namespace: &Namespace,
    names: &[String],
) -> Result<Vec<Label>> {
    let names = normalize(names);
    if names.is_empty() {
        return Ok(Vec::new());
    }
    if !namespace.is_persisted() {
        return Err(Error::not_found("namespace not found"));
    }

    names
        .iter()
        .map(|name| store.ensure_label(kind, namespace.id, name))
        .collect()
}

/// Resolves names to the labels that already exist in `namespace`.
/// Unknown names are skipped.
pub fn find_existing(
    store: &dyn Store,
    kind: LabelKind,
    namespace: &Namespace,
    names: &[String],
) -> Result<Vec<Label>> {
    if !namespace.is_persisted() {
        return Ok(Vec::new());
    }

    let mut labels = Vec::new();
    for name in normalize(names) {
        if let Some(label) = store.get_label_by_name(kind, namespace.id, &name)? {
            labels.push(label);
        }
    }
    Ok(labels)
}

/// Lists every label of `kind` in a namespace the caller may read.
pub fn list_labels(
    store: &dyn Store,
    caller: &User,
    kind: LabelKind,
    namespace: &str,
) -> Result<Vec<Label>> {
    let namespace = namespaces::resolve_namespace(store, namespace, caller)?;
    access::require_read(caller, &namespace)?;
    if !namespace.is_persisted() {
        return Ok(Vec::new());
    }
    store.list_labels(kind, namespace.id)
}

/// True if `have` shares at least one label with `wanted`.
#[must_use]
pub fn contains_any(have: &[Label], wanted: &[Label]) -> bool {
    have.iter().any(|h| wanted.iter().any(|w| w.id == h.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::namespace::{default_namespace, materialize};
    use crate::files::testing::{create_user, test_store};
    use crate::types::Capabilities;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(&strings(&[" a ", "", "b", "a", "   ", "c"])),
            strings(&["a", "b", "c"])
        );
    }

    #[test]
    fn test_resolve_or_create_is_idempotent() {
        let (_temp, store) = test_store();
        let alice = create_user(&store, "alice", Capabilities::default_user());
        let ns = materialize(&store, default_namespace(&alice)).unwrap();

        let first = resolve_or_create(&store, LabelKind::Tag, &ns, &strings(&["x", "y"])).unwrap();
        let second =
            resolve_or_create(&store, LabelKind::Tag, &ns, &strings(&["y", "x", "x"])).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(first[0].id, second[1].id);
        assert_eq!(store.list_labels(LabelKind::Tag, ns.id).unwrap().len(), 2);
    }

    #[test]
    fn test_tags_and_groups_are_separate() {
        let (_temp, store) = test_store();
        let alice = create_user(&store, "alice", Capabilities::default_user());
        let ns = materialize(&store, default_namespace(&alice)).unwrap();

        resolve_or_create(&store, LabelKind::Tag, &ns, &strings(&["work"])).unwrap();
        assert!(
            find_existing(&store, LabelKind::Group, &ns, &strings(&["work"]))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_list_labels() {
        let (_temp, store) = test_store();
        let alice = create_user(&store, "alice", Capabilities::default_user());
        assert!(list_labels(&store, &alice, LabelKind::Tag, "").unwrap().is_empty());

        let ns = materialize(&store, default_namespace(&alice)).unwrap();
        resolve_or_create(&store, LabelKind::Group, &ns, &strings(&["g1", "g2"])).unwrap();
        let groups = list_labels(&store, &alice, LabelKind::Group, "default").unwrap();
        assert_eq!(groups.len(), 2);

        let bob = create_user(&store, "bob", Capabilities::default_user());
        assert!(matches!(
            list_labels(&store, &bob, LabelKind::Group, "alice_default"),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn test_find_existing_skips_unknown() {
        let (_temp, store) = test_store();
        let alice = create_user(&store, "alice", Capabilities::default_user());
        let ns = materialize(&store, default_namespace(&alice)).unwrap();
        resolve_or_create(&store, LabelKind::Tag, &ns, &strings(&["a"])).unwrap();

        let found = find_existing(&store, LabelKind::Tag, &ns, &strings(&["a", "zzz"])).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "a");

        let unsaved = default_namespace(&create_user(&store, "bob", Capabilities::default_user()));
        assert!(
            find_existing(&store, LabelKind::Tag, &unsaved, &strings(&["a"]))
                .unwrap()
                .is_empty()
        );
    }
}

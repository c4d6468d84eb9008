use chrono::Utc;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Namespace, User};
use crate::validation::validate_namespace_name;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Prefixes `name` with the user's name, e.g. `alice_docs`.
#[must_use]
pub fn user_namespace_name(name: &str, user: &User) -> String {
    format!("{}_{name}", user.username)
}

#[must_use]
pub fn is_default_name(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.eq_ignore_ascii_case(DEFAULT_NAMESPACE)
}

/// The caller's default namespace before it has been stored.
#[must_use]
pub fn default_namespace(user: &User) -> Namespace {
    Namespace {
        id: 0,
        name: user_namespace_name(DEFAULT_NAMESPACE, user),
        owner_id: user.id,
        created_at: Utc::now(),
    }
}

/// Resolves a requested namespace name for `caller`.
///
/// Empty or `default` resolves to the caller's default namespace, which may be
/// an unsaved sentinel. Other names are looked up verbatim first and then with
/// the caller's prefix added, so `docs` finds `alice_docs` for alice while
/// `bob_docs` still addresses bob's namespace directly.
pub fn resolve_namespace(store: &dyn Store, requested: &str, caller: &User) -> Result<Namespace> {
    if is_default_name(requested) {
        let sentinel = default_namespace(caller);
        return Ok(store.get_namespace_by_name(&sentinel.name)?.unwrap_or(sentinel));
    }

    let requested = requested.trim();
    if let Some(ns) = store.get_namespace_by_name(requested)? {
        return Ok(ns);
    }

    let prefix = format!("{}_", caller.username);
    if !requested.starts_with(&prefix) {
        let prefixed = user_namespace_name(requested, caller);
        if let Some(ns) = store.get_namespace_by_name(&prefixed)? {
            return Ok(ns);
        }
    }

    Err(Error::not_found("namespace not found"))
}

/// Stores an unsaved default namespace. Persisted namespaces pass through.
pub fn materialize(store: &dyn Store, namespace: Namespace) -> Result<Namespace> {
    if namespace.is_persisted() {
        return Ok(namespace);
    }
    let stored = store.ensure_namespace(&namespace.name, namespace.owner_id)?;
    tracing::debug!("Materialized namespace {}", stored.name);
    Ok(stored)
}

pub fn create_namespace(store: &dyn Store, caller: &User, name: &str) -> Result<Namespace> {
    let name = name.trim();
    validate_namespace_name(name)?;
    if is_default_name(name) {
        return Err(Error::BadRequest(format!(
            "namespace name '{DEFAULT_NAMESPACE}' is reserved"
        )));
    }

    let prefix = format!("{}_", caller.username);
    let full_name = if name.starts_with(&prefix) {
        name.to_string()
    } else {
        user_namespace_name(name, caller)
    };

    if store.get_namespace_by_name(&full_name)?.is_some() {
        return Err(Error::Conflict("namespace already exists".into()));
    }

    let mut ns = Namespace {
        id: 0,
        name: full_name,
        owner_id: caller.id,
        created_at: Utc::now(),
    };
    ns.id = store.create_namespace(&ns).map_err(|e| match e {
        Error::AlreadyExists => Error::Conflict("namespace already exists".into()),
        other => other,
    })?;

    tracing::info!("Created namespace {} for {}", ns.name, caller.username);
    Ok(ns)
}

pub fn list_namespaces(store: &dyn Store, caller: &User) -> Result<Vec<Namespace>> {
    store.list_user_namespaces(caller.id)
}

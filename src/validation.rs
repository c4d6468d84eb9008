use crate::error::{Error, Result};

const MAX_NAMESPACE_NAME_LEN: usize = 64;
const MAX_USERNAME_LEN: usize = 32;
const MAX_PUBLIC_NAME_LEN: usize = 100;
const MAX_FILE_NAME_LEN: usize = 255;

fn is_valid_name_char(c: char, allow_underscore: bool, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric()
        || c == '-'
        || (allow_underscore && c == '_')
        || (allow_period && c == '.')
}

struct NameRules {
    entity: &'static str,
    max_len: usize,
    allow_underscore: bool,
    allow_period: bool,
    forbid_leading_special: bool,
}

fn validate_name(name: &str, rules: &NameRules) -> std::result::Result<(), String> {
    let entity = rules.entity;
    if name.is_empty() {
        return Err(format!("{entity} cannot be empty"));
    }
    if name.len() > rules.max_len {
        return Err(format!("{entity} cannot exceed {} characters", rules.max_len));
    }
    if !name
        .chars()
        .all(|c| is_valid_name_char(c, rules.allow_underscore, rules.allow_period))
    {
        let mut allowed = "alphanumeric characters, hyphens".to_string();
        if rules.allow_underscore {
            allowed.push_str(", underscores");
        }
        if rules.allow_period {
            allowed.push_str(", periods");
        }
        return Err(format!("{entity} can only contain {allowed}"));
    }
    if rules.forbid_leading_special && (name.starts_with('-') || name.starts_with('_')) {
        return Err(format!("{entity} cannot start with a hyphen or underscore"));
    }
    Ok(())
}

pub fn validate_namespace_name(name: &str) -> Result<()> {
    validate_name(
        name,
        &NameRules {
            entity: "namespace name",
            max_len: MAX_NAMESPACE_NAME_LEN,
            allow_underscore: true,
            allow_period: false,
            forbid_leading_special: true,
        },
    )
    .map_err(Error::BadRequest)
}

/// Usernames may not contain underscores: they prefix namespace names as
/// `<username>_<name>`, and an underscore would make that prefix ambiguous.
pub fn validate_username(name: &str) -> Result<()> {
    validate_name(
        name,
        &NameRules {
            entity: "username",
            max_len: MAX_USERNAME_LEN,
            allow_underscore: false,
            allow_period: false,
            forbid_leading_special: true,
        },
    )
    .map_err(Error::BadRequest)
}

pub fn validate_public_name(name: &str) -> Result<()> {
    validate_name(
        name,
        &NameRules {
            entity: "public name",
            max_len: MAX_PUBLIC_NAME_LEN,
            allow_underscore: true,
            allow_period: true,
            forbid_leading_special: false,
        },
    )
    .map_err(Error::BadRequest)
}

/// Display names are free text, minus control characters and path separators.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::BadRequest("file name cannot be empty".into()));
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(Error::BadRequest(format!(
            "file name cannot exceed {MAX_FILE_NAME_LEN} characters"
        )));
    }
    if name.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
        return Err(Error::BadRequest(
            "file name cannot contain control characters or slashes".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_names() {
        assert!(validate_namespace_name("docs").is_ok());
        assert!(validate_namespace_name("alice_docs-2").is_ok());
        assert!(validate_namespace_name("").is_err());
        assert!(validate_namespace_name("_docs").is_err());
        assert!(validate_namespace_name("my.docs").is_err());
        assert!(validate_namespace_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_usernames_reject_underscore() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob-smith").is_ok());
        assert!(validate_username("bob_smith").is_err());
        assert!(validate_username("-bob").is_err());
    }

    #[test]
    fn test_public_names() {
        assert!(validate_public_name("report.pdf").is_ok());
        assert!(validate_public_name("q3_report-final").is_ok());
        assert!(validate_public_name("has space").is_err());
        assert!(validate_public_name("a/b").is_err());
    }

    #[test]
    fn test_file_names() {
        assert!(validate_file_name("Quarterly Report (final).pdf").is_ok());
        assert!(validate_file_name("   ").is_err());
        assert!(validate_file_name("../etc/passwd").is_err());
        assert!(validate_file_name("line\nbreak").is_err());
    }
}

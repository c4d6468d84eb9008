use std::fmt;

use serde::{Deserialize, Serialize};

/// Capabilities is a bitmask of what a user may do beyond their own namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const UPLOAD_FILES: Capabilities = Capabilities(1 << 0); // 1
    pub const UPLOAD_URLS: Capabilities = Capabilities(1 << 1); // 2
    pub const READ_FOREIGN: Capabilities = Capabilities(1 << 2); // 4
    pub const WRITE_FOREIGN: Capabilities = Capabilities(1 << 3); // 8

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if this bitmask contains every bit of `required`.
    #[must_use]
    pub const fn has(self, required: Capabilities) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: Capabilities) -> Capabilities {
        Capabilities(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Capabilities) -> Capabilities {
        Capabilities(self.0 & !other.0)
    }

    /// Capabilities handed to users created without an explicit list:
    /// upload:files + upload:urls, no access to foreign namespaces.
    #[must_use]
    pub const fn default_user() -> Capabilities {
        Capabilities(Self::UPLOAD_FILES.0 | Self::UPLOAD_URLS.0)
    }

    pub fn parse(s: &str) -> Option<Capabilities> {
        match s {
            "upload:files" => Some(Self::UPLOAD_FILES),
            "upload:urls" => Some(Self::UPLOAD_URLS),
            "namespace:read-foreign" => Some(Self::READ_FOREIGN),
            "namespace:write-foreign" => Some(Self::WRITE_FOREIGN),
            _ => None,
        }
    }

    pub fn parse_many<S: AsRef<str>>(strs: &[S]) -> Option<Capabilities> {
        let mut result = Capabilities::default();
        for s in strs {
            result = result.union(Self::parse(s.as_ref())?);
        }
        Some(result)
    }

    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        let mut caps = Vec::new();
        if self.has(Self::UPLOAD_FILES) {
            caps.push("upload:files");
        }
        if self.has(Self::UPLOAD_URLS) {
            caps.push("upload:urls");
        }
        if self.has(Self::READ_FOREIGN) {
            caps.push("namespace:read-foreign");
        }
        if self.has(Self::WRITE_FOREIGN) {
            caps.push("namespace:write-foreign");
        }
        caps
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<i64> for Capabilities {
    fn from(bits: i64) -> Self {
        Self(bits as u32)
    }
}

impl From<Capabilities> for i64 {
    fn from(c: Capabilities) -> Self {
        c.0 as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_has() {
        let c = Capabilities::UPLOAD_FILES.union(Capabilities::READ_FOREIGN);
        assert!(c.has(Capabilities::UPLOAD_FILES));
        assert!(c.has(Capabilities::READ_FOREIGN));
        assert!(!c.has(Capabilities::WRITE_FOREIGN));
        assert!(!c.has(Capabilities::UPLOAD_URLS));
    }

    #[test]
    fn test_write_foreign_does_not_imply_read_foreign() {
        let c = Capabilities::WRITE_FOREIGN;
        assert!(!c.has(Capabilities::READ_FOREIGN));
    }

    #[test]
    fn test_parse_many() {
        let c = Capabilities::parse_many(&["upload:files", "namespace:write-foreign"]).unwrap();
        assert_eq!(c.to_strings(), vec!["upload:files", "namespace:write-foreign"]);
        assert!(Capabilities::parse_many(&["upload:files", "bogus"]).is_none());
    }

    #[test]
    fn test_default_user() {
        let c = Capabilities::default_user();
        assert!(c.has(Capabilities::UPLOAD_FILES));
        assert!(c.has(Capabilities::UPLOAD_URLS));
        assert_eq!(c.difference(Capabilities::UPLOAD_URLS), Capabilities::UPLOAD_FILES);
    }
}

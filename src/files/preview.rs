use serde::Serialize;

/// Coarse preview classification derived from a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewCategory {
    Default,
    Image,
    Text,
}

// Checked in order; the first category with a matching pattern wins.
const PATTERNS: &[(PreviewCategory, &[&str])] = &[
    (PreviewCategory::Image, &["image/*"]),
    (PreviewCategory::Text, &["text/*"]),
];

impl PreviewCategory {
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim();
        if mime.is_empty() {
            return Self::Default;
        }

        PATTERNS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| pattern_matches(p, mime)))
            .map_or(Self::Default, |(category, _)| *category)
    }

    #[must_use]
    pub fn is_image(self) -> bool {
        self == Self::Image
    }

    #[must_use]
    pub fn is_text(self) -> bool {
        self == Self::Text
    }

    #[must_use]
    pub fn is_default(self) -> bool {
        self == Self::Default
    }
}

fn pattern_matches(pattern: &str, mime: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => mime.starts_with(prefix),
        None => pattern == mime,
    }
}

/// Formats a byte count with binary units, e.g. `1.5 KiB`.
#[must_use]
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

//! URL- and filesystem-safe renderings of instance values and labels.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length for a single mirrored path component.
const MAX_COMPONENT_LENGTH: usize = 128;

/// Characters that are neither word characters, whitespace nor hyphens.
static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

/// Runs of whitespace and hyphens.
static SLUG_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Anything that is not an ASCII letter or digit.
static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());

/// Lowercase, drop punctuation, and join words with single hyphens.
///
/// ```
/// use docindex_core::slug::slugify;
///
/// assert_eq!(slugify("  Hello, World! "), "hello-world");
/// assert_eq!(slugify("Q3 -- 2024"), "q3-2024");
/// ```
pub fn slugify(value: &str) -> String {
    let cleaned = NON_SLUG_CHARS.replace_all(value, "");
    let lowered = cleaned.trim().to_lowercase();
    SLUG_SEPARATORS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Title-case each word, then keep only ASCII letters and digits.
///
/// ```
/// use docindex_core::slug::proper_name;
///
/// assert_eq!(proper_name("acme corp."), "AcmeCorp");
/// ```
pub fn proper_name(value: &str) -> String {
    let titled: String = value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();
    NON_ALNUM.replace_all(&titled, "").to_string()
}

/// Turn an instance value or document label into one path component.
///
/// Never returns an empty string, `.` or `..`, and never contains a path
/// separator.
pub fn path_component(value: &str, slugify_paths: bool) -> String {
    let mut result = if slugify_paths {
        slugify(value)
    } else {
        value
            .trim()
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
            .collect()
    };

    if result.chars().count() > MAX_COMPONENT_LENGTH {
        result = result.chars().take(MAX_COMPONENT_LENGTH).collect();
    }

    if result.is_empty() || result == "." || result == ".." {
        result = "_".to_string();
    }

    result
}

/// Path component for a document link, keeping the file extension.
pub fn link_name(label: &str, extension: Option<&str>, slugify_paths: bool) -> String {
    let stem = path_component(label, slugify_paths);
    match extension {
        Some(ext) if !ext.is_empty() && !stem.to_lowercase().ends_with(&format!(".{}", ext)) => {
            format!("{}.{}", stem, ext)
        }
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Invoices"), "invoices");
        assert_eq!(slugify("Acme Corp."), "acme-corp");
        assert_eq!(slugify("a_b c"), "a_b-c");
    }

    #[test]
    fn test_slugify_separators() {
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("--edge--"), "edge");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_proper_name() {
        assert_eq!(proper_name("JOHN o'neil"), "JohnOneil");
        assert_eq!(proper_name(""), "");
    }

    #[test]
    fn test_path_component_raw() {
        assert_eq!(path_component("2024/Q1", false), "2024_Q1");
        assert_eq!(path_component(" Invoices ", false), "Invoices");
        assert_eq!(path_component("..", false), "_");
        assert_eq!(path_component("", false), "_");
    }

    #[test]
    fn test_path_component_slugified() {
        assert_eq!(path_component("Acme Corp.", true), "acme-corp");
        assert_eq!(path_component("???", true), "_");
    }

    #[test]
    fn test_path_component_truncation() {
        let long = "x".repeat(300);
        assert_eq!(path_component(&long, false).len(), MAX_COMPONENT_LENGTH);
    }

    #[test]
    fn test_link_name() {
        assert_eq!(link_name("Scan 1", Some("pdf"), false), "Scan 1.pdf");
        assert_eq!(link_name("scan.pdf", Some("pdf"), false), "scan.pdf");
        assert_eq!(link_name("Scan 1", Some("pdf"), true), "scan-1.pdf");
        assert_eq!(link_name("notes", None, false), "notes");
    }
}

//! Slug generation, validation and slug-to-title conversion.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUN: OnceLock<Regex> = OnceLock::new();
static VALID_SLUG: OnceLock<Regex> = OnceLock::new();

fn hyphen_run() -> &'static Regex {
    HYPHEN_RUN.get_or_init(|| Regex::new(r"-+").expect("valid regex"))
}

fn valid_slug() -> &'static Regex {
    VALID_SLUG.get_or_init(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"))
}

/// Convert a string to a URL-safe ASCII slug
///
/// Rules:
/// - Lowercase
/// - Replace whitespace, underscores and dots with hyphens
/// - Drop every other character outside `[a-z0-9-]`
/// - Collapse multiple hyphens
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use folio_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// assert_eq!(slugify("C++ Programming"), "c-programming");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let cleaned = lowercased
        .graphemes(true)
        .filter_map(|g| match g {
            " " | "_" | "\t" | "\n" | "." => Some("-"),
            _ => {
                let c = g.chars().next()?;
                (c.is_ascii_alphanumeric() || c == '-').then_some(g)
            }
        })
        .collect::<String>();

    let collapsed = hyphen_run().replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// Slugify each `/`-separated segment of a hierarchical term.
pub fn slugify_path(input: &str) -> String {
    input
        .split('/')
        .map(slugify)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Does `slug` match `^[a-z0-9-]+$`?
pub fn is_valid_slug(slug: &str) -> bool {
    valid_slug().is_match(slug)
}

/// `"getting-started"` → `"Getting Started"`
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut graphemes = word.graphemes(true);
            match graphemes.next() {
                Some(first) => format!("{}{}", first.to_uppercase(), graphemes.as_str()),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust Programming"), "rust-programming");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(slugify("Rust & Safety"), "rust-safety");
        assert_eq!(slugify("C++ Programming"), "c-programming");
        assert_eq!(slugify("Node.js Tips"), "node-js-tips");
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("Café"), "caf");
    }

    #[test]
    fn test_leading_trailing_and_repeated_hyphens() {
        assert_eq!(slugify("  Hello    World  "), "hello-world");
        assert_eq!(slugify("-Leading Hyphen"), "leading-hyphen");
        assert_eq!(slugify("rust_lang_basics"), "rust-lang-basics");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_path() {
        assert_eq!(slugify_path("Languages/Rust Lang"), "languages/rust-lang");
        assert_eq!(slugify_path("/a//b/"), "a/b");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("hello-world-2"));
        assert!(!is_valid_slug("Hello"));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(title_from_slug("getting-started"), "Getting Started");
        assert_eq!(title_from_slug("faq"), "Faq");
        assert_eq!(title_from_slug("release_notes-2"), "Release Notes 2");
    }
}

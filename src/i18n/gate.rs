//! Gate deciding whether a text blob is worth sending to a provider.

use regex::Regex;
use std::sync::OnceLock;

static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static MARKUP_REGEX: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("valid regex"))
}

fn markup_regex() -> &'static Regex {
    // HTML tags and markdown syntax characters
    MARKUP_REGEX.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>|[*_`#>\[\]()!-]").expect("valid regex"))
}

/// Whether `text` contains translatable prose.
///
/// Returns false for empty/whitespace input and for input with no alphabetic
/// content once URLs and markup are stripped (bare numbers, punctuation,
/// links). Everything else is worth a provider call.
pub fn needs_translation(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }

    let without_urls = url_regex().replace_all(text, "");
    let stripped = markup_regex().replace_all(&without_urls, "");

    stripped.chars().any(|c| c.is_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_false() {
        assert!(!needs_translation(""));
    }

    #[test]
    fn test_whitespace_is_false() {
        assert!(!needs_translation("   "));
        assert!(!needs_translation("\n\t "));
    }

    #[test]
    fn test_digits_only_is_false() {
        assert!(!needs_translation("12345"));
        assert!(!needs_translation("3.14 / 2,718"));
    }

    #[test]
    fn test_punctuation_only_is_false() {
        assert!(!needs_translation("... !!! ???"));
    }

    #[test]
    fn test_bare_url_is_false() {
        assert!(!needs_translation("https://example.com/path?q=1"));
        assert!(!needs_translation("http://a.io https://b.io"));
    }

    #[test]
    fn test_markup_only_is_false() {
        assert!(!needs_translation("<br/> <hr>"));
        assert!(!needs_translation("** __ ## []()"));
    }

    #[test]
    fn test_prose_is_true() {
        assert!(needs_translation("Hello world"));
    }

    #[test]
    fn test_prose_with_url_is_true() {
        assert!(needs_translation("Check out https://example.com for details"));
    }

    #[test]
    fn test_markdown_prose_is_true() {
        assert!(needs_translation("**Featured** work from [my site](https://x.io)"));
    }

    #[test]
    fn test_non_latin_prose_is_true() {
        assert!(needs_translation("こんにちは"));
    }

    #[test]
    fn test_single_word_is_true() {
        assert!(needs_translation("Portfolio"));
    }
}

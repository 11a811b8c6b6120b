//! Slug normalization
//!
//! Level names are free-form display strings; slugs are the stable keys
//! derived from them. Everything that stores or routes by level uses the
//! slug, so normalization must be deterministic and idempotent.

use std::collections::HashSet;

/// Reserved slug of the synthetic zero level.
///
/// Tenants without an assignment report this level. It is injected into
/// catalog reads on request and never persisted.
pub const UNASSIGNED: &str = "unassigned";

/// Normalize a level name into its slug.
///
/// Lowercases the input and collapses every run of whitespace and/or
/// non-word characters (word = ASCII alphanumeric or `_`) into a single
/// underscore. The result is idempotent: feeding a slug back in returns it
/// unchanged.
///
/// # Examples
///
/// ```
/// use warden_levels::slug::make_slug;
///
/// assert_eq!(make_slug("Premium Plus"), "premium_plus");
/// assert_eq!(make_slug("a - b"), "a_b");
/// assert_eq!(make_slug("Basic!"), "basic_");
/// assert_eq!(make_slug(&make_slug("Déjà Vu")), make_slug("Déjà Vu"));
/// ```
pub fn make_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_separator_run = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            in_separator_run = false;
        } else if c == '_' {
            slug.push('_');
            in_separator_run = false;
        } else if !in_separator_run {
            slug.push('_');
            in_separator_run = true;
        }
    }

    slug
}

/// Whether a slug is reserved for the synthetic zero level.
pub fn is_reserved(slug: &str) -> bool {
    slug == UNASSIGNED
}

/// Pick a collision-free variant of `base` by appending a numeric suffix.
///
/// Counts up from 2 (`basic`, `basic_2`, `basic_3`, ...) until the
/// candidate is absent from `taken`. Deterministic for a given base and
/// taken set.
pub fn disambiguate(base: &str, taken: &HashSet<String>) -> String {
    let mut n: u32 = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_slug_lowercases() {
        assert_eq!(make_slug("Basic"), "basic");
        assert_eq!(make_slug("PREMIUM"), "premium");
    }

    #[test]
    fn test_make_slug_collapses_runs() {
        assert_eq!(make_slug("Premium   Plus"), "premium_plus");
        assert_eq!(make_slug("a - b"), "a_b");
        assert_eq!(make_slug("tab\tand\nnewline"), "tab_and_newline");
    }

    #[test]
    fn test_make_slug_keeps_underscores() {
        assert_eq!(make_slug("already_a_slug"), "already_a_slug");
        assert_eq!(make_slug("a__b"), "a__b");
    }

    #[test]
    fn test_make_slug_non_ascii_is_separator() {
        assert_eq!(make_slug("Café"), "caf_");
        assert_eq!(make_slug("日本語"), "_");
    }

    #[test]
    fn test_make_slug_idempotent() {
        for name in ["Basic", "Premium Plus!", " padded ", "a - b", "カタログ"] {
            let once = make_slug(name);
            assert_eq!(make_slug(&once), once, "not idempotent for {:?}", name);
        }
    }

    #[test]
    fn test_make_slug_no_whitespace() {
        for name in ["a b", " leading", "trailing ", "a\t\nb"] {
            assert!(!make_slug(name).contains(char::is_whitespace));
        }
    }

    #[test]
    fn test_disambiguate_counts_up() {
        let mut taken = HashSet::new();
        taken.insert("basic".to_string());
        assert_eq!(disambiguate("basic", &taken), "basic_2");

        taken.insert("basic_2".to_string());
        taken.insert("basic_3".to_string());
        assert_eq!(disambiguate("basic", &taken), "basic_4");
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved("unassigned"));
        assert!(!is_reserved("basic"));
    }
}

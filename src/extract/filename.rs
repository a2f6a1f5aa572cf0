//! Filesystem-safe filename generation
//!
//! Local filenames are derived deterministically from a URL so the same
//! resource always lands (and gets referenced) at the same path. Reserved
//! characters are replaced, long names are truncated while keeping a
//! trailing extension when one exists, and query strings are folded into a
//! short content hash so `?page=1` and `?page=2` stay distinct files.

use sha2::{Digest, Sha256};
use url::Url;

/// Maximum filename length before the query-hash suffix.
const MAX_NAME_LEN: usize = 120;

/// Hex chars of query-string hash appended when a query is present.
const QUERY_HASH_LEN: usize = 10;

/// Derives a safe local filename from a URL.
///
/// Deterministic: the same URL always produces the same name. The result
/// contains no path separators or reserved characters and is at most
/// `MAX_NAME_LEN` characters excluding the fixed-length query suffix.
pub fn safe_filename(url: &str) -> String {
    let (path, query) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.path().trim_matches('/').to_string(),
            parsed.query().map(str::to_string),
        ),
        // Not an absolute URL; treat everything before '?' as the path.
        Err(_) => match url.split_once('?') {
            Some((path, query)) => (
                path.trim_matches('/').to_string(),
                Some(query.to_string()),
            ),
            None => (url.trim_matches('/').to_string(), None),
        },
    };

    let path = if path.is_empty() { "index".to_string() } else { path };

    let mut name: String = path
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    name = name.replace('%', "_percent_");

    if name.chars().count() > MAX_NAME_LEN {
        name = truncate_keeping_extension(&name);
    }

    if let Some(query) = query {
        if !query.is_empty() {
            name = format!("{}_{}", name, query_hash(&query));
        }
    }

    name
}

/// Truncates to the length cap, preserving a trailing extension when the
/// name has one.
fn truncate_keeping_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => {
            // 115 chars of stem leaves room for a typical extension.
            let stem: String = name[..dot].chars().take(MAX_NAME_LEN - 5).collect();
            format!("{}{}", stem, &name[dot..])
        }
        _ => name.chars().take(MAX_NAME_LEN).collect(),
    }
}

fn query_hash(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())[..QUERY_HASH_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_path() {
        assert_eq!(safe_filename("http://example.com/css/site.css"), "css_site.css");
    }

    #[test]
    fn root_url_becomes_index() {
        assert_eq!(safe_filename("http://example.com/"), "index");
        assert_eq!(safe_filename("http://example.com"), "index");
    }

    #[test]
    fn reserved_characters_are_replaced() {
        let name = safe_filename("http://example.com/a<b>c:d|e");
        assert!(!name.contains('/'));
        assert!(!name.contains('<'));
        assert!(!name.contains('>'));
        assert!(!name.contains(':'));
        assert!(!name.contains('|'));
    }

    #[test]
    fn percent_encoding_is_spelled_out() {
        let name = safe_filename("http://example.com/caf%C3%A9.html");
        assert!(name.contains("_percent_"));
        assert!(!name.contains('%'));
    }

    #[test]
    fn query_string_gets_hash_suffix() {
        let a = safe_filename("http://example.com/page.php?id=1");
        let b = safe_filename("http://example.com/page.php?id=2");
        let plain = safe_filename("http://example.com/page.php");
        assert_ne!(a, b);
        assert_ne!(a, plain);
        assert!(a.starts_with("page.php_"));
        assert_eq!(a.len(), plain.len() + 1 + 10);
    }

    #[test]
    fn long_names_are_truncated_keeping_extension() {
        let long = format!("http://example.com/{}.html", "a".repeat(300));
        let name = safe_filename(&long);
        assert!(name.chars().count() <= 120, "got {} chars", name.chars().count());
        assert!(name.ends_with(".html"));
    }

    #[test]
    fn long_names_without_extension_are_truncated() {
        let long = format!("http://example.com/{}", "b".repeat(300));
        let name = safe_filename(&long);
        assert_eq!(name.chars().count(), 120);
    }

    #[test]
    fn long_name_with_query_stays_within_budget() {
        let long = format!("http://example.com/{}.php?x=1", "c".repeat(300));
        let name = safe_filename(&long);
        // Name capped at 120 excluding the fixed "_" + 10-char suffix.
        assert!(name.chars().count() <= 120 + 1 + 10);
    }

    #[test]
    fn deterministic_across_calls() {
        let url = "http://example.com/forum/topic.php?t=42&page=3";
        assert_eq!(safe_filename(url), safe_filename(url));
    }

    #[test]
    fn relative_input_still_produces_a_name() {
        let name = safe_filename("img/banner.gif");
        assert_eq!(name, "img_banner.gif");
    }
}

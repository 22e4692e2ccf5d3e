//! Website normalization and blocklist matching.
//!
//! Package identifiers never pass through here; they are compared verbatim.

const STRIPPED_PREFIXES: [&str; 3] = ["https://", "http://", "www."];

/// Substrings that make a piece of on-screen text look like an address.
const URL_MARKERS: [&str; 5] = [".com", ".org", ".net", ".io", "www."];

/// Canonical comparable form of a website string.
///
/// Lower-cases, strips each of `https://`, `http://` and `www.` at most once (in that
/// order), then strips one trailing `/`. The pass is repeated until the string stops
/// changing, so the result is always a fixed point: `normalize_website(normalize_website(x))
/// == normalize_website(x)` even for inputs like `"https://https://a.com//"`.
pub fn normalize_website(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut rest = lowered.as_str();

    for prefix in STRIPPED_PREFIXES {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
        }
    }

    rest.strip_suffix('/').unwrap_or(rest).to_string()
}

/// Whether on-screen text looks like a browser address.
pub fn looks_like_url(text: &str) -> bool {
    text.contains('.')
        && (text.starts_with("http") || URL_MARKERS.iter().any(|marker| text.contains(marker)))
}

/// Whether a normalized address matches a normalized blocklist entry.
///
/// Any of: the address contains the entry, starts with it, or its host part (text before
/// the first `/`) contains it. Containment is deliberately loose: blocking `facebook.com`
/// also matches `facebook.com.attacker.example`.
pub fn address_matches(address: &str, entry: &str) -> bool {
    if entry.is_empty() {
        return false;
    }

    let host = address.split('/').next().unwrap_or(address);

    address.contains(entry) || address.starts_with(entry) || host.contains(entry)
}

/// Find the first blocklist entry matched by a raw address.
///
/// Returns the matched entry itself, not the address.
pub fn find_blocked_entry<'a, I>(raw_address: &str, entries: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let address = normalize_website(raw_address);

    entries
        .into_iter()
        .map(String::as_str)
        .find(|entry| address_matches(&address, &normalize_website(entry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize_website("https://www.Example.com/"), "example.com");
        assert_eq!(normalize_website("HTTP://EXAMPLE.ORG"), "example.org");
        assert_eq!(normalize_website("example.net/"), "example.net");
        assert_eq!(normalize_website("www.reddit.com/r/rust"), "reddit.com/r/rust");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "",
            "/",
            "//",
            "https://",
            "https://https://a.com//",
            "www.https://x.io/",
            "http://www.www.site.net///",
            "Mixed.Case/Path/",
            "  spaced.com ",
            "İstanbul.com",
        ];

        for input in inputs {
            let once = normalize_website(input);
            assert_eq!(normalize_website(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn test_normalize_can_empty() {
        assert_eq!(normalize_website("https://www./"), "");
        assert_eq!(normalize_website("/"), "");
    }

    #[test]
    fn test_looks_like_url() {
        assert!(looks_like_url("m.facebook.com/feed"));
        assert!(looks_like_url("https://example.de"));
        assert!(looks_like_url("www.example.de"));
        assert!(looks_like_url("docs.rs.io"));
        assert!(!looks_like_url("example.de"));
        assert!(!looks_like_url("Search or type URL"));
        assert!(!looks_like_url("http"));
    }

    #[test]
    fn test_address_matches() {
        assert!(address_matches("m.facebook.com/feed", "facebook.com"));
        assert!(address_matches("facebook.com", "facebook.com"));
        assert!(address_matches("notfacebook.com.evil.test", "facebook.com"));
        assert!(!address_matches("example.com/facebook", "facebook.com"));
        assert!(!address_matches("example.com", ""));
    }

    #[test]
    fn test_find_blocked_entry_returns_entry() {
        let entries: BTreeSet<String> = ["facebook.com".to_string(), "reddit.com".to_string()].into();

        assert_eq!(
            find_blocked_entry("https://www.Reddit.com/r/rust/", &entries),
            Some("reddit.com")
        );
        assert_eq!(
            find_blocked_entry("m.facebook.com/feed", &entries),
            Some("facebook.com")
        );
        assert_eq!(find_blocked_entry("github.com", &entries), None);
    }
}

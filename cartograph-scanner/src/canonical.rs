use crate::error::Result;
use url::Url;

/// Resolve `raw` against `base` and drop the fragment and query string.
///
/// The returned URL's string form is the identity used for deduplication:
/// two links refer to the same page iff their canonical strings are equal.
pub fn canonicalize(base: &Url, raw: &str) -> Result<Url> {
    let mut url = base.join(raw.trim())?;
    strip(&mut url);
    Ok(url)
}

/// Canonicalize an already-absolute URL in place.
pub fn normalize(mut url: Url) -> Url {
    strip(&mut url);
    url
}

fn strip(url: &mut Url) {
    url.set_fragment(None);
    url.set_query(None);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html").unwrap()
    }

    #[test]
    fn test_strips_query_and_fragment() {
        let url = canonicalize(&base(), "https://example.com/a?x=1#top").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_resolves_path_relative() {
        let url = canonicalize(&base(), "guide.html").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/guide.html");
    }

    #[test]
    fn test_resolves_root_relative() {
        let url = canonicalize(&base(), "/about").unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_resolves_protocol_relative() {
        let url = canonicalize(&base(), "//cdn.example.org/lib.js").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/lib.js");
    }

    #[test]
    fn test_fragment_only_resolves_to_page() {
        let url = canonicalize(&base(), "#section").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/index.html");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://example.com/a?x=1#top",
            "../up/./here?q",
            "//other.net/path#frag",
            "/",
            "http://example.com:8080/p/",
        ];
        for raw in inputs {
            let once = canonicalize(&base(), raw).unwrap();
            let twice = canonicalize(&once, once.as_str()).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", raw);
            assert!(once.query().is_none());
            assert!(once.fragment().is_none());
        }
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(canonicalize(&base(), "http://[::1").is_err());
        assert!(canonicalize(&base(), "http://exa mple.com/").is_err());
    }

    #[test]
    fn test_normalize_absolute() {
        let url = normalize(Url::parse("http://x/index.html?a=b#c").unwrap());
        assert_eq!(url.as_str(), "http://x/index.html");
    }
}

//! Object key and public URL helpers shared by all storage backends.
//!
//! Public URLs are `{base}/{key}` where every segment of the key is
//! percent-encoded on its own, so `/` separators survive while Korean or
//! otherwise non-ASCII filenames stay addressable.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left untouched when encoding a URL path segment.
/// Matches JavaScript's `encodeURIComponent`.
const URL_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Strip leading slashes from a key to avoid empty path segments in the bucket.
pub fn clean_key(key: &str) -> &str {
    key.trim_start_matches('/')
}

/// Percent-encode each segment of a key independently, keeping `/` separators.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, URL_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the public URL for an object key.
pub fn public_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        encode_key(clean_key(key))
    )
}

/// Derive an object key from a public URL or a bare key.
///
/// Strips the public base URL prefix if present, removes leading slashes and
/// decodes percent-encoded segments back to the raw key.
pub fn key_from_url(base_url: &str, url_or_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let remainder = url_or_key
        .strip_prefix(base)
        .map(|r| r.trim_start_matches('/'))
        .unwrap_or_else(|| clean_key(url_or_key));

    remainder
        .split('/')
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_key() {
        assert_eq!(clean_key("/projects/a.jpg"), "projects/a.jpg");
        assert_eq!(clean_key("projects/a.jpg"), "projects/a.jpg");
        assert_eq!(clean_key("//a.jpg"), "a.jpg");
    }

    #[test]
    fn test_encode_key_ascii_passthrough() {
        assert_eq!(
            encode_key("uploads/thumb/1700000000000-ab12cd-door.jpg"),
            "uploads/thumb/1700000000000-ab12cd-door.jpg"
        );
    }

    #[test]
    fn test_encode_key_non_ascii() {
        // Korean filename segments must be encoded, separators kept
        let encoded = encode_key("projects/10/창호.jpg");
        assert_eq!(
            encoded,
            "projects/10/%EC%B0%BD%ED%98%B8.jpg"
        );
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("https://img.example.com", "/uploads/large/a b.jpg"),
            "https://img.example.com/uploads/large/a%20b.jpg"
        );
    }

    #[test]
    fn test_key_from_url_round_trip() {
        let base = "https://img.example.com";
        let key = "projects/10/창호 설치.jpg";
        let url = public_url(base, key);
        assert_eq!(key_from_url(base, &url), key);
    }

    #[test]
    fn test_key_from_url_accepts_bare_key() {
        assert_eq!(
            key_from_url("https://img.example.com", "/uploads/thumb/a.jpg"),
            "uploads/thumb/a.jpg"
        );
    }

    #[test]
    fn test_key_from_url_foreign_url_kept_as_key() {
        // URL under a different host is not ours; treated as an opaque key
        let key = key_from_url("https://img.example.com", "https://other.host/x/y.jpg");
        assert_eq!(key, "https://other.host/x/y.jpg");
    }
}

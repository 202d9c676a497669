//! Request fingerprints used as cache keys.

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::Request;

const HEADERS_SUFFIX: &str = "-headers";

/// Deterministic digest of a request's full target and body.
///
/// Lowercase hex SHA-256 over the length-prefixed URL string (query included), a
/// body-presence marker and the body bytes. The length prefix keeps the URL/body
/// boundary unambiguous. The body is only borrowed, so the request stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a request.
    #[must_use]
    pub fn of(request: &Request<Bytes>) -> Self {
        let url = request.url().as_str().as_bytes();
        let mut hasher = Sha256::new();
        hasher.update(u64::try_from(url.len()).unwrap_or(u64::MAX).to_be_bytes());
        hasher.update(url);
        match request.body() {
            Some(body) => {
                hasher.update([1]);
                hasher.update(body);
            }
            None => hasher.update([0]),
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Key of the body entry.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the headers entry.
    #[must_use]
    pub fn headers_key(&self) -> String {
        format!("{}{HEADERS_SUFFIX}", self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    fn request(method: Method, url: &str, body: Option<&'static str>) -> Request<Bytes> {
        let url = url::Url::parse(url).expect("url");
        let builder = Request::builder(method, url);
        match body {
            Some(body) => builder.body(Bytes::from_static(body.as_bytes())).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn identical_requests_share_a_fingerprint() {
        let first = request(Method::GET, "http://example.com/path?q=test", None);
        let second = request(Method::GET, "http://example.com/path?q=test", None);
        assert_eq!(Fingerprint::of(&first), Fingerprint::of(&second));
        assert_eq!(Fingerprint::of(&first), Fingerprint::of(&first));
    }

    #[test]
    fn query_and_body_change_the_fingerprint() {
        let bare = request(Method::GET, "http://example.com/path", None);
        let query = request(Method::GET, "http://example.com/path?q=test", None);
        let body = request(Method::POST, "http://example.com/path", Some("request body"));
        let other_body = request(Method::POST, "http://example.com/path", Some("other body"));

        let keys = [&bare, &query, &body, &other_body].map(Fingerprint::of);
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn url_and_body_boundary_is_unambiguous() {
        let long_path = request(Method::GET, "http://a.com/xy", None);
        let split = request(Method::POST, "http://a.com/x", Some("y"));
        assert_ne!(Fingerprint::of(&long_path), Fingerprint::of(&split));

        let absent = request(Method::POST, "http://a.com/x", None);
        let empty = request(Method::POST, "http://a.com/x", Some(""));
        assert_ne!(Fingerprint::of(&absent), Fingerprint::of(&empty));
    }

    #[test]
    fn fingerprint_leaves_the_body_readable() {
        let request = request(Method::POST, "http://example.com/", Some("payload"));
        let _ = Fingerprint::of(&request);
        assert_eq!(request.body(), Some(&Bytes::from("payload")));
    }

    #[test]
    fn key_shapes() {
        let key = Fingerprint::of(&request(Method::GET, "http://example.com/", None));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.headers_key(), format!("{key}-headers"));
    }
}

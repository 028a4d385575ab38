//! Random tokens that grant public, read-only access to a shared document.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

const TOKEN_BYTES: usize = 32;

/// 32 random bytes, URL-safe base64 without padding (43 chars).
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Cheap shape check so obviously bogus tokens never reach the database.
pub fn looks_valid(token: &str) -> bool {
    token.len() == 43
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Token plus the absolute link handed to the customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ShareLink {
    pub token: String,
    pub url: String,
}

impl ShareLink {
    /// `kind` is the public path segment, e.g. `invoices`.
    pub fn new(public_base_url: &str, kind: &str, token: String) -> Self {
        let url = format!(
            "{}/api/public/{}/{}",
            public_base_url.trim_end_matches('/'),
            kind,
            token
        );
        Self { token, url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_url_safe_and_unique() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
        assert!(looks_valid(&a));
        assert!(looks_valid(&b));
    }

    #[test]
    fn link_joins_base_without_double_slash() {
        let link = ShareLink::new("https://office.example.com/", "invoices", "abc".to_string());
        assert_eq!(link.url, "https://office.example.com/api/public/invoices/abc");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(!looks_valid(""));
        assert!(!looks_valid("short"));
        assert!(!looks_valid(&"a/".repeat(22)[..43]));
    }
}

//! Key <-> file name mapping
//!
//! Keys are DOIs like `10.1109/5.771073`. The only character rewritten is
//! `/`, which becomes `@`. Keys that already contain `@` do not round-trip.

use tracing::warn;

const SEPARATOR: char = '/';
const REPLACEMENT: char = '@';

/// Map a key to its storage name
pub fn sanitize(key: &str) -> String {
    let name = key.replace(SEPARATOR, &REPLACEMENT.to_string());
    if name.is_empty() || name == "." || name == ".." {
        warn!(key, storage_name = %name, "Sanitized key may be an invalid file name");
    }
    name
}

/// Map a storage name (artifact suffix already stripped) back to its key
pub fn unsanitize(name: &str) -> String {
    name.replace(REPLACEMENT, &SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_slashes() {
        assert_eq!(sanitize("10.123/test:key"), "10.123@test:key");
        assert_eq!(sanitize("10.1/a/b/c"), "10.1@a@b@c");
        assert_eq!(sanitize("no-slashes"), "no-slashes");
    }

    #[test]
    fn test_unsanitize_restores_slashes() {
        assert_eq!(unsanitize("10.123@test:key"), "10.123/test:key");
    }

    #[test]
    fn test_round_trip_without_at_sign() {
        for key in ["10.1109/5.771073", "10.1000/xyz123", "a/b/c", "plain", "/"] {
            assert_eq!(unsanitize(&sanitize(key)), key);
        }
    }

    #[test]
    fn test_at_sign_does_not_round_trip() {
        assert_eq!(unsanitize(&sanitize("user@host/doc")), "user/host/doc");
    }

    #[test]
    fn test_degenerate_names_still_produced() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("."), ".");
        assert_eq!(sanitize(".."), "..");
    }
}

//! User identity used to key conversation logs and model selections.

use std::fmt;

/// Filesystem-safe identity of a chat user.
///
/// The raw name is percent-encoded (dots included) so it can be embedded in
/// file names directly and distinct names never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserKey(String);

impl UserKey {
    /// Surrounding whitespace is ignored; a blank name maps to `anonymous`.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self("anonymous".to_string());
        }
        // `.` is unreserved in URLs but `.`/`..` must never become a path
        Self(urlencoding::encode(raw).replace('.', "%2E"))
    }

    /// Key for a Telegram user. The numeric id is stable across username changes.
    pub fn telegram(user_id: u64) -> Self {
        Self(user_id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_path_characters() {
        assert_eq!(UserKey::new("../etc/passwd").as_str(), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(UserKey::new("..").as_str(), "%2E%2E");
        assert_eq!(UserKey::new("alice smith").as_str(), "alice%20smith");
    }

    #[test]
    fn test_keeps_safe_names() {
        assert_eq!(UserKey::new("bob_42-x").as_str(), "bob_42-x");
        assert_eq!(UserKey::new("  bob  ").as_str(), "bob");
    }

    #[test]
    fn test_distinct_names_get_distinct_keys() {
        let names = [
            "Олег", "Иван", "alice.smith", "alice_smith", "alice smith", "alice%2Esmith",
            "a/b", "a_b", "%", "_",
        ];
        let keys: std::collections::HashSet<UserKey> =
            names.iter().map(|n| UserKey::new(n)).collect();
        assert_eq!(keys.len(), names.len());
    }

    #[test]
    fn test_non_ascii_key_is_file_name_safe() {
        let key = UserKey::new("Олег");
        assert!(key
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "%-_~".contains(c)));
    }

    #[test]
    fn test_empty_becomes_anonymous() {
        assert_eq!(UserKey::new("   ").as_str(), "anonymous");
    }

    #[test]
    fn test_telegram_key() {
        assert_eq!(UserKey::telegram(123456789).to_string(), "123456789");
    }
}

//! Provider credential held for the lifetime of a session.
//!
//! The key is entered by the user, kept in memory only, and never written to
//! disk or to the log. `Debug` and `Display` both redact it.

use std::fmt;

use crate::error::Error;
use crate::Result;

/// Opaque API key for the hosted model.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw key. Only the LLM client should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Reject a missing key before any provider call is attempted.
    pub fn require(&self) -> Result<&str> {
        if self.is_empty() {
            return Err(Error::Auth(
                "No API key set. Enter your API key before chatting.".to_string(),
            ));
        }
        Ok(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("not set")
        } else {
            f.write_str("✓")
        }
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let cred = Credential::new("gsk_super_secret");
        let shown = format!("{:?} {}", cred, cred);
        assert!(!shown.contains("gsk_super_secret"));
        assert_eq!(cred.expose(), "gsk_super_secret");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let cred = Credential::new("   ");
        assert!(cred.is_empty());
        assert!(matches!(cred.require(), Err(Error::Auth(_))));
    }
}

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("the email shape pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientAddress(String);

impl RecipientAddress {
    /// Accepts `local@domain.tld` shaped strings without whitespace.
    ///
    /// Only the shape is checked, deliverability is up to the mail server.
    pub fn parse(s: String) -> Result<RecipientAddress, String> {
        if !EMAIL_SHAPE.is_match(&s) {
            return Err(format!("{} is not a valid recipient address.", s));
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for RecipientAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

use crate::error::StoreError;
use std::fmt;

/// A validated model domain: the caller-chosen name a version history lives
/// under.
///
/// Domains are stable identifiers, so no normalization is applied; a name is
/// accepted exactly as given or rejected. The rules:
/// - non-empty
/// - characters limited to `[a-z0-9._-]`
/// - never `.` or `..` (domains become single key segments)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainName(String);

impl DomainName {
    /// Validates `value` and wraps it as a domain name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDomain`] when the value breaks any of the
    /// domain rules.
    pub fn new(value: impl Into<String>) -> Result<Self, StoreError> {
        Self::try_from(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, StoreError> {
        if value.is_empty() {
            return Err(StoreError::InvalidDomain {
                message: "EMPTY".into(),
                context: Some("Domain name cannot be empty".into()),
            });
        }

        if !value.chars().all(is_domain_char) {
            return Err(StoreError::InvalidDomain {
                message: value.into(),
                context: Some("Domain name is limited to lowercase [a-z0-9._-]".into()),
            });
        }

        if value == "." || value == ".." {
            return Err(StoreError::InvalidDomain {
                message: value.into(),
                context: Some("Domain name must not be a relative path segment".into()),
            });
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for DomainName {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, StoreError> {
        Self::try_from(value.to_owned())
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const fn is_domain_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
}

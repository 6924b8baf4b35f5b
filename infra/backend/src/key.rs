use crate::error::BackendError;
use std::fmt;

/// A validated object key: a relative, `/`-separated location inside a
/// backend root.
///
/// Keys are checked once at construction so the engines can treat them as
/// trusted input. The rules are deliberately narrow:
/// - non-empty, no leading or trailing `/`, no empty segments
/// - segments never equal `.` or `..`
/// - characters limited to `[A-Za-z0-9._/-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validates `value` and wraps it as a key.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidKey`] when the value breaks any of the
    /// key rules.
    pub fn new(value: impl Into<String>) -> Result<Self, BackendError> {
        Self::try_from(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment, used as the local file name on download.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, BackendError> {
        if value.is_empty() {
            return Err(BackendError::InvalidKey {
                message: "EMPTY".into(),
                context: Some("Object key cannot be empty".into()),
            });
        }

        if !value.chars().all(is_key_char) {
            return Err(BackendError::InvalidKey {
                message: value.into(),
                context: Some("Object key contains illegal characters".into()),
            });
        }

        if let Some(reason) = segment_violation(&value) {
            return Err(BackendError::InvalidKey {
                message: value.into(),
                context: Some(reason.into()),
            });
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for ObjectKey {
    type Error = BackendError;

    fn try_from(value: &str) -> Result<Self, BackendError> {
        Self::try_from(value.to_owned())
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listing prefixes share the key charset but may be empty or end with `/`.
pub(crate) fn validate_prefix(prefix: &str) -> Result<(), BackendError> {
    if !prefix.chars().all(is_key_char) {
        return Err(BackendError::InvalidKey {
            message: prefix.to_owned().into(),
            context: Some("Listing prefix contains illegal characters".into()),
        });
    }

    if prefix.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(BackendError::InvalidKey {
            message: prefix.to_owned().into(),
            context: Some("Listing prefix must not contain relative path segments".into()),
        });
    }

    Ok(())
}

fn segment_violation(value: &str) -> Option<&'static str> {
    for segment in value.split('/') {
        if segment.is_empty() {
            return Some("Object key contains an empty path segment");
        }
        if segment == "." || segment == ".." {
            return Some("Object key must not contain relative path segments");
        }
    }
    None
}

const fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/')
}

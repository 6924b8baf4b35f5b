use std::borrow::Cow;

/// A specialized [`BackendError`] enum of this crate.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend configuration rejected{}: {message}", format_context(.context))]
    Configuration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid object key{}: {message}", format_context(.context))]
    InvalidKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Object not found{}: {message}", format_context(.context))]
    ObjectNotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Object already exists{}: {message}", format_context(.context))]
    DuplicateKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Backend unavailable{}: {source}", format_context(.context))]
    Unavailable { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

pub trait BackendErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, BackendError>;
}

impl<T> BackendErrorExt<T> for Result<T, BackendError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                BackendError::Configuration { context: c, .. }
                | BackendError::InvalidKey { context: c, .. }
                | BackendError::ObjectNotFound { context: c, .. }
                | BackendError::DuplicateKey { context: c, .. }
                | BackendError::Unavailable { context: c, .. }
                | BackendError::Io { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl From<std::io::Error> for BackendError {
    #[inline]
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, context: None }
    }
}

impl<T> BackendErrorExt<T> for Result<T, std::io::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, BackendError> {
        self.map_err(|source| BackendError::Io { source, context: Some(context.into()) })
    }
}

impl From<reqwest::Error> for BackendError {
    #[inline]
    fn from(source: reqwest::Error) -> Self {
        Self::Unavailable { source, context: None }
    }
}

impl<T> BackendErrorExt<T> for Result<T, reqwest::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, BackendError> {
        self.map_err(|source| BackendError::Unavailable { source, context: Some(context.into()) })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

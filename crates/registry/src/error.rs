use mdock_archive::ArchiveError;
use mdock_backend::BackendError;
use std::borrow::Cow;

/// A specialized [`StoreError`] enum of this crate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Configuration error{}: {source}", format_context(.context))]
    Config { source: ::config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Invalid domain name{}: {message}", format_context(.context))]
    InvalidDomain { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {message}", format_context(.context))]
    Serialization { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Index inconsistency{}: {message}", format_context(.context))]
    IndexInconsistency { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unknown version{}: {message}", format_context(.context))]
    UnknownVersion { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Archive error{}: {source}", format_context(.context))]
    Archive { source: ArchiveError, context: Option<Cow<'static, str>> },

    #[error("Storage error{}: {source}", format_context(.context))]
    Backend { source: BackendError, context: Option<Cow<'static, str>> },
}

pub trait StoreErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, StoreError>;
}

impl<T> StoreErrorExt<T> for Result<T, StoreError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                StoreError::Config { context: c, .. }
                | StoreError::InvalidDomain { context: c, .. }
                | StoreError::Serialization { context: c, .. }
                | StoreError::IndexInconsistency { context: c, .. }
                | StoreError::UnknownVersion { context: c, .. }
                | StoreError::Archive { context: c, .. }
                | StoreError::Backend { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl From<::config::ConfigError> for StoreError {
    #[inline]
    fn from(source: ::config::ConfigError) -> Self {
        Self::Config { source, context: None }
    }
}

impl<T> StoreErrorExt<T> for Result<T, ::config::ConfigError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Config { source, context: Some(context.into()) })
    }
}

impl From<ArchiveError> for StoreError {
    #[inline]
    fn from(source: ArchiveError) -> Self {
        Self::Archive { source, context: None }
    }
}

impl<T> StoreErrorExt<T> for Result<T, ArchiveError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Archive { source, context: Some(context.into()) })
    }
}

impl From<BackendError> for StoreError {
    #[inline]
    fn from(source: BackendError) -> Self {
        Self::Backend { source, context: None }
    }
}

impl<T> StoreErrorExt<T> for Result<T, BackendError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Backend { source, context: Some(context.into()) })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

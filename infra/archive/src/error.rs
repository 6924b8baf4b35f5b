//! # Archive Errors
//!
//! This module defines the [`ArchiveError`] enum used throughout the archive
//! crate for reporting capture, format, and disk failures.

use std::borrow::Cow;

/// A specialized [`ArchiveError`] enum for archive-related failures.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Failure while capturing model state or encoding the manifest.
    #[error("Serialization error{}: {message}", format_context(.context))]
    Serialization { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure when the container bytes are malformed or do not match the
    /// manifest they carry.
    #[error("Invalid archive{}: {message}", format_context(.context))]
    InvalidFormat { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure during payload decompression.
    #[error("Decompression error{}: {message}", format_context(.context))]
    Decompression { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Local disk failure.
    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

pub trait ArchiveErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ArchiveError>;
}

impl<T> ArchiveErrorExt<T> for Result<T, ArchiveError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                ArchiveError::Serialization { context: c, .. }
                | ArchiveError::InvalidFormat { context: c, .. }
                | ArchiveError::Decompression { context: c, .. }
                | ArchiveError::Io { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl From<std::io::Error> for ArchiveError {
    #[inline]
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, context: None }
    }
}

impl<T> ArchiveErrorExt<T> for Result<T, std::io::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ArchiveError> {
        self.map_err(|source| ArchiveError::Io { source, context: Some(context.into()) })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

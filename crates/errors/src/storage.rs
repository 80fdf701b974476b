//! Storage and filesystem-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("failed creating destination directory {path}: {message}")]
    DirectoryCreateFailed { path: String, message: String },

    #[error("invalid path: {path}")]
    InvalidPath { path: String },
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DirectoryCreateFailed { .. } => {
                Some("Check that the destination directory is writable by this user.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DirectoryCreateFailed { .. } => "storage.directory_create_failed",
            Self::InvalidPath { .. } => "storage.invalid_path",
        };
        Some(code)
    }
}

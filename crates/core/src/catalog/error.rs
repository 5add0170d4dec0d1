use thiserror::Error;

use crate::api::ApiError;
use crate::fields::FieldErrors;
use crate::storage::StorageError;

/// Errors surfaced by catalog queries and mutations.
///
/// `Clone` so a single in-flight result can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// The request never got an answer (offline, DNS, timeout).
    #[error("Network error: {0}")]
    Transport(String),

    /// Client-side validation failed before anything was sent.
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    /// The server rejected the request with per-field details.
    #[error("Rejected by server ({code}): {fields}")]
    Rejected { code: String, fields: FieldErrors },

    /// Non-success status without usable details.
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Anything else (malformed response, missing configuration).
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// The import file has no content.
    #[error("The file is empty")]
    EmptyImportFile,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or refused auth token.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The same mutation is already pending.
    #[error("Another request for this action is still in progress")]
    InFlight,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    /// Field-scoped messages, whether detected locally or by the server.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            CatalogError::Validation(fields) => Some(fields),
            CatalogError::Rejected { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    pub fn is_field_scoped(&self) -> bool {
        self.field_errors().is_some()
    }
}

impl From<ApiError> for CatalogError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::HttpError(e) => CatalogError::Transport(e.to_string()),
            ApiError::Unauthorized => CatalogError::Unauthenticated,
            ApiError::NotFound(what) => CatalogError::NotFound(what),
            ApiError::Rejected { code, fields } => CatalogError::Rejected { code, fields },
            ApiError::Status { status, message } => CatalogError::Server { status, message },
            ApiError::ParseError(msg) | ApiError::NotConfigured(msg) => {
                CatalogError::Unexpected(msg)
            }
        }
    }
}

impl From<StorageError> for CatalogError {
    fn from(e: StorageError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_same_shape_for_client_and_server() {
        let mut fields = FieldErrors::new();
        fields.insert("title", "Title cannot be empty");
        let local = CatalogError::Validation(fields);

        let mut fields = FieldErrors::new();
        fields.insert("data/email", "NOT_UNIQUE");
        let remote = CatalogError::Rejected {
            code: "EMAIL_NOT_UNIQUE".to_string(),
            fields,
        };

        assert_eq!(
            local.field_errors().and_then(|f| f.get("title")),
            Some("Title cannot be empty")
        );
        assert_eq!(
            remote.field_errors().and_then(|f| f.get("email")),
            Some("NOT_UNIQUE")
        );
    }

    #[test]
    fn test_rejection_without_fields_is_generic() {
        let err = CatalogError::Rejected {
            code: "MOVIE_EXISTS".to_string(),
            fields: FieldErrors::new(),
        };
        assert!(!err.is_field_scoped());
        assert!(!CatalogError::Transport("offline".to_string()).is_field_scoped());
    }

    #[test]
    fn test_from_api_error() {
        assert_eq!(
            CatalogError::from(ApiError::Unauthorized),
            CatalogError::Unauthenticated
        );
        assert_eq!(
            CatalogError::from(ApiError::Status {
                status: 500,
                message: "boom".to_string()
            }),
            CatalogError::Server {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert!(matches!(
            CatalogError::from(ApiError::ParseError("bad json".to_string())),
            CatalogError::Unexpected(_)
        ));
    }

    #[test]
    fn test_empty_file_message() {
        assert_eq!(CatalogError::EmptyImportFile.to_string(), "The file is empty");
    }
}

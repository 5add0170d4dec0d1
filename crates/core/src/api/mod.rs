//! Remote movie catalog API.
//!
//! [`CatalogApi`] describes the REST contract of the movie service.
//! [`HttpCatalogApi`] talks to the real service; tests use
//! `testing::MockCatalogApi`.

mod http;
mod types;

pub use http::HttpCatalogApi;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::fields::FieldErrors;

/// Errors that can occur when talking to the catalog service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The service did not accept the auth token (or none was sent).
    #[error("Not authorized")]
    Unauthorized,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The service rejected the request with field-level details.
    #[error("Request rejected ({code}): {fields}")]
    Rejected { code: String, fields: FieldErrors },

    /// Any other non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (bad base URL, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// The movie catalog REST contract.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /movies` with the query's filters.
    async fn list_movies(&self, query: &ListQuery) -> Result<Vec<Movie>, ApiError>;

    /// `GET /movies/{id}`, including actors.
    async fn get_movie(&self, id: &MovieId) -> Result<Movie, ApiError>;

    /// `POST /movies`.
    async fn create_movie(&self, input: &MovieInput) -> Result<Movie, ApiError>;

    /// `DELETE /movies/{id}`.
    async fn delete_movie(&self, id: &MovieId) -> Result<(), ApiError>;

    /// `POST /movies/import` with the file as multipart field `movies`.
    async fn import_movies(&self, file: &ImportFile) -> Result<ImportSummary, ApiError>;

    /// `POST /users`.
    async fn register(&self, request: &RegisterRequest) -> Result<Registration, ApiError>;
}

//! reqwest-backed client for the movie catalog service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, multipart, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    ApiError, CatalogApi, ImportFile, ImportSummary, ListQuery, Movie, MovieId, MovieInput,
    RegisterRequest, Registration,
};
use crate::config::ApiConfig;
use crate::fields::FieldErrors;
use crate::metrics;
use crate::session::Session;

/// Multipart field name the import endpoint expects.
const IMPORT_FIELD: &str = "movies";

/// HTTP client for the movie catalog.
///
/// The auth token is read from the [`Session`] on every request, so a login
/// or logout takes effect without rebuilding the client.
pub struct HttpCatalogApi {
    client: Client,
    base_url: String,
    auth_scheme: Option<String>,
    session: Session,
}

impl HttpCatalogApi {
    /// Create a new client from the `[api]` config section.
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self, ApiError> {
        let base_url = config.url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::NotConfigured("API base URL is required".to_string()));
        }
        Url::parse(&base_url)
            .map_err(|e| ApiError::NotConfigured(format!("Invalid API base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_scheme: config.auth_scheme.clone(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn movie_url(&self, id: &MovieId) -> String {
        self.url(&format!("movies/{}", urlencoding::encode(id.as_str())))
    }

    /// Attach the session token, if any.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token().await {
            Some(token) => {
                let value = match &self.auth_scheme {
                    Some(scheme) => format!("{} {}", scheme, token),
                    None => token,
                };
                request.header(header::AUTHORIZATION, value)
            }
            None => request,
        }
    }

    /// Send a request and classify the response.
    ///
    /// Returns the parsed JSON body, or `None` when the body is empty or not
    /// JSON. The service sometimes reports failures with a 2xx status and an
    /// `error` object, so the body is inspected before the status.
    async fn send(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
        subject: &str,
    ) -> Result<Option<Value>, ApiError> {
        let request = self.authorize(request).await;
        let started = Instant::now();

        let result = self.exchange(request, subject).await;

        metrics::API_REQUEST_DURATION
            .with_label_values(&[endpoint])
            .observe(started.elapsed().as_secs_f64());
        metrics::API_REQUESTS
            .with_label_values(&[endpoint, outcome_label(&result)])
            .inc();

        if let Err(e) = &result {
            warn!("{} request failed: {}", endpoint, e);
        }
        result
    }

    async fn exchange(
        &self,
        request: RequestBuilder,
        subject: &str,
    ) -> Result<Option<Value>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let value = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Value>(&body).ok()
        };

        if let Some(rejection) = value.as_ref().and_then(rejection_from) {
            return Err(rejection);
        }
        if status == 401 || status == 403 {
            return Err(ApiError::Unauthorized);
        }
        if status == 404 {
            return Err(ApiError::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(value)
    }
}

fn outcome_label(result: &Result<Option<Value>, ApiError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ApiError::HttpError(_)) => "transport",
        Err(ApiError::Rejected { .. }) => "rejected",
        Err(_) => "error",
    }
}

/// Extract `{error: {code, fields}}` from a response body.
fn rejection_from(body: &Value) -> Option<ApiError> {
    let error = body.get("error")?;
    if !error.is_object() {
        return None;
    }
    let code = error
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN")
        .to_string();
    let fields = error
        .get("fields")
        .map(FieldErrors::from_server)
        .unwrap_or_default();
    Some(ApiError::Rejected { code, fields })
}

/// Deserialize a `{data: T}` envelope, falling back to a bare `T`.
fn unwrap_data<T: DeserializeOwned>(body: Option<Value>, what: &str) -> Result<T, ApiError> {
    let mut body = body.ok_or_else(|| ApiError::ParseError(format!("Empty {} response", what)))?;
    let payload = if body.get("data").is_some() {
        body["data"].take()
    } else {
        body
    };
    serde_json::from_value(payload)
        .map_err(|e| ApiError::ParseError(format!("Failed to parse {} response: {}", what, e)))
}

fn import_summary(body: Option<Value>) -> ImportSummary {
    body.as_ref()
        .and_then(|b| b.get("meta"))
        .and_then(|meta| serde_json::from_value(meta.clone()).ok())
        .unwrap_or_default()
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn list_movies(&self, query: &ListQuery) -> Result<Vec<Movie>, ApiError> {
        debug!("Listing movies: {:?}", query);

        let request = self.client.get(self.url("movies")).query(&query.to_pairs());
        let body = self.send("list_movies", request, "movie list").await?;

        unwrap_data(body, "movie list")
    }

    async fn get_movie(&self, id: &MovieId) -> Result<Movie, ApiError> {
        debug!("Fetching movie {}", id);

        let request = self.client.get(self.movie_url(id));
        let body = self
            .send("get_movie", request, &format!("Movie ID {}", id))
            .await?;

        unwrap_data(body, "movie")
    }

    async fn create_movie(&self, input: &MovieInput) -> Result<Movie, ApiError> {
        debug!("Creating movie '{}' ({})", input.title, input.year);

        let request = self.client.post(self.url("movies")).json(input);
        let body = self.send("create_movie", request, "movie").await?;

        unwrap_data(body, "created movie")
    }

    async fn delete_movie(&self, id: &MovieId) -> Result<(), ApiError> {
        debug!("Deleting movie {}", id);

        let request = self.client.delete(self.movie_url(id));
        self.send("delete_movie", request, &format!("Movie ID {}", id))
            .await?;

        Ok(())
    }

    async fn import_movies(&self, file: &ImportFile) -> Result<ImportSummary, ApiError> {
        debug!(
            "Importing '{}' ({} bytes)",
            file.file_name,
            file.contents.len()
        );

        let part = multipart::Part::bytes(file.contents.clone())
            .file_name(file.file_name.clone())
            .mime_str("text/plain")?;
        let form = multipart::Form::new().part(IMPORT_FIELD, part);

        let request = self.client.post(self.url("movies/import")).multipart(form);
        let body = self.send("import_movies", request, "import").await?;

        Ok(import_summary(body))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<Registration, ApiError> {
        debug!("Registering user {}", request.email);

        let http = self.client.post(self.url("users")).json(request);
        let body = self.send("register", http, "user").await?;

        let body =
            body.ok_or_else(|| ApiError::ParseError("Empty registration response".to_string()))?;
        serde_json::from_value(body)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse registration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MovieFormat;
    use serde_json::json;

    fn api_config(url: &str) -> ApiConfig {
        ApiConfig {
            url: url.to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_new_requires_base_url() {
        let result = HttpCatalogApi::new(&api_config(""), Session::in_memory());
        assert!(matches!(result, Err(ApiError::NotConfigured(_))));
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = HttpCatalogApi::new(&api_config("not a url"), Session::in_memory());
        assert!(matches!(result, Err(ApiError::NotConfigured(_))));
    }

    #[test]
    fn test_urls_are_joined_without_double_slash() {
        let api =
            HttpCatalogApi::new(&api_config("http://localhost:8000/api/v1/"), Session::in_memory())
                .unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(api.url("movies"), "http://localhost:8000/api/v1/movies");
        assert_eq!(
            api.movie_url(&MovieId::new("a b")),
            "http://localhost:8000/api/v1/movies/a%20b"
        );
    }

    #[test]
    fn test_rejection_from_error_body() {
        let body = json!({
            "status": 0,
            "error": {
                "code": "FORMAT_ERROR",
                "fields": {"data/email": "REQUIRED"}
            }
        });
        match rejection_from(&body) {
            Some(ApiError::Rejected { code, fields }) => {
                assert_eq!(code, "FORMAT_ERROR");
                assert_eq!(fields.get("email"), Some("REQUIRED"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_no_rejection_for_data_body() {
        assert!(rejection_from(&json!({"data": [], "status": 1})).is_none());
        assert!(rejection_from(&json!({"error": "text"})).is_none());
    }

    #[test]
    fn test_unwrap_data_envelope_and_bare() {
        let wrapped = json!({"data": {"id": 1, "title": "Heat", "year": 1995, "format": "DVD"}});
        let movie: Movie = unwrap_data(Some(wrapped), "movie").unwrap();
        assert_eq!(movie.title, "Heat");

        let bare = json!({"id": "2", "title": "Ronin", "year": 1998, "format": "VHS"});
        let movie: Movie = unwrap_data(Some(bare), "movie").unwrap();
        assert_eq!(movie.format, MovieFormat::Vhs);

        let empty: Result<Movie, _> = unwrap_data(None, "movie");
        assert!(matches!(empty, Err(ApiError::ParseError(_))));
    }

    #[test]
    fn test_import_summary_from_meta() {
        let body = json!({"data": [], "meta": {"imported": 0, "total": 4}, "status": 1});
        let summary = import_summary(Some(body));
        assert_eq!(summary.imported, Some(0));
        assert_eq!(summary.total, Some(4));

        assert_eq!(import_summary(None), ImportSummary::default());
    }
}

//! In-memory stand-in for the movie catalog service.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, Mutex, RwLock};

use crate::api::{
    Actor, ApiError, CatalogApi, ImportFile, ImportSummary, ListQuery, Movie, MovieFormat,
    MovieId, MovieInput, RegisterRequest, Registration, SortKey, SortOrder, User,
};
use crate::fields::FieldErrors;

/// Which endpoint a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListMovies,
    GetMovie,
    CreateMovie,
    DeleteMovie,
    ImportMovies,
    Register,
}

/// A call made against the mock, for test assertions.
#[derive(Debug, Clone)]
pub enum RecordedCall {
    ListMovies(ListQuery),
    GetMovie(MovieId),
    CreateMovie(MovieInput),
    DeleteMovie(MovieId),
    ImportMovies { file_name: String, bytes: usize },
    Register(RegisterRequest),
}

impl RecordedCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            RecordedCall::ListMovies(_) => Endpoint::ListMovies,
            RecordedCall::GetMovie(_) => Endpoint::GetMovie,
            RecordedCall::CreateMovie(_) => Endpoint::CreateMovie,
            RecordedCall::DeleteMovie(_) => Endpoint::DeleteMovie,
            RecordedCall::ImportMovies { .. } => Endpoint::ImportMovies,
            RecordedCall::Register(_) => Endpoint::Register,
        }
    }
}

/// Holds one call to an endpoint until released (or dropped).
#[derive(Debug)]
pub struct Gate {
    release: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Mock implementation of [`CatalogApi`].
///
/// Keeps a movie collection in memory and behaves like the real service
/// for filtering, sorting, duplicate titles and imports. Provides:
/// - Recorded calls for assertions
/// - One-shot error injection
/// - Gates that hold the next call to an endpoint so tests can decide the
///   order responses arrive in
///
/// # Example
///
/// ```rust,ignore
/// let api = Arc::new(MockCatalogApi::with_movies(vec![fixtures::movie(1, "Alien", 1979)]));
/// let gate = api.gate_next(Endpoint::ListMovies).await;
/// // ... start a list request, then:
/// gate.release();
/// ```
pub struct MockCatalogApi {
    movies: Arc<RwLock<Vec<Movie>>>,
    next_id: Arc<RwLock<u64>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    next_error: Arc<RwLock<Option<ApiError>>>,
    gates: Arc<Mutex<HashMap<Endpoint, VecDeque<oneshot::Receiver<()>>>>>,
}

impl std::fmt::Debug for MockCatalogApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCatalogApi")
            .field("movies", &"<movies>")
            .field("calls", &"<calls>")
            .field("gates", &"<gates>")
            .finish()
    }
}

impl Default for MockCatalogApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogApi {
    /// Create a mock with an empty collection.
    pub fn new() -> Self {
        Self::with_movies(Vec::new())
    }

    /// Create a mock preloaded with `movies`.
    pub fn with_movies(movies: Vec<Movie>) -> Self {
        let next_id = movies
            .iter()
            .filter_map(|m| m.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            movies: Arc::new(RwLock::new(movies)),
            next_id: Arc::new(RwLock::new(next_id)),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current server-side collection.
    pub async fn movies(&self) -> Vec<Movie> {
        self.movies.read().await.clone()
    }

    /// Replace the server-side collection without recording a call.
    pub async fn set_movies(&self, movies: Vec<Movie>) {
        *self.movies.write().await = movies;
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of calls made to `endpoint`.
    pub async fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.endpoint() == endpoint)
            .count()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Configure the next call (to any endpoint) to fail with `error`.
    pub async fn set_next_error(&self, error: ApiError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Hold the next call to `endpoint` until the returned gate is released.
    /// Gates for the same endpoint are consumed in call order.
    pub async fn gate_next(&self, endpoint: Endpoint) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .await
            .entry(endpoint)
            .or_default()
            .push_back(rx);
        Gate { release: tx }
    }

    /// Wait until at least `count` calls reached `endpoint`.
    pub async fn wait_for_calls(&self, endpoint: Endpoint, count: usize) {
        while self.call_count(endpoint).await < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Record the call, then wait on its gate if one was set. The injected
    /// error, if any, is claimed before waiting.
    async fn enter(&self, call: RecordedCall) -> Result<(), ApiError> {
        let endpoint = call.endpoint();
        self.calls.write().await.push(call);
        let error = self.next_error.write().await.take();
        let gate = self
            .gates
            .lock()
            .await
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn insert(&self, input: &MovieInput) -> Result<Movie, ApiError> {
        let mut movies = self.movies.write().await;
        let wanted = input.title.trim().to_lowercase();
        if movies.iter().any(|m| m.title.trim().to_lowercase() == wanted) {
            let mut fields = FieldErrors::new();
            fields.insert("title", "NOT_UNIQUE");
            return Err(ApiError::Rejected {
                code: "MOVIE_EXISTS".to_string(),
                fields,
            });
        }

        let mut next_id = self.next_id.write().await;
        *next_id += 1;
        let id = *next_id;
        let movie = Movie {
            id: MovieId::from(id),
            title: input.title.clone(),
            year: input.year,
            format: input.format,
            actors: input
                .actors
                .iter()
                .enumerate()
                .map(|(i, name)| Actor {
                    id: (id * 100 + i as u64).to_string(),
                    name: name.clone(),
                    created_at: None,
                    updated_at: None,
                })
                .collect(),
            created_at: None,
            updated_at: None,
        };
        movies.push(movie.clone());
        Ok(movie)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Parse the import text format: blank-line separated blocks of
/// `Title:`, `Release Year:`, `Format:` and `Stars:` lines.
pub fn parse_import(text: &str) -> Vec<MovieInput> {
    text.split("\n\n")
        .filter_map(|block| {
            let mut title = None;
            let mut year = None;
            let mut format = None;
            let mut actors = Vec::new();
            for line in block.lines() {
                let Some((key, value)) = line.split_once(':') else {
                    continue;
                };
                let value = value.trim();
                match key.trim() {
                    "Title" => title = Some(value.to_string()),
                    "Release Year" => year = value.parse::<i32>().ok(),
                    "Format" => format = value.parse::<MovieFormat>().ok(),
                    "Stars" => {
                        actors = value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    }
                    _ => {}
                }
            }
            Some(MovieInput {
                title: title?,
                year: year?,
                format: format?,
                actors,
            })
        })
        .collect()
}

#[async_trait]
impl CatalogApi for MockCatalogApi {
    async fn list_movies(&self, query: &ListQuery) -> Result<Vec<Movie>, ApiError> {
        self.enter(RecordedCall::ListMovies(query.clone())).await?;

        let mut movies: Vec<Movie> = self
            .movies
            .read()
            .await
            .iter()
            .filter(|m| query.title.as_deref().map_or(true, |t| contains_ci(&m.title, t)))
            .filter(|m| {
                query
                    .actor
                    .as_deref()
                    .map_or(true, |a| m.actors.iter().any(|actor| contains_ci(&actor.name, a)))
            })
            .cloned()
            .collect();

        movies.sort_by(|a, b| {
            let ord = match query.sort {
                SortKey::Id => a
                    .id
                    .as_str()
                    .parse::<u64>()
                    .unwrap_or(0)
                    .cmp(&b.id.as_str().parse::<u64>().unwrap_or(0)),
                SortKey::Title => a.title.cmp(&b.title),
                SortKey::Year => a.year.cmp(&b.year),
            };
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        movies.truncate(query.limit as usize);

        // List responses do not carry actors
        for movie in &mut movies {
            movie.actors.clear();
        }
        Ok(movies)
    }

    async fn get_movie(&self, id: &MovieId) -> Result<Movie, ApiError> {
        self.enter(RecordedCall::GetMovie(id.clone())).await?;
        self.movies
            .read()
            .await
            .iter()
            .find(|m| &m.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("movies/{}", id)))
    }

    async fn create_movie(&self, input: &MovieInput) -> Result<Movie, ApiError> {
        self.enter(RecordedCall::CreateMovie(input.clone())).await?;
        self.insert(input).await
    }

    async fn delete_movie(&self, id: &MovieId) -> Result<(), ApiError> {
        self.enter(RecordedCall::DeleteMovie(id.clone())).await?;
        let mut movies = self.movies.write().await;
        let before = movies.len();
        movies.retain(|m| &m.id != id);
        if movies.len() == before {
            return Err(ApiError::NotFound(format!("movies/{}", id)));
        }
        Ok(())
    }

    async fn import_movies(&self, file: &ImportFile) -> Result<ImportSummary, ApiError> {
        self.enter(RecordedCall::ImportMovies {
            file_name: file.file_name.clone(),
            bytes: file.contents.len(),
        })
        .await?;

        let text = String::from_utf8_lossy(&file.contents).replace("\r\n", "\n");
        let inputs = parse_import(&text);
        let total = inputs.len() as u64;
        let mut imported = 0;
        for input in &inputs {
            if self.insert(input).await.is_ok() {
                imported += 1;
            }
        }
        Ok(ImportSummary {
            imported: Some(imported),
            total: Some(total),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<Registration, ApiError> {
        self.enter(RecordedCall::Register(request.clone())).await?;
        let count = self.call_count(Endpoint::Register).await as u64;
        Ok(Registration {
            token: format!("mock-token-{}", count),
            user: Some(User {
                id: count,
                email: request.email.clone(),
                name: request.name.clone(),
            }),
        })
    }
}

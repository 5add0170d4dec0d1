//! Types exchanged with the remote movie catalog API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque movie identifier.
///
/// The API hands out numeric ids but the client never does arithmetic on
/// them, so both JSON numbers and strings are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MovieId(String);

impl MovieId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for MovieId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for MovieId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

/// Ids arrive as JSON numbers or strings depending on the backend.
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

impl<'de> Deserialize<'de> for MovieId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        number_or_string(deserializer).map(MovieId)
    }
}

impl Serialize for MovieId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

// ============================================================================
// Read model
// ============================================================================

/// Physical format of a movie in the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovieFormat {
    #[serde(rename = "VHS")]
    Vhs,
    #[serde(rename = "DVD")]
    Dvd,
    #[serde(rename = "Blu-Ray")]
    BluRay,
}

impl MovieFormat {
    pub const ALL: [MovieFormat; 3] = [MovieFormat::Vhs, MovieFormat::Dvd, MovieFormat::BluRay];

    /// Label used by the API and shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            MovieFormat::Vhs => "VHS",
            MovieFormat::Dvd => "DVD",
            MovieFormat::BluRay => "Blu-Ray",
        }
    }
}

impl fmt::Display for MovieFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MovieFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovieFormat::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown format: {}", s))
    }
}

/// An actor attached to a movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(deserialize_with = "number_or_string")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A movie as stored by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: i32,
    pub format: MovieFormat,
    /// Only populated by detail responses; list responses omit actors.
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Movie {
    /// Actor names joined for display, `N/A` when there are none.
    pub fn actor_names(&self) -> String {
        if self.actors.is_empty() {
            "N/A".to_string()
        } else {
            self.actors
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

// ============================================================================
// Write model
// ============================================================================

/// Payload for creating a movie. Actors are free-text names resolved
/// server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieInput {
    pub title: String,
    pub year: i32,
    pub format: MovieFormat,
    pub actors: Vec<String>,
}

/// A text file selected for bulk import.
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl ImportFile {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk, keeping its base name for the upload.
    pub async fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "movies.txt".to_string());
        Ok(Self::new(file_name, contents))
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Counts reported by the server after an import. Both are `None` when the
/// server answered without a body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    #[serde(default)]
    pub imported: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

// ============================================================================
// Queries
// ============================================================================

/// Server-side sort key for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Id,
    Title,
    #[default]
    Year,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Title => "title",
            SortKey::Year => "year",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(SortKey::Id),
            "title" => Ok(SortKey::Title),
            "year" => Ok(SortKey::Year),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

/// Server-side sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

/// Default result limit for list queries.
pub const DEFAULT_LIST_LIMIT: u32 = 1000;

/// Filter state as edited by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieFilters {
    pub title: Option<String>,
    pub actor: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: u32,
}

impl Default for MovieFilters {
    fn default() -> Self {
        Self {
            title: None,
            actor: None,
            sort: SortKey::default(),
            order: SortOrder::default(),
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl MovieFilters {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Normalize into the query actually sent (and cached).
    pub fn to_query(&self) -> ListQuery {
        ListQuery {
            title: non_blank(self.title.as_deref()),
            actor: non_blank(self.actor.as_deref()),
            sort: self.sort,
            order: self.order,
            limit: self.limit,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
}

/// A normalized list query. Doubles as the cache key for list results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub title: Option<String>,
    pub actor: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        MovieFilters::default().to_query()
    }
}

impl ListQuery {
    /// Query-string pairs; blank filters are never transmitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(title) = &self.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(actor) = &self.actor {
            pairs.push(("actor", actor.clone()));
        }
        pairs.push(("sort", self.sort.as_str().to_string()));
        pairs.push(("order", self.order.as_str().to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

// ============================================================================
// Users
// ============================================================================

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
}

/// Successful registration: the token to persist plus the created user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_id_accepts_number_and_string() {
        let a: MovieId = serde_json::from_str("42").unwrap();
        let b: MovieId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"42\"");
    }

    #[test]
    fn test_list_movie_without_actors() {
        let json = r#"{
            "id": 7,
            "title": "Casablanca",
            "year": 1942,
            "format": "DVD",
            "createdAt": "2021-02-17T10:43:34.993Z",
            "updatedAt": "2021-02-17T10:43:34.993Z"
        }"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id.as_str(), "7");
        assert_eq!(movie.format, MovieFormat::Dvd);
        assert!(movie.actors.is_empty());
        assert_eq!(movie.actor_names(), "N/A");
        assert!(movie.created_at.is_some());
    }

    #[test]
    fn test_detail_movie_with_actors() {
        let json = r#"{
            "id": "3",
            "title": "Blazing Saddles",
            "year": 1974,
            "format": "VHS",
            "actors": [
                {"id": 1, "name": "Mel Brooks"},
                {"id": "a-2", "name": "Clevon Little"}
            ]
        }"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.actors.len(), 2);
        assert_eq!(movie.actors[0].id, "1");
        assert_eq!(movie.actors[1].id, "a-2");
        assert_eq!(movie.actor_names(), "Mel Brooks, Clevon Little");
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(serde_json::to_string(&MovieFormat::BluRay).unwrap(), "\"Blu-Ray\"");
        assert_eq!("blu-ray".parse::<MovieFormat>().unwrap(), MovieFormat::BluRay);
        assert_eq!("VHS".parse::<MovieFormat>().unwrap(), MovieFormat::Vhs);
        assert!("Betamax".parse::<MovieFormat>().is_err());
    }

    #[test]
    fn test_filter_defaults() {
        let query = MovieFilters::default().to_query();
        assert_eq!(query.sort, SortKey::Year);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.limit, 1000);
        assert_eq!(
            query.to_pairs(),
            vec![
                ("sort", "year".to_string()),
                ("order", "DESC".to_string()),
                ("limit", "1000".to_string()),
            ]
        );
    }

    #[test]
    fn test_blank_filters_not_transmitted() {
        let query = MovieFilters::default()
            .with_title("   ")
            .with_actor("Hanks")
            .to_query();
        assert_eq!(query.title, None);
        assert_eq!(query.actor.as_deref(), Some("Hanks"));
        let pairs = query.to_pairs();
        assert!(pairs.iter().all(|(k, _)| *k != "title"));
        assert!(pairs.contains(&("actor", "Hanks".to_string())));
    }

    #[test]
    fn test_blank_and_empty_filters_share_cache_key() {
        let a = MovieFilters::default().with_title("").to_query();
        let b = MovieFilters::default().with_title("  ").to_query();
        assert_eq!(a, b);
        assert_eq!(a, ListQuery::default());
    }

    #[test]
    fn test_register_request_uses_camel_case() {
        let req = RegisterRequest {
            email: "a@b.c".to_string(),
            name: "Default Name".to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["confirmPassword"], "secret");
    }

    #[tokio::test]
    async fn test_import_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample_movies.txt");
        tokio::fs::write(&path, "Title: Blazing Saddles\n").await.unwrap();

        let file = ImportFile::from_path(&path).await.unwrap();
        assert_eq!(file.file_name, "sample_movies.txt");
        assert!(!file.is_empty());

        let empty = dir.path().join("empty.txt");
        tokio::fs::write(&empty, "").await.unwrap();
        assert!(ImportFile::from_path(&empty).await.unwrap().is_empty());
    }
}

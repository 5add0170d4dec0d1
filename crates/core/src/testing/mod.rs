//! Testing utilities: an in-memory catalog service and fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use movieshelf_core::testing::{fixtures, MockCatalogApi};
//!
//! let api = Arc::new(MockCatalogApi::with_movies(vec![
//!     fixtures::movie(1, "Casablanca", 1942),
//! ]));
//! let catalog = MovieCatalog::new(api.clone());
//! ```

mod mock_catalog_api;

pub use mock_catalog_api::{parse_import, Endpoint, Gate, MockCatalogApi, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::api::{Actor, Movie, MovieFormat, MovieId, MovieInput};
    use crate::validation::ManualEntry;

    /// Three movies in the service's import format.
    pub const SAMPLE_IMPORT: &str = "Title: Blazing Saddles
Release Year: 1974
Format: VHS
Stars: Mel Brooks, Clevon Little, Harvey Korman

Title: Casablanca
Release Year: 1942
Format: DVD
Stars: Humphrey Bogart, Ingrid Bergman, Claude Rains

Title: Star Wars
Release Year: 1977
Format: Blu-Ray
Stars: Harrison Ford, Mark Hamill, Carrie Fisher
";

    /// A DVD without actors, as list responses return it.
    pub fn movie(id: u64, title: &str, year: i32) -> Movie {
        Movie {
            id: MovieId::from(id),
            title: title.to_string(),
            year,
            format: MovieFormat::Dvd,
            actors: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// A movie with resolved actors, as detail responses return it.
    pub fn movie_with_actors(id: u64, title: &str, year: i32, actors: &[&str]) -> Movie {
        let mut movie = movie(id, title, year);
        movie.actors = actors
            .iter()
            .enumerate()
            .map(|(i, name)| Actor {
                id: (id * 100 + i as u64).to_string(),
                name: name.to_string(),
                created_at: None,
                updated_at: None,
            })
            .collect();
        movie
    }

    pub fn movie_input(title: &str, year: i32) -> MovieInput {
        MovieInput {
            title: title.to_string(),
            year,
            format: MovieFormat::Dvd,
            actors: vec!["Jane Doe".to_string()],
        }
    }

    pub fn manual_entry(title: &str, year: &str, format: &str, actors: &str) -> ManualEntry {
        ManualEntry {
            title: title.to_string(),
            year: year.to_string(),
            format: format.to_string(),
            actors: actors.to_string(),
        }
    }
}

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::{lock, CatalogError, MovieCatalog};
use crate::api::{ApiError, ImportFile, ImportSummary, Movie, MovieId, MovieInput};
use crate::cache::Tag;
use crate::metrics;
use crate::notice::{
    IMPORT_FAILED, IMPORT_FILE_EMPTY, MOVIES_IMPORTED, MOVIE_ADDED, MOVIE_ADD_FAILED,
    MOVIE_DELETED, MOVIE_DELETE_FAILED,
};
use crate::validation::ManualEntry;

/// What a mutation targets. Two invocations with the same kind may not be
/// pending at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Delete(MovieId),
    Import,
}

impl MutationKind {
    /// Tags whose cached queries this mutation makes stale.
    pub fn writes(&self) -> Vec<Tag> {
        match self {
            MutationKind::Create | MutationKind::Import => vec![Tag::Movies],
            MutationKind::Delete(id) => vec![Tag::Movies, Tag::Movie(id.clone())],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Delete(_) => "delete",
            MutationKind::Import => "import",
        }
    }

    fn notices(&self) -> (&'static str, &'static str) {
        match self {
            MutationKind::Create => (MOVIE_ADDED, MOVIE_ADD_FAILED),
            MutationKind::Delete(_) => (MOVIE_DELETED, MOVIE_DELETE_FAILED),
            MutationKind::Import => (MOVIES_IMPORTED, IMPORT_FAILED),
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Delete(id) => write!(f, "delete:{}", id),
            other => f.write_str(other.label()),
        }
    }
}

/// Lifecycle of the latest invocation of a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Default)]
pub(super) struct MutationTracker {
    states: HashMap<MutationKind, MutationState>,
}

impl MutationTracker {
    fn state(&self, kind: &MutationKind) -> MutationState {
        self.states.get(kind).cloned().unwrap_or_default()
    }

    fn begin(&mut self, kind: &MutationKind) -> Result<(), CatalogError> {
        if self.state(kind) == MutationState::Pending {
            return Err(CatalogError::InFlight);
        }
        self.states.insert(kind.clone(), MutationState::Pending);
        Ok(())
    }

    fn settle(&mut self, kind: &MutationKind, state: MutationState) {
        self.states.insert(kind.clone(), state);
    }
}

/// Keeps a mutation `Pending` while alive; resets it to `Idle` if the
/// caller drops the future before the request settles.
struct PendingGuard {
    tracker: Arc<Mutex<MutationTracker>>,
    kind: MutationKind,
    settled: bool,
}

impl PendingGuard {
    fn settle(mut self, state: MutationState) {
        lock(&self.tracker).settle(&self.kind, state);
        self.settled = true;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.settled {
            lock(&self.tracker).settle(&self.kind, MutationState::Idle);
        }
    }
}

impl MovieCatalog {
    /// Current state of the mutation targeting `kind`.
    pub fn mutation_state(&self, kind: &MutationKind) -> MutationState {
        lock(&self.mutations).state(kind)
    }

    /// Create a movie. The payload is forwarded as-is; see
    /// [`MovieCatalog::add_manual_entry`] for the validated path.
    pub async fn create_movie(&self, input: &MovieInput) -> Result<Movie, CatalogError> {
        info!(title = %input.title, year = input.year, format = %input.format, "Creating movie");
        self.run_mutation(MutationKind::Create, self.api.create_movie(input))
            .await
    }

    /// Validate a manual entry against the cached list, then create it.
    pub async fn add_manual_entry(&self, entry: &ManualEntry) -> Result<Movie, CatalogError> {
        let titles = self.cached_titles();
        let input = entry
            .validate(titles.iter().map(String::as_str), &self.policy)
            .map_err(CatalogError::Validation)?;
        self.create_movie(&input).await
    }

    pub async fn delete_movie(&self, id: &MovieId) -> Result<(), CatalogError> {
        info!(%id, "Deleting movie");
        self.run_mutation(MutationKind::Delete(id.clone()), self.api.delete_movie(id))
            .await
    }

    /// Upload a text file of movies. An empty file is refused locally.
    pub async fn import_movies(&self, file: &ImportFile) -> Result<ImportSummary, CatalogError> {
        if file.is_empty() {
            warn!(file = %file.file_name, "Refusing to import empty file");
            if let Some(notices) = &self.notices {
                notices.error(IMPORT_FILE_EMPTY).await;
            }
            return Err(CatalogError::EmptyImportFile);
        }

        info!(file = %file.file_name, bytes = file.contents.len(), "Importing movies");
        let summary = self
            .run_mutation(MutationKind::Import, self.api.import_movies(file))
            .await?;
        info!(imported = ?summary.imported, total = ?summary.total, "Import finished");
        Ok(summary)
    }

    /// Drive one mutation through `Pending` to a terminal state.
    ///
    /// On success the written tags are invalidated and the state settled
    /// before anything else is awaited; only the refetch of the active list
    /// can be cut short by dropping the future.
    async fn run_mutation<T, F>(&self, kind: MutationKind, request: F) -> Result<T, CatalogError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        lock(&self.mutations).begin(&kind)?;
        let guard = PendingGuard {
            tracker: Arc::clone(&self.mutations),
            kind: kind.clone(),
            settled: false,
        };

        let (success_notice, failure_notice) = kind.notices();
        match request.await {
            Ok(value) => {
                self.invalidate_writes(&kind);
                guard.settle(MutationState::Succeeded);
                metrics::MUTATIONS
                    .with_label_values(&[kind.label(), "success"])
                    .inc();
                info!(mutation = %kind, "Mutation succeeded");
                if let Some(notices) = &self.notices {
                    notices.success(success_notice).await;
                }
                self.refetch_stale_active().await;
                Ok(value)
            }
            Err(e) => {
                let err = CatalogError::from(e);
                guard.settle(MutationState::Failed(err.to_string()));
                metrics::MUTATIONS
                    .with_label_values(&[kind.label(), "failed"])
                    .inc();
                warn!(mutation = %kind, error = %err, "Mutation failed");
                if let Some(notices) = &self.notices {
                    notices.error(failure_notice).await;
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes() {
        assert_eq!(MutationKind::Create.writes(), vec![Tag::Movies]);
        assert_eq!(MutationKind::Import.writes(), vec![Tag::Movies]);
        assert_eq!(
            MutationKind::Delete(MovieId::new("4")).writes(),
            vec![Tag::Movies, Tag::Movie(MovieId::new("4"))]
        );
    }

    #[test]
    fn test_tracker_refuses_second_pending() {
        let mut tracker = MutationTracker::default();
        tracker.begin(&MutationKind::Create).unwrap();
        assert_eq!(
            tracker.begin(&MutationKind::Create),
            Err(CatalogError::InFlight)
        );
        // Other targets are independent
        tracker.begin(&MutationKind::Delete(MovieId::new("1"))).unwrap();
        tracker.begin(&MutationKind::Delete(MovieId::new("2"))).unwrap();

        tracker.settle(&MutationKind::Create, MutationState::Succeeded);
        assert!(tracker.begin(&MutationKind::Create).is_ok());
    }

    #[test]
    fn test_dropped_guard_resets_to_idle() {
        let tracker = Arc::new(Mutex::new(MutationTracker::default()));
        lock(&tracker).begin(&MutationKind::Import).unwrap();
        drop(PendingGuard {
            tracker: Arc::clone(&tracker),
            kind: MutationKind::Import,
            settled: false,
        });
        assert_eq!(lock(&tracker).state(&MutationKind::Import), MutationState::Idle);
    }

    #[test]
    fn test_display() {
        assert_eq!(MutationKind::Delete(MovieId::new("9")).to_string(), "delete:9");
        assert_eq!(MutationKind::Import.to_string(), "import");
    }
}

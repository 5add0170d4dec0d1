//! Movie catalog: cached queries and mutations over a [`CatalogApi`].
//!
//! [`MovieCatalog`] owns two tagged caches, one for list queries (tagged
//! [`Tag::Movies`]) and one for movie details (tagged [`Tag::Movie`]). Every
//! successful mutation invalidates the tags it writes and refetches the
//! active list, so whatever the caller displays next reflects the server.
//!
//! The caches sit behind plain mutexes that are never held across an
//! `.await`, so invalidation after a confirmed write happens in the same
//! poll that observed the response.

mod detail;
mod error;
mod mutation;
mod query;

pub use detail::{DetailPanel, ExpansionToken, PanelView};
pub use error::CatalogError;
pub use mutation::{MutationKind, MutationState};
pub use query::{sort_by_title, QueryOutcome, TitleOrder};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

use crate::api::{CatalogApi, ListQuery, Movie, MovieId};
use crate::cache::{QueryCache, Tag};
use crate::metrics;
use crate::notice::NoticeBoard;
use crate::validation::YearPolicy;

use mutation::MutationTracker;

type DetailFuture = Shared<BoxFuture<'static, Result<Movie, CatalogError>>>;

/// Lock a catalog mutex. A panic while one was held leaves plain data
/// behind, so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Client-side view of the remote movie collection.
pub struct MovieCatalog {
    api: Arc<dyn CatalogApi>,
    lists: Mutex<QueryCache<ListQuery, Vec<Movie>>>,
    details: Arc<Mutex<QueryCache<MovieId, Movie>>>,
    /// Detail requests currently on the wire, keyed by id with the ticket
    /// sequence that started them.
    in_flight_details: Arc<Mutex<HashMap<MovieId, (u64, DetailFuture)>>>,
    /// The list the caller is currently showing.
    active_list: Mutex<Option<ListQuery>>,
    mutations: Arc<Mutex<MutationTracker>>,
    policy: YearPolicy,
    notices: Option<NoticeBoard>,
}

impl MovieCatalog {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            lists: Mutex::new(QueryCache::new()),
            details: Arc::new(Mutex::new(QueryCache::new())),
            in_flight_details: Arc::new(Mutex::new(HashMap::new())),
            active_list: Mutex::new(None),
            mutations: Arc::new(Mutex::new(MutationTracker::default())),
            policy: YearPolicy::default(),
            notices: None,
        }
    }

    /// Year bounds used by [`MovieCatalog::add_manual_entry`].
    pub fn with_year_policy(mut self, policy: YearPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Post mutation outcomes to `notices`.
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn year_policy(&self) -> &YearPolicy {
        &self.policy
    }

    pub fn notices(&self) -> Option<&NoticeBoard> {
        self.notices.as_ref()
    }

    /// The list query most recently requested through
    /// [`MovieCatalog::list_movies`].
    pub fn active_query(&self) -> Option<ListQuery> {
        lock(&self.active_list).clone()
    }

    /// Whether the cached result for `query` has been invalidated and not
    /// yet refetched.
    pub fn is_list_stale(&self, query: &ListQuery) -> bool {
        lock(&self.lists).is_stale(query)
    }

    /// Number of list results currently held.
    pub fn cached_list_count(&self) -> usize {
        lock(&self.lists).len()
    }

    /// Forget every cached query and the active list.
    ///
    /// Called when the session changes hands; responses still on the wire
    /// for the previous session are dropped when they arrive.
    pub fn reset(&self) {
        lock(&self.lists).clear();
        lock(&self.details).clear();
        lock(&self.in_flight_details).clear();
        *lock(&self.active_list) = None;
        info!("Catalog cache reset");
    }

    /// Mark everything `kind` wrote as stale.
    ///
    /// Runs without awaiting, right after the server confirmed the write, so
    /// a caller that stops polling afterwards still leaves the caches stale.
    fn invalidate_writes(&self, kind: &MutationKind) {
        let tags = kind.writes();

        let stale_lists = lock(&self.lists).invalidate(&tags);
        let stale_details = lock(&self.details).invalidate(&tags);
        metrics::CACHE_INVALIDATIONS
            .with_label_values(&["list"])
            .inc_by(stale_lists.len() as u64);
        metrics::CACHE_INVALIDATIONS
            .with_label_values(&["detail"])
            .inc_by(stale_details.len() as u64);

        if !stale_details.is_empty() {
            let mut in_flight = lock(&self.in_flight_details);
            for id in &stale_details {
                in_flight.remove(id);
            }
        }

        debug!(
            tags = %tags.iter().map(Tag::to_string).collect::<Vec<_>>().join(","),
            lists = stale_lists.len(),
            details = stale_details.len(),
            "Invalidated cached queries"
        );
    }

    /// Bring the active list back in line with the server.
    ///
    /// A failed refetch is logged and otherwise ignored; the stale data stays
    /// available and the next `list_movies` call retries.
    async fn refetch_stale_active(&self) {
        let Some(active) = self.active_query() else {
            return;
        };
        if lock(&self.lists).fresh(&active).is_some() {
            return;
        }

        metrics::LIST_REFETCHES.inc();
        match self.fetch_list(active).await {
            Ok(QueryOutcome::Ready(movies)) => {
                debug!(count = movies.len(), "Refetched active list after mutation");
            }
            Ok(QueryOutcome::Superseded) => {
                debug!("Active list changed during refetch");
            }
            Err(e) => {
                warn!(error = %e, "Failed to refetch active list after mutation");
            }
        }
    }
}

impl std::fmt::Debug for MovieCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieCatalog")
            .field("policy", &self.policy)
            .field("notices", &self.notices.is_some())
            .finish_non_exhaustive()
    }
}

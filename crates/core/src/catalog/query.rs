use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, warn};

use super::{lock, CatalogError, MovieCatalog};
use crate::api::{ListQuery, Movie, MovieFilters, MovieId};
use crate::cache::{QueryCache, Retention, Tag, Ticket};
use crate::metrics;

/// Result of a query that may have been overtaken by a newer one.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    Ready(T),
    /// A newer request (or a different active list) made this response
    /// irrelevant; it was dropped without touching the cache.
    Superseded,
}

impl<T> QueryOutcome<T> {
    pub fn into_ready(self) -> Option<T> {
        match self {
            QueryOutcome::Ready(value) => Some(value),
            QueryOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, QueryOutcome::Superseded)
    }
}

/// Display order for the title column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleOrder {
    #[default]
    Ascending,
    Descending,
}

impl TitleOrder {
    pub fn toggled(self) -> Self {
        match self {
            TitleOrder::Ascending => TitleOrder::Descending,
            TitleOrder::Descending => TitleOrder::Ascending,
        }
    }
}

/// Stable, case-insensitive sort by title. Movies with equal titles keep
/// the order the server returned them in.
pub fn sort_by_title(movies: &[Movie], order: TitleOrder) -> Vec<Movie> {
    let mut keyed: Vec<(String, &Movie)> = movies
        .iter()
        .map(|m| (m.title.to_lowercase(), m))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let ord = a.cmp(b);
        match order {
            TitleOrder::Ascending => ord,
            TitleOrder::Descending => ord.reverse(),
        }
    });
    keyed.into_iter().map(|(_, m)| m.clone()).collect()
}

impl MovieCatalog {
    /// List movies matching `filters` and make that list the active one.
    ///
    /// A fresh cached result is returned without a request. Failures leave
    /// any previously cached result in place.
    pub async fn list_movies(
        &self,
        filters: &MovieFilters,
    ) -> Result<QueryOutcome<Vec<Movie>>, CatalogError> {
        let query = filters.to_query();
        *lock(&self.active_list) = Some(query.clone());

        let cached = lock(&self.lists).fresh(&query).cloned();
        if let Some(movies) = cached {
            metrics::CACHE_HITS.with_label_values(&["list"]).inc();
            debug!(?query, "List served from cache");
            return Ok(QueryOutcome::Ready(movies));
        }

        self.fetch_list(query).await
    }

    /// Fetch the active list again regardless of cache state.
    ///
    /// Returns `Superseded` when no list has been requested yet.
    pub async fn refetch_active(&self) -> Result<QueryOutcome<Vec<Movie>>, CatalogError> {
        match self.active_query() {
            Some(query) => self.fetch_list(query).await,
            None => Ok(QueryOutcome::Superseded),
        }
    }

    /// Last known contents of the active list, stale or not.
    pub fn active_movies(&self) -> Option<Vec<Movie>> {
        let query = self.active_query()?;
        lock(&self.lists).last_known(&query).cloned()
    }

    /// Titles in the active list, used for duplicate checks.
    pub fn cached_titles(&self) -> Vec<String> {
        self.active_movies()
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.title)
            .collect()
    }

    pub(super) async fn fetch_list(
        &self,
        query: ListQuery,
    ) -> Result<QueryOutcome<Vec<Movie>>, CatalogError> {
        let ticket = lock(&self.lists).issue(query.clone(), &[Tag::Movies]);
        debug!(?query, seq = ticket.seq(), "Fetching movie list");

        let result = self.api.list_movies(&query).await;

        let active = self.active_query();
        let mut lists = lock(&self.lists);
        if active.as_ref() != Some(&query) || !lists.is_latest(&ticket) {
            lists.abandon(&ticket);
            metrics::SUPERSEDED_RESPONSES.with_label_values(&["list"]).inc();
            debug!(?query, seq = ticket.seq(), "Discarding superseded list response");
            return Ok(QueryOutcome::Superseded);
        }

        let outcome = match result {
            Ok(movies) => {
                lists.complete(&ticket, movies.clone());
                debug!(count = movies.len(), "Movie list updated");
                Ok(QueryOutcome::Ready(movies))
            }
            Err(e) => {
                lists.abandon(&ticket);
                let err = CatalogError::from(e);
                warn!(error = %err, "Failed to fetch movie list");
                Err(err)
            }
        };

        let evicted = lists.evict(active.as_ref(), Retention::LISTS, Utc::now());
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "Evicted unused list results");
        }
        outcome
    }

    /// A movie with its actors resolved.
    ///
    /// Concurrent calls for the same id share one request.
    pub async fn movie_detail(&self, id: &MovieId) -> Result<Movie, CatalogError> {
        let cached = lock(&self.details).fresh(id).cloned();
        if let Some(movie) = cached {
            metrics::CACHE_HITS.with_label_values(&["detail"]).inc();
            debug!(%id, "Detail served from cache");
            return Ok(movie);
        }

        let request = {
            let mut in_flight = lock(&self.in_flight_details);
            match in_flight.get(id) {
                Some((_, shared)) => {
                    metrics::SHARED_DETAIL_REQUESTS.inc();
                    debug!(%id, "Joining in-flight detail request");
                    shared.clone()
                }
                None => {
                    let ticket = lock(&self.details).issue(id.clone(), &[Tag::Movie(id.clone())]);
                    let seq = ticket.seq();
                    let shared = self.detail_request(ticket).boxed().shared();
                    in_flight.insert(id.clone(), (seq, shared.clone()));
                    shared
                }
            }
        };

        request.await
    }

    fn detail_request(
        &self,
        ticket: Ticket<MovieId>,
    ) -> impl Future<Output = Result<Movie, CatalogError>> + Send + 'static {
        let api = Arc::clone(&self.api);
        let details = Arc::clone(&self.details);
        let in_flight = Arc::clone(&self.in_flight_details);

        async move {
            let id = ticket.key().clone();
            debug!(%id, "Fetching movie detail");

            let result = api.get_movie(&id).await.map_err(CatalogError::from);
            store_detail(&details, &ticket, &result);

            let mut in_flight = lock(&in_flight);
            if in_flight
                .get(&id)
                .is_some_and(|(seq, _)| *seq == ticket.seq())
            {
                in_flight.remove(&id);
            }
            result
        }
    }
}

fn store_detail(
    details: &Mutex<QueryCache<MovieId, Movie>>,
    ticket: &Ticket<MovieId>,
    result: &Result<Movie, CatalogError>,
) {
    let mut details = lock(details);
    match result {
        Ok(movie) => {
            details.complete(ticket, movie.clone());
        }
        Err(e) => {
            details.abandon(ticket);
            warn!(id = %ticket.key(), error = %e, "Failed to fetch movie detail");
        }
    }
    details.evict(Some(ticket.key()), Retention::DETAILS, Utc::now());
}

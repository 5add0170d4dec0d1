//! Prometheus metrics for the catalog client.
//!
//! This module provides metrics for:
//! - Remote API requests (count, outcome, duration)
//! - The query cache (hits, invalidations, refetches, superseded responses)
//! - Mutations (create, delete, import)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// =============================================================================
// Remote API
// =============================================================================

/// API requests total by endpoint and outcome.
pub static API_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("movieshelf_api_requests_total", "Total catalog API requests"),
        &["endpoint", "outcome"], // outcome: "success", "transport", "rejected", "error"
    )
    .unwrap()
});

/// API request duration in seconds.
pub static API_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "movieshelf_api_request_duration_seconds",
            "Duration of catalog API requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

// =============================================================================
// Query cache
// =============================================================================

/// Queries answered from a fresh cache entry.
pub static CACHE_HITS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("movieshelf_cache_hits_total", "Queries served from cache"),
        &["query"], // "list", "detail"
    )
    .unwrap()
});

/// Cache entries marked stale by a mutation.
pub static CACHE_INVALIDATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "movieshelf_cache_invalidations_total",
            "Cache entries invalidated after mutations",
        ),
        &["query"],
    )
    .unwrap()
});

/// Active list refetches triggered by invalidation.
pub static LIST_REFETCHES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "movieshelf_list_refetches_total",
        "Active list refetches after invalidation",
    )
    .unwrap()
});

/// Responses dropped because a newer request was issued.
pub static SUPERSEDED_RESPONSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "movieshelf_superseded_responses_total",
            "Responses discarded in favour of a newer request",
        ),
        &["query"],
    )
    .unwrap()
});

/// Detail lookups that joined a request already in flight.
pub static SHARED_DETAIL_REQUESTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "movieshelf_shared_detail_requests_total",
        "Detail lookups that reused an in-flight request",
    )
    .unwrap()
});

// =============================================================================
// Mutations
// =============================================================================

/// Mutations by kind and result.
pub static MUTATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("movieshelf_mutations_total", "Total mutations"),
        &["kind", "result"], // kind: "create", "delete", "import"; result: "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(API_REQUESTS.clone()),
        Box::new(API_REQUEST_DURATION.clone()),
        Box::new(CACHE_HITS.clone()),
        Box::new(CACHE_INVALIDATIONS.clone()),
        Box::new(LIST_REFETCHES.clone()),
        Box::new(SUPERSEDED_RESPONSES.clone()),
        Box::new(SHARED_DETAIL_REQUESTS.clone()),
        Box::new(MUTATIONS.clone()),
    ]
}

/// Register every metric in `registry`.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();

        API_REQUESTS.with_label_values(&["list_movies", "success"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "movieshelf_api_requests_total"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();
        assert!(register_metrics(&registry).is_err());
    }
}

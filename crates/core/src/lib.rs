pub mod api;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod fields;
pub mod metrics;
pub mod notice;
pub mod session;
pub mod storage;
pub mod testing;
pub mod validation;

pub use api::{
    ApiError, CatalogApi, HttpCatalogApi, ImportFile, ImportSummary, ListQuery, Movie,
    MovieFilters, MovieFormat, MovieId, MovieInput, SortKey, SortOrder,
};
pub use auth::AuthFlow;
pub use catalog::{
    sort_by_title, CatalogError, DetailPanel, MovieCatalog, MutationKind, MutationState,
    PanelView, QueryOutcome, TitleOrder,
};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, ApiConfig,
    Config, ConfigError, SanitizedConfig,
};
pub use fields::FieldErrors;
pub use notice::{Notice, NoticeBoard, NoticeLevel, NoticeQueue};
pub use session::{Session, StartView};
pub use storage::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError};
pub use validation::{ManualEntry, YearPolicy};

//! Session persistence across restarts and startup configuration.

use std::io::Write;
use std::sync::Arc;

use tempfile::{NamedTempFile, TempDir};
use tokio_test::{assert_err, assert_ok};

use movieshelf_core::{
    load_config, testing::MockCatalogApi, validate_config, AuthFlow, ConfigError,
    HttpCatalogApi, KeyValueStore, Session, SqliteKeyValueStore, StartView,
};

fn open_store(dir: &TempDir) -> Arc<dyn KeyValueStore> {
    Arc::new(SqliteKeyValueStore::new(&dir.path().join("movieshelf.db")).expect("open store"))
}

#[tokio::test]
async fn test_token_survives_restart() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let session = assert_ok!(Session::restore(open_store(&dir)));
        assert_eq!(session.start_view().await, StartView::Register);

        let auth = AuthFlow::new(Arc::new(MockCatalogApi::new()), session.clone());
        assert_ok!(auth.register("user@example.com", "secret").await);
        assert_eq!(session.start_view().await, StartView::Movies);
    }

    // A fresh process opens the same database file
    let session = assert_ok!(Session::restore(open_store(&dir)));
    assert_eq!(session.token().await.as_deref(), Some("mock-token-1"));
    assert_eq!(session.start_view().await, StartView::Movies);

    let auth = AuthFlow::new(Arc::new(MockCatalogApi::new()), session.clone());
    assert_ok!(auth.logout().await);

    let session = assert_ok!(Session::restore(open_store(&dir)));
    assert!(!session.is_authenticated().await);
}

#[tokio::test]
async fn test_client_built_from_config_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
[api]
url = "http://127.0.0.1:8000/api/v1/"
auth_scheme = "Bearer"

[validation]
min_year = 1850
"#
    )
    .expect("write config");

    let config = assert_ok!(load_config(file.path()));
    assert_ok!(validate_config(&config));
    assert_eq!(config.validation.min_year, 1850);
    assert_eq!(config.validation.max_year, 2021);

    let client = assert_ok!(HttpCatalogApi::new(&config.api, Session::in_memory()));
    assert_eq!(client.base_url(), "http://127.0.0.1:8000/api/v1");
}

#[test]
fn test_missing_api_url_is_fatal() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "[list]\nlimit = 50").expect("write config");

    let config = assert_ok!(load_config(file.path()));
    let err = assert_err!(validate_config(&config));
    assert!(matches!(err, ConfigError::MissingApiUrl));
}

//! Registration and logout.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{CatalogApi, RegisterRequest, Registration};
use crate::catalog::{CatalogError, MovieCatalog};
use crate::session::Session;

/// Display name sent with every registration.
pub const DEFAULT_NAME: &str = "Default Name";

/// Registers users and keeps the [`Session`] in sync with the outcome.
///
/// A catalog attached with [`AuthFlow::with_catalog`] is reset whenever the
/// session changes, so one account never sees another's cached lists.
pub struct AuthFlow {
    api: Arc<dyn CatalogApi>,
    session: Session,
    catalog: Option<Arc<MovieCatalog>>,
}

impl AuthFlow {
    pub fn new(api: Arc<dyn CatalogApi>, session: Session) -> Self {
        Self {
            api,
            session,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<MovieCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn session_changed(&self) {
        if let Some(catalog) = &self.catalog {
            catalog.reset();
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Register `email` and log in with the returned token.
    ///
    /// Field-level rejections (e.g. an email already in use) come back as
    /// [`CatalogError::Rejected`]; the session is left untouched on failure.
    pub async fn register(&self, email: &str, password: &str) -> Result<Registration, CatalogError> {
        let request = RegisterRequest {
            email: email.trim().to_string(),
            name: DEFAULT_NAME.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
        };

        let registration = self.api.register(&request).await.map_err(|e| {
            let err = CatalogError::from(e);
            warn!(error = %err, "Registration failed");
            err
        })?;

        if registration.token.is_empty() {
            return Err(CatalogError::Unexpected(
                "Registration response carried no token".to_string(),
            ));
        }

        self.session.establish(&registration.token).await?;
        self.session_changed();
        info!(email = %request.email, "Registered and logged in");
        Ok(registration)
    }

    pub async fn logout(&self) -> Result<(), CatalogError> {
        self.session.clear().await?;
        self.session_changed();
        Ok(())
    }
}

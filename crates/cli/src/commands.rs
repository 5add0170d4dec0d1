//! Command handlers and plain-text rendering.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use movieshelf_core::{
    sort_by_title, AuthFlow, CatalogError, Config, ImportFile, ManualEntry, Movie, MovieCatalog,
    MovieFilters, MovieId, NoticeBoard, NoticeLevel, QueryOutcome, SanitizedConfig, Session,
    SortKey, SortOrder, StartView, TitleOrder,
};

/// Everything a command needs, built once at startup.
pub struct App {
    pub config: Config,
    pub session: Session,
    pub catalog: Arc<MovieCatalog>,
    pub auth: AuthFlow,
    pub notices: NoticeBoard,
}

/// Filters accepted by `list`.
pub struct ListArgs {
    pub title: Option<String>,
    pub actor: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub desc_title: bool,
}

impl App {
    async fn require_login(&self) -> Result<()> {
        if self.session.start_view().await == StartView::Register {
            bail!("Not logged in. Run `movieshelf register` first.");
        }
        Ok(())
    }

    /// Print notices raised by the last operation.
    async fn flush_notices(&self) {
        for notice in self.notices.snapshot().await {
            let marker = match notice.level {
                NoticeLevel::Success => "ok",
                NoticeLevel::Error => "error",
            };
            println!("[{}] {}", marker, notice.message);
            self.notices.dismiss(notice.id).await;
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<()> {
        let registration = self
            .auth
            .register(email, password)
            .await
            .map_err(catalog_error)?;
        match registration.user {
            Some(user) => println!("Registered {} and logged in", user.email),
            None => println!("Logged in"),
        }
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await.map_err(catalog_error)?;
        println!("Logged out");
        Ok(())
    }

    pub async fn list(&self, args: ListArgs) -> Result<()> {
        self.require_login().await?;
        let filters = MovieFilters {
            title: args.title,
            actor: args.actor,
            sort: args.sort,
            order: args.order,
            limit: args.limit.unwrap_or(self.config.list.limit),
        };

        let movies = match self.catalog.list_movies(&filters).await.map_err(catalog_error)? {
            QueryOutcome::Ready(movies) => movies,
            QueryOutcome::Superseded => Vec::new(),
        };
        let order = if args.desc_title {
            TitleOrder::Descending
        } else {
            TitleOrder::Ascending
        };
        print!("{}", render_movies(&sort_by_title(&movies, order)));
        Ok(())
    }

    pub async fn show(&self, id: &str) -> Result<()> {
        self.require_login().await?;
        let movie = self
            .catalog
            .movie_detail(&MovieId::new(id))
            .await
            .map_err(catalog_error)?;
        print!("{}", render_detail(&movie));
        Ok(())
    }

    pub async fn add(&self, entry: ManualEntry) -> Result<()> {
        self.require_login().await?;

        // Load the list first so the duplicate-title check has data
        let filters = MovieFilters {
            limit: self.config.list.limit,
            ..MovieFilters::default()
        };
        if let Err(e) = self.catalog.list_movies(&filters).await {
            tracing::warn!(error = %e, "Could not load existing titles; skipping duplicate check");
        }

        let result = self.catalog.add_manual_entry(&entry).await;
        self.flush_notices().await;
        let movie = result.map_err(catalog_error)?;
        println!("Added #{}: {} ({})", movie.id, movie.title, movie.year);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.require_login().await?;
        let result = self.catalog.delete_movie(&MovieId::new(id)).await;
        self.flush_notices().await;
        result.map_err(catalog_error)
    }

    pub async fn import(&self, path: &Path) -> Result<()> {
        self.require_login().await?;
        let file = ImportFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;

        let result = self.catalog.import_movies(&file).await;
        self.flush_notices().await;
        let summary = result.map_err(catalog_error)?;
        if let (Some(imported), Some(total)) = (summary.imported, summary.total) {
            println!("Imported {} of {} movies", imported, total);
        }
        Ok(())
    }

}

/// Print the configuration with auth details reduced to flags.
pub fn print_config(config: &Config) -> Result<()> {
    let sanitized = SanitizedConfig::from(config);
    println!("{}", serde_json::to_string_pretty(&sanitized)?);
    Ok(())
}

/// Convert a catalog error, spelling out field messages when present.
fn catalog_error(err: CatalogError) -> anyhow::Error {
    anyhow!(render_error(&err))
}

pub fn render_error(err: &CatalogError) -> String {
    match err.field_errors() {
        Some(fields) => {
            let mut out = String::from("Please fix the following fields:");
            for (field, message) in fields.iter() {
                let _ = write!(out, "\n  {}: {}", field, message);
            }
            out
        }
        None => err.to_string(),
    }
}

pub fn render_movies(movies: &[Movie]) -> String {
    if movies.is_empty() {
        return "No movies found\n".to_string();
    }
    let width = movies.iter().map(|m| m.title.chars().count()).max().unwrap_or(0).max(5);
    let mut out = format!("{:>6}  {:<width$}  {:>4}  {}\n", "ID", "TITLE", "YEAR", "FORMAT");
    for movie in movies {
        let _ = writeln!(
            out,
            "{:>6}  {:<width$}  {:>4}  {}",
            movie.id, movie.title, movie.year, movie.format
        );
    }
    out
}

pub fn render_detail(movie: &Movie) -> String {
    format!(
        "#{}\nTitle:  {}\nYear:   {}\nFormat: {}\nActors: {}\n",
        movie.id,
        movie.title,
        movie.year,
        movie.format,
        movie.actor_names()
    )
}

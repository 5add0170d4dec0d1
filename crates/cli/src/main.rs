mod cli;
mod commands;
mod metrics;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movieshelf_core::{
    load_config, load_config_from_env, validate_config, AuthFlow, CatalogApi, Config,
    HttpCatalogApi, KeyValueStore, ManualEntry, MovieCatalog, NoticeBoard, Session,
    SqliteKeyValueStore,
};

use cli::{Cli, Commands};
use commands::{App, ListArgs};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Load without validating, so `config` can show what is wrong.
fn load_unvalidated(path: &Path) -> Result<Config> {
    if path.exists() {
        info!("Loading configuration from {:?}", path);
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
    } else {
        info!("No config file at {:?}, using environment only", path);
        load_config_from_env().context("Failed to load config from environment")
    }
}

/// Read the config file when present, otherwise rely on the environment.
fn read_config(path: &Path) -> Result<Config> {
    let config = load_unvalidated(path)?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

/// Print the effective configuration. Needs neither a valid API URL nor the
/// token store.
fn show_config(path: &Path) -> Result<()> {
    let config = load_unvalidated(path)?;
    if let Err(e) = validate_config(&config) {
        eprintln!("Warning: {}", e);
    }
    commands::print_config(&config)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    if matches!(cli.command, Commands::Config) {
        return show_config(&cli.config);
    }

    let config = read_config(&cli.config)?;
    info!("API base URL: {}", config.api.url);
    info!("Storage path: {:?}", config.storage.path);

    let store: Arc<dyn KeyValueStore> = Arc::new(
        SqliteKeyValueStore::new(&config.storage.path).context("Failed to open token store")?,
    );
    let session = Session::restore(store).context("Failed to restore session")?;

    let api: Arc<dyn CatalogApi> = Arc::new(
        HttpCatalogApi::new(&config.api, session.clone())
            .context("Failed to create catalog client")?,
    );

    let notices = NoticeBoard::new(Duration::from_millis(config.notices.auto_dismiss_ms));
    let catalog = Arc::new(
        MovieCatalog::new(Arc::clone(&api))
            .with_year_policy(config.validation.clone())
            .with_notices(notices.clone()),
    );
    let auth = AuthFlow::new(api, session.clone()).with_catalog(Arc::clone(&catalog));

    let app = App {
        config,
        session,
        catalog,
        auth,
        notices,
    };

    let result = match cli.command {
        Commands::Register { email, password } => app.register(&email, &password).await,
        Commands::Logout => app.logout().await,
        Commands::List {
            title,
            actor,
            sort,
            order,
            limit,
            desc_title,
        } => {
            app.list(ListArgs {
                title,
                actor,
                sort,
                order,
                limit,
                desc_title,
            })
            .await
        }
        Commands::Show { id } => app.show(&id).await,
        Commands::Add {
            title,
            year,
            format,
            actors,
        } => {
            app.add(ManualEntry {
                title,
                year,
                format,
                actors,
            })
            .await
        }
        Commands::Delete { id } => app.delete(&id).await,
        Commands::Import { file } => app.import(&file).await,
        Commands::Config => commands::print_config(&app.config),
    };

    if cli.metrics {
        print!("{}", metrics::gather());
    }
    result
}

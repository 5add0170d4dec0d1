//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use movieshelf_core::{MovieFormat, SortKey, SortOrder};

/// Manage a personal movie collection stored on a remote catalog service.
#[derive(Parser, Debug)]
#[command(name = "movieshelf", version)]
#[command(after_help = "\
Examples:
  movieshelf register --email me@example.com --password secret
  movieshelf list --actor \"Bogart\" --desc-title
  movieshelf add --title Casablanca --year 1942 --format DVD --actors \"Humphrey Bogart, Ingrid Bergman\"
  movieshelf import sample_movies.txt")]
pub struct Cli {
    /// Config file (TOML). Environment variables prefixed MOVIESHELF_ override it.
    #[arg(long, global = true, env = "MOVIESHELF_CONFIG", default_value = "movieshelf.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Print Prometheus metrics collected during the command
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and log in with it
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "MOVIESHELF_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored token
    Logout,

    /// List movies
    List {
        /// Only titles containing this text
        #[arg(long)]
        title: Option<String>,

        /// Only movies with an actor whose name contains this text
        #[arg(long)]
        actor: Option<String>,

        /// Server-side sort key (id, title, year)
        #[arg(long, default_value = "year", value_parser = parse_sort)]
        sort: SortKey,

        /// Server-side sort direction (asc, desc)
        #[arg(long, default_value = "desc", value_parser = parse_order)]
        order: SortOrder,

        /// Maximum number of movies (defaults to list.limit from config)
        #[arg(long)]
        limit: Option<u32>,

        /// Display titles Z to A instead of A to Z
        #[arg(long)]
        desc_title: bool,
    },

    /// Show one movie with its actors
    Show { id: String },

    /// Add a movie after validating it locally
    Add {
        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        year: String,

        /// VHS, DVD or Blu-Ray
        #[arg(long, default_value = "", value_parser = parse_format)]
        format: String,

        /// Comma-separated actor names
        #[arg(long, default_value = "")]
        actors: String,
    },

    /// Delete a movie
    Delete { id: String },

    /// Import movies from a text file
    Import { file: PathBuf },

    /// Print the effective configuration
    Config,
}

fn parse_sort(s: &str) -> Result<SortKey, String> {
    s.parse()
}

fn parse_order(s: &str) -> Result<SortOrder, String> {
    s.parse()
}

/// Accept an empty value so the validator can report it per field.
fn parse_format(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Ok(String::new());
    }
    s.parse::<MovieFormat>().map(|f| f.label().to_string())
}

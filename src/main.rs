//! # membank CLI
//!
//! The `membank` binary is the interface to the per-project memory store.
//! It provides commands for database initialization, writing and reading
//! memory files, search, and project/file management.
//!
//! ## Usage
//!
//! ```bash
//! membank --config ./config/membank.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `membank init` | Create the SQLite database and run schema migrations |
//! | `membank write <project> <file>` | Store a memory file (stdin or `--input`) |
//! | `membank read <project> <file>` | Print a memory file's reconstructed content |
//! | `membank search <project> "<query>"` | Search a project's chunks |
//! | `membank projects` | List projects with stored content |
//! | `membank files <project>` | List a project's memory files |
//! | `membank delete <project> [file]` | Delete one file or a whole project |

mod config;
mod db;
mod embedding;
mod error;
mod memory;
mod migrate;
mod models;
mod search;
mod splitter;
mod store;
mod tokenizer;

use std::io::Read as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::embedding::Embedder;
use crate::splitter::TextSplitter;
use crate::store::SqliteStore;
use crate::tokenizer::HfTokenizer;

/// membank — project-scoped text memory with token-aware chunking and
/// semantic retrieval.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/membank.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "membank",
    about = "Project-scoped text memory with token-aware chunking and semantic retrieval",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/membank.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the memory_chunks table.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Store a memory file.
    ///
    /// Splits the content into token-bounded chunks, embeds them (when an
    /// embedding provider is configured), and atomically replaces the
    /// file's previous chunk set. Empty content clears the file.
    Write {
        /// Project identifier.
        project: String,

        /// Memory file name (e.g. `architecture.md`).
        file: String,

        /// Read content from this path instead of stdin.
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
    },

    /// Print a memory file's reconstructed content.
    ///
    /// Concatenates the file's chunks in index order. With a non-zero
    /// chunk overlap the overlapping spans appear twice.
    Read {
        /// Project identifier.
        project: String,

        /// Memory file name.
        file: String,
    },

    /// Search a project's chunks.
    Search {
        /// Project identifier.
        project: String,

        /// The search query string.
        query: String,

        /// Search mode: `semantic` (vector distance) or `keyword`
        /// (substring match ordered by file then chunk index).
        #[arg(long, default_value = "semantic")]
        mode: String,

        /// Maximum number of results (bounded by `search.max_top_k`).
        #[arg(long, default_value_t = 5)]
        top_k: usize,

        /// Restrict to these file names (repeatable).
        #[arg(long = "file")]
        files: Vec<String>,
    },

    /// List projects with stored content.
    Projects,

    /// List a project's memory files.
    Files {
        /// Project identifier.
        project: String,
    },

    /// Delete one memory file, or a whole project when no file is given.
    Delete {
        /// Project identifier.
        project: String,

        /// Memory file name. Omit to delete the entire project.
        file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Write {
            project,
            file,
            input,
        } => {
            let text = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read input file: {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };

            // Fail fast: the tokenizer must load before any chunking call.
            // Construction may download the vocabulary, so it runs off the
            // async runtime.
            let tok_cfg = cfg.tokenizer.clone();
            let tok = tokio::task::spawn_blocking(move || HfTokenizer::from_config(&tok_cfg))
                .await
                .context("tokenizer initialization task failed")??;
            let splitter = TextSplitter::new(&cfg.chunking, &tok);
            let embedder: Option<Box<dyn Embedder>> = if cfg.embedding.is_enabled() {
                Some(embedding::create_embedder(&cfg.embedding)?)
            } else {
                None
            };

            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let written = memory::replace_file_chunks(
                &store,
                &splitter,
                embedder.as_deref(),
                &project,
                &file,
                &text,
            )
            .await?;
            store.pool().close().await;

            println!("wrote {}/{}", project, file);
            println!("  chunks: {}", written);
            if !cfg.embedding.is_enabled() {
                println!("  embeddings: skipped (provider disabled)");
            }
            println!("ok");
        }
        Commands::Read { project, file } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let result = memory::get_file_content(&store, &project, &file).await;
            store.pool().close().await;
            match result {
                Ok(content) => print!("{}", content),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Search {
            project,
            query,
            mode,
            top_k,
            files,
        } => {
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let file_filter = if files.is_empty() {
                None
            } else {
                Some(files.as_slice())
            };
            let result = search::search(
                &store,
                embedder.as_ref(),
                &cfg.search,
                &project,
                &query,
                &mode,
                top_k,
                file_filter,
            )
            .await;
            store.pool().close().await;

            let hits = match result {
                Ok(hits) => hits,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            if hits.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for (i, hit) in hits.iter().enumerate() {
                match hit.score {
                    Some(distance) => println!(
                        "{}. [{:.4}] {}#{}",
                        i + 1,
                        distance,
                        hit.file_name,
                        hit.chunk_index
                    ),
                    None => println!("{}. {}#{}", i + 1, hit.file_name, hit.chunk_index),
                }
                println!("    \"{}\"", hit.text.replace('\n', " ").trim());
            }
        }
        Commands::Projects => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let projects = memory::list_projects(&store).await?;
            store.pool().close().await;
            if projects.is_empty() {
                println!("No projects.");
            }
            for project in projects {
                println!("{}", project);
            }
        }
        Commands::Files { project } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let result = memory::list_files(&store, &project).await;
            store.pool().close().await;
            match result {
                Ok(files) => {
                    for file in files {
                        println!("{}", file);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Delete { project, file } => {
            let pool = db::connect(&cfg).await?;
            let store = SqliteStore::new(pool);
            let result = match &file {
                Some(file_name) => memory::delete_file(&store, &project, file_name).await,
                None => memory::delete_project(&store, &project).await,
            };
            store.pool().close().await;
            match result {
                Ok(removed) => {
                    match file {
                        Some(file_name) => println!("deleted {}/{}", project, file_name),
                        None => println!("deleted project {}", project),
                    }
                    println!("  chunks removed: {}", removed);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

//! PharmaGuard CLI - migrations, roster management and a device client.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! pharmaguard migrate
//!
//! # Replace the roster directly in the database
//! pharmaguard roster import gardes.json
//!
//! # Replace the roster through a running portal
//! pharmaguard roster upload gardes.json
//!
//! # Show the on-duty pharmacies for this week, then the week after
//! pharmaguard roster show
//! pharmaguard roster show --next 1
//!
//! # Health feed
//! pharmaguard posts list
//! pharmaguard posts like 12
//! pharmaguard posts comment 12 "Merci pour ces conseils"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `roster` - Import, upload and browse the duty roster
//! - `posts` - Read posts, like them and comment

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod client;
mod commands;
mod device;
mod render;

#[derive(Parser)]
#[command(name = "pharmaguard")]
#[command(author, version, about = "PharmaGuard CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage and browse the duty roster
    Roster {
        #[command(subcommand)]
        action: RosterAction,
    },
    /// Read and react to health posts
    Posts {
        #[command(subcommand)]
        action: PostsAction,
    },
}

#[derive(Subcommand)]
enum RosterAction {
    /// Replace the stored roster with a JSON file, writing to the database
    Import {
        /// Roster file (JSON array of weeks)
        file: PathBuf,
    },
    /// Replace the roster through the portal API
    Upload {
        /// Roster file (JSON array of weeks)
        file: PathBuf,
    },
    /// Show on-duty pharmacies, starting from the active week
    Show {
        /// Jump to week number N (1-based)
        #[arg(short, long, conflicts_with_all = ["next", "prev"])]
        week: Option<usize>,

        /// Move forward N weeks from the active week
        #[arg(short, long, default_value_t = 0)]
        next: usize,

        /// Move back N weeks from the active week
        #[arg(short, long, default_value_t = 0)]
        prev: usize,

        /// Use the roster cached on this device without contacting the portal
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Subcommand)]
enum PostsAction {
    /// List published posts
    List,
    /// Like a post, or remove the like if this device already likes it
    Like {
        /// Post id
        id: i32,
    },
    /// Show the comments on a post
    Comments {
        /// Post id
        id: i32,
    },
    /// Comment on a post (1-300 characters)
    Comment {
        /// Post id
        id: i32,

        /// Comment text
        body: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Roster { action } => match action {
            RosterAction::Import { file } => commands::roster::import(&file).await?,
            RosterAction::Upload { file } => commands::roster::upload(&file).await?,
            RosterAction::Show {
                week,
                next,
                prev,
                offline,
            } => {
                let moves = commands::roster::Moves { week, next, prev };
                commands::roster::show(moves, offline).await?;
            }
        },
        Commands::Posts { action } => match action {
            PostsAction::List => commands::posts::list().await?,
            PostsAction::Like { id } => commands::posts::toggle_like(id.into()).await?,
            PostsAction::Comments { id } => commands::posts::comments(id.into()).await?,
            PostsAction::Comment { id, body } => {
                commands::posts::comment(id.into(), &body).await?;
            }
        },
    }
    Ok(())
}

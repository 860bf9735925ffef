//! CLI entry point for nobelium-rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nobelium_rs::commands::generate::GenerateOptions;
use nobelium_rs::server::ServerOptions;
use nobelium_rs::Blog;

#[derive(Parser)]
#[command(name = "nobelium-rs")]
#[command(version)]
#[command(about = "A static blog generator backed by a Notion database", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new blog
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Fetch posts from Notion into the local snapshot
    Fetch,

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Build from the local snapshot instead of Notion
        #[arg(long)]
        offline: bool,

        /// Only build the post or page with this slug
        #[arg(long)]
        slug: Option<String>,
    },

    /// Start a local server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,

        /// Build from the local snapshot instead of Notion
        #[arg(long)]
        offline: bool,

        /// Rebuild from Notion every N seconds
        #[arg(long, value_name = "SECS")]
        revalidate: Option<u64>,
    },

    /// Clean the public folder
    Clean {
        /// Also delete the fetched snapshot
        #[arg(long)]
        all: bool,
    },

    /// List site information
    List {
        /// Type of content to list (post, page, tag)
        #[arg(default_value = "post")]
        r#type: String,

        /// Read the local snapshot instead of Notion
        #[arg(long)]
        offline: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "nobelium_rs=debug,tower_http=debug,info"
    } else {
        "nobelium_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot read the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing blog in {:?}", target_dir);
            nobelium_rs::commands::init::init_site(&target_dir)?;
            println!("Initialized blog in {:?}", target_dir);
        }

        Commands::Fetch => {
            let blog = Blog::new(&base_dir)?;
            let changes = nobelium_rs::commands::fetch::run(&blog).await?;
            println!("Fetched successfully! ({})", changes.summary());
        }

        Commands::Generate { offline, slug } => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate(&GenerateOptions { offline, slug }).await?;
            println!("Generated successfully!");
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
            offline,
            revalidate,
        } => {
            let blog = Blog::new(&base_dir)?;
            let generate = GenerateOptions {
                offline,
                slug: None,
            };

            // Generate first
            tracing::info!("Generating static files...");
            if let Err(e) = blog.generate(&generate).await {
                // Still serve whatever was built before
                tracing::error!("Generation failed: {:#}", e);
            }

            tracing::info!("Starting server at http://{}:{}", ip, port);
            let options = ServerOptions {
                ip,
                port,
                watch: !r#static,
                open,
                revalidate,
                generate,
            };
            nobelium_rs::server::start(&blog, options).await?;
        }

        Commands::Clean { all } => {
            let blog = Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean(all)?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type, offline } => {
            let blog = Blog::new(&base_dir)?;
            nobelium_rs::commands::list::run(&blog, &r#type, offline).await?;
        }

        Commands::Version => {
            println!("nobelium-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

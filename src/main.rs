//! CLI entry point for avanco-site

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avanco_site::config::Mode;
use avanco_site::Site;

#[derive(Parser)]
#[command(name = "avanco-site")]
#[command(author = "Avanco")]
#[command(version)]
#[command(about = "Marketing site and MDX blog for Avanco", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Override the mode from _config.yml (drafts are listed in development)
    #[arg(short, long, global = true, value_enum)]
    mode: Option<Mode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the site into the public folder
    #[command(alias = "g")]
    Build {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Start a local server that renders pages per request
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Disable file watching and live reload
        #[arg(long)]
        r#static: bool,
    },

    /// List site content
    List {
        /// Type of content to list (posts, categories, tags)
        #[arg(default_value = "posts")]
        r#type: String,
    },

    /// Clean the public folder
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "avanco_site=debug,info"
    } else {
        "avanco_site=info"
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
        None => std::env::current_dir()?,
    };

    let load = |default_mode: Option<Mode>| -> Result<Site> {
        let site = Site::new(&base_dir)?;
        Ok(match cli.mode.or(default_mode) {
            Some(mode) => site.with_mode(mode),
            None => site,
        })
    };

    match cli.command {
        Commands::Build { watch } => {
            let site = load(None)?;
            tracing::info!("Generating static files...");

            site.build()?;
            println!("Generated successfully!");

            if watch {
                tracing::info!("Watching for file changes...");
                avanco_site::commands::build::watch(&site).await?;
            }
        }

        Commands::Serve {
            port,
            ip,
            open,
            r#static,
        } => {
            // The local server previews drafts unless told otherwise
            let site = load(Some(Mode::Development))?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            avanco_site::server::start(&site, &ip, port, !r#static, open).await?;
        }

        Commands::List { r#type } => {
            let site = load(None)?;
            avanco_site::commands::list::run(&site, &r#type)?;
        }

        Commands::Clean => {
            let site = load(None)?;
            tracing::info!("Cleaning public folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("avanco-site version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

use std::path::PathBuf;

use awesome_stars::{
    app_init::{create_github_client, initialize_logging, run_host},
    config::{default_config_path, load_config},
    storage::{FileStore, MemoryStore},
};
use clap::Parser;
use tracing::info;

/// Native messaging host for the Awesome Stars browser extension
#[derive(Debug, Parser)]
#[command(name = "awesome-stars", version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long)]
    debug: bool,

    /// Keep the access token in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Arguments appended by the browser, such as the calling extension's origin
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    browser_args: Vec<String>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = load_config(&config_path)?;

    let _log_guard = initialize_logging(&config, args.debug)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        browser_args = ?args.browser_args,
        "awesome-stars host starting up"
    );

    let client = create_github_client(&config)?;

    if args.ephemeral {
        info!("Using in-memory token storage");
        run_host(client, MemoryStore::new()).await?;
    } else {
        let storage = FileStore::new(config.storage_path());
        info!(path = %storage.path().display(), "Using file token storage");
        run_host(client, storage).await?;
    }

    Ok(())
}

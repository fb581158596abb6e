//! drivedocs command-line tool.
//!
//! Mirrors a Google Drive shared drive into a directory of Markdown files
//! for a static documentation site, and manages the OAuth credentials that
//! the sync needs.

mod report;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use drivedocs_core::config::{DocsConfig, LoggingConfig, SyncOverrides, DEFAULT_CONFIG_FILE};
use drivedocs_core::errors::ConfigError;
use drivedocs_core::{authorize, load_or_refresh, AuthorizeOutcome, Replicator};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// drivedocs command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "drivedocs",
    version,
    about = "Mirror Google Docs from a shared drive into Markdown for a documentation site"
)]
struct Cli {
    /// Site directory; relative paths in the config resolve against it.
    #[arg(long, global = true, default_value = ".")]
    site_dir: PathBuf,

    /// Path to the TOML configuration file [default: <site-dir>/drivedocs.toml].
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the output directory with a fresh export of the shared drive.
    #[command(name = "drive:sync")]
    DriveSync {
        /// Shared drive to export from (overrides drive.shared_drive_id).
        #[arg(long)]
        shared_drive_id: Option<String>,

        /// Folder inside the shared drive to start from (overrides drive.nested_folder_id).
        #[arg(long)]
        nested_folder_id: Option<String>,

        /// Output directory, relative to the site directory (overrides output.dir).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Authorize drivedocs against Google and store the token.
    Auth {
        /// Print the consent URL instead of opening a browser.
        #[arg(long)]
        no_browser: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file [default: <site-dir>/drivedocs.toml].
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration and check for credential files.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Init { .. } => Ok(DocsConfig::default()),
        _ => DocsConfig::discover(&cli.site_dir, cli.config.as_deref()),
    };
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let _guards = init_logging(&logging, &cli.site_dir);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Result<DocsConfig, ConfigError>) -> Result<()> {
    let site_dir = cli.site_dir;
    let loaded = || config.context("failed to load configuration file");

    match cli.command {
        Commands::DriveSync {
            shared_drive_id,
            nested_folder_id,
            output_dir,
        } => {
            let overrides = SyncOverrides {
                shared_drive_id,
                nested_folder_id,
                output_dir,
            };
            cmd_sync(&loaded()?, &overrides, &site_dir).await
        }
        Commands::Auth { no_browser } => cmd_auth(&loaded()?, &site_dir, no_browser).await,
        Commands::Init { output } => {
            let output = output.unwrap_or_else(|| site_dir.join(DEFAULT_CONFIG_FILE));
            cmd_init(&output)
        }
        Commands::Validate => cmd_validate(&loaded()?, &site_dir),
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the tracing subscriber. `RUST_LOG` wins over `[logging].level`.
///
/// The returned guards flush buffered log lines when dropped and must live
/// until the program exits.
fn init_logging(logging: &LoggingConfig, site_dir: &Path) -> Vec<WorkerGuard> {
    let mut guards = Vec::new();

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(stderr_writer)
        .with_filter(env_filter(&logging.level));

    let file_layer = logging.file.as_ref().map(|file| {
        let path = site_dir.join(file);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Warning: failed to create log directory {}: {}", dir.display(), e);
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "drivedocs.log".into());
        let appender = tracing_appender::rolling::never(&dir, file_name);
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        guards.push(file_guard);
        tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_filter(env_filter(&logging.level))
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guards
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_sync(config: &DocsConfig, overrides: &SyncOverrides, site_dir: &Path) -> Result<()> {
    config
        .validate()
        .context("configuration validation failed")?;
    let settings = config
        .sync_settings(overrides, site_dir)
        .context("cannot resolve sync settings")?;

    let client = load_or_refresh(&config.auth_settings(site_dir))
        .await
        .context("authentication failed")?;

    let stats = Replicator::new(&client, &settings)
        .run(
            &settings.root_folder_id,
            &settings.shared_drive_id,
            &settings.output_dir,
        )
        .await
        .context("sync aborted")?;

    report::print_sync_summary(&stats, &settings.output_dir);
    Ok(())
}

async fn cmd_auth(config: &DocsConfig, site_dir: &Path, no_browser: bool) -> Result<()> {
    config
        .validate()
        .context("configuration validation failed")?;
    let settings = config.auth_settings(site_dir);

    let outcome = authorize(&settings, |url| {
        println!("Authorize drivedocs by visiting this URL:");
        println!();
        println!("  {}", url);
        println!();
        if !no_browser {
            if let Err(e) = open::that(url) {
                warn!(error = %e, "could not open a browser; open the URL above manually");
            }
        }
        println!("{}", style::dim("Waiting for the redirect..."));
    })
    .await
    .context("authorization failed")?;

    match outcome {
        AuthorizeOutcome::AlreadyAuthorized => {
            println!(
                "{}",
                style::success(&format!(
                    "Already authorized; delete {} to re-authenticate",
                    settings.token_path.display()
                ))
            );
        }
        AuthorizeOutcome::Authorized(token) => {
            info!(scope = token.scope.as_deref().unwrap_or("-"), "token stored");
            println!(
                "{}",
                style::success(&format!(
                    "Authentication successful; token saved to {}",
                    settings.token_path.display()
                ))
            );
            if token.refresh_token.is_none() {
                println!(
                    "{}",
                    style::warn("No refresh token was issued; you will need to re-run 'drivedocs auth' when the access token expires")
                );
            }
        }
    }
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DocsConfig::default_template()).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Set drive.shared_drive_id to the shared drive you want to publish");
    println!("  2. Save your OAuth client secret as credentials.json next to it");
    println!("  3. Authorize with: drivedocs auth");
    println!("  4. Export with: drivedocs drive:sync");

    Ok(())
}

fn cmd_validate(config: &DocsConfig, site_dir: &Path) -> Result<()> {
    println!("Validating configuration in {}", site_dir.display());
    println!();
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All present fields are valid"),
        Err(e) => {
            println!("  {}", style::error(&format!("Validation error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    }

    let auth = config.auth_settings(site_dir);
    println!();
    println!("Configuration summary:");
    println!(
        "  Shared drive  : {}",
        config.drive.shared_drive_id.as_deref().unwrap_or("NOT SET (pass --shared-drive-id)")
    );
    println!(
        "  Nested folder : {}",
        config.drive.nested_folder_id.as_deref().unwrap_or("-")
    );
    println!("  Output dir    : {}", site_dir.join(&config.output.dir).display());
    println!(
        "  Root document : {}",
        config.site.root_doc_id.as_deref().unwrap_or("-")
    );
    println!(
        "  Credentials   : {} ({})",
        auth.credentials_path.display(),
        style::presence(auth.credentials_path.exists())
    );
    println!(
        "  Token         : {} ({})",
        auth.token_path.display(),
        style::presence(auth.token_path.exists())
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}

//! lessondeck - Lesson deck generator

mod cli;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lessondeck_core::AppConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "lessondeck",
    version,
    about = "Generate lesson slide decks from AI-written content",
    long_about = "Builds the prompts for a lesson topic, turns the pasted AI answer into a\n\
                  Google Slides deck, shares it with anyone holding the link and exports\n\
                  every slide as a PNG inside one ZIP.\n\
                  \n\
                  Examples:\n\
                    lessondeck                               # Run the web UI (default)\n\
                    lessondeck serve --port 8080             # Custom port\n\
                    lessondeck login                         # Sign in with your Google account\n\
                    lessondeck prompts \"Knowing Yourself\"    # Print the prompts for a topic\n\
                    lessondeck prompts \"Topic\" --template \"Template Number 2\"\n\
                    lessondeck export <link> -o deck.zip     # Download slide images\n\
                  \n\
                  Environment Variables:\n\
                    LESSONDECK_USE_SERVICE_ACCOUNT           # Use a service account instead of OAuth\n\
                    LESSONDECK_SERVICE_ACCOUNT               # Service-account key (path or JSON)\n\
                    LESSONDECK_OAUTH_CLIENT                  # OAuth client secrets (path or JSON)\n\
                    LESSONDECK_TOKEN_CACHE                   # OAuth token cache file\n\
                    LESSONDECK_REDIRECT_URI                  # OAuth redirect URI of the web UI\n\
                    LESSONDECK_TEMPLATE                      # Name of the deck template to use\n\
                    LESSONDECK_TEMPLATE_ID                   # Presentation copied by that template\n\
                    LESSONDECK_DESTINATION_FOLDER            # Drive folder for new decks\n\
                    LESSONDECK_PORT                          # Web server port\n\
                    RUST_LOG                                 # Log filter (default: info)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the TOML config file (default: ./lessondeck.toml if present)
    #[arg(long, global = true, env = "LESSONDECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Settings that take precedence over the config file
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Use a service account instead of per-user OAuth consent
    #[arg(long, global = true, env = "LESSONDECK_USE_SERVICE_ACCOUNT")]
    use_service_account: bool,

    /// Service-account key: file path or inline JSON
    #[arg(long, global = true, env = "LESSONDECK_SERVICE_ACCOUNT", hide_env_values = true)]
    service_account: Option<String>,

    /// OAuth client secrets: file path or inline JSON
    #[arg(long, global = true, env = "LESSONDECK_OAUTH_CLIENT", hide_env_values = true)]
    oauth_client: Option<String>,

    /// OAuth token cache file
    #[arg(long, global = true, env = "LESSONDECK_TOKEN_CACHE")]
    token_cache: Option<PathBuf>,

    /// OAuth redirect URI registered for the web UI
    #[arg(long, global = true, env = "LESSONDECK_REDIRECT_URI")]
    redirect_uri: Option<String>,

    /// Deck template to use, by name (default: the first configured one)
    #[arg(long, global = true, env = "LESSONDECK_TEMPLATE")]
    template: Option<String>,

    /// Presentation copied by the chosen template
    #[arg(long, global = true, env = "LESSONDECK_TEMPLATE_ID")]
    template_id: Option<String>,

    /// Drive folder new decks are moved into
    #[arg(long, global = true, env = "LESSONDECK_DESTINATION_FOLDER")]
    destination_folder: Option<String>,

    /// Port for the web server
    #[arg(long, global = true, env = "LESSONDECK_PORT")]
    port: Option<u16>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if self.use_service_account {
            config.auth.use_service_account = true;
        }
        if let Some(key) = self.service_account {
            config.auth.service_account = Some(key);
        }
        if let Some(client) = self.oauth_client {
            config.auth.oauth_client = Some(client);
        }
        if let Some(path) = self.token_cache {
            config.auth.token_cache = Some(path);
        }
        if let Some(uri) = self.redirect_uri {
            config.auth.redirect_uri = uri;
        }
        if let Some(name) = self.template {
            config.deck.default_template = Some(name);
        }
        if let Some(id) = self.template_id {
            config.deck.set_default_presentation(id);
        }
        if let Some(folder) = self.destination_folder {
            config.deck.destination_folder = Some(folder);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the web UI (default)
    Serve,
    /// Sign in with a Google account and cache the token
    Login,
    /// Print the prompts for a topic and exit
    Prompts {
        /// Lesson topic
        topic: String,
    },
    /// Download every slide of a deck as PNG images in one ZIP
    Export {
        /// Google Slides link or presentation id
        deck: String,
        /// Output file (default: named after the deck id)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        // No Google access needed, hence no credential checks
        Command::Prompts { topic } => {
            let config = load_deck_config(cli.config, cli.overrides)?;
            cli::run_prompts(&config.deck, &topic)
        }
        Command::Serve => {
            let config = load_config(cli.config, cli.overrides)?;
            cli::run_serve(&config, http_client()?).await
        }
        Command::Login => {
            let config = load_config(cli.config, cli.overrides)?;
            cli::run_login(&config, http_client()?).await
        }
        Command::Export { deck, output } => {
            let config = load_config(cli.config, cli.overrides)?;
            cli::run_export(&config, http_client()?, &deck, output).await
        }
    }
}

fn load_config(path: Option<PathBuf>, overrides: Overrides) -> Result<AppConfig> {
    let mut config = AppConfig::load(path.as_deref()).context("Failed to load configuration")?;
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Config for commands that never call Google: only the deck settings are
/// checked
fn load_deck_config(path: Option<PathBuf>, overrides: Overrides) -> Result<AppConfig> {
    let mut config = AppConfig::load(path.as_deref()).context("Failed to load configuration")?;
    overrides.apply(&mut config);
    config.deck.validate().context("Invalid deck configuration")?;
    Ok(config)
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .user_agent(concat!("lessondeck/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

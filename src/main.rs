mod repl;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use subset_core::config::AppConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "subset-agent",
    about = "Ask analytics questions in plain language",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/subset-agent/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the model name
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Override the analytics engine host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive question session (default)
    Chat,

    /// Answer a single question and exit
    Ask {
        /// The question, in plain language
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "subset_agent=info,subset_core=info,subset_tools=info,warn".into()
        }))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    if let Some(model) = &cli.model {
        config.provider.model = model.clone();
    }
    if let Some(host) = &cli.host {
        config.analytics.host = Some(host.clone());
    }

    match cli.command {
        Some(Commands::Config { action }) => handle_config_command(action, &config, &config_path),
        Some(Commands::Ask { question }) => {
            config.resolve_env();
            repl::ask(&config, &question.join(" ")).await
        }
        Some(Commands::Chat) | None => {
            config.resolve_env();
            repl::run(&config).await
        }
    }
}

fn handle_config_command(
    action: Option<ConfigAction>,
    config: &AppConfig,
    path: &std::path::Path,
) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save_to(path)?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

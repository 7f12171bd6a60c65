use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod repl;
mod ui;

use neurochat_core::*;
use neurochat_provider::{create_provider, gemini_from_config, ProviderType};
use neurochat_schema::PredictionLabel;

#[derive(Parser)]
#[command(name = "neurochat", version, about = "MRI companion chat backed by Gemini")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.neurochat",
        help = "Root directory (contains neurochat.yaml and logs/)"
    )]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Interactive chat session")]
    Chat {
        #[arg(long, help = "Use the offline stub backend instead of Gemini")]
        offline: bool,
    },
    #[command(about = "Validate the config file")]
    Validate,
    #[command(about = "Print the explanation shown for a prediction label")]
    Explain {
        #[arg(help = "Label, e.g. MildDemented")]
        label: String,
    },
    #[command(about = "List the Gemini models available to the configured api key")]
    Models,
}

fn expand_home(path: PathBuf) -> PathBuf {
    if !path.starts_with("~") {
        return path;
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(path.strip_prefix("~").unwrap_or(&path)),
        None => path,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.root = expand_home(cli.root);

    let log_dir = cli.root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "neurochat.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config_path = cli.root.join(CONFIG_FILE_NAME);
    match command {
        Commands::Validate => {
            let config = load_config(&config_path)?;
            println!(
                "Config valid. provider={:?} model={} history_replay={:?} classifier={}",
                config.provider.provider_type,
                config.provider.model,
                config.conversation.history_replay,
                config.classifier.label
            );
        }
        Commands::Explain { label } => {
            let label = PredictionLabel::from(label.as_str());
            if !label.is_known() {
                eprintln!("Unknown label '{label}', showing the generic explanation.");
            }
            println!("{}", explanation_for(&label));
        }
        Commands::Models => {
            let config = load_config_or_default(&config_path)?;
            let gemini = gemini_from_config(&config.provider)?;
            let models = gemini.list_models().await?;
            for model in &models {
                println!("{}", ui::format_model_line(model));
            }
        }
        Commands::Chat { offline } => {
            let config = if offline {
                let mut config = if config_path.exists() {
                    load_config_lenient(&config_path)?
                } else {
                    NeurochatConfig::default()
                };
                config.provider.provider_type = ProviderType::Stub;
                config
            } else {
                load_config_or_default(&config_path)?
            };
            validate_config(&config)?;

            let backend = create_provider(&config.provider)?;
            if let Err(err) = backend.health().await {
                tracing::warn!("chat backend health check failed: {err}");
            }
            let manager = ConversationManager::new(backend)
                .with_history_replay(config.conversation.history_replay);
            let classifier = StaticClassifier::new(config.classifier.label.clone());

            repl::run_repl(&config.app.name, &manager, &classifier).await?;
        }
    }

    Ok(())
}

/// Reads the config without requiring a usable Gemini key.
fn load_config_lenient(path: &std::path::Path) -> Result<NeurochatConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

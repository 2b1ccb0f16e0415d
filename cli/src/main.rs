use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use momshero_core::{
    AssistantConfig, ConversationInterface, ConversationOrchestrator, RendererKind, Reply,
    ResponseCache,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "momshero")]
#[command(about = "MomsHero recipe assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant, one message per stdin line
    Chat {
        /// User id the session is kept under
        #[arg(long, default_value = "local")]
        user: String,
        /// Use canned responses instead of the Gemini API
        #[arg(long)]
        offline: bool,
        /// Render recommendations as a menu with quick replies
        #[arg(long)]
        menu: bool,
    },
    /// Inspect or maintain the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print entry counts as JSON
    Stats,
    /// Remove expired entries
    Sweep,
    /// Remove every entry
    Clear,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Environment configuration; `offline` forces the fake provider so no API key is needed.
fn load_config(offline: bool) -> Result<AssistantConfig> {
    let config = if offline {
        AssistantConfig::from_lookup(|name| match name {
            "MOMSHERO_LLM_PROVIDER" => Some("fake".to_string()),
            _ => std::env::var(name).ok(),
        })
    } else {
        AssistantConfig::from_env()
    };
    config.context("Invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            user,
            offline,
            menu,
        } => {
            let mut config = load_config(offline)?;
            if menu {
                config.renderer = RendererKind::Menu;
            }
            chat(&config, &user).await?;
        }
        Commands::Cache { action } => {
            let config = load_config(true)?;
            cache(&config, action)?;
        }
    }

    Ok(())
}

async fn chat(config: &AssistantConfig, user: &str) -> Result<()> {
    let bot = ConversationOrchestrator::from_config(config)
        .context("Failed to set up the language model")?;
    info!(
        user,
        provider = ?config.provider,
        model = %config.model,
        "Chat started"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = bot.handle(user, line).await;
        println!("{}\n", render(&reply));
        bot.evict_idle_sessions();
    }

    println!("{}", serde_json::to_string_pretty(&bot.monitor().report())?);
    Ok(())
}

fn render(reply: &Reply) -> String {
    let mut out = reply.as_text();
    if let Reply::Text { quick_replies, .. } = reply {
        if !quick_replies.is_empty() {
            let labels: Vec<String> = quick_replies
                .iter()
                .map(|option| format!("[{}]", option.label))
                .collect();
            out.push_str(&format!("\n\n{}", labels.join(" ")));
        }
    }
    out
}

fn cache(config: &AssistantConfig, action: CacheAction) -> Result<()> {
    let dir = config
        .cache_dir
        .clone()
        .context("MOMSHERO_CACHE_DIR is \"none\"; there is no disk cache")?;
    let cache = ResponseCache::new(Some(dir.clone()), config.cache_ttl);

    match action {
        CacheAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&cache.stats())?);
        }
        CacheAction::Sweep => {
            let removed = cache.sweep_expired();
            println!("Removed {} expired entries from {}", removed, dir.display());
        }
        CacheAction::Clear => {
            cache
                .clear()
                .with_context(|| format!("Failed to clear {}", dir.display()))?;
            println!("Cleared {}", dir.display());
        }
    }
    Ok(())
}

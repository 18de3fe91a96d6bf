//! VexusBot - conversational travel planner
//!
//! CLI entry point for the webhook server, the local chat and session tools.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use guidestore::GuideStore;
use sessionstore::ProfileField;
use tracing::{debug, info, warn};

use vexusbot::cli::{Cli, Command};
use vexusbot::config::Config;
use vexusbot::engine::Engine;
use vexusbot::llm::create_client;
use vexusbot::prompts::PromptLoader;
use vexusbot::qa::{GuideQa, GuideRetriever};
use vexusbot::render::DocumentRenderer;
use vexusbot::repl::ChatRepl;
use vexusbot::server::{self, AppState, StatusInfo};
use vexusbot::session::SessionManager;
use vexusbot::transport::{ConsoleTransport, TelegramTransport, Transport, WhatsAppTransport};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vexusbot")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("vexusbot.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!(provider = %config.llm.provider, model = %config.llm.model, "VexusBot loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Serve { bind }) => cmd_serve(&config, bind).await,
        Some(Command::Chat { identity, name, output }) => cmd_chat(&config, identity, name, output).await,
        Some(Command::Reset { identity }) => cmd_reset(&config, &identity).await,
        Some(Command::Profile { identity }) => cmd_profile(&config, &identity).await,
        Some(Command::Status) => cmd_status(&config).await,
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Wire the engine and its collaborators from configuration
fn build_engine(config: &Config) -> Result<(Arc<Engine>, StatusInfo)> {
    config.validate()?;

    let llm = create_client(&config.llm).context("Failed to create completion client")?;
    let prompts = Arc::new(PromptLoader::new(std::env::current_dir()?));
    let sessions = SessionManager::spawn(&config.storage.session_dir)
        .context(format!("Failed to open session store at {}", config.storage.session_dir))?;

    let guide = GuideStore::open(&config.guide.store_path)
        .context(format!("Failed to open guide store at {}", config.guide.store_path))?;
    let guide_loaded = guide.is_loaded();
    let retriever = Arc::new(GuideRetriever::new(guide, config.guide.top_k));
    let qa = GuideQa::new(retriever, llm.clone(), prompts.clone(), config.llm.max_tokens);

    let engine = Engine::new(
        sessions,
        llm,
        qa,
        Arc::new(DocumentRenderer),
        prompts,
        config.llm.max_tokens,
    );
    let status = StatusInfo {
        provider: config.llm.provider.clone(),
        model: config.llm.model.clone(),
        guide_loaded,
    };
    Ok((Arc::new(engine), status))
}

async fn cmd_serve(config: &Config, bind: Option<String>) -> Result<()> {
    debug!(?bind, "cmd_serve: called");
    let (engine, status) = build_engine(config)?;

    let whatsapp: Option<Arc<dyn Transport>> = match config.whatsapp.token() {
        Some(token) if !config.whatsapp.phone_number_id.is_empty() => {
            Some(Arc::new(WhatsAppTransport::new(&config.whatsapp, token)))
        }
        Some(_) => {
            warn!("WhatsApp token set but phone-number-id missing, WhatsApp disabled");
            None
        }
        None => None,
    };
    let telegram: Option<Arc<dyn Transport>> = config
        .telegram
        .token()
        .map(|token| Arc::new(TelegramTransport::new(&config.telegram, token)) as Arc<dyn Transport>);

    if whatsapp.is_none() && telegram.is_none() {
        return Err(eyre::eyre!(
            "No transport configured. Set {} (with whatsapp.phone-number-id) or {}.",
            config.whatsapp.token_env,
            config.telegram.token_env
        ));
    }

    let state = AppState {
        engine,
        whatsapp,
        telegram,
        verify_token: config.whatsapp.verify_token(),
        status,
    };

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    println!("{} listening on {}", "VexusBot".bright_cyan().bold(), bind);
    server::serve(&bind, state).await
}

async fn cmd_chat(config: &Config, identity: String, name: Option<String>, output: PathBuf) -> Result<()> {
    debug!(%identity, ?name, "cmd_chat: called");
    let (engine, _) = build_engine(config)?;
    let console = Arc::new(ConsoleTransport::new(output));
    ChatRepl::new(engine, console, identity, name).run().await
}

async fn cmd_reset(config: &Config, identity: &str) -> Result<()> {
    debug!(%identity, "cmd_reset: called");
    let sessions = SessionManager::spawn(&config.storage.session_dir)?;
    if sessions.clear(identity).await? {
        println!("{} session cleared for {}", "✓".green(), identity);
    } else {
        println!("No session stored for {}", identity);
    }
    Ok(())
}

async fn cmd_profile(config: &Config, identity: &str) -> Result<()> {
    debug!(%identity, "cmd_profile: called");
    let sessions = SessionManager::spawn(&config.storage.session_dir)?;
    let profile = sessions.get_profile(identity).await?;
    if profile.is_empty() {
        println!("No profile stored for {}", identity);
        return Ok(());
    }

    println!("{}", format!("Profile {}", identity).bold());
    for field in ProfileField::ALL {
        if let Some(value) = profile.get(field) {
            println!("  {:<13} {}", field.column().dimmed(), value);
        }
    }
    Ok(())
}

async fn cmd_status(config: &Config) -> Result<()> {
    debug!("cmd_status: called");
    let check = |ok: bool| if ok { "✓".green() } else { "✗".red() };

    println!("{}", "VexusBot".bright_cyan().bold());
    println!("  version        {}", env!("GIT_DESCRIBE"));
    println!("  provider       {} ({})", config.llm.provider, config.llm.model);
    println!(
        "  api key        {} {}",
        check(config.validate().is_ok()),
        config.llm.api_key_env
    );
    println!(
        "  whatsapp       {} {}",
        check(config.whatsapp.token().is_some()),
        config.whatsapp.token_env
    );
    println!(
        "  telegram       {} {}",
        check(config.telegram.token().is_some()),
        config.telegram.token_env
    );

    match GuideStore::open(&config.guide.store_path).and_then(|g| g.list_guides()) {
        Ok(guides) => println!(
            "  guide          {} {} guide(s) in {}",
            check(!guides.is_empty()),
            guides.len(),
            config.guide.store_path
        ),
        Err(e) => println!("  guide          {} {}", check(false), e),
    }

    let sessions = SessionManager::spawn(&config.storage.session_dir)?;
    let active = sessions.list().await?;
    println!("  sessions       {} active in {}", active.len(), config.storage.session_dir);
    Ok(())
}

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use toolchat::config::{Config, Secrets};
use toolchat::llm::{GeminiClient, GeminiConfig};
use toolchat::runner::{RunnerConfig, TurnRunner};
use toolchat::server::{self, AppState};
use toolchat::session::SessionStore;
use toolchat::tools::{ToolHttp, ToolRegistry};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(verbose: bool) -> Result<PathBuf> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolchat")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("toolchat.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::new()
        .filter_level(LevelFilter::Trace)
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    // Without RUST_LOG the max level gates output; config may adjust it later
    if !rust_log_set() {
        log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(log_file)
}

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

/// `RUST_LOG` and `-v` both take precedence over the configured level
fn apply_configured_level(config: &Config, verbose: bool) {
    if verbose || rust_log_set() {
        return;
    }
    if let Some(level) = &config.log_level {
        match level.parse::<LevelFilter>() {
            Ok(filter) => log::set_max_level(filter),
            Err(_) => log::warn!("Ignoring invalid log_level '{}'", level),
        }
    }
}

fn load_secrets() -> Secrets {
    match Secrets::from_env() {
        Ok(secrets) => secrets,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{} {}", "Error:".red(), e);
            std::process::exit(1);
        }
    }
}

fn build_runner(config: &Config, secrets: &Secrets) -> Result<TurnRunner<GeminiClient>> {
    let llm = GeminiClient::new(secrets.llm_api_key.clone(), GeminiConfig::from_config(&config.llm))
        .context("Failed to create Gemini client")?;
    let http = ToolHttp::new(&config.tools, secrets).context("Failed to create tool HTTP client")?;

    let registry = ToolRegistry::standard(Arc::new(http));
    registry
        .verify()
        .context("Tool registry does not match the advertised manifest")?;
    info!("Registered tools: {}", registry.tool_names().join(", "));

    let sessions = Arc::new(SessionStore::new(config.sessions.idle_timeout()));

    Ok(TurnRunner::with_config(
        Arc::new(llm),
        Arc::new(registry),
        sessions,
        RunnerConfig::from_config(config),
    ))
}

async fn run_application(cli: &Cli, config: &Config, secrets: &Secrets) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let runner = build_runner(config, secrets)?;

    match cli.command.clone().unwrap_or_default() {
        Commands::Serve { host, port } => handle_serve_command(runner, config, host, port).await,
        Commands::Ask { message, session } => handle_ask_command(&runner, config, &message, session).await,
        Commands::Tools => handle_tools_command(&runner),
    }
}

async fn handle_serve_command(
    runner: TurnRunner<GeminiClient>,
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context(format!("Invalid listen address {}:{}", host, port))?;

    runner
        .sessions()
        .clone()
        .spawn_sweeper(config.sessions.sweep_interval());

    println!(
        "{} http://{} (model {})",
        "Listening on".green(),
        addr,
        runner.model().cyan()
    );

    let state = AppState::new(Arc::new(runner), config.server.default_session_id.clone());
    server::serve(addr, server::router(state))
        .await
        .context("Server failed")?;
    Ok(())
}

async fn handle_ask_command(
    runner: &TurnRunner<GeminiClient>,
    config: &Config,
    message: &str,
    session: Option<String>,
) -> Result<()> {
    let session = session.unwrap_or_else(|| config.server.default_session_id.clone());
    info!("Asking in session '{}': {}", session, message);

    match runner.run_turn(&session, message).await {
        Ok(reply) => {
            println!("{}", reply.text);
            if !reply.tools_used.is_empty() {
                println!(
                    "{} {}",
                    "Tools used:".dimmed(),
                    reply.tools_used.join(", ").dimmed()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} Failed to get response from AI: {}", "Error:".red(), e);
            Err(e).context("Turn failed")
        }
    }
}

fn handle_tools_command(runner: &TurnRunner<GeminiClient>) -> Result<()> {
    for declaration in runner.declarations() {
        println!("{} - {}", declaration.name.green(), declaration.description);
        let properties = declaration.parameters["properties"].as_object();
        let required = declaration.parameters["required"].as_array();
        for (name, schema) in properties.into_iter().flatten() {
            let is_required = required.is_some_and(|r| r.iter().any(|v| v == name.as_str()));
            println!(
                "    {} ({}{})",
                name.cyan(),
                schema["type"].as_str().unwrap_or("ANY").to_lowercase(),
                if is_required { ", required" } else { "" }
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables take precedence
    let dotenv = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging before anything that may need to report a problem
    setup_logging(cli.is_verbose()).context("Failed to setup logging")?;

    // Load configuration
    let mut config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {:#}", e);
            return Err(e).context("Failed to load configuration");
        }
    };
    config
        .apply_env_overrides(|key| std::env::var(key).ok())
        .context("Invalid environment override")?;
    apply_configured_level(&config, cli.is_verbose());

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let secrets = load_secrets();

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config, &secrets)
        .await
        .context("Application failed")?;

    Ok(())
}

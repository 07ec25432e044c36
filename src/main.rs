//! Courier CLI entry point

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use courier::agent::{AgentLoop, Context, OpenAiClient};
use courier::auth::CredentialStore;
use courier::config::{self, Config};
use courier::gmail;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Courier - a small tool-calling agent with Gmail tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Run a single task through the agent
    Run {
        /// Task description
        #[arg(short, long, default_value = "tell me a joke")]
        task: String,

        /// Only register the calculator and joke tools
        #[arg(long)]
        minimal: bool,
    },

    /// Serve the agent over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },

    /// List the tools available to the agent
    Tools,

    /// Authorize read-only Gmail access
    Login,

    /// Remove the stored Gmail token
    Logout,

    /// Show configuration and credential status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let path = config::config_path();
            if path.exists() {
                println!("Config already exists at {:?}", path);
            } else {
                config::save(&Config::default())?;
                println!("{} Wrote {:?}", "✓".green(), path);
            }
        }

        Commands::Run { task, minimal } => {
            let config = config::load()?;
            run_once(&config, &task, minimal).await?;
        }

        Commands::Serve { host, port } => {
            let config = config::load()?;
            run_server(&config, &host, port).await?;
        }

        Commands::Tools => {
            let config = config::load()?;
            let ctx = Context::new(&config)?;
            for def in ctx.tool_runner.definitions() {
                println!("{}  {}", def.name.cyan().bold(), def.description);
            }
        }

        Commands::Login => {
            let config = config::load()?;
            let store = CredentialStore::new(&config.gmail, config.request_timeout())?;
            store.get_valid_credential().await?;
            println!("{} Gmail access authorized", "✓".green());
            println!("  Token saved to {:?}", store.token_path());
        }

        Commands::Logout => {
            let config = config::load()?;
            CredentialStore::new(&config.gmail, config.request_timeout())?.delete()?;
            println!("{} Gmail token removed", "✓".green());
        }

        Commands::Status => {
            let config = config::load()?;
            let store = CredentialStore::new(&config.gmail, config.request_timeout())?;
            println!("Courier status\n");
            println!("Config:        {:?}", config::config_path());
            println!("Model:         {} ({})", config.model, config.api_base);
            println!(
                "API key:       {}",
                if config.resolved_api_key().is_ok() { "✓".green() } else { "not set".red() }
            );
            println!(
                "Gmail tools:   {}",
                if gmail::is_available() { "✓".green() } else { "not built".red() }
            );
            println!(
                "Client secret: {:?} {}",
                store.client_secret_path(),
                if store.client_secret_path().exists() { "✓".green() } else { "missing".red() }
            );
            println!(
                "Gmail token:   {:?} {}",
                store.token_path(),
                if store.has_credential() { "✓".green() } else { "not set (run 'courier login')".yellow() }
            );
        }
    }

    Ok(())
}

async fn run_once(config: &Config, task: &str, minimal: bool) -> Result<()> {
    println!("Loading model...");
    let start = Instant::now();
    let client = OpenAiClient::from_config(config)?;
    let ctx = if minimal { Context::minimal() } else { Context::new(config)? };
    let agent = AgentLoop::new(client, config.max_iterations);
    let load_time = start.elapsed().as_secs_f64();
    println!("Model loaded in {:.2} seconds", load_time);

    println!("Processing task...");
    let start = Instant::now();
    let response = agent.run(task, &ctx).await?;
    let processing_time = start.elapsed().as_secs_f64();

    println!("{} {}", "Result:".green().bold(), response.content);
    println!("Processing time: {:.2} seconds", processing_time);
    println!("Total time: {:.2} seconds", load_time + processing_time);
    Ok(())
}

async fn run_server(config: &Config, host: &str, port: u16) -> Result<()> {
    let client = OpenAiClient::from_config(config)?;
    let ctx = Context::new(config)?;
    if !gmail::is_available() {
        tracing::warn!("Serving without Gmail tools");
    }

    let agent = AgentLoop::new(client, config.max_iterations);
    let state = Arc::new(courier::server::AppState::new(agent, ctx));

    ctrlc::set_handler(|| {
        println!("\nBye!");
        std::process::exit(0);
    })
    .ok();

    courier::server::serve(state, host, port).await?;
    Ok(())
}

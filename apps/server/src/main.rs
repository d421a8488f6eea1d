//! mermagen HTTP server — LLM-powered Mermaid diagram generation.
//!
//! Runs the detect/generate/validate/autofix pipeline behind a small JSON
//! API with an SSE streaming variant.

mod routes;
mod schemas;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;

use mermagen_shared::{load_config, load_config_from};

/// mermagen — generate Mermaid diagrams from natural-language prompts.
#[derive(Parser)]
#[command(
    name = "mermagen-server",
    version,
    about = "HTTP server turning natural-language prompts into Mermaid diagrams.",
    long_about = None,
)]
struct Cli {
    /// Path to a config file (defaults to ~/.mermagen/mermagen.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address override.
    #[arg(long)]
    host: Option<String>,

    /// Bind port override.
    #[arg(long)]
    port: Option<u16>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mermagen=info,tower_http=info",
        1 => "mermagen=debug,tower_http=debug",
        _ => "mermagen=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let state = routes::AppState::from_config(&config).await?;
    let mode = state.deps.mode;
    let app = routes::router(state, &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, mode = mode.as_str(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

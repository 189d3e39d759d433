use std::path::PathBuf;

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "buchi",
    about = "Buchi: share one file, once, gated by a hardware token"
)]
struct Cli {
    /// File to share.
    file: PathBuf,

    /// Config file path (default: discover buchi.{toml,yaml,json}).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen port from the config.
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "buchi starting");

    // Explicit config path is fatal when broken; discovery falls back to
    // defaults.
    let mut config = match &cli.config {
        Some(path) => buchi_config::load_config(path)?,
        None => buchi_config::discover_and_load(),
    };
    if let Some(port) = cli.port {
        config.http_port = port;
    }

    buchi_gateway::run(config, cli.file).await
}

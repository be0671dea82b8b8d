mod cli;
mod core;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(name = "twil", about = "Prometheus exporter for Twilio usage records", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: $XDG_CONFIG_HOME/twil/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Twilio account SID
    #[arg(long, global = true)]
    account: Option<String>,

    /// Basic authorization token forwarded to the API
    #[arg(long, global = true)]
    token: Option<String>,

    /// Port metrics are exposed on, e.g. :2112
    #[arg(long, global = true)]
    port: Option<String>,

    /// Full listen address, e.g. 127.0.0.1:2112 (overrides --port)
    #[arg(long, global = true)]
    listen: Option<String>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve usage metrics over HTTP (default)
    Serve,
    /// Run one collection cycle and print the result
    Scrape {
        /// Print decoded usage records as JSON
        #[arg(short = 'j', long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match &cli.command {
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(cli.config.as_deref())?,
            ConfigAction::Check => cli::config_cmd::check(cli.config.as_deref())?,
        },
        Some(Commands::Scrape { json, pretty }) => {
            let config = load_config(&cli)?;
            let opts = cli::output::OutputOptions::new(*json, *pretty, cli.verbose);
            cli::scrape_cmd::run(config, &opts).await?;
        }
        None | Some(Commands::Serve) => {
            let config = load_config(&cli)?;
            cli::serve_cmd::run(config).await?;
        }
    }

    Ok(())
}

/// Config file, then environment, then flags.
fn load_config(cli: &Cli) -> anyhow::Result<crate::core::config::ExporterConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env();
    config.apply_overrides(&Overrides {
        account: cli.account.clone(),
        token: cli.token.clone(),
        port: cli.port.clone(),
        listen: cli.listen.clone(),
    });
    Ok(config.resolve()?)
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("twil=debug")
        } else {
            EnvFilter::new("twil=info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

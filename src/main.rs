mod cli;
mod dispatcher;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use fluxo::config::AppConfig;

#[tokio::main]
async fn main() {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => dispatcher::dispatch_command(cli.command, &config, cli.json).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        eprintln!("{} {:#}", "✗".red().bold(), err);
        std::process::exit(1);
    }
}

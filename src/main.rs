mod cli;

use clap::Parser;
use deskhost::surface::HeadlessPlatform;
use deskhost::{Config, Controller, Error as DeskhostError, StartupFlags, StateStore};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(deskhost_error) = e.downcast_ref::<DeskhostError>() {
            eprintln!("Error: {}", deskhost_error);
            if let Some(suggestion) = deskhost_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing();

    let config = Config::load(cli.config.as_deref())?;
    let flags = StartupFlags {
        autohide: cli.autohide,
        no_session_restore: cli.no_session_restore,
        dev: cli.dev,
    };

    let state_path = match cli.state_file {
        Some(path) => path,
        None => StateStore::default_path(&config.app_name)?,
    };
    let store = StateStore::open(state_path)?;

    let (platform, events) = HeadlessPlatform::new();

    let mut controller = Controller::builder()
        .config(config)
        .flags(flags)
        .store(store)
        .platform(platform, events)
        .build()?;

    controller.run().await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

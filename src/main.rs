use anyhow::{Context, Result};
use blob_thumbnailer::app::App;
use blob_thumbnailer::event::{parse_events, read_events, StorageEvent};
use blob_thumbnailer::models::Config;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "blob-thumbnailer")]
#[command(about = "Create small, medium and large thumbnails for newly created image blobs")]
struct CliArgs {
    /// Event JSON file holding one event or an array of events. Reads stdin
    /// when omitted or "-".
    #[arg(value_name = "EVENT")]
    event: Option<PathBuf>,

    /// Use this file as the blob content instead of reading it from storage.
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Keep thumbnails in memory instead of uploading them. Nothing is read
    /// from storage either, so this needs --input.
    #[arg(long, requires = "input")]
    dry_run: bool,
}

fn load_events(source: Option<&Path>) -> Result<Vec<StorageEvent>> {
    match source {
        Some(path) if path != Path::new("-") => read_events(path)
            .with_context(|| format!("Failed to read events from {}", path.display())),
        _ => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read events from stdin")?;
            Ok(parse_events(&json)?)
        }
    }
}

/// A dry run has no storage to read the source from.
fn ensure_dry_run_has_input(config: &Config, input: Option<&Path>) -> Result<()> {
    if config.dry_run && input.is_none() {
        anyhow::bail!("Dry run (--dry-run or DRY_RUN) needs the blob content passed with --input");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blob_thumbnailer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    Config::load_env_file()?;
    let config = Config::from_lookup(|key| match key {
        "DRY_RUN" if args.dry_run => Some("true".to_string()),
        _ => std::env::var(key).ok(),
    })
    .context("Invalid configuration")?;
    ensure_dry_run_has_input(&config, args.input.as_deref())?;

    let events = load_events(args.event.as_deref())?;
    let input = match &args.input {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("Failed to read input blob {}", path.display()))?,
        ),
        None => None,
    };

    let app = match App::new(&config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize thumbnailer: {}", e);
            std::process::exit(1);
        }
    };

    info!("Handling {} event(s)", events.len());

    let mut failures = 0;
    for event in &events {
        match app.handle_event_with_input(event, input.clone()).await {
            Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
            Err(_) => failures += 1,
        }
    }

    if failures > 0 {
        error!("{} of {} event(s) failed", failures, events.len());
        std::process::exit(1);
    }

    info!("All events handled");
    Ok(())
}

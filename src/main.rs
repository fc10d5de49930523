mod cli;
mod views;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use jaye::prelude::*;
use jaye::search::{resolve, INVALID_QUERY};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.api_endpoint = endpoint;
        config.normalize()?;
    }
    tracing::debug!(endpoint = %config.api_endpoint, service = %config.service, "using backend");
    let jaye = Jaye::connect(config)?;

    match cli.command {
        Commands::List => {
            let library = jaye.library().await?;
            views::print_library(&library);
        }
        Commands::Search { query } => {
            let videos = resolve(jaye.api(), &query).await.context(INVALID_QUERY)?;
            views::print_candidates(&videos, videos.first().map(|v| v.id.as_str()));
        }
        Commands::Download { query, pick } => {
            let videos = resolve(jaye.api(), &query).await.context(INVALID_QUERY)?;
            let n = pick.unwrap_or(1);
            let chosen = n
                .checked_sub(1)
                .and_then(|i| videos.get(i))
                .ok_or_else(|| anyhow!("no candidate #{n} ({} found)", videos.len()))?;
            println!("downloading {} ({})...", chosen.title, chosen.id);
            let video = jaye.api().video(&chosen.id).await
                .with_context(|| format!("backend failed to download {}", chosen.id))?;
            println!("downloaded: {} ({})", video.title, video.id);
        }
        Commands::Urls { id } => {
            let id = id_or_url(&id);
            println!("video: {}", jaye.api().video_url(&id));
            println!("audio: {}", jaye.api().audio_url(&id));
        }
        Commands::Save { id, audio, output } => {
            let id = id_or_url(&id);
            let kind = if audio { MediaKind::Audio } else { MediaKind::Video };
            let path = jaye.save_media(&id, kind, Path::new("."), output).await?;
            println!("saved {}", path.display());
        }
        Commands::Open { path } => views::open(&jaye, Route::resolve(&path)).await?,
    }
    Ok(())
}

// Accept either a pasted URL or a bare id.
fn id_or_url(input: &str) -> String {
    let id = id_from_url(input);
    if id.is_empty() { input.trim().to_string() } else { id }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "jaye=debug" } else { "jaye=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

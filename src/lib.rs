pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod library;
pub mod media;
pub mod routes;
pub mod search;
pub mod transport;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::{id_from_url, ApiClient};
    pub use crate::config::ClientConfig;
    pub use crate::dashboard::Dashboard;
    pub use crate::error::ApiError;
    pub use crate::library::VideoLibrary;
    pub use crate::media::{MediaKind, MediaSaver};
    pub use crate::routes::Route;
    pub use crate::search::{SearchPipeline, SearchView};
    pub use crate::types::VideoInfo;
    pub use crate::Jaye;
}

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::dashboard::Dashboard;
use crate::library::VideoLibrary;
use crate::media::{file_name, MediaKind, MediaSaver};
use crate::search::SearchPipeline;
use crate::types::VideoInfo;

/// Async library entry point. Owns the configuration and a shared API client.
pub struct Jaye {
    config: ClientConfig,
    api: Arc<ApiClient>,
}

impl Jaye {
    /// Build a client over HTTP. Does not contact the backend.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(&config).context("creating api client")?;
        Ok(Self { config, api: Arc::new(api) })
    }

    /// Build from an already constructed client (custom transports, tests).
    pub fn with_client(config: ClientConfig, api: ApiClient) -> Self {
        Self { config, api: Arc::new(api) }
    }

    pub fn config(&self) -> &ClientConfig { &self.config }
    pub fn api(&self) -> &Arc<ApiClient> { &self.api }

    /// The video list view's collection, fetched once.
    pub async fn library(&self) -> Result<VideoLibrary> {
        VideoLibrary::load(&self.api).await.context("loading video list")
    }

    /// Start a search pipeline with the configured debounce window.
    pub fn search(&self, downloaded: mpsc::UnboundedSender<VideoInfo>) -> SearchPipeline {
        SearchPipeline::spawn(self.api.clone(), self.config.debounce(), downloaded)
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        Dashboard::open(self.api.clone(), self.config.debounce()).await.context("opening dashboard")
    }

    /// Resolve metadata for `id` and save its media file under `dir`, or at
    /// `output` when given. Returns the path written.
    pub async fn save_media(&self, id: &str, kind: MediaKind, dir: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
        let dest = match output {
            Some(p) => p,
            None => {
                let info = self.api.info(id).await.with_context(|| format!("looking up {id}"))?;
                dir.join(file_name(&info.title, kind))
            }
        };
        let saver = MediaSaver::new(&self.config)?;
        saver.save(&kind.link(&self.api, id), &dest).await?;
        Ok(dest)
    }
}

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::library::VideoLibrary;
use crate::search::SearchPipeline;
use crate::types::VideoInfo;

/// Search pipeline and video library side by side. Videos the pipeline
/// downloads come back over a channel and are appended here, on the owner's turn.
pub struct Dashboard {
    search: SearchPipeline,
    library: VideoLibrary,
    downloads: mpsc::UnboundedReceiver<VideoInfo>,
}

impl Dashboard {
    /// Load the video list, then start the pipeline.
    pub async fn open(api: Arc<ApiClient>, debounce: Duration) -> Result<Self, ApiError> {
        let library = VideoLibrary::load(&api).await?;
        Ok(Self::with_library(api, debounce, library))
    }

    pub fn with_library(api: Arc<ApiClient>, debounce: Duration, library: VideoLibrary) -> Self {
        let (tx, downloads) = mpsc::unbounded_channel();
        let search = SearchPipeline::spawn(api, debounce, tx);
        Self { search, library, downloads }
    }

    pub fn search(&self) -> &SearchPipeline { &self.search }
    pub fn library(&self) -> &VideoLibrary { &self.library }

    /// Wait for the next finished download and append it. `None` once the pipeline is gone.
    pub async fn next_download(&mut self) -> Option<VideoInfo> {
        let video = self.downloads.recv().await?;
        self.library.append(video.clone());
        Some(video)
    }

    /// Append every download that has already arrived. Returns how many.
    pub fn drain_downloads(&mut self) -> usize {
        let mut n = 0;
        while let Ok(video) = self.downloads.try_recv() {
            self.library.append(video);
            n += 1;
        }
        n
    }

    pub async fn close(self) {
        self.search.shutdown().await;
    }
}

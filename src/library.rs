use crate::api::ApiClient;
use crate::error::ApiError;
use crate::types::VideoInfo;

/// The known videos, in fetch order followed by append order.
#[derive(Debug, Clone, Default)]
pub struct VideoLibrary {
    videos: Vec<VideoInfo>,
}

impl VideoLibrary {
    /// Fetch the full list once.
    pub async fn load(api: &ApiClient) -> Result<Self, ApiError> {
        let videos = api.list().await?;
        tracing::debug!(count = videos.len(), "video list loaded");
        Ok(Self { videos })
    }

    /// Re-fetch; the held collection is replaced only when the count changed.
    /// Returns whether it was replaced.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<bool, ApiError> {
        let videos = api.list().await?;
        if videos.len() == self.videos.len() {
            return Ok(false);
        }
        self.videos = videos;
        Ok(true)
    }

    pub fn append(&mut self, video: VideoInfo) {
        self.videos.push(video);
    }

    pub fn videos(&self) -> &[VideoInfo] { &self.videos }
    pub fn len(&self) -> usize { self.videos.len() }
    pub fn is_empty(&self) -> bool { self.videos.is_empty() }

    pub fn get(&self, id: &str) -> Option<&VideoInfo> {
        self.videos.iter().find(|v| v.id == id)
    }
}

impl From<Vec<VideoInfo>> for VideoLibrary {
    fn from(videos: Vec<VideoInfo>) -> Self { Self { videos } }
}

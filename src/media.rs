use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::api::ApiClient;
use crate::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    /// Direct link for `id` on the backend.
    pub fn link(self, api: &ApiClient, id: &str) -> String {
        match self {
            MediaKind::Video => api.video_url(id),
            MediaKind::Audio => api.audio_url(id),
        }
    }
}

/// `<title>.<ext>`, with path separators and control characters replaced.
pub fn file_name(title: &str, kind: MediaKind) -> String {
    let clean: String = title
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let clean = clean.trim().trim_start_matches('.');
    let stem = if clean.is_empty() { "untitled" } else { clean };
    format!("{stem}.{}", kind.extension())
}

/// Streams direct media links to disk. Not routed through the API interceptor:
/// the backend only serves the file when JSON is not requested.
pub struct MediaSaver {
    client: reqwest::Client,
}

impl MediaSaver {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }

    /// Download `url` into `dest`. Data goes to `<dest>.part` first and is renamed
    /// on success; the partial file is removed on failure. Returns bytes written.
    pub async fn save(&self, url: &str, dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await
                .with_context(|| format!("creating output dir: {}", parent.display()))?;
        }
        let part = part_path(dest);
        match self.stream_to(url, &part).await {
            Ok(written) => {
                tokio::fs::rename(&part, dest).await
                    .with_context(|| format!("moving {} into place", part.display()))?;
                tracing::info!(url, path = %dest.display(), bytes = written, "media saved");
                Ok(written)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&part).await {
                    tracing::debug!("no partial file to remove at {}: {rm}", part.display());
                }
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64> {
        let resp = self.client.get(url).send().await
            .with_context(|| format!("request to {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{url} answered {status}"));
        }
        let mut file = tokio::fs::File::create(part).await
            .with_context(|| format!("creating {}", part.display()))?;
        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("reading body of {url}"))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut s: OsString = dest.as_os_str().to_owned();
    s.push(".part");
    PathBuf::from(s)
}

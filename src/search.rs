//! Debounced search-and-preview pipeline.
//!
//! Input events restart a debounce timer; when it fires the query is dispatched
//! with the next sequence number and resolved on a child task (ids, then all
//! metadata concurrently). A dispatch aborts the previous child, and results
//! carrying any sequence number other than the latest are dropped, so only the
//! latest query can ever reach the view.

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::types::VideoInfo;

pub const INVALID_QUERY: &str = "Invalid YouTube Video or Query";
pub const DOWNLOAD_FAILED: &str = "Download failed";

/// What the search view currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchView {
    pub query: String,
    pub candidates: Vec<VideoInfo>,
    pub selected: Option<String>,
    pub error: Option<&'static str>,
    /// A dispatched query has not produced its outcome yet.
    pub resolving: bool,
    /// Sequence number of the last dispatched query.
    pub generation: u64,
}

impl SearchView {
    pub fn selected_video(&self) -> Option<&VideoInfo> {
        let id = self.selected.as_deref()?;
        self.candidates.iter().find(|v| v.id == id)
    }
}

/// Resolve a query to metadata: ids first, then every `info` call concurrently.
/// Fails as soon as any call fails.
pub async fn resolve(api: &ApiClient, query: &str) -> Result<Vec<VideoInfo>, ApiError> {
    let ids = api.search(query).await?;
    try_join_all(ids.iter().map(|id| api.info(id))).await
}

enum Command {
    Input(String),
    Select(String),
    Download(Option<String>),
}

struct Resolved {
    seq: u64,
    outcome: Result<Vec<VideoInfo>, ApiError>,
}

struct Download {
    id: String,
    /// Sequence number the view had when the download was requested.
    seq: u64,
    outcome: Result<VideoInfo, ApiError>,
}

/// Handle to a running pipeline. Dropping it closes the command channel, which
/// stops the driver.
pub struct SearchPipeline {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SearchView>,
    driver: JoinHandle<()>,
}

impl SearchPipeline {
    /// Start the driver task. Videos fetched through [`download`](Self::download)
    /// are sent on `downloaded`.
    pub fn spawn(api: Arc<ApiClient>, debounce: Duration, downloaded: mpsc::UnboundedSender<VideoInfo>) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(SearchView::default());
        let driver = Driver {
            api,
            debounce,
            view: view_tx,
            downloaded,
            events,
            pending: None,
            seq: 0,
            in_flight: None,
            downloads: JoinSet::new(),
        };
        let driver = tokio::spawn(driver.run(commands_rx, events_rx));
        Self { commands, view, driver }
    }

    /// The query field changed.
    pub fn input(&self, query: impl Into<String>) {
        let _ = self.commands.send(Command::Input(query.into()));
    }

    /// Make `id` the selected candidate. Ignored if it is not displayed.
    pub fn select(&self, id: impl Into<String>) {
        let _ = self.commands.send(Command::Select(id.into()));
    }

    pub fn download(&self, id: impl Into<String>) {
        let _ = self.commands.send(Command::Download(Some(id.into())));
    }

    /// Download whatever is selected when the command is processed.
    pub fn download_selected(&self) {
        let _ = self.commands.send(Command::Download(None));
    }

    pub fn snapshot(&self) -> SearchView { self.view.borrow().clone() }

    pub fn watch(&self) -> watch::Receiver<SearchView> { self.view.clone() }

    /// Stop the driver and any in-flight resolution. Downloads already
    /// requested are awaited, and the successful ones are still emitted.
    pub async fn shutdown(self) {
        let Self { commands, driver, .. } = self;
        drop(commands);
        let _ = driver.await;
    }
}

struct Driver {
    api: Arc<ApiClient>,
    debounce: Duration,
    view: watch::Sender<SearchView>,
    downloaded: mpsc::UnboundedSender<VideoInfo>,
    events: mpsc::UnboundedSender<Resolved>,
    pending: Option<(String, Instant)>,
    seq: u64,
    in_flight: Option<JoinHandle<()>>,
    downloads: JoinSet<Download>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, mut events: mpsc::UnboundedReceiver<Resolved>) {
        loop {
            let deadline = self.pending.as_ref().map(|(_, at)| *at);
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                Some(resolved) = events.recv() => self.apply(resolved),
                Some(joined) = self.downloads.join_next(), if !self.downloads.is_empty() => {
                    self.finish_download(joined);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((query, _)) = self.pending.take() {
                        self.dispatch(query);
                    }
                }
            }
        }
        self.cancel_in_flight();
        while let Some(joined) = self.downloads.join_next().await {
            self.finish_download(joined);
        }
        debug!("search pipeline stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Input(query) => {
                self.view.send_modify(|v| v.query = query.clone());
                self.pending = Some((query, Instant::now() + self.debounce));
            }
            Command::Select(id) => {
                self.view.send_if_modified(|v| {
                    if v.selected.as_deref() != Some(id.as_str()) && v.candidates.iter().any(|c| c.id == id) {
                        v.selected = Some(id);
                        true
                    } else {
                        false
                    }
                });
            }
            Command::Download(id) => {
                let Some(id) = id.or_else(|| self.view.borrow().selected.clone()) else {
                    debug!("download requested with nothing selected");
                    return;
                };
                self.start_download(id);
            }
        }
    }

    fn dispatch(&mut self, query: String) {
        self.cancel_in_flight();
        self.seq += 1;
        let seq = self.seq;
        debug!(seq, query = %query, "dispatching query");
        self.view.send_modify(|v| {
            v.resolving = true;
            v.generation = seq;
        });
        let api = self.api.clone();
        let events = self.events.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = resolve(&api, &query).await;
            let _ = events.send(Resolved { seq, outcome });
        }));
    }

    fn apply(&mut self, Resolved { seq, outcome }: Resolved) {
        if seq != self.seq {
            debug!(seq, latest = self.seq, "discarding superseded result");
            return;
        }
        self.in_flight = None;
        match outcome {
            Ok(videos) => {
                debug!(seq, count = videos.len(), "query resolved");
                self.view.send_modify(|v| {
                    v.selected = videos.first().map(|f| f.id.clone());
                    v.candidates = videos;
                    v.error = None;
                    v.resolving = false;
                });
            }
            Err(e) => {
                warn!(seq, "query failed: {e}");
                self.view.send_modify(|v| {
                    v.candidates.clear();
                    v.selected = None;
                    v.error = Some(INVALID_QUERY);
                    v.resolving = false;
                });
            }
        }
    }

    // The failure indicator only goes on the cleared form the download left
    // behind; once another query has been dispatched it belongs to that query.
    fn finish_download(&mut self, joined: Result<Download, JoinError>) {
        let Download { id, seq, outcome } = match joined {
            Ok(download) => download,
            Err(e) => {
                warn!("download task ended abnormally: {e}");
                return;
            }
        };
        match outcome {
            Ok(video) => {
                info!(id = %video.id, title = %video.title, "download finished");
                let _ = self.downloaded.send(video);
            }
            Err(e) => {
                warn!(id = %id, "download failed: {e}");
                if seq == self.seq {
                    self.view.send_modify(|v| v.error = Some(DOWNLOAD_FAILED));
                }
            }
        }
    }

    // Clears the form, which also supersedes whatever query was pending or in flight.
    fn start_download(&mut self, id: String) {
        self.pending = None;
        self.cancel_in_flight();
        self.seq += 1;
        let seq = self.seq;
        self.view.send_modify(|v| {
            v.query.clear();
            v.candidates.clear();
            v.selected = None;
            v.error = None;
            v.resolving = false;
            v.generation = seq;
        });
        info!(id = %id, "requesting download");
        let api = self.api.clone();
        self.downloads.spawn(async move {
            let outcome = api.video(&id).await;
            Download { id, seq, outcome }
        });
    }

    fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::transport::mock::{Reply, ScriptedTransport};
    use serde_json::json;

    const BASE: &str = "http://api.test";
    const DEBOUNCE: Duration = Duration::from_millis(200);

    fn video(id: &str) -> serde_json::Value {
        json!({ "id": id, "title": format!("title {id}"), "url": "", "thumbnail": "", "service": "youtube" })
    }

    fn search_url(q: &str) -> String { format!("{BASE}/search?service=youtube&q={q}") }
    fn info_url(id: &str) -> String { format!("{BASE}/info?service=youtube&id={id}") }

    fn pipeline(t: &ScriptedTransport) -> (SearchPipeline, mpsc::UnboundedReceiver<VideoInfo>) {
        let cfg = ClientConfig { api_endpoint: BASE.into(), ..Default::default() };
        let api = Arc::new(ApiClient::with_transport(&cfg, t.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        (SearchPipeline::spawn(api, DEBOUNCE, tx), rx)
    }

    async fn settled(p: &SearchPipeline, generation: u64) -> SearchView {
        let mut rx = p.watch();
        let view = rx.wait_for(|v| v.generation >= generation && !v.resolving).await.unwrap();
        view.clone()
    }

    fn ids(view: &SearchView) -> Vec<&str> { view.candidates.iter().map(|v| v.id.as_str()).collect() }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_keystroke_is_resolved() {
        let t = ScriptedTransport::new();
        t.on(&search_url("cats"), Reply::ok(json!(["aaaaaaaaaaa"])));
        t.on(&info_url("aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")));
        let (p, _rx) = pipeline(&t);

        for q in ["c", "ca", "cat", "cats"] {
            p.input(q);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let view = settled(&p, 1).await;

        assert_eq!(view.generation, 1);
        assert_eq!(ids(&view), vec!["aaaaaaaaaaa"]);
        assert_eq!(t.urls(), vec![search_url("cats"), info_url("aaaaaaaaaaa")]);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_dispatched_before_the_window_closes() {
        let t = ScriptedTransport::new();
        let (p, _rx) = pipeline(&t);
        p.input("dogs");
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(t.requests().is_empty());
        assert_eq!(p.snapshot().query, "dogs");
        assert_eq!(p.snapshot().generation, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn later_query_wins_over_slower_earlier_one() {
        let t = ScriptedTransport::new();
        t.on(&search_url("slow"), Reply::ok(json!(["sssssssssss"])).after(1_000));
        t.on(&info_url("sssssssssss"), Reply::ok(video("sssssssssss")));
        t.on(&search_url("fast"), Reply::ok(json!(["fffffffffff"])).after(10));
        t.on(&info_url("fffffffffff"), Reply::ok(video("fffffffffff")));
        let (p, _rx) = pipeline(&t);

        let mut rx = p.watch();
        let recorder = tokio::spawn(async move {
            let mut shown = Vec::new();
            while rx.changed().await.is_ok() {
                shown.extend(rx.borrow().candidates.iter().map(|v| v.id.clone()));
            }
            shown
        });

        p.input("slow");
        // past the debounce window, so "slow" is in flight
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(p.snapshot().generation, 1);
        p.input("fast");

        let view = settled(&p, 2).await;
        assert_eq!(ids(&view), vec!["fffffffffff"]);

        // give the superseded search all the time it needs
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ids(&p.snapshot()), vec!["fffffffffff"]);
        assert!(!t.urls().contains(&info_url("sssssssssss")));

        p.shutdown().await;
        let shown = recorder.await.unwrap();
        assert!(!shown.iter().any(|id| id == "sssssssssss"));
    }

    #[tokio::test(start_paused = true)]
    async fn metadata_is_fetched_concurrently_in_id_order() {
        let t = ScriptedTransport::new();
        t.on(&search_url("trio"), Reply::ok(json!(["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"])));
        t.on(&info_url("aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")).after(300));
        t.on(&info_url("bbbbbbbbbbb"), Reply::ok(video("bbbbbbbbbbb")).after(100));
        t.on(&info_url("ccccccccccc"), Reply::ok(video("ccccccccccc")).after(200));
        let (p, _rx) = pipeline(&t);

        let start = Instant::now();
        p.input("trio");
        let view = settled(&p, 1).await;
        let elapsed = start.elapsed();

        assert_eq!(ids(&view), vec!["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]);
        assert_eq!(view.selected.as_deref(), Some("aaaaaaaaaaa"));
        assert_eq!(view.selected_video().map(|v| v.title.as_str()), Some("title aaaaaaaaaaa"));
        // debounce + slowest info, not the sum of all three
        assert!(elapsed < DEBOUNCE + Duration::from_millis(400), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn pasted_url_skips_remote_search() {
        let t = ScriptedTransport::new();
        t.on(&info_url("dQw4w9WgXcQ"), Reply::ok(video("dQw4w9WgXcQ")));
        let (p, _rx) = pipeline(&t);

        p.input("https://youtu.be/dQw4w9WgXcQ");
        let view = settled(&p, 1).await;
        assert_eq!(ids(&view), vec!["dQw4w9WgXcQ"]);
        assert_eq!(t.urls(), vec![info_url("dQw4w9WgXcQ")]);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failed_lookup_fails_the_whole_query() {
        let t = ScriptedTransport::new();
        t.on(&search_url("mixed"), Reply::ok(json!(["aaaaaaaaaaa", "bbbbbbbbbbb"])));
        t.on(&info_url("aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")));
        t.on(&info_url("bbbbbbbbbbb"), Reply::status(500, "failed to retrieve video info"));
        t.on(&search_url("good"), Reply::ok(json!(["aaaaaaaaaaa"])));
        let (p, _rx) = pipeline(&t);

        p.input("mixed");
        let view = settled(&p, 1).await;
        assert_eq!(view.error, Some(INVALID_QUERY));
        assert!(view.candidates.is_empty());
        assert!(view.selected.is_none());

        p.input("good");
        let view = settled(&p, 2).await;
        assert_eq!(view.error, None);
        assert_eq!(ids(&view), vec!["aaaaaaaaaaa"]);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_the_query_empties_the_list() {
        let t = ScriptedTransport::new();
        t.on(&search_url("one"), Reply::ok(json!(["aaaaaaaaaaa"])));
        t.on(&info_url("aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")));
        t.on(&search_url("none"), Reply::ok(json!(null)));
        let (p, _rx) = pipeline(&t);

        p.input("one");
        assert_eq!(settled(&p, 1).await.candidates.len(), 1);

        p.input("");
        let view = settled(&p, 2).await;
        assert!(view.candidates.is_empty());
        assert!(view.selected.is_none());
        assert_eq!(view.error, None);

        p.input("none");
        let view = settled(&p, 3).await;
        assert!(view.candidates.is_empty());
        assert_eq!(view.error, None);
        assert_eq!(t.urls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn select_only_accepts_displayed_candidates() {
        let t = ScriptedTransport::new();
        t.on(&search_url("two"), Reply::ok(json!(["aaaaaaaaaaa", "bbbbbbbbbbb"])));
        t.on(&info_url("aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")));
        t.on(&info_url("bbbbbbbbbbb"), Reply::ok(video("bbbbbbbbbbb")));
        let (p, _rx) = pipeline(&t);

        p.input("two");
        settled(&p, 1).await;
        let mut rx = p.watch();
        p.select("zzzzzzzzzzz");
        p.select("bbbbbbbbbbb");
        let view = rx.wait_for(|v| v.selected.as_deref() == Some("bbbbbbbbbbb")).await.unwrap().clone();
        assert_eq!(view.candidates.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn download_clears_form_and_emits_video() {
        let t = ScriptedTransport::new();
        t.on(&search_url("song"), Reply::ok(json!(["aaaaaaaaaaa", "bbbbbbbbbbb"])));
        t.on(&info_url("aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")));
        t.on(&info_url("bbbbbbbbbbb"), Reply::ok(video("bbbbbbbbbbb")));
        t.on(&format!("{BASE}/video?service=youtube&id=aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")).after(500));
        let (p, mut downloads) = pipeline(&t);

        p.input("song");
        settled(&p, 1).await;
        p.download_selected();

        let got = downloads.recv().await.unwrap();
        assert_eq!(got.id, "aaaaaaaaaaa");
        let view = p.snapshot();
        assert!(view.query.is_empty());
        assert!(view.candidates.is_empty());
        assert!(view.selected.is_none());
        assert_eq!(view.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn download_supersedes_in_flight_query() {
        let t = ScriptedTransport::new();
        t.on(&search_url("late"), Reply::ok(json!(["lllllllllll"])).after(1_000));
        t.on(&info_url("lllllllllll"), Reply::ok(video("lllllllllll")));
        t.on(&format!("{BASE}/video?service=youtube&id=dQw4w9WgXcQ"), Reply::ok(video("dQw4w9WgXcQ")));
        let (p, mut downloads) = pipeline(&t);

        p.input("late");
        tokio::time::sleep(Duration::from_millis(300)).await;
        p.download("dQw4w9WgXcQ");
        assert_eq!(downloads.recv().await.unwrap().id, "dQw4w9WgXcQ");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(p.snapshot().candidates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_download_emits_nothing() {
        let t = ScriptedTransport::new();
        t.on(&format!("{BASE}/video?service=youtube&id=dQw4w9WgXcQ"), Reply::status(500, "failed to retrieve video file"));
        let (p, mut downloads) = pipeline(&t);
        let mut rx = p.watch();

        p.download("dQw4w9WgXcQ");
        let view = rx.wait_for(|v| v.error.is_some()).await.unwrap().clone();
        assert_eq!(view.error, Some(DOWNLOAD_FAILED));
        assert!(downloads.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn late_download_failure_leaves_newer_results_alone() {
        let t = ScriptedTransport::new();
        t.on(&format!("{BASE}/video?service=youtube&id=dQw4w9WgXcQ"),
            Reply::status(500, "failed to retrieve video file").after(1_000));
        t.on(&search_url("cats"), Reply::ok(json!(["aaaaaaaaaaa"])));
        t.on(&info_url("aaaaaaaaaaa"), Reply::ok(video("aaaaaaaaaaa")));
        let (p, mut downloads) = pipeline(&t);

        p.download("dQw4w9WgXcQ");
        p.input("cats");
        let view = settled(&p, 2).await;
        assert_eq!(ids(&view), vec!["aaaaaaaaaaa"]);

        // well past the failing download
        tokio::time::sleep(Duration::from_secs(2)).await;
        let view = p.snapshot();
        assert_eq!(ids(&view), vec!["aaaaaaaaaaa"]);
        assert_eq!(view.error, None);
        assert!(downloads.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_still_delivers_requested_downloads() {
        let t = ScriptedTransport::new();
        t.on(&format!("{BASE}/video?service=youtube&id=dQw4w9WgXcQ"), Reply::ok(video("dQw4w9WgXcQ")).after(500));
        let (p, mut downloads) = pipeline(&t);

        p.download("dQw4w9WgXcQ");
        p.shutdown().await;

        assert_eq!(downloads.recv().await.map(|v| v.id).as_deref(), Some("dQw4w9WgXcQ"));
        // driver gone, channel closed
        assert!(downloads.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn download_without_selection_is_ignored() {
        let t = ScriptedTransport::new();
        let (p, mut downloads) = pipeline(&t);
        p.download_selected();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(t.requests().is_empty());
        assert!(downloads.try_recv().is_err());
    }
}

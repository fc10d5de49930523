use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use jaye::prelude::*;

pub fn print_library(library: &VideoLibrary) {
    if library.is_empty() {
        println!("no videos yet");
        return;
    }
    for (i, v) in library.videos().iter().enumerate() {
        println!("{:>3}. {}  [{}]  {}", i + 1, v.title, v.id, v.url);
    }
}

pub fn print_candidates(videos: &[VideoInfo], selected: Option<&str>) {
    if videos.is_empty() {
        println!("no matches");
        return;
    }
    for (i, v) in videos.iter().enumerate() {
        let mark = if Some(v.id.as_str()) == selected { '*' } else { ' ' };
        println!("{mark}{:>2}. {}  [{}]", i + 1, v.title, v.id);
    }
}

pub async fn open(jaye: &Jaye, route: Route) -> Result<()> {
    tracing::debug!(%route, "opening view");
    match route {
        Route::Videos => {
            print_library(&jaye.library().await?);
            Ok(())
        }
        Route::Dashboard => {
            let dash = jaye.dashboard().await?;
            print_library(dash.library());
            interact(dash, true).await
        }
        Route::Download => {
            let dash = Dashboard::with_library(jaye.api().clone(), jaye.config().debounce(), VideoLibrary::default());
            interact(dash, false).await
        }
    }
}

enum Step {
    Line(Option<String>),
    View,
    Downloaded(Option<VideoInfo>),
}

// Lines from stdin drive the query field; `:`-prefixed lines are commands.
async fn interact(mut dash: Dashboard, show_library: bool) -> Result<()> {
    println!("type to search  |  :N select  |  :get [N] download  |  :list  |  :quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = dash.search().watch();
    let mut last_shown: Option<(u64, Option<String>, Option<&'static str>)> = None;

    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Line(line?),
            changed = view.changed() => {
                if changed.is_err() { break; }
                Step::View
            }
            video = dash.next_download() => Step::Downloaded(video),
        };

        match step {
            Step::Line(None) => break,
            Step::Line(Some(line)) => {
                if !command(&dash, &line, show_library) {
                    break;
                }
            }
            Step::View => {
                let v = view.borrow_and_update().clone();
                let key = (v.generation, v.selected.clone(), v.error);
                if v.resolving || last_shown.as_ref() == Some(&key) {
                    continue;
                }
                last_shown = Some(key);
                if let Some(err) = v.error {
                    println!("! {err}");
                } else if !v.query.is_empty() {
                    print_candidates(&v.candidates, v.selected.as_deref());
                }
            }
            Step::Downloaded(Some(video)) => {
                println!("downloaded: {} ({})", video.title, video.id);
                if show_library {
                    println!("{} videos in library", dash.library().len());
                }
            }
            Step::Downloaded(None) => break,
        }
    }
    dash.close().await;
    Ok(())
}

/// Returns false when the session should end.
fn command(dash: &Dashboard, line: &str, show_library: bool) -> bool {
    let search = dash.search();
    let trimmed = line.trim();
    let Some(cmd) = trimmed.strip_prefix(':') else {
        search.input(line);
        return true;
    };
    let mut parts = cmd.split_whitespace();
    match parts.next() {
        Some("q") | Some("quit") => return false,
        Some("list") if show_library => print_library(dash.library()),
        Some("get") => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) => match nth_candidate(search, n) {
                Some(id) => search.download(id),
                None => println!("no candidate #{n}"),
            },
            None => search.download_selected(),
        },
        Some(n) => match n.parse::<usize>().ok().and_then(|n| nth_candidate(search, n)) {
            Some(id) => search.select(id),
            None => println!("unknown command: {trimmed}"),
        },
        None => {}
    }
    true
}

fn nth_candidate(search: &SearchPipeline, n: usize) -> Option<String> {
    let view = search.snapshot();
    n.checked_sub(1).and_then(|i| view.candidates.get(i)).map(|v| v.id.clone())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line front end for a jaye backend
#[derive(Parser)]
#[command(name = "jaye")]
#[command(about = "Search, preview and download videos through a jaye backend", long_about = None)]
pub struct Cli {
    /// Config file (TOML). Defaults to the per-user config file if present
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(short, long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all videos known to the backend
    List,
    /// Resolve a query or pasted URL into candidates
    Search {
        /// Free text, a video URL or a bare id
        query: String,
    },
    /// Resolve a query and have the backend download one candidate
    Download {
        query: String,
        /// 1-based candidate to download instead of the first
        #[arg(short, long)]
        pick: Option<usize>,
    },
    /// Print the direct video and audio links for an id or URL
    Urls {
        id: String,
    },
    /// Save the media file for an id or URL to disk
    Save {
        id: String,
        /// Save the audio track instead of the video
        #[arg(long)]
        audio: bool,
        /// Output file. Defaults to `<title>.mp4` / `<title>.mp3` in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Open an interactive view by route: `/`, `/videos` or `/download`
    Open {
        #[arg(default_value = "/")]
        path: String,
    },
}

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Map definition (.json)
    pub config: PathBuf,
    /// Marker payload (.json); omit when using --api
    pub markers: Option<PathBuf>,
    /// Page the map lives on; scopes stored state
    #[arg(long, default_value = "Map")]
    pub page: String,
    /// MediaWiki api.php endpoint to fetch markers from
    #[arg(long)]
    pub api: Option<String>,
    /// Page revision to pin API requests to
    #[arg(long)]
    pub revision: Option<u64>,
    /// Page address, e.g. with a `marker` parameter to focus
    #[arg(long)]
    pub link: Option<String>,
    /// File keeping backgrounds and collected markers between runs
    #[arg(long)]
    pub storage: Option<PathBuf>,
    /// Background to select
    #[arg(long)]
    pub background: Option<usize>,
    /// Layers or groups to switch off
    #[arg(long = "hide")]
    pub hide: Vec<String>,
    /// Layers or groups to switch on
    #[arg(long = "show")]
    pub show: Vec<String>,
    /// Markers to toggle collected/dismissed
    #[arg(long = "toggle")]
    pub toggle: Vec<String>,
    /// Print search results instead of the visible markers
    #[arg(long)]
    pub search: Option<String>,
}

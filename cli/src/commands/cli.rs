use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use prospector_core::api::TaskKind;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Classify,
    CrawlOnly,
}

impl From<KindArg> for TaskKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Classify => TaskKind::Classify,
            KindArg::CrawlOnly => TaskKind::CrawlOnly,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "prospector", version, about = "Crawl websites and classify target customers")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file. Defaults to ~/.prospector/config.toml, then ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ServeArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// One URL per line; blank lines and `#` comments are skipped.
    #[arg(long)]
    pub urls_file: PathBuf,

    #[arg(long, value_enum, default_value_t = KindArg::Classify)]
    pub kind: KindArg,

    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Classification prompt template; the built-in template is used when absent.
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Export path. Defaults to prospector-results-<date>.json in the current directory.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server.
    Serve(ServeArgs),
    /// Process a URL list in-process and write a JSON export.
    Run(RunArgs),
}

use clap::{Parser, Subcommand};

/// sitegraph cli
#[derive(Parser)]
#[command(name = "sitegraph")]
#[command(about = "A single-domain web crawler with contact extraction and PageRank scoring")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl a domain and write the extraction artifacts
    Crawl {
        /// The starting URL to begin crawling from
        start_url: String,

        /// max pages per path family
        #[arg(
            long,
            default_value = "1000",
            help = "Maximum pages stored per path family"
        )]
        max_per_path: usize,

        /// max distinct path families
        #[arg(
            long,
            default_value = "1000",
            help = "Maximum number of distinct path families"
        )]
        max_path_types: usize,

        /// artifact output dir
        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory to write crawl artifacts into"
        )]
        output: String,

        /// optional config file
        #[arg(short, long, help = "TOML configuration file")]
        config: Option<String>,
    },

    /// Crawl a domain, then score pages with PageRank
    Analyze {
        /// The starting URL to begin crawling from
        start_url: String,

        /// max pages per path family
        #[arg(
            long,
            default_value = "1000",
            help = "Maximum pages stored per path family"
        )]
        max_per_path: usize,

        /// max distinct path families
        #[arg(
            long,
            default_value = "1000",
            help = "Maximum number of distinct path families"
        )]
        max_path_types: usize,

        /// artifact output dir
        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory to write crawl artifacts into"
        )]
        output: String,

        /// optional config file
        #[arg(short, long, help = "TOML configuration file")]
        config: Option<String>,
    },

    /// Render a plain-text report from stored crawl data
    Report {
        /// stored data dir
        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory containing pages.jsonl from a previous crawl"
        )]
        output: String,
    },
}

impl Cli {
    /// parse args
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

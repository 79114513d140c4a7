use std::path::Path;

use sitegraph::cli::{Cli, Commands};
use sitegraph::config::CrawlerConfig;
use sitegraph::crawler::Crawler;
use sitegraph::{export, logging, pagerank, report, url_utils};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(None)?;
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Crawl {
            start_url,
            max_per_path,
            max_path_types,
            output,
            config,
        } => {
            run_crawl(
                &start_url,
                max_per_path,
                max_path_types,
                &output,
                config.as_deref(),
                false,
            )
            .await?;
        }

        Commands::Analyze {
            start_url,
            max_per_path,
            max_path_types,
            output,
            config,
        } => {
            run_crawl(
                &start_url,
                max_per_path,
                max_path_types,
                &output,
                config.as_deref(),
                true,
            )
            .await?;
        }

        Commands::Report { output } => {
            let pages = export::read_pages_jsonl(&Path::new(&output).join("pages.jsonl"))?;
            let domain = pages
                .first()
                .and_then(|p| url::Url::parse(&p.url).ok())
                .and_then(|u| u.host_str().map(url_utils::registrable_domain))
                .unwrap_or_else(|| "unknown".to_string());
            println!("{}", report::render(&pages, &domain));
        }
    }

    Ok(())
}

async fn run_crawl(
    start_url: &str,
    max_per_path: usize,
    max_path_types: usize,
    output: &str,
    config_path: Option<&str>,
    with_pagerank: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => CrawlerConfig::load(Path::new(path))?,
        None => CrawlerConfig::default(),
    };
    config.max_per_path = max_per_path;
    config.max_path_types = max_path_types;

    let start_url = url_utils::normalize_url_for_cli(start_url);
    let crawler = Crawler::new(&start_url, config)?;
    let domain = crawler.domain().to_string();

    let mut result = crawler.crawl().await;
    if with_pagerank {
        pagerank::score(&mut result);
    }

    let dir = Path::new(output);
    export::save_results(&result, dir)?;
    export::write_pages_jsonl(&result, &dir.join("pages.jsonl"))?;

    println!(
        "Crawled {} pages from {} ({} fetch errors)",
        result.total_pages, domain, result.error_count
    );
    println!("Artifacts written to {}", dir.display());
    if with_pagerank {
        println!("{}", report::render(&result.pages, &domain));
    }

    Ok(())
}

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use topscrap::{
    info_time,
    process::{extract_files, fetch_pages, scrape_site},
    ConsoleSink, Result, ScrapeConfig, Sink, SqliteSink, TsvSink, DB_PATH, TSV_PATH,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "topscrap", version, about = "Scrape a ranked movie listing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download the listing pages into a directory.
    Fetch {
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Extract records from saved pages (a file or a directory).
    Extract {
        path: PathBuf,
        #[command(flatten)]
        sink: SinkArgs,
    },
    /// Fetch and extract in one go.
    Scrape {
        #[command(flatten)]
        site: SiteArgs,
        #[command(flatten)]
        sink: SinkArgs,
    },
    /// List stored titles released in a year.
    Search {
        #[arg(long, default_value = DB_PATH)]
        db: PathBuf,
        #[arg(long)]
        year: u32,
    },
}

#[derive(Debug, Args)]
struct SiteArgs {
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    pages: Option<usize>,
    #[arg(long)]
    delay_ms: Option<u64>,
}

impl SiteArgs {
    fn into_config(self) -> ScrapeConfig {
        let mut config = ScrapeConfig::default();
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(pages) = self.pages {
            config.page_count = pages;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.delay = Duration::from_millis(delay_ms);
        }
        config
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkKind {
    Console,
    Tsv,
    Sqlite,
}

#[derive(Debug, Args)]
struct SinkArgs {
    #[arg(long, value_enum, default_value_t = SinkKind::Console)]
    sink: SinkKind,
    /// TSV output file.
    #[arg(long, default_value = TSV_PATH)]
    output: PathBuf,
    #[arg(long, default_value = DB_PATH)]
    db: PathBuf,
}

impl SinkArgs {
    fn open(&self) -> Result<Box<dyn Sink + Send>> {
        Ok(match self.sink {
            SinkKind::Console => Box::new(ConsoleSink),
            SinkKind::Tsv => Box::new(TsvSink::create(&self.output)?),
            SinkKind::Sqlite => Box::new(SqliteSink::open(&self.db)?),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("topscrap=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let start_time = Local::now();
    match Cli::parse().command {
        Command::Fetch { out, site } => {
            fetch_pages(&site.into_config(), out).await?;
        }
        Command::Extract { path, sink } => {
            extract_files(path, sink.open()?).await?;
        }
        Command::Scrape { site, sink } => {
            scrape_site(&site.into_config(), sink.open()?).await?;
        }
        Command::Search { db, year } => {
            let titles = SqliteSink::open(db)?.titles_for_year(year)?;
            info_time!("{} titles from {year}", titles.len());
            for title in titles {
                println!("{title}");
            }
        }
    }
    info_time!(start_time, "Full program time:");

    Ok(())
}

//! Scrapes a ranked movie listing (ten pages of 25 entries), extracts one
//! record per entry and hands the records to a console, TSV or SQLite sink.

mod config;
mod error;
pub mod extract;
mod macros;
pub mod parse;
pub mod process;
mod record;
pub mod request;
pub mod sink;

pub use config::ScrapeConfig;
pub use error::{Error, Result};
pub use extract::{CreditMarkers, Extractor};
pub use record::{ExtractedRecord, NO_TITLE};
pub use sink::{ConsoleSink, Sink, SqliteSink, TsvSink};

pub const BASE_URL: &str = "https://movie.douban.com/top250";
pub const PAGE_COUNT: usize = 10;
pub const PAGE_SIZE: usize = 25;
pub const REQUEST_DELAY_MS: u64 = 1000;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/122.0 Safari/537.36";
/// Saved pages are named `{FILE_PREFIX}_page{n}.html`.
pub const FILE_PREFIX: &str = "douban_top250";
pub const TSV_PATH: &str = "douban_top250.tsv";
pub const DB_PATH: &str = "douban_movie.db";
/// Pages of records in flight between the parser and the sink.
const CHANNEL_CAPACITY: usize = 16;

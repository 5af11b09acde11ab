use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use reqwest::Client;
use tokio::{
    fs,
    sync::mpsc,
    task::{spawn_blocking, JoinHandle},
    time::sleep,
};
use tracing::{debug, warn};

use crate::parse::parse_page_blocking;
use crate::request::{build_client, page_url, request_page_html};
use crate::{
    info_time, Error, ExtractedRecord, Extractor, Result, ScrapeConfig, Sink, CHANNEL_CAPACITY,
};

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_read: usize,
    pub pages_failed: usize,
    pub records_written: usize,
    pub records_ignored: usize,
    pub entries_skipped: usize,
}

/// Fetches every listing page in order, extracts the entries and hands them to `sink`.
pub async fn scrape_site<S>(config: &ScrapeConfig, sink: S) -> Result<RunSummary>
where
    S: Sink + Send + 'static,
{
    config.validate()?;
    let start_time = Local::now();
    let client = build_client(config)?;
    let extractor = Arc::new(Extractor::new()?);

    info_time!("Started scraping {} pages", config.page_count);

    let (rec_tx, rec_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let collect_handle = spawn_blocking(move || collect_records(rec_rx, sink));

    let produced = request_pages(config, &client, extractor, &rec_tx).await;
    let summary = finish_run(produced, rec_tx, collect_handle).await?;
    info_time!(start_time, "Finished scraping: {:?}", summary);
    Ok(summary)
}

/// Extracts entries from saved pages. `path` is either one HTML file or a
/// directory whose regular files are read in name order.
pub async fn extract_files<S>(path: impl AsRef<Path>, sink: S) -> Result<RunSummary>
where
    S: Sink + Send + 'static,
{
    let start_time = Local::now();
    let files = list_page_files(path.as_ref()).await?;
    let extractor = Arc::new(Extractor::new()?);

    info_time!("Started extracting {} files", files.len());

    let (rec_tx, rec_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let collect_handle = spawn_blocking(move || collect_records(rec_rx, sink));

    let produced = read_pages(files, extractor, &rec_tx).await;
    let summary = finish_run(produced, rec_tx, collect_handle).await?;
    info_time!(start_time, "Finished extracting: {:?}", summary);
    Ok(summary)
}

/// Downloads the listing pages into `out_dir` as `<FILE_PREFIX>_page<N>.html`, N starting at 1.
/// Returns the paths written.
pub async fn fetch_pages(config: &ScrapeConfig, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let start_time = Local::now();
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir).await?;
    let client = build_client(config)?;

    let mut written = Vec::with_capacity(config.page_count);
    for page_num in 0..config.page_count {
        if page_num > 0 {
            sleep(config.delay).await;
        }
        let url = page_url(&config.base_url, page_num, config.page_size);
        let Some(html) = request_page_html(&client, &url).await? else {
            continue;
        };
        let file_path = out_dir.join(page_file_name(page_num));
        fs::write(&file_path, html).await?;
        info_time!("Saved page {} to {}", page_num + 1, file_path.display());
        written.push(file_path);
    }
    info_time!(start_time, "Saved {} of {} pages", written.len(), config.page_count);
    Ok(written)
}

#[inline]
pub fn page_file_name(page_num: usize) -> String {
    format!("{}_page{}.html", crate::FILE_PREFIX, page_num + 1)
}

async fn request_pages(
    config: &ScrapeConfig,
    client: &Client,
    extractor: Arc<Extractor>,
    rec_tx: &mpsc::Sender<Vec<ExtractedRecord>>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for page_num in 0..config.page_count {
        if page_num > 0 {
            sleep(config.delay).await;
        }
        let url = page_url(&config.base_url, page_num, config.page_size);
        let Some(html) = request_page_html(client, &url).await? else {
            summary.pages_failed += 1;
            continue;
        };
        process_page(html, &url, extractor.clone(), rec_tx, &mut summary).await?;
    }
    Ok(summary)
}

async fn read_pages(
    files: Vec<PathBuf>,
    extractor: Arc<Extractor>,
    rec_tx: &mpsc::Sender<Vec<ExtractedRecord>>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for file in files {
        let html = match fs::read_to_string(&file).await {
            Ok(html) => html,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "couldn't read page, skipping");
                summary.pages_failed += 1;
                continue;
            }
        };
        let name = file.display().to_string();
        process_page(html, &name, extractor.clone(), rec_tx, &mut summary).await?;
    }
    Ok(summary)
}

/// Closes the channel, waits for the collector and merges its counts into the summary.
async fn finish_run(
    produced: Result<RunSummary>,
    rec_tx: mpsc::Sender<Vec<ExtractedRecord>>,
    collect_handle: JoinHandle<Result<(usize, usize)>>,
) -> Result<RunSummary> {
    // Closing the channel lets the collector finish.
    drop(rec_tx);
    let collected = collect_handle.await?;

    let (mut summary, (written, ignored)) = match (produced, collected) {
        // The channel only closes early when the sink failed; report the sink's error.
        (Err(Error::RuntimeSendError), Err(sink_err)) => return Err(sink_err),
        (Err(e), _) | (Ok(_), Err(e)) => return Err(e),
        (Ok(summary), Ok(counts)) => (summary, counts),
    };
    summary.records_written = written;
    summary.records_ignored = ignored;
    Ok(summary)
}

/// Parses one page and sends its records to the collector.
async fn process_page(
    html: String,
    source: &str,
    extractor: Arc<Extractor>,
    rec_tx: &mpsc::Sender<Vec<ExtractedRecord>>,
    summary: &mut RunSummary,
) -> Result<()> {
    let page = parse_page_blocking(html, extractor).await?;
    if !page.list_found {
        warn!(source, "no entry list found");
    }
    summary.pages_read += 1;
    summary.entries_skipped += page.skipped;
    info_time!("Parsed {}: {} records", source, page.records.len());
    if !page.records.is_empty() {
        rec_tx.send(page.records).await?;
    }
    Ok(())
}

/// Drains the channel into the sink on a blocking thread.
/// Returns how many records were written and how many the sink ignored.
/// The sink is finished even when a write fails, so records stored before the failure are kept.
fn collect_records<S: Sink>(
    mut rec_rx: mpsc::Receiver<Vec<ExtractedRecord>>,
    mut sink: S,
) -> Result<(usize, usize)> {
    let drained = drain_into(&mut rec_rx, &mut sink);
    let finished = sink.finish();
    let counts = drained?;
    finished?;
    Ok(counts)
}

fn drain_into<S: Sink>(
    rec_rx: &mut mpsc::Receiver<Vec<ExtractedRecord>>,
    sink: &mut S,
) -> Result<(usize, usize)> {
    let (mut written, mut ignored) = (0, 0);
    while let Some(records) = rec_rx.blocking_recv() {
        debug!("Received a page of records: LEN: {}", records.len());
        for record in &records {
            if sink.write(record)? {
                written += 1;
            } else {
                ignored += 1;
            }
        }
    }
    Ok((written, ignored))
}

async fn list_page_files(path: &Path) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(path).await?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut dir = fs::read_dir(path).await?;
    while let Some(entry) = dir.next_entry().await? {
        let entry_path = entry.path();
        if entry.file_type().await?.is_file() {
            files.push(entry_path);
        } else {
            debug!(path = %entry_path.display(), "skipping non-file");
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_files_are_one_based() {
        assert_eq!(page_file_name(0), "douban_top250_page1.html");
        assert_eq!(page_file_name(9), "douban_top250_page10.html");
    }
}

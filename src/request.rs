use reqwest::Client;
use tracing::warn;

use crate::{info_time, Result, ScrapeConfig};

/// Builds the client used for every page request.
pub fn build_client(config: &ScrapeConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout);
    if !config.system_proxy {
        builder = builder.no_proxy();
    }
    let client = builder.build()?;
    Ok(client)
}

/// Url of the zero-based page `page_num`; pages are addressed by the offset of their first entry.
pub fn page_url(base_url: &str, page_num: usize, page_size: usize) -> String {
    format!("{base_url}?start={}", page_num * page_size)
}

/// Requests a page and returns its HTML.
/// A non-success status is logged and gives `Ok(None)`; only transport errors fail.
pub(crate) async fn request_page_html(client: &Client, url: &str) -> Result<Option<String>> {
    info_time!("Requesting page: {url}");
    // Compressed bodies (br, gzip, deflate) are negotiated and decoded by the client.
    let res = client.get(url).send().await?;

    let status = res.status();
    if !status.is_success() {
        warn!(%status, url, "page request failed, skipping");
        return Ok(None);
    }
    let html = res.text().await?;
    Ok(Some(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_urls_step_by_page_size() {
        let urls: Vec<_> = (0..3)
            .map(|n| page_url("https://movie.douban.com/top250", n, 25))
            .collect();
        assert_eq!(
            urls,
            [
                "https://movie.douban.com/top250?start=0",
                "https://movie.douban.com/top250?start=25",
                "https://movie.douban.com/top250?start=50",
            ]
        );
    }
}

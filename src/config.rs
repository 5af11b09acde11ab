use std::time::Duration;

use crate::{
    Error, Result, BASE_URL, PAGE_COUNT, PAGE_SIZE, REQUEST_DELAY_MS, REQUEST_TIMEOUT_SECS,
    USER_AGENT,
};

/// Settings for fetching the listing pages.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub page_count: usize,
    pub page_size: usize,
    /// Pause between two sequential page requests.
    pub delay: Duration,
    pub user_agent: String,
    pub timeout: Duration,
    /// Honour `HTTP_PROXY` and friends from the environment.
    pub system_proxy: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            page_count: PAGE_COUNT,
            page_size: PAGE_SIZE,
            delay: Duration::from_millis(REQUEST_DELAY_MS),
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            system_proxy: true,
        }
    }
}

impl ScrapeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("base url is empty".into()));
        }
        if self.page_count == 0 {
            return Err(Error::InvalidConfig("page count must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page size must be at least 1".into()));
        }
        Ok(())
    }
}

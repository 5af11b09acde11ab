use std::sync::Arc;

use scraper::Html;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::extract::create_selector;
use crate::{ExtractedRecord, Extractor, Result};

/// Records pulled out of one page.
#[derive(Debug, Default)]
pub struct PageRecords {
    pub records: Vec<ExtractedRecord>,
    /// Entries dropped because their heading region was missing.
    pub skipped: usize,
    /// `false` if the page had no entry list at all.
    pub list_found: bool,
}

/// Parses a whole page and extracts every entry of every entry list on it.
/// Several pages concatenated into one document are handled in document order.
pub fn parse_page(html: &str, extractor: &Extractor) -> Result<PageRecords> {
    let doc = Html::parse_document(html);

    let list_selector = create_selector("ol.grid_view")?;
    let entry_selector = create_selector("li")?;

    // A listing page holds 25 entries.
    let mut page = PageRecords {
        records: Vec::with_capacity(25),
        ..Default::default()
    };
    for list in doc.select(&list_selector) {
        page.list_found = true;
        // Only direct children, nested lists inside an entry are not entries.
        let entries = list
            .select(&entry_selector)
            .filter(|li| li.parent().map(|p| p.id()) == Some(list.id()));
        for entry in entries {
            let record = extractor.extract(entry);
            if !record.has_title() {
                debug!("skipping entry without a title");
                page.skipped += 1;
                continue;
            }
            page.records.push(record);
        }
    }
    Ok(page)
}

/// Runs [`parse_page`] on the blocking pool. The parsed tree never leaves it,
/// only the records do.
pub(crate) async fn parse_page_blocking(
    html: String,
    extractor: Arc<Extractor>,
) -> Result<PageRecords> {
    spawn_blocking(move || parse_page(&html, &extractor)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <ol class="grid_view">
          <li>
            <div class="hd"><span class="title">霸王别姬</span></div>
            <div class="bd"><p>导演: 陈凯歌 主演: 张国荣<br>1993 / 中国大陆 中国香港 / 剧情 爱情</p>
              <div class="star"><span class="rating_num">9.6</span><span>2251212人评价</span></div>
            </div>
          </li>
          <li><div class="bd"><p>no heading here</p></div></li>
          <li>
            <div class="hd"><span class="title">阿甘正传</span></div>
            <div class="bd"><p>导演: 罗伯特·泽米吉斯<br>1994 / 美国 / 剧情 爱情</p>
              <ul><li>nested, not an entry</li></ul>
            </div>
          </li>
        </ol>
        </body></html>"#;

    #[test]
    fn parses_entries_and_skips_untitled() {
        let extractor = Extractor::new().unwrap();
        let page = parse_page(PAGE, &extractor).unwrap();
        assert!(page.list_found);
        assert_eq!(page.skipped, 1);
        let titles: Vec<_> = page.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["霸王别姬", "阿甘正传"]);
        assert_eq!(page.records[0].year, 1993);
        assert_eq!(page.records[0].popularity, 2251212);
        assert_eq!(page.records[1].actor, "");
    }

    #[test]
    fn page_without_list_is_reported() {
        let extractor = Extractor::new().unwrap();
        let page = parse_page("<html><body><p>rate limited</p></body></html>", &extractor).unwrap();
        assert!(!page.list_found);
        assert!(page.records.is_empty());
    }

    #[test]
    fn concatenated_pages_are_read_in_order() {
        let extractor = Extractor::new().unwrap();
        let html = format!("{PAGE}{PAGE}");
        let page = parse_page(&html, &extractor).unwrap();
        assert_eq!(page.records.len(), 4);
        assert_eq!(page.skipped, 2);
        assert_eq!(page.records[2].title, "霸王别姬");
    }
}

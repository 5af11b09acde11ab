//! Field extraction for a single listing entry.
//!
//! An entry is one `<li>` of the listing, shaped roughly like:
//!
//! ```html
//! <li>
//!   <div class="pic"><a href="DETAIL"><img src="POSTER"></a></div>
//!   <div class="hd"><a><span class="title">TITLE</span></a></div>
//!   <div class="bd">
//!     <p>导演: DIRECTOR 主演: ACTOR<br>1994 / COUNTRY / GENRE</p>
//!     <div class="star">
//!       <span class="rating5-t"></span>
//!       <span class="rating_num">9.7</span>
//!       <span>2049人评价</span>
//!     </div>
//!   </div>
//! </li>
//! ```
//!
//! Extraction never fails: missing or malformed pieces fall back to the
//! defaults of [`ExtractedRecord`].

use scraper::{ElementRef, Node, Selector};

use crate::{Error, ExtractedRecord, Result, NO_TITLE};

/// Marker tokens that introduce the director and actor parts of the credits line.
/// Any alternative in each list is accepted, the earliest occurrence wins.
#[derive(Debug, Clone)]
pub struct CreditMarkers {
    pub director: Vec<String>,
    pub actor: Vec<String>,
}

impl Default for CreditMarkers {
    fn default() -> Self {
        Self {
            director: vec!["导演:".into(), "导演：".into()],
            actor: vec!["主演:".into(), "主演：".into()],
        }
    }
}

struct Selectors {
    heading: Selector,
    title: Selector,
    scoring: Selector,
    rating: Selector,
    annotation: Selector,
    body: Selector,
    paragraph: Selector,
    media: Selector,
    image: Selector,
    link: Selector,
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            heading: create_selector("div.hd")?,
            title: create_selector("span.title")?,
            scoring: create_selector("div.star")?,
            rating: create_selector("span.rating_num")?,
            annotation: create_selector("span")?,
            body: create_selector("div.bd")?,
            paragraph: create_selector("p")?,
            media: create_selector("div.pic")?,
            image: create_selector("img")?,
            link: create_selector("a")?,
        })
    }
}

/// Turns listing entries into [`ExtractedRecord`]s.
///
/// Holds the compiled selectors, so build it once and share it (it is `Send + Sync`).
pub struct Extractor {
    selectors: Selectors,
    markers: CreditMarkers,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        Self::with_markers(CreditMarkers::default())
    }

    /// Fails with [`Error::InvalidConfig`] if a marker list is empty or holds an empty marker.
    pub fn with_markers(markers: CreditMarkers) -> Result<Self> {
        for (role, alternatives) in [("director", &markers.director), ("actor", &markers.actor)] {
            if alternatives.is_empty() || alternatives.iter().any(|m| m.trim().is_empty()) {
                return Err(Error::InvalidConfig(format!("empty {role} marker")));
            }
        }
        Ok(Self {
            selectors: Selectors::new()?,
            markers,
        })
    }

    /// Extracts one record from one entry. Pure and deterministic.
    ///
    /// A missing heading region yields [`NO_TITLE`]; it's up to the caller
    /// whether such a record is kept.
    pub fn extract(&self, entry: ElementRef<'_>) -> ExtractedRecord {
        let sel = &self.selectors;

        let title = first(entry, &sel.heading)
            .and_then(|heading| first(heading, &sel.title))
            .map(trimmed_text)
            .unwrap_or_else(|| NO_TITLE.to_string());

        let scoring = first(entry, &sel.scoring);
        let rating = scoring
            .and_then(|star| first(star, &sel.rating))
            .map(|label| parse_rating(&trimmed_text(label)))
            .unwrap_or(0.0);
        // Only the last span carries the vote count.
        let popularity = scoring
            .and_then(|star| star.select(&sel.annotation).last())
            .map(|span| digit_run(&trimmed_text(span)))
            .unwrap_or(0);

        let lines = first(entry, &sel.body)
            .and_then(|body| first(body, &sel.paragraph))
            .map(logical_lines)
            .unwrap_or_default();

        let (director, actor) = lines
            .iter()
            .find(|line| !line.is_empty())
            .map(|line| split_credits(line, &self.markers))
            .unwrap_or_default();

        let (year, country, genre) = find_detail_line(&lines)
            .map(parse_detail)
            .unwrap_or_default();

        let media = first(entry, &sel.media);
        let media_url = media
            .and_then(|pic| first(pic, &sel.image))
            .and_then(|img| img.value().attr("src"))
            .map(|src| src.trim().to_string())
            .unwrap_or_default();
        let detail_link = media
            .and_then(|pic| first(pic, &sel.link))
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .unwrap_or_default();

        ExtractedRecord {
            title,
            rating,
            popularity,
            director,
            actor,
            year,
            country,
            genre,
            media_url,
            detail_link,
        }
    }
}

#[inline]
pub(crate) fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

#[inline]
fn first<'a>(el: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    el.select(selector).next()
}

#[inline]
fn trimmed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Splits a paragraph into trimmed lines, breaking at `<br>` and at newlines in text.
/// Blank lines are kept.
fn logical_lines(paragraph: ElementRef<'_>) -> Vec<String> {
    let mut lines = vec![String::new()];
    for node in paragraph.descendants() {
        match node.value() {
            Node::Text(text) => {
                let mut parts = text.split('\n');
                if let (Some(part), Some(line)) = (parts.next(), lines.last_mut()) {
                    line.push_str(part);
                }
                lines.extend(parts.map(String::from));
            }
            Node::Element(el) if el.name() == "br" => lines.push(String::new()),
            _ => {}
        }
    }
    lines.iter().map(|line| line.trim().to_string()).collect()
}

/// Parses a plain decimal like `9.7`. Anything else (`NaN`, `inf`, exponents, signs) gives 0.0.
pub fn parse_rating(text: &str) -> f64 {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return 0.0;
    }
    text.parse::<f64>()
        .ok()
        .filter(|rating| rating.is_finite())
        .unwrap_or(0.0)
}

/// Parses the first run of ASCII digits in `text`. No digits, or a run too
/// long for `u64`, gives 0.
pub fn digit_run(text: &str) -> u64 {
    text.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Returns `(director, actor)` from a credits line.
/// Both are empty when the line has no director marker.
pub fn split_credits(line: &str, markers: &CreditMarkers) -> (String, String) {
    let Some((_, director_marker)) = find_marker(line, &markers.director) else {
        return (String::new(), String::new());
    };
    let (credits, actor) = match find_marker(line, &markers.actor) {
        Some((at, actor_marker)) => (&line[..at], line[at + actor_marker.len()..].trim()),
        None => (line, ""),
    };
    let director = credits.replacen(director_marker, "", 1).trim().to_string();
    (director, actor.to_string())
}

fn find_marker<'m>(line: &str, alternatives: &'m [String]) -> Option<(usize, &'m str)> {
    alternatives
        .iter()
        .filter_map(|marker| line.find(marker.as_str()).map(|at| (at, marker.as_str())))
        .min_by_key(|(at, _)| *at)
}

/// The detail line is the first one holding a `/` and at least one digit,
/// wherever it sits in the paragraph.
pub fn find_detail_line<S: AsRef<str>>(lines: &[S]) -> Option<&str> {
    lines
        .iter()
        .map(|line| line.as_ref())
        .find(|line| line.contains('/') && line.chars().any(|c| c.is_ascii_digit()))
}

/// Returns `(year, country, genre)` from a detail line like `1994 / 美国 / 犯罪 剧情`.
pub fn parse_detail(line: &str) -> (u32, String, String) {
    let mut segments = line.split('/').map(str::trim);
    let year = segments.next().map(year_prefix).unwrap_or(0);
    let country = segments.next().unwrap_or_default().to_string();
    let genre = segments.next().unwrap_or_default().to_string();
    (year, country, genre)
}

/// Parses the leading four characters as a year, ignoring anything after them.
pub fn year_prefix(segment: &str) -> u32 {
    let mut chars = segment.chars();
    (0..4)
        .try_fold(0u32, |acc, _| {
            chars.next()?.to_digit(10).map(|digit| acc * 10 + digit)
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    const FULL_ENTRY: &str = r#"
        <ol class="grid_view"><li>
          <div class="item">
            <div class="pic">
              <em class="">1</em>
              <a href="https://movie.douban.com/subject/1292052/">
                <img width="100" alt="肖申克的救赎" src="https://img.example.com/p480747492.webp" class="">
              </a>
            </div>
            <div class="info">
              <div class="hd">
                <a href="https://movie.douban.com/subject/1292052/" class="">
                  <span class="title">肖申克的救赎</span>
                  <span class="title">&nbsp;/&nbsp;The Shawshank Redemption</span>
                </a>
              </div>
              <div class="bd">
                <p class="">
                  导演: 弗兰克·德拉邦特 Frank Darabont&nbsp;&nbsp;&nbsp;主演: 蒂姆·罗宾斯 Tim Robbins /...<br>
                  1994&nbsp;/&nbsp;美国&nbsp;/&nbsp;犯罪 剧情
                </p>
                <div class="star">
                  <span class="rating5-t"></span>
                  <span class="rating_num" property="v:average">9.7</span>
                  <span property="v:best" content="10.0"></span>
                  <span>3052194人评价</span>
                </div>
                <p class="quote"><span class="inq">希望让人自由。</span></p>
              </div>
            </div>
          </div>
        </li></ol>"#;

    fn extract_from(html: &str) -> ExtractedRecord {
        let doc = Html::parse_fragment(html);
        let li = create_selector("li").unwrap();
        let entry = doc.select(&li).next().expect("fixture has an entry");
        Extractor::new().unwrap().extract(entry)
    }

    #[test]
    fn extracts_every_field_from_full_entry() {
        let record = extract_from(FULL_ENTRY);
        assert_eq!(record.title, "肖申克的救赎");
        assert_eq!(record.rating, 9.7);
        assert_eq!(record.popularity, 3052194);
        assert_eq!(record.director, "弗兰克·德拉邦特 Frank Darabont");
        assert_eq!(record.actor, "蒂姆·罗宾斯 Tim Robbins /...");
        assert_eq!(record.year, 1994);
        assert_eq!(record.country, "美国");
        assert_eq!(record.genre, "犯罪 剧情");
        assert_eq!(record.media_url, "https://img.example.com/p480747492.webp");
        assert_eq!(record.detail_link, "https://movie.douban.com/subject/1292052/");
    }

    #[test]
    fn extraction_is_idempotent() {
        let doc = Html::parse_fragment(FULL_ENTRY);
        let li = create_selector("li").unwrap();
        let entry = doc.select(&li).next().unwrap();
        let extractor = Extractor::new().unwrap();
        assert_eq!(extractor.extract(entry), extractor.extract(entry));
    }

    #[test]
    fn missing_heading_gives_sentinel_title() {
        let record = extract_from(r#"<ul><li><div class="bd"><p>导演: 王家卫</p></div></li></ul>"#);
        assert_eq!(record.title, NO_TITLE);
        assert!(!record.has_title());
        assert_eq!(record.director, "王家卫");
    }

    #[test]
    fn empty_entry_degrades_to_defaults() {
        let record = extract_from("<ul><li></li></ul>");
        assert_eq!(record, ExtractedRecord::default());
    }

    #[test]
    fn malformed_rating_is_zero() {
        let record = extract_from(
            r#"<ul><li><div class="hd"><span class="title">T</span></div>
               <div class="star"><span class="rating_num">n/a</span><span>暂无评价</span></div></li></ul>"#,
        );
        assert_eq!(record.rating, 0.0);
        assert_eq!(record.popularity, 0);
    }

    #[test]
    fn non_decimal_rating_is_zero() {
        for text in ["NaN", "inf", "-infinity", "1e999", "+9.0", "."] {
            assert_eq!(parse_rating(text), 0.0, "rating text {text:?}");
        }
        assert_eq!(parse_rating("8.5"), 8.5);
        assert_eq!(parse_rating("9"), 9.0);

        let html = r#"<ul><li><div class="hd"><span class="title">T</span></div>
               <div class="star"><span class="rating_num">NaN</span></div></li></ul>"#;
        let record = extract_from(html);
        assert_eq!(record.rating, 0.0);
        assert_eq!(record, extract_from(html));
    }

    #[test]
    fn empty_markers_are_rejected() {
        let markers = CreditMarkers {
            director: vec!["导演:".into(), String::new()],
            ..Default::default()
        };
        assert!(matches!(Extractor::with_markers(markers), Err(Error::InvalidConfig(_))));

        let markers = CreditMarkers {
            actor: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(Extractor::with_markers(markers), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn popularity_comes_from_last_span() {
        let record = extract_from(
            r#"<ul><li><div class="star">
                 <span>111人</span><span class="rating_num">8.0</span><span>2049人评价</span>
               </div></li></ul>"#,
        );
        assert_eq!(record.popularity, 2049);
    }

    #[test]
    fn missing_media_region_gives_empty_url() {
        let record = extract_from(r#"<ul><li><div class="hd"><span class="title">T</span></div></li></ul>"#);
        assert_eq!(record.media_url, "");
        assert_eq!(record.detail_link, "");
    }

    #[test]
    fn detail_line_found_after_blank_lines() {
        let record = extract_from(
            r#"<ul><li><div class="bd"><p><br>导演: X<br>1994 / 中国 / 剧情</p></div></li></ul>"#,
        );
        assert_eq!(record.director, "X");
        assert_eq!(record.year, 1994);
        assert_eq!(record.country, "中国");
        assert_eq!(record.genre, "剧情");
    }

    #[test]
    fn digit_run_takes_first_run() {
        assert_eq!(digit_run("2049人评价"), 2049);
        assert_eq!(digit_run("暂无评价"), 0);
        assert_eq!(digit_run("共 12 条，另 7 条"), 12);
        assert_eq!(digit_run("99999999999999999999999人评价"), 0);
    }

    #[test]
    fn split_credits_with_and_without_actor() {
        let markers = CreditMarkers::default();
        assert_eq!(
            split_credits("导演: 张艺谋 主演: 巩俐", &markers),
            ("张艺谋".to_string(), "巩俐".to_string())
        );
        assert_eq!(
            split_credits("导演: 王家卫", &markers),
            ("王家卫".to_string(), String::new())
        );
        assert_eq!(
            split_credits("导演：陈凯歌 主演：张国荣", &markers),
            ("陈凯歌".to_string(), "张国荣".to_string())
        );
        assert_eq!(split_credits("主演: 巩俐", &markers), (String::new(), String::new()));
    }

    #[test]
    fn detail_line_is_chosen_by_content() {
        let lines = ["", "导演: X", "1994 / 中国 / 剧情"];
        assert_eq!(find_detail_line(&lines), Some("1994 / 中国 / 剧情"));
        assert_eq!(find_detail_line(&["导演: X", "no detail"]), None);
    }

    #[test]
    fn parse_detail_tolerates_short_and_long_lines() {
        assert_eq!(parse_detail("1994"), (1994, String::new(), String::new()));
        assert_eq!(
            parse_detail("1961(中国大陆) / 1964 / 中国大陆 / 剧情 动画"),
            (1961, "1964".to_string(), "中国大陆".to_string())
        );
    }

    #[test]
    fn year_prefix_ignores_trailing_annotation() {
        assert_eq!(year_prefix("1994(中国香港)"), 1994);
        assert_eq!(year_prefix("199"), 0);
        assert_eq!(year_prefix("约1994"), 0);
        assert_eq!(year_prefix(""), 0);
    }
}

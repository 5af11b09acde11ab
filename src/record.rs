use std::fmt;

/// Title used when an entry has no heading region.
/// The page parser skips entries carrying it.
pub const NO_TITLE: &str = "No title found";

/// One movie extracted from a listing entry.
///
/// Built once by [`crate::Extractor::extract`] and never mutated afterwards.
/// Every field has a default that stands in for a missing or malformed value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub title: String,
    pub rating: f64,
    pub popularity: u64,
    pub director: String,
    pub actor: String,
    pub year: u32,
    pub country: String,
    pub genre: String,
    pub media_url: String,
    pub detail_link: String,
}

impl Default for ExtractedRecord {
    fn default() -> Self {
        Self {
            title: NO_TITLE.to_string(),
            rating: 0.0,
            popularity: 0,
            director: String::new(),
            actor: String::new(),
            year: 0,
            country: String::new(),
            genre: String::new(),
            media_url: String::new(),
            detail_link: String::new(),
        }
    }
}

impl ExtractedRecord {
    /// Column names of [`ExtractedRecord::tsv_fields`], in the same order.
    pub const TSV_HEADER: [&'static str; 9] = [
        "title",
        "rating",
        "popularity",
        "director",
        "actor",
        "year",
        "country",
        "genre",
        "media_url",
    ];

    /// `false` when the heading region was missing.
    pub fn has_title(&self) -> bool {
        self.title != NO_TITLE
    }

    pub fn tsv_fields(&self) -> [String; 9] {
        [
            self.title.clone(),
            format!("{:.1}", self.rating),
            self.popularity.to_string(),
            self.director.clone(),
            self.actor.clone(),
            self.year.to_string(),
            self.country.clone(),
            self.genre.clone(),
            self.media_url.clone(),
        ]
    }
}

impl fmt::Display for ExtractedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} | {:>3.1} | {:>8} votes | {} / {} / {} | dir: {} | cast: {}",
            self.title,
            self.rating,
            self.popularity,
            self.year,
            self.country,
            self.genre,
            self.director,
            self.actor
        )
    }
}

//! Destinations for finished records.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use rusqlite::{params, Connection};

use crate::{ExtractedRecord, Result};

/// Anything a finished record can be handed to.
pub trait Sink {
    /// Stores one record. Returns `false` if the sink chose not to keep it (e.g. a duplicate).
    fn write(&mut self, record: &ExtractedRecord) -> Result<bool>;

    /// Flushes or commits whatever is still pending.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, record: &ExtractedRecord) -> Result<bool> {
        (**self).write(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Prints one human readable line per record to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn write(&mut self, record: &ExtractedRecord) -> Result<bool> {
        let mut out = io::stdout().lock();
        writeln!(out, "{record}")?;
        Ok(true)
    }
}

/// Tab separated values, one record per line, preceded by a header line.
pub struct TsvSink<W: Write> {
    out: BufWriter<W>,
    header_written: bool,
}

impl TsvSink<std::fs::File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(std::fs::File::create(path)?))
    }
}

impl<W: Write> TsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            header_written: false,
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.out.into_inner().map_err(|e| e.into_error().into())
    }

    fn write_line<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let line = fields
            .iter()
            .map(|field| tsv_escape(field.as_ref()))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

impl<W: Write> Sink for TsvSink<W> {
    fn write(&mut self, record: &ExtractedRecord) -> Result<bool> {
        if !self.header_written {
            self.write_line(&ExtractedRecord::TSV_HEADER)?;
            self.header_written = true;
        }
        self.write_line(&record.tsv_fields())?;
        Ok(true)
    }

    fn finish(&mut self) -> Result<()> {
        if !self.header_written {
            self.write_line(&ExtractedRecord::TSV_HEADER)?;
            self.header_written = true;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[inline]
fn tsv_escape(field: &str) -> String {
    field.replace(['\t', '\r', '\n'], " ")
}

/// Stores records in the `douban_movie` table of a SQLite database.
///
/// Rows are keyed by an autoincrement id; a second record with the same
/// title and year is ignored. Writes go into one transaction, committed by
/// [`Sink::finish`]. The pipeline calls `finish` after a failed write too, so
/// rows stored before the failure are kept; dropping the sink without
/// `finish` rolls them back.
pub struct SqliteSink {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS douban_movie (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                rating_num REAL NOT NULL,
                comment_num INTEGER NOT NULL,
                directors TEXT NOT NULL,
                actors TEXT NOT NULL,
                year INTEGER NOT NULL,
                country TEXT NOT NULL,
                category TEXT NOT NULL,
                pic TEXT NOT NULL,
                link TEXT NOT NULL,
                UNIQUE (title, year)
            );",
        )?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    /// Titles released in `year`, in insertion order.
    pub fn titles_for_year(&self, year: u32) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM douban_movie WHERE year = ?1 ORDER BY id")?;
        let titles = stmt
            .query_map(params![year], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM douban_movie", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl Sink for SqliteSink {
    fn write(&mut self, record: &ExtractedRecord) -> Result<bool> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO douban_movie
                (title, rating_num, comment_num, directors, actors, year, country, category, pic, link)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.title,
                record.rating,
                i64::try_from(record.popularity).unwrap_or(i64::MAX),
                record.director,
                record.actor,
                record.year,
                record.country,
                record.genre,
                record.media_url,
                record.detail_link,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn finish(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, year: u32) -> ExtractedRecord {
        ExtractedRecord {
            title: title.into(),
            rating: 9.1,
            popularity: 1234,
            director: "导演\tA".into(),
            year,
            ..Default::default()
        }
    }

    #[test]
    fn tsv_writes_header_then_escaped_rows() {
        let mut sink = TsvSink::new(Vec::new());
        sink.write(&record("千与千寻", 2001)).unwrap();
        sink.finish().unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], ExtractedRecord::TSV_HEADER.join("\t"));
        assert_eq!(lines[1], "千与千寻\t9.1\t1234\t导演 A\t\t2001\t\t\t");
    }

    #[test]
    fn tsv_empty_run_still_has_header() {
        let mut sink = TsvSink::new(Vec::new());
        sink.finish().unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn sqlite_ignores_duplicates_and_answers_year_query() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        assert!(sink.write(&record("千与千寻", 2001)).unwrap());
        assert!(!sink.write(&record("千与千寻", 2001)).unwrap());
        assert!(sink.write(&record("天使爱美丽", 2001)).unwrap());
        assert!(sink.write(&record("熔炉", 2011)).unwrap());
        sink.finish().unwrap();

        assert_eq!(sink.count().unwrap(), 3);
        assert_eq!(sink.titles_for_year(2001).unwrap(), ["千与千寻", "天使爱美丽"]);
        assert!(sink.titles_for_year(1900).unwrap().is_empty());
    }
}

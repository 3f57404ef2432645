//! Report files.
//!
//! Every report lands in one output directory under a name of the form
//! `{stem}_{YYYYmmdd_HHMMSS}.{ext}`, so repeated runs never overwrite each
//! other.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::error::Result;

pub mod markdown;

pub use markdown::MarkdownDoc;

/// UTF-8 byte order mark, so spreadsheet apps detect the encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `{stem}_{YYYYmmdd_HHMMSS}.{ext}`
///
/// ```rust
/// use chrono::{Local, TimeZone};
/// use dataprobe::report::timestamped_name;
///
/// let now = Local.with_ymd_and_hms(2026, 2, 14, 9, 5, 7).unwrap();
/// assert_eq!(timestamped_name("sales", "csv", now), "sales_20260214_090507.csv");
/// ```
pub fn timestamped_name(stem: &str, ext: &str, now: DateTime<Local>) -> String {
    format!("{stem}_{}.{ext}", now.format("%Y%m%d_%H%M%S"))
}

/// Writes reports into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    csv_bom: bool,
}

impl ReportWriter {
    /// Writer for `dir`, created if missing.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            csv_bom: false,
        })
    }

    /// Prefix CSV files with a UTF-8 byte order mark.
    pub fn with_csv_bom(mut self, enabled: bool) -> Self {
        self.csv_bom = enabled;
        self
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh path for `stem`/`ext`; a counter is appended if a report
    /// with the same second-resolution name already exists.
    fn path_for(&self, stem: &str, ext: &str) -> PathBuf {
        let name = timestamped_name(stem, ext, Local::now());
        let mut path = self.dir.join(&name);
        let mut n = 1;
        while path.exists() {
            let base = name.trim_end_matches(&format!(".{ext}")).to_string();
            path = self.dir.join(format!("{base}_{n}.{ext}"));
            n += 1;
        }
        path
    }

    /// Write `value` as pretty-printed JSON.
    pub fn write_json<T: Serialize + ?Sized>(&self, stem: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_for(stem, "json");
        let mut out = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut out, value)?;
        out.write_all(b"\n")?;
        out.flush()?;
        info!(path = %path.display(), "wrote JSON report");
        Ok(path)
    }

    /// Write a CSV table.
    pub fn write_csv<I, R, S>(&self, stem: &str, headers: &[&str], rows: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let path = self.path_for(stem, "csv");
        let mut file = BufWriter::new(File::create(&path)?);
        if self.csv_bom {
            file.write_all(UTF8_BOM)?;
        }
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(headers)?;
        let mut count = 0usize;
        for row in rows {
            writer.write_record(row)?;
            count += 1;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = count, "wrote CSV report");
        Ok(path)
    }

    /// Write a Markdown document.
    pub fn write_markdown(&self, stem: &str, doc: &MarkdownDoc) -> Result<PathBuf> {
        let path = self.path_for(stem, "md");
        fs::write(&path, doc.render())?;
        info!(path = %path.display(), "wrote Markdown report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("out")).unwrap();
        let path = writer.write_json("summary", &json!({"total": 8560.5})).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("summary_") && name.ends_with(".json"));
        let back: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["total"], 8560.5);
    }

    #[test]
    fn same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        let first = writer.write_json("r", &1).unwrap();
        let second = writer.write_json("r", &2).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn csv_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap().with_csv_bom(true);
        let path = writer
            .write_csv("t", &["name", "count"], vec![vec!["卫衣", "8"]])
            .unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "name,count\n卫衣,8\n");
    }
}

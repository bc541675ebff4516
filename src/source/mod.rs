pub mod types;

pub use types::{ChangeRecord, PatchSet, QueryStats};

use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read source file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed change record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a query statistics footer on line {line}, found a change record or other data")]
    MissingFooter { line: usize },

    #[error("Source file is empty; expected at least a query statistics footer")]
    Empty,
}

/// How the last line of a query dump is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FooterPolicy {
    /// The last line must be the `{"type":"stats",...}` record and is not exported.
    #[default]
    Stats,
    /// Every line is a change record.
    #[serde(rename = "none")]
    #[value(name = "none")]
    Absent,
}

/// A newline-delimited JSON dump of changes on disk.
#[derive(Debug, Clone)]
pub struct ChangeSource {
    path: PathBuf,
    footer: FooterPolicy,
}

impl ChangeSource {
    pub fn open(path: &Path, footer: FooterPolicy) -> Self {
        Self {
            path: path.to_path_buf(),
            footer,
        }
    }

    /// Start a fresh pass over the file. Each call reopens it, so the
    /// sequence can be restarted from the beginning at any time.
    #[instrument(skip(self), fields(path = %self.path.display(), footer = ?self.footer))]
    pub fn records(&self) -> Result<Records, SourceError> {
        let file = File::open(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;
        debug!("opened change dump");
        Ok(Records {
            path: self.path.clone(),
            lines: BufReader::new(file).lines().peekable(),
            footer: self.footer,
            line_no: 0,
            yielded: 0,
            finished: false,
        })
    }
}

/// Lazy iterator over the change records of one pass.
///
/// Any error ends the pass: after yielding an `Err` the iterator is exhausted.
pub struct Records {
    path: PathBuf,
    lines: Peekable<Lines<BufReader<File>>>,
    footer: FooterPolicy,
    line_no: usize,
    yielded: u64,
    finished: bool,
}

impl Records {
    fn read_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Read {
            path: self.path.clone(),
            source,
        }
    }

    fn check_footer(&self, raw: &str) -> Result<(), SourceError> {
        let missing = SourceError::MissingFooter { line: self.line_no };
        let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| missing)?;
        if value.get("type").and_then(|t| t.as_str()) != Some("stats") {
            return Err(SourceError::MissingFooter { line: self.line_no });
        }
        let stats: QueryStats = serde_json::from_value(value).map_err(|source| {
            SourceError::Malformed {
                line: self.line_no,
                source,
            }
        })?;
        if stats.row_count != self.yielded {
            warn!(
                footer_rows = stats.row_count,
                records = self.yielded,
                "footer row count does not match the number of change records"
            );
        }
        if stats.more_changes {
            warn!("query dump was truncated by the server (moreChanges=true)");
        }
        debug!(kind = %stats.kind, rows = stats.row_count, "validated footer");
        Ok(())
    }

    fn fail(&mut self, err: SourceError) -> Option<Result<ChangeRecord, SourceError>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl Iterator for Records {
    type Item = Result<ChangeRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let line = match self.lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                let err = self.read_error(e);
                return self.fail(err);
            }
            None => {
                self.finished = true;
                if self.footer == FooterPolicy::Stats && self.line_no == 0 {
                    return Some(Err(SourceError::Empty));
                }
                return None;
            }
        };
        self.line_no += 1;

        if self.footer == FooterPolicy::Stats && self.lines.peek().is_none() {
            self.finished = true;
            return match self.check_footer(&line) {
                Ok(()) => None,
                Err(e) => Some(Err(e)),
            };
        }

        match serde_json::from_str::<ChangeRecord>(&line) {
            Ok(record) => {
                self.yielded += 1;
                Some(Ok(record))
            }
            Err(source) => {
                let line = self.line_no;
                self.fail(SourceError::Malformed { line, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CHANGE: &str = r#"{"project":"p","branch":"master","number":"42","status":"MERGED","owner":{"username":"alice"},"subject":"fix bug","patchSets":[{"number":1,"uploader":{"username":"bob"},"createdOn":1700000000,"files":[{"file":"a.py","type":"MODIFIED","insertions":3,"deletions":1}]}]}"#;
    const FOOTER: &str = r#"{"type":"stats","rowCount":1,"runTimeMilliseconds":12,"moreChanges":false}"#;

    fn dump(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn collect(source: &ChangeSource) -> Result<Vec<ChangeRecord>, SourceError> {
        source.records()?.collect()
    }

    #[test]
    fn test_footer_line_is_excluded() {
        let file = dump(&[CHANGE, FOOTER]);
        let source = ChangeSource::open(file.path(), FooterPolicy::Stats);
        let records = collect(&source).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 42);
        assert_eq!(records[0].subject, "fix bug");
    }

    #[test]
    fn test_missing_footer_fails_loudly() {
        let file = dump(&[CHANGE, CHANGE]);
        let source = ChangeSource::open(file.path(), FooterPolicy::Stats);
        let err = collect(&source).unwrap_err();
        assert!(matches!(err, SourceError::MissingFooter { line: 2 }));
    }

    #[test]
    fn test_no_footer_policy_reads_every_line() {
        let file = dump(&[CHANGE, CHANGE]);
        let source = ChangeSource::open(file.path(), FooterPolicy::Absent);
        assert_eq!(collect(&source).unwrap().len(), 2);
    }

    #[test]
    fn test_records_are_restartable() {
        let file = dump(&[CHANGE, CHANGE, FOOTER]);
        let source = ChangeSource::open(file.path(), FooterPolicy::Stats);
        let first = collect(&source).unwrap();
        let second = collect(&source).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let file = dump(&[CHANGE, "{not json", CHANGE, FOOTER]);
        let source = ChangeSource::open(file.path(), FooterPolicy::Stats);
        let mut records = source.records().unwrap();
        assert!(records.next().unwrap().is_ok());
        assert!(matches!(
            records.next().unwrap(),
            Err(SourceError::Malformed { line: 2, .. })
        ));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_missing_required_field_is_fatal() {
        let file = dump(&[r#"{"project":"p"}"#, FOOTER]);
        let source = ChangeSource::open(file.path(), FooterPolicy::Stats);
        assert!(matches!(
            collect(&source),
            Err(SourceError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_file() {
        let file = dump(&[]);
        let strict = ChangeSource::open(file.path(), FooterPolicy::Stats);
        assert!(matches!(collect(&strict), Err(SourceError::Empty)));
        let lenient = ChangeSource::open(file.path(), FooterPolicy::Absent);
        assert!(collect(&lenient).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let source = ChangeSource::open(Path::new("/nonexistent/changes.json"), FooterPolicy::Stats);
        assert!(matches!(source.records(), Err(SourceError::Read { .. })));
    }

    #[test]
    fn test_fixture_parses() {
        let file = dump(&[include_str!("../../tests/fixtures/changes.json").trim_end()]);
        let source = ChangeSource::open(file.path(), FooterPolicy::Stats);
        let records = collect(&source).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].patch_sets.len(), 2);
    }
}

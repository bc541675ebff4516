pub mod patch_set;
pub mod review;
pub mod subject;
pub mod tag;
pub mod time;

pub use tag::{TagOptions, TagParser};
pub use time::Timezone;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::sheet::types::Row;
use crate::source::ChangeRecord;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Change {0} has no patch sets")]
    NoPatchSets(u64),

    #[error("Timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error(transparent)]
    Tag(#[from] tag::TagError),
}

/// Language of the header row written above each sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLocale {
    #[default]
    Zh,
    En,
}

/// Inclusive date range that review comments must fall in, by patch set creation date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewWindow {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl ReviewWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.since.map_or(true, |since| date >= since) && self.until.map_or(true, |until| date <= until)
    }
}

pub struct ProjectionOptions {
    pub timezone: Timezone,
    pub headers: HeaderLocale,
    pub tags: TagParser,
    pub window: ReviewWindow,
}

/// Flattens a change into the rows of one target sheet.
pub trait Projection {
    /// Name of the sheet the rows are appended to.
    fn sheet_name(&self) -> &'static str;

    fn headers(&self, locale: HeaderLocale) -> &'static [&'static str];

    /// Must be pure: the same change always yields the same rows.
    fn project(&self, change: &ChangeRecord, options: &ProjectionOptions) -> Result<Vec<Row>, ProjectionError>;
}

/// Rows produced for one sheet from one change.
#[derive(Debug, Clone)]
pub struct SheetRows {
    pub sheet: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Row>,
}

/// `"42/1"`: the change number and patch set number as shown in the sheets.
pub fn change_ref(change_number: u64, patch_set_number: u64) -> String {
    format!("{}/{}", change_number, patch_set_number)
}

/// Run every projection over a change, in sheet order:
/// "Patch Set", "Review Info", "Change Subject".
pub fn run_all(change: &ChangeRecord, options: &ProjectionOptions) -> Result<Vec<SheetRows>, ProjectionError> {
    let projections: [&dyn Projection; 3] = [
        &patch_set::PatchSetProjection,
        &review::ReviewProjection,
        &subject::SubjectProjection,
    ];

    let mut out = Vec::with_capacity(projections.len());
    for projection in projections {
        let rows = projection.project(change, options)?;
        debug!(sheet = projection.sheet_name(), change = change.number, rows = rows.len(), "projected change");
        out.push(SheetRows {
            sheet: projection.sheet_name(),
            headers: projection.headers(options.headers),
            rows,
        });
    }
    Ok(out)
}

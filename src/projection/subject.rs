use super::{HeaderLocale, Projection, ProjectionError, ProjectionOptions};
use crate::sheet::types::{Cell, Row};
use crate::source::ChangeRecord;

pub const SHEET: &str = "Change Subject";

const HEADERS_ZH: &[&str] = &["项目名", "分支名", "change number", "subject"];
const HEADERS_EN: &[&str] = &["project name", "branch name", "change number", "subject"];

pub struct SubjectProjection;

impl Projection for SubjectProjection {
    fn sheet_name(&self) -> &'static str {
        SHEET
    }

    fn headers(&self, locale: HeaderLocale) -> &'static [&'static str] {
        match locale {
            HeaderLocale::Zh => HEADERS_ZH,
            HeaderLocale::En => HEADERS_EN,
        }
    }

    // One row per change, whatever its patch sets look like.
    fn project(&self, change: &ChangeRecord, _options: &ProjectionOptions) -> Result<Vec<Row>, ProjectionError> {
        Ok(vec![vec![
            Cell::from(change.project.as_str()),
            Cell::from(change.branch.as_str()),
            Cell::from(change.number),
            Cell::from(change.subject.as_str()),
        ]])
    }
}

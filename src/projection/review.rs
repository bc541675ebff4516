use super::time::DISPLAY_FORMAT;
use super::{change_ref, HeaderLocale, Projection, ProjectionError, ProjectionOptions};
use crate::sheet::types::{Cell, Row};
use crate::source::{ChangeRecord, PatchSet};

pub const SHEET: &str = "Review Info";

const HEADERS_ZH: &[&str] = &[
    "项目名",
    "分支名",
    "change number/patch set number",
    "状态",
    "上传者",
    "创建时间",
    "文件",
    "文件行数",
    "检视人",
    "严重级别",
    "问题类型",
    "检视信息",
];

// English column order differs from the zh layout; cells follow the headers.
const HEADERS_EN: &[&str] = &[
    "review message",
    "review date",
    "reviewed file",
    "line number of reviewed file",
    "inline message problem type",
    "inline message severity level",
    "change status",
    "patch set uploader",
    "reviewer",
    "project name",
    "branch name",
    "change number/patch set number",
];

/// One inline comment left by someone other than the patch set uploader.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub project: String,
    pub branch: String,
    pub change_ref: String,
    pub status: String,
    pub uploader: String,
    pub created: String,
    pub file: String,
    pub line: Option<u64>,
    pub reviewer: String,
    pub severity: String,
    pub problem_type: String,
    pub message: String,
}

impl ReviewRow {
    /// Cells in the column order of `locale`'s header row.
    pub fn into_cells(self, locale: HeaderLocale) -> Row {
        match locale {
            HeaderLocale::Zh => vec![
                Cell::from(self.project),
                Cell::from(self.branch),
                Cell::from(self.change_ref),
                Cell::from(self.status),
                Cell::from(self.uploader),
                Cell::from(self.created),
                Cell::from(self.file),
                Cell::from(self.line),
                Cell::from(self.reviewer),
                Cell::from(self.severity),
                Cell::from(self.problem_type),
                Cell::from(self.message),
            ],
            HeaderLocale::En => vec![
                Cell::from(self.message),
                Cell::from(self.created),
                Cell::from(self.file),
                Cell::from(self.line),
                Cell::from(self.problem_type),
                Cell::from(self.severity),
                Cell::from(self.status),
                Cell::from(self.uploader),
                Cell::from(self.reviewer),
                Cell::from(self.project),
                Cell::from(self.branch),
                Cell::from(self.change_ref),
            ],
        }
    }
}

/// Review rows for a single patch set. Starts from an empty list every call.
pub fn project_patch_set(
    change: &ChangeRecord,
    patch_set: &PatchSet,
    options: &ProjectionOptions,
) -> Result<Vec<ReviewRow>, ProjectionError> {
    let Some(comments) = &patch_set.comments else {
        return Ok(Vec::new());
    };

    let created_at = options.timezone.to_naive(patch_set.created_on)?;
    if !options.window.contains(created_at.date()) {
        return Ok(Vec::new());
    }
    let created = created_at.format(DISPLAY_FORMAT).to_string();

    let mut rows = Vec::new();
    for comment in comments {
        if comment.reviewer.username == patch_set.uploader.username {
            continue;
        }
        let tag = options.tags.parse(&comment.message)?;
        rows.push(ReviewRow {
            project: change.project.clone(),
            branch: change.branch.clone(),
            change_ref: change_ref(change.number, patch_set.number),
            status: change.status.to_string(),
            uploader: patch_set.uploader.username.clone(),
            created: created.clone(),
            file: comment.file.clone(),
            line: comment.line,
            reviewer: comment.reviewer.username.clone(),
            severity: tag.severity,
            problem_type: tag.problem_type,
            message: comment.message.clone(),
        });
    }
    Ok(rows)
}

/// Review rows across every patch set of a change, in patch set order.
pub fn project_reviews(change: &ChangeRecord, options: &ProjectionOptions) -> Result<Vec<ReviewRow>, ProjectionError> {
    let mut rows = Vec::new();
    for patch_set in &change.patch_sets {
        rows.extend(project_patch_set(change, patch_set, options)?);
    }
    Ok(rows)
}

pub struct ReviewProjection;

impl Projection for ReviewProjection {
    fn sheet_name(&self) -> &'static str {
        SHEET
    }

    fn headers(&self, locale: HeaderLocale) -> &'static [&'static str] {
        match locale {
            HeaderLocale::Zh => HEADERS_ZH,
            HeaderLocale::En => HEADERS_EN,
        }
    }

    fn project(&self, change: &ChangeRecord, options: &ProjectionOptions) -> Result<Vec<Row>, ProjectionError> {
        Ok(project_reviews(change, options)?
            .into_iter()
            .map(|row| row.into_cells(options.headers))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::tag::{TagDialect, TagOptions, TagParser};
    use crate::projection::tests::{comment, patch_set, test_change, test_options};
    use crate::projection::ReviewWindow;
    use chrono::NaiveDate;

    fn reviewed_change() -> ChangeRecord {
        let mut change = test_change();
        change.patch_sets = vec![
            PatchSet {
                comments: Some(vec![
                    comment("dave", "[Major][Logic] off by one"),
                    comment("bob", "fixed"),
                ]),
                ..patch_set(1, "bob")
            },
            PatchSet {
                comments: Some(vec![comment("erin", "nit")]),
                ..patch_set(2, "bob")
            },
            patch_set(3, "bob"),
        ];
        change
    }

    #[test]
    fn test_no_comments_no_rows() {
        assert!(project_reviews(&test_change(), &test_options()).unwrap().is_empty());
    }

    #[test]
    fn test_self_comments_are_excluded() {
        let rows = project_reviews(&reviewed_change(), &test_options()).unwrap();
        assert!(rows.iter().all(|r| r.reviewer != "bob"));
    }

    #[test]
    fn test_rows_do_not_accumulate_across_patch_sets() {
        let rows = project_reviews(&reviewed_change(), &test_options()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].change_ref, "42/1");
        assert_eq!(rows[0].reviewer, "dave");
        assert_eq!(rows[1].change_ref, "42/2");
        assert_eq!(rows[1].reviewer, "erin");
    }

    #[test]
    fn test_tag_columns_are_filled() {
        let rows = project_reviews(&reviewed_change(), &test_options()).unwrap();
        assert_eq!(rows[0].severity, "Major");
        assert_eq!(rows[0].problem_type, "Logic");
        assert_eq!(rows[1].severity, "");
        assert_eq!(rows[1].problem_type, "");
    }

    #[test]
    fn test_change_fields_are_denormalized() {
        let rows = project_reviews(&reviewed_change(), &test_options()).unwrap();
        for row in &rows {
            assert_eq!(row.project, "p");
            assert_eq!(row.branch, "master");
            assert_eq!(row.status, "MERGED");
        }
    }

    #[test]
    fn test_strict_tags_propagate_errors() {
        let mut options = test_options();
        options.tags = TagParser::new(TagOptions {
            dialect: TagDialect::Bracketed,
            strict: true,
        })
        .unwrap();
        assert!(matches!(
            project_reviews(&reviewed_change(), &options),
            Err(ProjectionError::Tag(_))
        ));
    }

    #[test]
    fn test_window_filters_by_patch_set_date() {
        let mut change = reviewed_change();
        // ten days after the first patch set
        change.patch_sets[1].created_on = 1_700_000_000 + 10 * 86_400;
        let mut options = test_options();
        options.window = ReviewWindow {
            since: NaiveDate::from_ymd_opt(2023, 11, 20),
            until: None,
        };
        let rows = project_reviews(&change, &options).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].change_ref, "42/2");
    }

    #[test]
    fn test_english_headers_follow_review_export_layout() {
        assert_eq!(
            ReviewProjection.headers(HeaderLocale::En),
            [
                "review message",
                "review date",
                "reviewed file",
                "line number of reviewed file",
                "inline message problem type",
                "inline message severity level",
                "change status",
                "patch set uploader",
                "reviewer",
                "project name",
                "branch name",
                "change number/patch set number",
            ]
        );
    }

    #[test]
    fn test_english_cells_line_up_with_headers() {
        let mut options = test_options();
        options.headers = HeaderLocale::En;
        let rows = ReviewProjection.project(&reviewed_change(), &options).unwrap();
        let headers = ReviewProjection.headers(HeaderLocale::En);
        let row = &rows[0];
        assert_eq!(row.len(), headers.len());

        let column = |name: &str| headers.iter().position(|h| *h == name).unwrap();
        assert_eq!(row[column("review message")], Cell::from("[Major][Logic] off by one"));
        assert_eq!(row[column("review date")], Cell::from("2023-11-15 06:13:20"));
        assert_eq!(row[column("inline message severity level")], Cell::from("Major"));
        assert_eq!(row[column("inline message problem type")], Cell::from("Logic"));
        assert_eq!(row[column("reviewer")], Cell::from("dave"));
        assert_eq!(row[column("change number/patch set number")], Cell::from("42/1"));
    }

    #[test]
    fn test_zh_cells_line_up_with_headers() {
        let rows = ReviewProjection.project(&reviewed_change(), &test_options()).unwrap();
        let headers = ReviewProjection.headers(HeaderLocale::Zh);
        assert_eq!(rows[0].len(), headers.len());
        assert_eq!(rows[0][0], Cell::from("p"));
        assert_eq!(rows[0][11], Cell::from("[Major][Logic] off by one"));
    }
}

use super::{change_ref, HeaderLocale, Projection, ProjectionError, ProjectionOptions};
use crate::sheet::types::{Cell, Row};
use crate::source::ChangeRecord;

pub const SHEET: &str = "Patch Set";

/// Gerrit's synthetic entry for the commit message. Matched exactly, so real
/// paths that merely contain the name are kept.
const COMMIT_MSG: &str = "/COMMIT_MSG";

const HEADERS_ZH: &[&str] = &[
    "项目名",
    "分支名",
    "change number/patch set number",
    "状态",
    "Owner",
    "上传者",
    "创建时间",
    "文件",
    "文件类型",
    "文件插入行数",
    "文件删除行数",
];

const HEADERS_EN: &[&str] = &[
    "project name",
    "branch name",
    "change number/patch set number",
    "change status",
    "owner",
    "patch set uploader",
    "created time",
    "file",
    "file type",
    "insertions",
    "deletions",
];

/// One file touched by the latest patch set of a change.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSetRow {
    pub project: String,
    pub branch: String,
    pub change_ref: String,
    pub status: String,
    pub owner: String,
    pub uploader: String,
    pub created: String,
    pub file: String,
    pub file_type: String,
    pub insertions: u64,
    pub deletions: u64,
}

impl PatchSetRow {
    pub fn into_cells(self) -> Row {
        vec![
            Cell::from(self.project),
            Cell::from(self.branch),
            Cell::from(self.change_ref),
            Cell::from(self.status),
            Cell::from(self.owner),
            Cell::from(self.uploader),
            Cell::from(self.created),
            Cell::from(self.file),
            Cell::from(self.file_type),
            Cell::from(self.insertions),
            Cell::from(self.deletions),
        ]
    }
}

/// Rows for the files of the last patch set only.
///
/// A patch set without a file list yields a single placeholder row.
pub fn project_files(change: &ChangeRecord, options: &ProjectionOptions) -> Result<Vec<PatchSetRow>, ProjectionError> {
    let last = change
        .last_patch_set()
        .ok_or(ProjectionError::NoPatchSets(change.number))?;
    let created = options.timezone.format(last.created_on)?;

    let row = |file: &str, file_type: &str, insertions: u64, deletions: u64| PatchSetRow {
        project: change.project.clone(),
        branch: change.branch.clone(),
        change_ref: change_ref(change.number, last.number),
        status: change.status.to_string(),
        owner: change.owner.username.clone(),
        uploader: last.uploader.username.clone(),
        created: created.clone(),
        file: file.to_string(),
        file_type: file_type.to_string(),
        insertions,
        deletions,
    };

    let rows = match &last.files {
        Some(files) => files
            .iter()
            .filter(|f| f.file != COMMIT_MSG)
            .map(|f| row(&f.file, &f.change_type, f.insertions, f.deletions))
            .collect(),
        None => vec![row("No file changed.", "UNKNOWN", 0, 0)],
    };
    Ok(rows)
}

pub struct PatchSetProjection;

impl Projection for PatchSetProjection {
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
        Ok(project_files(change, options)?
            .into_iter()
            .map(PatchSetRow::into_cells)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::tests::{file, patch_set, test_change, test_options};
    use crate::source::PatchSet;

    #[test]
    fn test_single_file_scenario() {
        let rows = project_files(&test_change(), &test_options()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.change_ref, "42/1");
        assert_eq!(row.file, "a.py");
        assert_eq!(row.insertions, 3);
        assert_eq!(row.deletions, 1);
        assert_eq!(row.status, "MERGED");
        assert_eq!(row.owner, "alice");
        assert_eq!(row.uploader, "bob");
        assert_eq!(row.created, "2023-11-15 06:13:20");
    }

    #[test]
    fn test_only_last_patch_set_is_projected() {
        let mut change = test_change();
        change.patch_sets.push(PatchSet {
            files: Some(vec![file("b.py", 1, 0), file("c.py", 2, 2)]),
            ..patch_set(2, "carol")
        });
        let rows = project_files(&change, &test_options()).unwrap();
        let files: Vec<&str> = rows.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["b.py", "c.py"]);
        assert!(rows.iter().all(|r| r.change_ref == "42/2" && r.uploader == "carol"));
    }

    #[test]
    fn test_missing_files_yields_placeholder() {
        let mut change = test_change();
        change.patch_sets = vec![patch_set(1, "bob")];
        let rows = project_files(&change, &test_options()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file, "No file changed.");
        assert_eq!(rows[0].file_type, "UNKNOWN");
        assert_eq!(rows[0].insertions, 0);
        assert_eq!(rows[0].deletions, 0);
    }

    #[test]
    fn test_commit_msg_is_filtered() {
        let mut change = test_change();
        change.patch_sets[0].files = Some(vec![file("/COMMIT_MSG", 9, 0), file("a.py", 3, 1)]);
        let rows = project_files(&change, &test_options()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file, "a.py");

        change.patch_sets[0].files = Some(vec![file("/COMMIT_MSG", 9, 0)]);
        assert!(project_files(&change, &test_options()).unwrap().is_empty());
    }

    #[test]
    fn test_paths_containing_commit_msg_are_kept() {
        let mut change = test_change();
        change.patch_sets[0].files = Some(vec![
            file("docs/COMMIT_MSG.md", 2, 0),
            file("tools/COMMIT_MSG", 1, 1),
        ]);
        let rows = project_files(&change, &test_options()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].file, "tools/COMMIT_MSG");
    }

    #[test]
    fn test_cells_follow_header_order() {
        let cells = project_files(&test_change(), &test_options())
            .unwrap()
            .remove(0)
            .into_cells();
        assert_eq!(cells.len(), HEADERS_ZH.len());
        assert_eq!(cells.len(), HEADERS_EN.len());
        assert_eq!(cells[7], Cell::from("a.py"));
        assert_eq!(cells[9], Cell::Int(3));
    }
}

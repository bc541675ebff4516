use serde::de::{self, Deserializer};
use serde::Deserialize;

/// One change as emitted by `gerrit query --format json --patch-sets --files --comments`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub project: String,
    pub branch: String,
    /// Change number. Older servers emit it as a string.
    #[serde(deserialize_with = "number_or_string")]
    pub number: u64,
    pub status: ChangeStatus,
    pub owner: Account,
    pub subject: String,
    /// Patch sets in upload order.
    pub patch_sets: Vec<PatchSet>,
}

impl ChangeRecord {
    /// The most recent patch set, if the change has any.
    pub fn last_patch_set(&self) -> Option<&PatchSet> {
        self.patch_sets.last()
    }
}

/// Review state of a change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ChangeStatus {
    New,
    Merged,
    Abandoned,
    Draft,
    Other(String),
}

impl From<String> for ChangeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NEW" => ChangeStatus::New,
            "MERGED" => ChangeStatus::Merged,
            "ABANDONED" => ChangeStatus::Abandoned,
            "DRAFT" => ChangeStatus::Draft,
            _ => ChangeStatus::Other(value),
        }
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeStatus::New => write!(f, "NEW"),
            ChangeStatus::Merged => write!(f, "MERGED"),
            ChangeStatus::Abandoned => write!(f, "ABANDONED"),
            ChangeStatus::Draft => write!(f, "DRAFT"),
            ChangeStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
}

/// One upload within a change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet {
    #[serde(deserialize_with = "number_or_string")]
    pub number: u64,
    pub uploader: Account,
    /// Unix epoch seconds.
    pub created_on: i64,
    /// Absent when the dump was taken without `--files` or nothing changed.
    pub files: Option<Vec<FileDelta>>,
    pub comments: Option<Vec<InlineComment>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileDelta {
    pub file: String,
    #[serde(rename = "type")]
    pub change_type: String,
    pub insertions: u64,
    /// Gerrit reports deletions as a negative count; the magnitude is kept.
    #[serde(deserialize_with = "unsigned_magnitude")]
    pub deletions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineComment {
    pub file: String,
    #[serde(default, deserialize_with = "optional_line")]
    pub line: Option<u64>,
    pub reviewer: Account,
    pub message: String,
}

/// Trailing statistics record of a query dump.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    #[serde(rename = "type")]
    pub kind: String,
    pub row_count: u64,
    #[serde(default)]
    pub more_changes: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

fn parse_digits<E: de::Error>(raw: &str) -> Result<u64, E> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| E::custom(format!("expected a number, found {:?}", raw)))
}

fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => {
            u64::try_from(n).map_err(|_| de::Error::custom(format!("negative number {}", n)))
        }
        NumberOrString::Text(s) => parse_digits(&s),
    }
}

fn unsigned_magnitude<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = i64::deserialize(deserializer)?;
    Ok(n.unsigned_abs())
}

fn optional_line<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(u64::try_from(n).ok()),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => parse_digits(&s).map(Some),
    }
}

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::Deserialize;

use super::ProjectionError;

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How epoch timestamps are rendered in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Timezone {
    /// Whatever the host's local timezone is.
    #[default]
    Local,
    /// UTC shifted by a fixed eight hours, regardless of the host.
    Utc8,
}

impl Timezone {
    pub fn to_naive(self, epoch_seconds: i64) -> Result<NaiveDateTime, ProjectionError> {
        let converted = match self {
            Timezone::Local => Local
                .timestamp_opt(epoch_seconds, 0)
                .single()
                .map(|dt| dt.naive_local()),
            Timezone::Utc8 => FixedOffset::east_opt(8 * 3600).and_then(|offset| {
                DateTime::from_timestamp(epoch_seconds, 0)
                    .map(|utc| utc.with_timezone(&offset).naive_local())
            }),
        };
        converted.ok_or(ProjectionError::InvalidTimestamp(epoch_seconds))
    }

    /// Render as `YYYY-MM-DD HH:MM:SS`.
    pub fn format(self, epoch_seconds: i64) -> Result<String, ProjectionError> {
        Ok(self.to_naive(epoch_seconds)?.format(DISPLAY_FORMAT).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc8_shift() {
        // 2023-11-14 22:13:20 UTC
        assert_eq!(
            Timezone::Utc8.format(1_700_000_000).unwrap(),
            "2023-11-15 06:13:20"
        );
    }

    #[test]
    fn test_local_format_shape() {
        let rendered = Timezone::Local.format(1_700_000_000).unwrap();
        assert_eq!(rendered.len(), 19);
        assert_eq!(&rendered[4..5], "-");
        assert_eq!(&rendered[10..11], " ");
    }

    #[test]
    fn test_out_of_range_epoch() {
        assert!(matches!(
            Timezone::Utc8.format(i64::MAX),
            Err(ProjectionError::InvalidTimestamp(_))
        ));
    }
}

//! Review tags embedded in inline comments.
//!
//! Teams mark inline comments with a short bracketed prefix so the export can
//! split out how bad a finding is and what kind of problem it is. Two prefix
//! styles are in use: `[Major][Logic] ...`, taken verbatim, and `[RE,G] ...`,
//! whose short codes are expanded to descriptions.

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

const BRACKETED_PATTERN: &str = r"\[([a-zA-Z]+)\]\[([a-zA-Z]+)\]";
const CODED_PATTERN: &str = r"\[([a-zA-Z]+),([a-zA-Z]+)\]";

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Inline message carries no {dialect} tag: {message:?}")]
    Unmatched { dialect: TagDialect, message: String },

    #[error("Unknown {kind} code {code:?} in inline message")]
    UnknownCode { kind: &'static str, code: String },

    #[error("Invalid tag pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagDialect {
    /// `[Severity][ProblemType]`, both kept as written.
    #[default]
    Bracketed,
    /// `[PROBLEM,SEVERITY]` short codes expanded to descriptions.
    Coded,
}

impl std::fmt::Display for TagDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagDialect::Bracketed => write!(f, "bracketed"),
            TagDialect::Coded => write!(f, "coded"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TagOptions {
    #[serde(default)]
    pub dialect: TagDialect,
    /// Reject messages without a tag, and unknown codes, instead of leaving the columns empty.
    #[serde(default)]
    pub strict: bool,
}

/// Severity and problem type pulled out of an inline message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineTag {
    pub severity: String,
    pub problem_type: String,
}

pub struct TagParser {
    options: TagOptions,
    pattern: Regex,
}

impl TagParser {
    pub fn new(options: TagOptions) -> Result<Self, TagError> {
        let pattern = match options.dialect {
            TagDialect::Bracketed => Regex::new(BRACKETED_PATTERN)?,
            TagDialect::Coded => Regex::new(CODED_PATTERN)?,
        };
        Ok(Self { options, pattern })
    }

    pub fn parse(&self, message: &str) -> Result<InlineTag, TagError> {
        let Some(caps) = self.pattern.captures(message) else {
            if self.options.strict {
                return Err(TagError::Unmatched {
                    dialect: self.options.dialect,
                    message: message.to_string(),
                });
            }
            return Ok(InlineTag::default());
        };
        let first = &caps[1];
        let second = &caps[2];

        match self.options.dialect {
            TagDialect::Bracketed => Ok(InlineTag {
                severity: first.to_string(),
                problem_type: second.to_string(),
            }),
            TagDialect::Coded => Ok(InlineTag {
                severity: self.decode("severity", second, severity_description)?,
                problem_type: self.decode("problem type", first, problem_description)?,
            }),
        }
    }

    fn decode(
        &self,
        kind: &'static str,
        code: &str,
        table: fn(&str) -> Option<&'static str>,
    ) -> Result<String, TagError> {
        match table(code) {
            Some(description) => Ok(description.to_string()),
            None if self.options.strict => Err(TagError::UnknownCode {
                kind,
                code: code.to_string(),
            }),
            None => Ok(code.to_string()),
        }
    }
}

fn problem_description(code: &str) -> Option<&'static str> {
    match code {
        "RE" => Some("error of understanding requirement"),
        "LE" => Some("error of running result"),
        "CO" => Some("code can promote"),
        "CS" => Some("syntax error"),
        "CE" => Some("error of code instruction"),
        _ => None,
    }
}

fn severity_description(code: &str) -> Option<&'static str> {
    match code {
        "F" => Some("fatal"),
        "S" => Some("critical"),
        "G" => Some("major"),
        "T" => Some("minor"),
        _ => None,
    }
}

use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::projection::{self, ProjectionError, ProjectionOptions};
use crate::sheet::layout::{self, LayoutConfig};
use crate::sheet::{SheetError, Workbook};
use crate::source::{ChangeSource, FooterPolicy, SourceError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to project change {change}: {source}")]
    Projection {
        change: u64,
        #[source]
        source: ProjectionError,
    },

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

pub struct ExportOptions {
    pub footer: FooterPolicy,
    pub projection: ProjectionOptions,
    pub layout: LayoutConfig,
}

/// Row counts for one sheet of the written workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSummary {
    pub name: String,
    pub added: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub changes: usize,
    pub sheets: Vec<SheetSummary>,
}

/// Export every change in `source` into the workbook at `target`.
///
/// Rows are appended after whatever the target already holds and the
/// workbook is written once, at the end. Any error aborts the run before
/// the target is touched.
#[instrument(skip_all, fields(source = %source.display(), target = %target.display()))]
pub fn run(source: &Path, target: &Path, options: &ExportOptions) -> Result<ExportSummary, ExportError> {
    let mut workbook = Workbook::open_or_new(target)?;
    layout::strip_index(&mut workbook, &options.layout.index_header);
    let before: HashMap<String, usize> = workbook
        .sheets()
        .iter()
        .map(|s| (s.name.clone(), s.rows.len()))
        .collect();

    let changes = ChangeSource::open(source, options.footer);
    let mut count = 0;
    for (index, record) in changes.records()?.enumerate() {
        let change = record?;
        let projected = projection::run_all(&change, &options.projection).map_err(|source| {
            ExportError::Projection {
                change: change.number,
                source,
            }
        })?;

        for rows in projected {
            let added = rows.rows.len();
            let total = workbook.append(rows.sheet, rows.headers, rows.rows);
            debug!(sheet = rows.sheet, added, total, "appended rows");
        }
        info!(index, change = change.number, project = %change.project, "added change to workbook");
        count += 1;
    }

    let sheets = workbook
        .sheets()
        .iter()
        .map(|s| SheetSummary {
            name: s.name.clone(),
            added: s.rows.len() - before.get(&s.name).copied().unwrap_or(0),
            total: s.rows.len(),
        })
        .collect();

    if options.layout.enabled {
        layout::apply(&mut workbook, &options.layout)?;
    }
    workbook.save(target)?;
    info!(changes = count, "workbook written");

    Ok(ExportSummary { changes: count, sheets })
}

/// Print a short per-sheet summary to the terminal.
pub fn print_summary(summary: &ExportSummary, target: &Path) {
    println!();
    println!(
        "Exported {} change(s) to {}",
        summary.changes.to_string().bold(),
        target.display()
    );
    for sheet in &summary.sheets {
        let added = if sheet.added == 0 {
            "+0".dimmed()
        } else {
            format!("+{}", sheet.added).green().bold()
        };
        println!("  • {:<16} {:>8} rows  (total {})", sheet.name, added, sheet.total);
    }
    println!();
}

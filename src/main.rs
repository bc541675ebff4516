mod config;
mod export;
mod projection;
mod sheet;
mod source;

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use projection::tag::TagDialect;
use projection::{HeaderLocale, ProjectionOptions, ReviewWindow, TagParser, Timezone};
use source::FooterPolicy;

/// Review Export: reads a `gerrit query --format json` dump and appends
/// patch set files, inline review comments and change subjects to an xlsx workbook.
#[derive(Parser, Debug)]
#[command(name = "review-export", version, about)]
struct Cli {
    /// Newline-delimited JSON dump of changes
    source: PathBuf,

    /// Workbook to append to (created if missing)
    target: PathBuf,

    /// Config file to use instead of ./.review-export.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How patch set timestamps are rendered
    #[arg(long, value_enum)]
    timezone: Option<Timezone>,

    /// Language of the header rows
    #[arg(long, value_enum)]
    headers: Option<HeaderLocale>,

    /// Inline comment tag style
    #[arg(long, value_enum)]
    tags: Option<TagDialect>,

    /// Fail on inline comments without a recognised tag
    #[arg(long)]
    strict_tags: bool,

    /// Whether the dump ends with a query statistics line
    #[arg(long, value_enum)]
    footer: Option<FooterPolicy>,

    /// Only export review comments on patch sets created on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Only export review comments on patch sets created on or before this date (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Skip the index column, borders, widths and empty sheet removal
    #[arg(long)]
    no_layout: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("review_export", source = %cli.source.display(), target = %cli.target.display()).entered();

    info!("loading configuration");
    let mut config = match &cli.config {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };

    if let Some(timezone) = cli.timezone {
        config.export.timezone = timezone;
    }
    if let Some(headers) = cli.headers {
        config.export.headers = headers;
    }
    if let Some(footer) = cli.footer {
        config.export.footer = footer;
    }
    if let Some(dialect) = cli.tags {
        config.tags.dialect = dialect;
    }
    if cli.strict_tags {
        config.tags.strict = true;
    }
    if cli.no_layout {
        config.layout.enabled = false;
    }
    debug!(?config, "resolved configuration");

    let options = export::ExportOptions {
        footer: config.export.footer,
        projection: ProjectionOptions {
            timezone: config.export.timezone,
            headers: config.export.headers,
            tags: TagParser::new(config.tags)?,
            window: ReviewWindow {
                since: cli.since,
                until: cli.until,
            },
        },
        layout: config.layout,
    };

    info!("exporting changes");
    let summary = export::run(&cli.source, &cli.target, &options)?;
    export::print_summary(&summary, &cli.target);
    info!(changes = summary.changes, "done");

    Ok(())
}

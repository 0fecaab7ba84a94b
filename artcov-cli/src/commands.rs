//! Subcommand implementations

use anyhow::{anyhow, Context, Result};
use artcov_common::config::AppConfig;
use artcov_common::events::ModelEvent;
use artcov_common::formats::{exporter_for, JsonFormat};
use artcov_common::grid::ScoreGrid;
use artcov_common::{Article, ArticleId, ComputedModel, Subject, SubjectId, VerifiedData};
use clap::{Args, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Subject name, in rank order (repeatable)
    #[arg(long = "subject", value_name = "NAME", required = true)]
    pub subjects: Vec<String>,

    /// Article name (repeatable)
    #[arg(long = "article", value_name = "NAME")]
    pub articles: Vec<String>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// JSON document
    pub file: PathBuf,

    /// Sort articles by descending h before printing
    #[arg(long)]
    pub sort: bool,

    /// Decimals for score columns (overrides config)
    #[arg(long)]
    pub precision: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// JSON document
    pub file: PathBuf,

    /// Output file (defaults to overwriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append a subject; the configured default name is used if NAME is omitted
    #[arg(long = "add-subject", value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
    pub add_subjects: Vec<String>,

    /// Append an article; the configured default name is used if NAME is omitted
    #[arg(long = "add-article", value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
    pub add_articles: Vec<String>,

    /// Mark article A as appearing at subject S
    #[arg(long = "appear", value_name = "A:S", value_parser = parse_pair)]
    pub appear: Vec<(ArticleId, SubjectId)>,

    /// Remove subject S from article A's appearance
    #[arg(long = "clear", value_name = "A:S", value_parser = parse_pair)]
    pub clear: Vec<(ArticleId, SubjectId)>,

    /// Make subject S the first appearance of article A
    #[arg(long = "first", value_name = "A:S", value_parser = parse_pair)]
    pub first: Vec<(ArticleId, SubjectId)>,

    /// Expand article A to every subject, or collapse it to the first one
    #[arg(long = "toggle", value_name = "A", value_parser = parse_article_id)]
    pub toggle: Vec<ArticleId>,

    /// Remove article A
    #[arg(long = "remove", value_name = "A", value_parser = parse_article_id)]
    pub remove: Vec<ArticleId>,

    /// Sort articles by descending h after editing
    #[arg(long)]
    pub sort: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON document
    pub file: PathBuf,

    /// Output format
    #[arg(long, value_enum)]
    pub format: ExportFormat,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

pub fn init(args: InitArgs) -> Result<()> {
    let subjects = (1u32..)
        .zip(args.subjects)
        .map(|(id, name)| Subject::new(SubjectId::new(id), name))
        .collect();
    let articles = (1u32..)
        .zip(args.articles)
        .map(|(id, name)| Article::new(ArticleId::new(id), name))
        .collect();

    let verified = VerifiedData::with_defaults(subjects, articles)
        .context("Cannot build document")?;
    info!(
        subjects = verified.data().subjects.len(),
        articles = verified.data().articles.len(),
        "Created document with default placement"
    );

    let bytes = JsonFormat::export(&verified)?;
    write_output(args.output.as_deref(), &bytes)
}

pub fn score(args: ScoreArgs, config: &AppConfig) -> Result<()> {
    let mut model = load_model(&args.file)?;
    if args.sort || config.display.sort_on_load {
        model.sort();
    }

    let precision = args.precision.unwrap_or(config.display.precision);
    let grid = ScoreGrid::new(model).with_precision(precision);

    let mut out = std::io::stdout().lock();
    out.write_all(render_grid(&grid).as_bytes())?;
    Ok(())
}

pub fn edit(args: EditArgs, config: &AppConfig) -> Result<()> {
    let mut model = load_model(&args.file)?;
    if config.display.sort_on_load {
        model.sort();
    }

    let mut grid = ScoreGrid::new(model).with_precision(config.display.precision);
    let mut events = grid.subscribe();

    apply_edits(&mut grid, &args, config, &mut events)?;

    let output = args.output.as_deref().unwrap_or(&args.file);
    let model = grid.into_model();
    let bytes = JsonFormat::export(&model.data())?;
    write_output(Some(output), &bytes)?;

    info!(
        "Wrote {} ({} subjects, {} articles, C_nu {})",
        output.display(),
        model.subject_count(),
        model.article_count(),
        format_c_nu(model.c_nu(), config.display.precision)
    );
    Ok(())
}

pub fn export(args: ExportArgs, config: &AppConfig) -> Result<()> {
    let mut model = load_model(&args.file)?;
    if config.display.sort_on_load {
        model.sort();
    }

    let exporter = exporter_for(args.format.name())
        .ok_or_else(|| anyhow!("No exporter for format '{}'", args.format.name()))?;
    let bytes = exporter.export_data(&model)?;

    debug!(format = exporter.extension(), bytes = bytes.len(), "Exported document");
    write_output(args.output.as_deref(), &bytes)
}

/// Apply edits in a fixed order: additions, appearance changes, first
/// appearances, row toggles, removals, sort
fn apply_edits(
    grid: &mut ScoreGrid,
    args: &EditArgs,
    config: &AppConfig,
    events: &mut broadcast::Receiver<ModelEvent>,
) -> Result<()> {
    for name in &args.add_subjects {
        let name = or_default(name, &config.defaults.subject_name);
        let id = grid.add_subject(name);
        info!(subject = %id, "Added subject '{}'", name);
    }
    log_events(events);

    for name in &args.add_articles {
        let name = or_default(name, &config.defaults.article_name);
        let id = grid.add_article(name);
        info!(article = %id, "Added article '{}'", name);
    }
    log_events(events);

    for &(article, subject) in &args.appear {
        let (row, column) = locate(grid, article, subject)?;
        grid.set_appearance(row, column, true)
            .with_context(|| format!("Cannot mark article {article} at subject {subject}"))?;
    }
    log_events(events);

    for &(article, subject) in &args.clear {
        let (row, column) = locate(grid, article, subject)?;
        grid.set_appearance(row, column, false)
            .with_context(|| format!("Cannot clear article {article} at subject {subject}"))?;
    }
    log_events(events);

    for &(article, subject) in &args.first {
        let (row, column) = locate(grid, article, subject)?;
        grid.set_first_appearance(row, column).with_context(|| {
            format!("Cannot make subject {subject} the first appearance of article {article}")
        })?;
    }
    log_events(events);

    for &article in &args.toggle {
        grid.toggle_whole_row(row_of(grid, article)?)
            .with_context(|| format!("Cannot toggle article {article}"))?;
    }
    log_events(events);

    for &article in &args.remove {
        grid.remove_row(row_of(grid, article)?)
            .with_context(|| format!("Cannot remove article {article}"))?;
    }
    log_events(events);

    if args.sort {
        grid.sort();
        log_events(events);
    }

    Ok(())
}

fn or_default<'a>(name: &'a str, default: &'a str) -> &'a str {
    if name.trim().is_empty() {
        default
    } else {
        name
    }
}

fn row_of(grid: &ScoreGrid, article: ArticleId) -> Result<usize> {
    grid.row_of(article)
        .ok_or_else(|| anyhow!("No article with id {}", article))
}

fn locate(grid: &ScoreGrid, article: ArticleId, subject: SubjectId) -> Result<(usize, usize)> {
    let row = row_of(grid, article)?;
    let column = grid
        .column_of(subject)
        .ok_or_else(|| anyhow!("No subject with id {}", subject))?;
    Ok((row, column))
}

/// Drain pending notifications into the log
fn log_events(events: &mut broadcast::Receiver<ModelEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!(event = event.event_type(), "{}", json),
                Err(e) => warn!("Failed to serialize {} event: {}", event.event_type(), e),
            },
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Event log fell behind, {} events skipped", skipped)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return,
        }
    }
}

fn load_model(path: &Path) -> Result<ComputedModel> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let verified =
        JsonFormat::import(&bytes).with_context(|| format!("Failed to import {}", path.display()))?;
    Ok(ComputedModel::compute(verified))
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(bytes)?;
            if !bytes.ends_with(b"\n") {
                out.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// Plain-text table with a trailing C_nu line
fn render_grid(grid: &ScoreGrid) -> String {
    let columns = grid.column_count();

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(grid.row_count() + 1);
    rows.push(
        (0..columns)
            .map(|c| {
                grid.header(c)
                    .map(|h| h.replace('\n', " #"))
                    .unwrap_or_default()
            })
            .collect(),
    );
    for row in 0..grid.row_count() {
        rows.push((0..columns).map(|c| grid.display(row, c)).collect());
    }

    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .map(|r| r[c].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut text = String::new();
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width.saturating_sub(cell.chars().count());
                format!("{}{}", cell, " ".repeat(pad))
            })
            .collect();
        text.push_str(cells.join(" | ").trim_end());
        text.push('\n');
    }

    text.push_str(&format!(
        "C_nu = {}\n",
        format_c_nu(grid.c_nu(), grid.precision())
    ));
    text
}

fn format_c_nu(c_nu: Option<f64>, precision: usize) -> String {
    match c_nu {
        Some(value) => format!("{:.*}", precision, value),
        None => "n/a".to_string(),
    }
}

fn parse_id(value: &str) -> Result<u32, String> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("'{}' is not a valid id: {}", value, e))
}

/// Parse `ARTICLE:SUBJECT`, e.g. `3:1`
pub fn parse_pair(value: &str) -> Result<(ArticleId, SubjectId), String> {
    let Some((article, subject)) = value.split_once(':') else {
        return Err(format!("expected ARTICLE:SUBJECT, got '{}'", value));
    };
    Ok((
        ArticleId::new(parse_id(article)?),
        SubjectId::new(parse_id(subject)?),
    ))
}

pub fn parse_article_id(value: &str) -> Result<ArticleId, String> {
    parse_id(value).map(ArticleId::new)
}

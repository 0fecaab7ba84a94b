//! Score grid
//!
//! Table view over a [`ComputedModel`] for editing surfaces. Rows are
//! articles in model order. Columns are laid out as:
//!
//! | column            | content                       |
//! |-------------------|-------------------------------|
//! | 0                 | article name                  |
//! | 1..=n             | subjects in rank order        |
//! | n+1, n+2, n+3     | `l`, `c`, `h` (reserved)      |
//!
//! Every successful edit publishes [`ModelEvent`]s on the grid's
//! [`EventBus`]; rejected edits publish nothing.

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::data::Subject;
use crate::events::{EventBus, ModelEvent};
use crate::ids::{ArticleId, SubjectId};
use crate::model::{ComputedModel, ModelError};

/// First subject column
pub const SUBJECTS_START: usize = 1;

/// Trailing columns holding `l`, `c`, `h`
pub const RESERVED_COLUMNS: usize = 3;

/// Cell marker for "article touches this subject"
pub const APPEARANCE_MARKER: &str = "🔴";

/// Cell marker for "article is first introduced here"
pub const FIRST_APPEARANCE_MARKER: &str = "✅";

/// Default number of decimals for score cells
pub const DEFAULT_PRECISION: usize = 2;

/// Grid coordinates that do not map to a model entity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("column {0} is not a subject column")]
    NotASubjectColumn(usize),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Content of one cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Name(String),
    Subject { appeared: bool, first: bool },
    Score(f64),
}

/// Editable table over a computed model
pub struct ScoreGrid {
    model: ComputedModel,
    events: EventBus,
    precision: usize,
}

impl ScoreGrid {
    pub fn new(model: ComputedModel) -> Self {
        Self {
            model,
            events: EventBus::default(),
            precision: DEFAULT_PRECISION,
        }
    }

    /// Number of decimals used by [`ScoreGrid::display`] for score cells
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn model(&self) -> &ComputedModel {
        &self.model
    }

    pub fn into_model(self) -> ComputedModel {
        self.model
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    pub fn row_count(&self) -> usize {
        self.model.article_count()
    }

    pub fn column_count(&self) -> usize {
        SUBJECTS_START + self.model.subject_count() + RESERVED_COLUMNS
    }

    /// One past the last subject column
    pub fn subjects_column_end(&self) -> usize {
        self.column_count() - RESERVED_COLUMNS
    }

    /// 0-based subject position for a column (rank - 1)
    pub fn subject_index(&self, column: usize) -> Option<usize> {
        (SUBJECTS_START..self.subjects_column_end())
            .contains(&column)
            .then(|| column - SUBJECTS_START)
    }

    /// Column showing the subject at 0-based position `index`
    pub fn subject_column(&self, index: usize) -> usize {
        SUBJECTS_START + index
    }

    /// Current row of an article
    pub fn row_of(&self, article: ArticleId) -> Option<usize> {
        self.model.articles().iter().position(|a| a.id == article)
    }

    /// Current column of a subject
    pub fn column_of(&self, subject: SubjectId) -> Option<usize> {
        self.model
            .rank_of_subject(subject)
            .map(|rank| self.subject_column(rank - 1))
    }

    pub fn header(&self, column: usize) -> Option<String> {
        let end = self.subjects_column_end();
        match column {
            0 => Some("Article Name".to_string()),
            c if c == end => Some("L".to_string()),
            c if c == end + 1 => Some("C".to_string()),
            c if c == end + 2 => Some("h".to_string()),
            c => self
                .subject_index(c)
                .and_then(|i| self.model.subject_at(i))
                .map(|s| format!("{}\n{}", s.name, c)),
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<CellValue> {
        let article = self.model.article_at(row)?;

        if column == 0 {
            return Some(CellValue::Name(article.name.clone()));
        }

        if let Some(index) = self.subject_index(column) {
            let subject = self.model.subject_at(index)?.id;
            return Some(CellValue::Subject {
                appeared: self.model.is_article_appeared_at(article.id, subject),
                first: self.model.is_article_first_appeared_at(article.id, subject),
            });
        }

        let scores = self.model.computed_data_for_article(article.id);
        let end = self.subjects_column_end();
        match column - end {
            0 => Some(CellValue::Score(scores.l)),
            1 => Some(CellValue::Score(scores.c)),
            2 => Some(CellValue::Score(scores.h)),
            _ => None,
        }
    }

    /// Text shown for a cell; empty for unknown coordinates
    pub fn display(&self, row: usize, column: usize) -> String {
        match self.cell(row, column) {
            Some(CellValue::Name(name)) => name,
            Some(CellValue::Subject { appeared, first }) => {
                let mut text = String::new();
                if appeared {
                    text.push_str(APPEARANCE_MARKER);
                }
                if first {
                    text.push_str(FIRST_APPEARANCE_MARKER);
                }
                text
            }
            Some(CellValue::Score(value)) => format!("{:.*}", self.precision, value),
            None => String::new(),
        }
    }

    pub fn c_nu(&self) -> Option<f64> {
        self.model.c_nu()
    }

    /// Flip appearance of the cell's subject for the row's article
    pub fn toggle_appearance(&mut self, row: usize, column: usize) -> Result<(), GridError> {
        let (article, subject) = self.locate(row, column)?;
        let present = !self.model.is_article_appeared_at(article, subject);
        self.apply_appearance(article, subject, present)
    }

    pub fn set_appearance(
        &mut self,
        row: usize,
        column: usize,
        present: bool,
    ) -> Result<(), GridError> {
        let (article, subject) = self.locate(row, column)?;
        self.apply_appearance(article, subject, present)
    }

    pub fn set_first_appearance(&mut self, row: usize, column: usize) -> Result<(), GridError> {
        let (article, subject) = self.locate(row, column)?;
        self.model.set_first_appearance(subject, article)?;
        self.publish_rescored(vec![article]);
        Ok(())
    }

    /// Expand the row to every subject or collapse it to the first one
    pub fn toggle_whole_row(&mut self, row: usize) -> Result<(), GridError> {
        let article = self.article_id(row)?;
        self.model.toggle_subject_appearance(article)?;
        self.publish_rescored(vec![article]);
        Ok(())
    }

    pub fn rename_row(&mut self, row: usize, name: impl Into<String>) -> Result<(), GridError> {
        let article = self.article_id(row)?;
        self.model.rename_article(article, name)?;
        self.events
            .emit_lossy(ModelEvent::articles_changed(self.model.article_count()));
        Ok(())
    }

    pub fn rename_subject_column(
        &mut self,
        column: usize,
        name: impl Into<String>,
    ) -> Result<(), GridError> {
        let subject = self.subject_id(column)?;
        self.model.rename_subject(subject, name)?;
        self.events
            .emit_lossy(ModelEvent::subjects_changed(self.model.subject_count()));
        Ok(())
    }

    pub fn add_subject(&mut self, name: impl Into<String>) -> SubjectId {
        let id = self.model.add_subject(name);
        self.events
            .emit_lossy(ModelEvent::subjects_changed(self.model.subject_count()));
        self.publish_rescored(self.all_article_ids());
        id
    }

    pub fn add_article(&mut self, name: impl Into<String>) -> ArticleId {
        let id = self.model.add_article(name);
        self.events
            .emit_lossy(ModelEvent::articles_changed(self.model.article_count()));
        self.publish_rescored(vec![id]);
        id
    }

    pub fn remove_row(&mut self, row: usize) -> Result<ArticleId, GridError> {
        let article = self.article_id(row)?;
        self.model.remove_article(article)?;
        self.events
            .emit_lossy(ModelEvent::articles_changed(self.model.article_count()));
        self.events
            .emit_lossy(ModelEvent::aggregate_changed(self.model.c_nu()));
        Ok(article)
    }

    pub fn set_subjects(&mut self, subjects: Vec<Subject>) -> Result<(), GridError> {
        self.model.set_subjects(subjects)?;
        self.events
            .emit_lossy(ModelEvent::subjects_changed(self.model.subject_count()));
        self.publish_rescored(self.all_article_ids());
        Ok(())
    }

    pub fn sort(&mut self) {
        self.model.sort();
        self.events
            .emit_lossy(ModelEvent::articles_changed(self.model.article_count()));
    }

    fn apply_appearance(
        &mut self,
        article: ArticleId,
        subject: SubjectId,
        present: bool,
    ) -> Result<(), GridError> {
        self.model.set_appearance(subject, article, present)?;
        self.publish_rescored(vec![article]);
        Ok(())
    }

    fn publish_rescored(&self, article_ids: Vec<ArticleId>) {
        debug!(articles = article_ids.len(), c_nu = ?self.model.c_nu(), "Publishing score changes");
        self.events
            .emit_lossy(ModelEvent::computed_data_changed(article_ids));
        self.events
            .emit_lossy(ModelEvent::aggregate_changed(self.model.c_nu()));
    }

    fn all_article_ids(&self) -> Vec<ArticleId> {
        self.model.articles().iter().map(|a| a.id).collect()
    }

    fn article_id(&self, row: usize) -> Result<ArticleId, GridError> {
        self.model
            .article_at(row)
            .map(|a| a.id)
            .ok_or(GridError::RowOutOfRange(row))
    }

    fn subject_id(&self, column: usize) -> Result<SubjectId, GridError> {
        self.subject_index(column)
            .and_then(|i| self.model.subject_at(i))
            .map(|s| s.id)
            .ok_or(GridError::NotASubjectColumn(column))
    }

    fn locate(&self, row: usize, column: usize) -> Result<(ArticleId, SubjectId), GridError> {
        Ok((self.article_id(row)?, self.subject_id(column)?))
    }
}

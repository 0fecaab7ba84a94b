//! Raw and verified data
//!
//! [`RawData`] is whatever an importer produced. [`VerifiedData`] can only be
//! obtained through [`VerifiedData::verify`] or
//! [`VerifiedData::with_defaults`], so holding one proves that:
//! - the subject sequence is not empty
//! - subject ids and article ids are unique
//! - every appearance / first-appearance entry belongs to an existing article
//!   and references existing subjects
//! - every article has exactly one appearance entry and one first-appearance
//!   entry

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

use crate::ids::{ArticleId, SubjectId};

/// Curriculum topic. Its position in the subject sequence is its rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
}

/// Content unit scored against the subject sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub name: String,
}

impl Subject {
    pub fn new(id: SubjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Article {
    pub fn new(id: ArticleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Subjects touched by each article
pub type AppearanceMap = BTreeMap<ArticleId, BTreeSet<SubjectId>>;

/// Subject that first introduces each article
pub type FirstAppearanceMap = BTreeMap<ArticleId, SubjectId>;

/// Unvalidated container as produced by an importer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawData {
    /// Ordered subject sequence (position = rank - 1)
    pub subjects: Vec<Subject>,
    pub articles: Vec<Article>,
    pub appearance: AppearanceMap,
    pub first_appearance: FirstAppearanceMap,
}

/// Reasons a [`RawData`] cannot become [`VerifiedData`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("there must be at least one subject")]
    EmptySubjectList,

    #[error("duplicate subject id {0}")]
    DuplicateSubjectId(SubjectId),

    #[error("duplicate article id {0}")]
    DuplicateArticleId(ArticleId),

    #[error("reference to unknown article id {0}")]
    UnknownArticleId(ArticleId),

    #[error("reference to unknown subject id {0}")]
    UnknownSubjectId(SubjectId),

    #[error("article {0} has no appearance entry")]
    MissingAppearance(ArticleId),

    #[error("article {0} has no first appearance entry")]
    MissingFirstAppearance(ArticleId),
}

/// Data known to satisfy every structural invariant
///
/// No public constructor and no mutators: the only way in is through the
/// validating constructors below, and the only way to change the data is to
/// take it apart with [`VerifiedData::into_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedData {
    data: RawData,
}

impl VerifiedData {
    /// Build data where every article appears at, and is first introduced
    /// by, the first subject
    pub fn with_defaults(
        subjects: Vec<Subject>,
        articles: Vec<Article>,
    ) -> Result<Self, ValidationError> {
        let first = subjects
            .first()
            .map(|s| s.id)
            .ok_or(ValidationError::EmptySubjectList)?;

        check_duplicates(&subjects, &articles)?;

        let appearance = articles
            .iter()
            .map(|a| (a.id, BTreeSet::from([first])))
            .collect();
        let first_appearance = articles.iter().map(|a| (a.id, first)).collect();

        Ok(Self {
            data: RawData {
                subjects,
                articles,
                appearance,
                first_appearance,
            },
        })
    }

    /// Validate imported data
    ///
    /// Duplicates are ruled out across both id spaces before any
    /// cross-reference is checked, so a reference error never masks a
    /// duplicate id.
    pub fn verify(data: RawData) -> Result<Self, ValidationError> {
        if data.subjects.is_empty() {
            return Err(ValidationError::EmptySubjectList);
        }

        let (subject_ids, article_ids) = check_duplicates(&data.subjects, &data.articles)?;

        for (article_id, subjects) in &data.appearance {
            if !article_ids.contains(article_id) {
                return Err(ValidationError::UnknownArticleId(*article_id));
            }
            if let Some(unknown) = subjects.iter().find(|s| !subject_ids.contains(*s)) {
                return Err(ValidationError::UnknownSubjectId(*unknown));
            }
        }

        for (article_id, subject_id) in &data.first_appearance {
            if !article_ids.contains(article_id) {
                return Err(ValidationError::UnknownArticleId(*article_id));
            }
            if !subject_ids.contains(subject_id) {
                return Err(ValidationError::UnknownSubjectId(*subject_id));
            }
        }

        for article in &data.articles {
            if !data.appearance.contains_key(&article.id) {
                return Err(ValidationError::MissingAppearance(article.id));
            }
            if !data.first_appearance.contains_key(&article.id) {
                return Err(ValidationError::MissingFirstAppearance(article.id));
            }
        }

        debug!(
            subjects = data.subjects.len(),
            articles = data.articles.len(),
            "Data verified"
        );

        Ok(Self { data })
    }

    /// Re-wrap data the caller already keeps consistent
    pub(crate) fn unverified_from_raw_data(data: RawData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &RawData {
        &self.data
    }

    pub fn into_data(self) -> RawData {
        self.data
    }
}

fn check_duplicates(
    subjects: &[Subject],
    articles: &[Article],
) -> Result<(BTreeSet<SubjectId>, BTreeSet<ArticleId>), ValidationError> {
    let mut subject_ids = BTreeSet::new();
    for subject in subjects {
        if !subject_ids.insert(subject.id) {
            return Err(ValidationError::DuplicateSubjectId(subject.id));
        }
    }

    let mut article_ids = BTreeSet::new();
    for article in articles {
        if !article_ids.insert(article.id) {
            return Err(ValidationError::DuplicateArticleId(article.id));
        }
    }

    Ok((subject_ids, article_ids))
}

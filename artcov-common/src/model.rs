//! Computed data model
//!
//! [`ComputedModel`] owns verified data together with a per-article score
//! cache and the C_nu aggregate (mean of every article's `c`). It is the
//! only mutator of that state, and every mutator leaves data, cache and
//! aggregate consistent with each other. A rejected call changes nothing.
//!
//! # Aggregate maintenance
//!
//! - Edits that touch one article and keep the article count
//!   (`set_appearance`, `set_first_appearance`, `toggle_subject_appearance`)
//!   update C_nu in O(1): `new = old - (old_c - new_c) / count`.
//! - Structural edits (`add_subject`, `add_article`, `remove_article`,
//!   `set_subjects`) rescore what changed and recompute C_nu from the cache.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::algorithm::{compute_outer_links, ComputedData};
use crate::data::{Article, RawData, Subject, ValidationError, VerifiedData};
use crate::ids::{ArticleId, IdGenerator, SubjectId};

/// Edits the model refuses to apply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Removing this subject would leave the article appearing nowhere
    #[error("article {article} must keep at least one subject (cannot remove subject {subject})")]
    LastAppearanceViolation {
        article: ArticleId,
        subject: SubjectId,
    },

    #[error("no article with id {0}")]
    UnknownArticle(ArticleId),

    #[error("no subject with id {0}")]
    UnknownSubject(SubjectId),

    /// Replacement subject list is not valid
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Verified data plus cached scores
#[derive(Debug, Clone)]
pub struct ComputedModel {
    data: RawData,
    computed: BTreeMap<ArticleId, ComputedData>,
    c_nu: Option<f64>,
    article_ids: IdGenerator<ArticleId>,
    subject_ids: IdGenerator<SubjectId>,
}

impl ComputedModel {
    /// Score every article and derive the initial aggregate
    pub fn compute(verified: VerifiedData) -> Self {
        let data = verified.into_data();

        let article_ids = IdGenerator::after(data.articles.iter().map(|a| &a.id));
        let subject_ids = IdGenerator::after(data.subjects.iter().map(|s| &s.id));

        let mut model = Self {
            data,
            computed: BTreeMap::new(),
            c_nu: None,
            article_ids,
            subject_ids,
        };
        model.recompute_all();

        info!(
            subjects = model.data.subjects.len(),
            articles = model.data.articles.len(),
            c_nu = ?model.c_nu,
            "Computed model initialized"
        );

        model
    }

    /// Add or remove `subject` from the article's appearance set
    pub fn set_appearance(
        &mut self,
        subject: SubjectId,
        article: ArticleId,
        present: bool,
    ) -> Result<(), ModelError> {
        self.ensure_article(article)?;
        self.ensure_subject(subject)?;

        let appearance = self
            .data
            .appearance
            .get_mut(&article)
            .ok_or(ModelError::UnknownArticle(article))?;

        if present {
            appearance.insert(subject);
        } else {
            if appearance.len() == 1 && appearance.contains(&subject) {
                warn!(%article, %subject, "Rejected removal of last appearance");
                return Err(ModelError::LastAppearanceViolation { article, subject });
            }
            appearance.remove(&subject);
        }

        self.rescore_article(article);
        Ok(())
    }

    /// Reassign the subject that first introduces the article
    ///
    /// The subject does not need to be in the article's appearance set.
    pub fn set_first_appearance(
        &mut self,
        subject: SubjectId,
        article: ArticleId,
    ) -> Result<(), ModelError> {
        self.ensure_article(article)?;
        self.ensure_subject(subject)?;

        self.data.first_appearance.insert(article, subject);

        self.rescore_article(article);
        Ok(())
    }

    /// Append a new subject to the end of the sequence
    ///
    /// Every article is rescored because `n` changed.
    pub fn add_subject(&mut self, name: impl Into<String>) -> SubjectId {
        let id = self.subject_ids.next_id();
        self.data.subjects.push(Subject::new(id, name));

        self.recompute_all();
        info!(subject = %id, subjects = self.data.subjects.len(), "Subject added");

        id
    }

    /// Append a new article appearing at, and introduced by, the first subject
    pub fn add_article(&mut self, name: impl Into<String>) -> ArticleId {
        let id = self.article_ids.next_id();
        let first = self.first_subject_id();

        self.data.articles.push(Article::new(id, name));
        self.data.appearance.insert(id, BTreeSet::from([first]));
        self.data.first_appearance.insert(id, first);

        let scores = self.score(id);
        self.computed.insert(id, scores);
        self.c_nu = mean_c(&self.computed);

        info!(article = %id, articles = self.data.articles.len(), "Article added");

        id
    }

    pub fn rename_article(
        &mut self,
        article: ArticleId,
        name: impl Into<String>,
    ) -> Result<(), ModelError> {
        let entry = self
            .data
            .articles
            .iter_mut()
            .find(|a| a.id == article)
            .ok_or(ModelError::UnknownArticle(article))?;
        entry.name = name.into();
        Ok(())
    }

    pub fn rename_subject(
        &mut self,
        subject: SubjectId,
        name: impl Into<String>,
    ) -> Result<(), ModelError> {
        let entry = self
            .data
            .subjects
            .iter_mut()
            .find(|s| s.id == subject)
            .ok_or(ModelError::UnknownSubject(subject))?;
        entry.name = name.into();
        Ok(())
    }

    /// Remove an article with its appearance data and cached scores
    pub fn remove_article(&mut self, article: ArticleId) -> Result<(), ModelError> {
        let index = self
            .data
            .articles
            .iter()
            .position(|a| a.id == article)
            .ok_or(ModelError::UnknownArticle(article))?;

        self.data.articles.remove(index);
        self.data.appearance.remove(&article);
        self.data.first_appearance.remove(&article);
        self.computed.remove(&article);
        self.c_nu = mean_c(&self.computed);

        info!(%article, articles = self.data.articles.len(), "Article removed");
        Ok(())
    }

    /// Replace the subject sequence
    ///
    /// References to subjects that no longer exist are dropped. An article
    /// left with no appearance, or whose first-appearance subject is gone,
    /// falls back to the first subject of the new sequence. Every article is
    /// rescored since ranks changed.
    pub fn set_subjects(&mut self, subjects: Vec<Subject>) -> Result<(), ModelError> {
        let first = subjects
            .first()
            .map(|s| s.id)
            .ok_or(ValidationError::EmptySubjectList)?;

        let mut ids = BTreeSet::new();
        for subject in &subjects {
            if !ids.insert(subject.id) {
                return Err(ValidationError::DuplicateSubjectId(subject.id).into());
            }
        }

        for id in &ids {
            self.subject_ids.observe(*id);
        }
        self.data.subjects = subjects;

        let mut rehomed = 0usize;
        for appearance in self.data.appearance.values_mut() {
            appearance.retain(|id| ids.contains(id));
            if appearance.is_empty() {
                appearance.insert(first);
                rehomed += 1;
            }
        }
        for subject in self.data.first_appearance.values_mut() {
            if !ids.contains(subject) {
                *subject = first;
                rehomed += 1;
            }
        }

        self.recompute_all();
        info!(
            subjects = self.data.subjects.len(),
            rehomed,
            c_nu = ?self.c_nu,
            "Subject list replaced"
        );
        Ok(())
    }

    /// Expand a single-subject article to every subject, or collapse any
    /// other article to just the first subject
    pub fn toggle_subject_appearance(&mut self, article: ArticleId) -> Result<(), ModelError> {
        self.ensure_article(article)?;

        let first = self.first_subject_id();
        let all: BTreeSet<SubjectId> = self.data.subjects.iter().map(|s| s.id).collect();

        let appearance = self
            .data
            .appearance
            .get_mut(&article)
            .ok_or(ModelError::UnknownArticle(article))?;

        if appearance.len() == 1 {
            *appearance = all;
        } else {
            *appearance = BTreeSet::from([first]);
        }

        self.rescore_article(article);
        Ok(())
    }

    /// Order articles by descending `h`
    ///
    /// Stable: articles with equal `h` keep their relative order. Subjects
    /// are never reordered.
    pub fn sort(&mut self) {
        let computed = &self.computed;
        let h = |article: &Article| computed.get(&article.id).map_or(0.0, |d| d.h);
        self.data.articles.sort_by(|a, b| h(b).total_cmp(&h(a)));
        debug!(articles = self.data.articles.len(), "Articles sorted by h");
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.data.subjects
    }

    pub fn articles(&self) -> &[Article] {
        &self.data.articles
    }

    pub fn subject_count(&self) -> usize {
        self.data.subjects.len()
    }

    pub fn article_count(&self) -> usize {
        self.data.articles.len()
    }

    /// Article at a display position
    pub fn article_at(&self, index: usize) -> Option<&Article> {
        self.data.articles.get(index)
    }

    /// Subject at a 0-based sequence position
    pub fn subject_at(&self, index: usize) -> Option<&Subject> {
        self.data.subjects.get(index)
    }

    /// 1-based rank of a subject
    pub fn rank_of_subject(&self, subject: SubjectId) -> Option<usize> {
        self.data
            .subjects
            .iter()
            .position(|s| s.id == subject)
            .map(|i| i + 1)
    }

    pub fn appearance_of(&self, article: ArticleId) -> Option<&BTreeSet<SubjectId>> {
        self.data.appearance.get(&article)
    }

    pub fn first_appearance_of(&self, article: ArticleId) -> Option<SubjectId> {
        self.data.first_appearance.get(&article).copied()
    }

    /// `false` for unknown ids
    pub fn is_article_appeared_at(&self, article: ArticleId, subject: SubjectId) -> bool {
        self.data
            .appearance
            .get(&article)
            .is_some_and(|set| set.contains(&subject))
    }

    /// `false` for unknown ids
    pub fn is_article_first_appeared_at(&self, article: ArticleId, subject: SubjectId) -> bool {
        self.data.first_appearance.get(&article) == Some(&subject)
    }

    /// Cached scores, or all-zero scores for an unknown article
    pub fn computed_data_for_article(&self, article: ArticleId) -> ComputedData {
        self.computed.get(&article).copied().unwrap_or_default()
    }

    /// Mean `c` over all articles, `None` when there are no articles
    pub fn c_nu(&self) -> Option<f64> {
        self.c_nu
    }

    /// Snapshot of the current data for export
    pub fn data(&self) -> VerifiedData {
        VerifiedData::unverified_from_raw_data(self.data.clone())
    }

    fn ensure_article(&self, article: ArticleId) -> Result<(), ModelError> {
        if self.data.appearance.contains_key(&article)
            && self.data.first_appearance.contains_key(&article)
        {
            Ok(())
        } else {
            Err(ModelError::UnknownArticle(article))
        }
    }

    fn ensure_subject(&self, subject: SubjectId) -> Result<(), ModelError> {
        if self.data.subjects.iter().any(|s| s.id == subject) {
            Ok(())
        } else {
            Err(ModelError::UnknownSubject(subject))
        }
    }

    /// The subject sequence is never empty
    fn first_subject_id(&self) -> SubjectId {
        self.data.subjects[0].id
    }

    fn score(&self, article: ArticleId) -> ComputedData {
        compute_outer_links(
            &self.data.subjects,
            &self.data.first_appearance,
            &self.data.appearance,
            article,
        )
        .unwrap_or_default()
    }

    /// Rescore one article; the article count is unchanged so C_nu moves by
    /// the article's share of the change in `c`
    fn rescore_article(&mut self, article: ArticleId) {
        let new = self.score(article);
        let old = self.computed.insert(article, new);
        let count = self.computed.len();

        self.c_nu = match (self.c_nu, old) {
            (Some(mean), Some(old)) => Some(mean - (old.c - new.c) / count as f64),
            _ => mean_c(&self.computed),
        };

        debug!(%article, l = new.l, c = new.c, h = new.h, c_nu = ?self.c_nu, "Article rescored");
    }

    fn recompute_all(&mut self) {
        let computed: BTreeMap<ArticleId, ComputedData> = self
            .data
            .articles
            .iter()
            .map(|a| (a.id, self.score(a.id)))
            .collect();
        self.computed = computed;
        self.c_nu = mean_c(&self.computed);
    }
}

fn mean_c(computed: &BTreeMap<ArticleId, ComputedData>) -> Option<f64> {
    if computed.is_empty() {
        return None;
    }
    let sum: f64 = computed.values().map(|d| d.c).sum();
    Some(sum / computed.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn sid(id: u32) -> SubjectId {
        SubjectId::new(id)
    }

    fn aid(id: u32) -> ArticleId {
        ArticleId::new(id)
    }

    /// Subjects 1..=3, articles 1 and 2 on default placement
    fn model() -> ComputedModel {
        let subjects = (1..=3)
            .map(|i| Subject::new(sid(i), format!("S{i}")))
            .collect();
        let articles = vec![Article::new(aid(1), "A"), Article::new(aid(2), "B")];
        ComputedModel::compute(VerifiedData::with_defaults(subjects, articles).unwrap())
    }

    fn assert_aggregate_consistent(model: &ComputedModel) {
        let cs: Vec<f64> = model
            .articles()
            .iter()
            .map(|a| model.computed_data_for_article(a.id).c)
            .collect();
        match model.c_nu() {
            None => assert!(cs.is_empty()),
            Some(c_nu) => {
                let mean = cs.iter().sum::<f64>() / cs.len() as f64;
                assert!((c_nu - mean).abs() < EPS, "c_nu {c_nu} != mean {mean}");
            }
        }
    }

    #[test]
    fn test_compute_scores_every_article() {
        let model = model();
        for article in model.articles() {
            let data = model.computed_data_for_article(article.id);
            assert!((data.l - 1.0 / 3.0).abs() < EPS);
            assert!((data.c - 1.0 / 3.0).abs() < EPS);
        }
        assert!((model.c_nu().unwrap() - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_compute_without_articles_has_no_aggregate() {
        let verified =
            VerifiedData::with_defaults(vec![Subject::new(sid(1), "S1")], Vec::new()).unwrap();
        let model = ComputedModel::compute(verified);
        assert_eq!(model.c_nu(), None);
    }

    #[test]
    fn test_set_appearance_updates_scores_and_aggregate() {
        let mut model = model();
        model.set_appearance(sid(3), aid(1), true).unwrap();

        let data = model.computed_data_for_article(aid(1));
        assert!((data.l - 1.0).abs() < EPS);
        assert!((data.c - (1.0 + 5.0 / 6.0) / 3.0).abs() < EPS);
        assert_aggregate_consistent(&model);
    }

    #[test]
    fn test_set_appearance_rejects_removing_last_subject() {
        let mut model = model();
        let before = model.computed_data_for_article(aid(1));
        let c_nu = model.c_nu();

        let result = model.set_appearance(sid(1), aid(1), false);

        assert_eq!(
            result,
            Err(ModelError::LastAppearanceViolation {
                article: aid(1),
                subject: sid(1),
            })
        );
        assert!(model.is_article_appeared_at(aid(1), sid(1)));
        assert_eq!(model.computed_data_for_article(aid(1)), before);
        assert_eq!(model.c_nu(), c_nu);
    }

    #[test]
    fn test_set_appearance_allows_removing_absent_subject_when_alone() {
        let mut model = model();
        model.set_appearance(sid(2), aid(1), false).unwrap();
        assert_eq!(model.appearance_of(aid(1)).unwrap(), &BTreeSet::from([sid(1)]));
    }

    #[test]
    fn test_set_appearance_unknown_ids() {
        let mut model = model();
        assert_eq!(
            model.set_appearance(sid(1), aid(42), true),
            Err(ModelError::UnknownArticle(aid(42)))
        );
        assert_eq!(
            model.set_appearance(sid(42), aid(1), true),
            Err(ModelError::UnknownSubject(sid(42)))
        );
    }

    #[test]
    fn test_set_first_appearance_outside_appearance() {
        let mut model = model();
        model.set_first_appearance(sid(3), aid(2)).unwrap();

        assert!(model.is_article_first_appeared_at(aid(2), sid(3)));
        assert!(!model.is_article_appeared_at(aid(2), sid(3)));
        assert_aggregate_consistent(&model);
    }

    #[test]
    fn test_add_subject_rescores_everything() {
        let mut model = model();
        model.set_appearance(sid(3), aid(1), true).unwrap();
        let before = model.computed_data_for_article(aid(1));

        let id = model.add_subject("S4");

        assert_eq!(id, sid(4));
        assert_eq!(model.rank_of_subject(id), Some(4));
        let after = model.computed_data_for_article(aid(1));
        assert!(after.l < before.l);
        assert!(after.c < before.c);
        assert_aggregate_consistent(&model);
    }

    #[test]
    fn test_add_article_uses_defaults() {
        let mut model = model();
        let id = model.add_article("C");

        assert_eq!(id, aid(3));
        assert!(model.is_article_appeared_at(id, sid(1)));
        assert!(model.is_article_first_appeared_at(id, sid(1)));
        assert_eq!(model.articles().last().unwrap().name, "C");
        assert_aggregate_consistent(&model);
    }

    #[test]
    fn test_renames_do_not_touch_scores() {
        let mut model = model();
        let before = model.computed_data_for_article(aid(1));

        model.rename_article(aid(1), "Renamed").unwrap();
        model.rename_subject(sid(2), "Middle").unwrap();

        assert_eq!(model.articles()[0].name, "Renamed");
        assert_eq!(model.subjects()[1].name, "Middle");
        assert_eq!(model.computed_data_for_article(aid(1)), before);
        assert_eq!(
            model.rename_subject(sid(9), "x"),
            Err(ModelError::UnknownSubject(sid(9)))
        );
    }

    #[test]
    fn test_remove_article_recomputes_aggregate() {
        let mut model = model();
        model.toggle_subject_appearance(aid(2)).unwrap();

        model.remove_article(aid(2)).unwrap();

        assert_eq!(model.article_count(), 1);
        assert!(model.appearance_of(aid(2)).is_none());
        assert!(model.first_appearance_of(aid(2)).is_none());
        assert_eq!(model.computed_data_for_article(aid(2)), ComputedData::default());
        assert_aggregate_consistent(&model);

        model.remove_article(aid(1)).unwrap();
        assert_eq!(model.c_nu(), None);
        assert_eq!(
            model.remove_article(aid(1)),
            Err(ModelError::UnknownArticle(aid(1)))
        );
    }

    #[test]
    fn test_set_subjects_drops_dangling_references() {
        let mut model = model();
        model.set_appearance(sid(3), aid(1), true).unwrap();
        model.set_first_appearance(sid(3), aid(2)).unwrap();

        model
            .set_subjects(vec![Subject::new(sid(3), "S3"), Subject::new(sid(2), "S2")])
            .unwrap();

        // article 1 loses S1 and keeps S3
        assert_eq!(model.appearance_of(aid(1)).unwrap(), &BTreeSet::from([sid(3)]));
        // article 1 was introduced at S1, which is gone
        assert_eq!(model.first_appearance_of(aid(1)), Some(sid(3)));
        // article 2 appeared only at S1 and falls back to the first subject
        assert_eq!(model.appearance_of(aid(2)).unwrap(), &BTreeSet::from([sid(3)]));
        assert_eq!(model.first_appearance_of(aid(2)), Some(sid(3)));

        let data = model.computed_data_for_article(aid(1));
        assert!((data.l - 0.5).abs() < EPS);
        assert_aggregate_consistent(&model);
    }

    #[test]
    fn test_set_subjects_rejects_invalid_lists() {
        let mut model = model();
        assert_eq!(
            model.set_subjects(Vec::new()),
            Err(ModelError::Validation(ValidationError::EmptySubjectList))
        );
        assert_eq!(
            model.set_subjects(vec![Subject::new(sid(1), "a"), Subject::new(sid(1), "b")]),
            Err(ModelError::Validation(ValidationError::DuplicateSubjectId(sid(1))))
        );
        assert_eq!(model.subject_count(), 3);
    }

    #[test]
    fn test_set_subjects_advances_id_generator() {
        let mut model = model();
        model
            .set_subjects(vec![Subject::new(sid(1), "S1"), Subject::new(sid(10), "S10")])
            .unwrap();
        assert_eq!(model.add_subject("next"), sid(11));
    }

    #[test]
    fn test_toggle_is_a_two_cycle() {
        let mut model = model();

        model.toggle_subject_appearance(aid(1)).unwrap();
        assert_eq!(
            model.appearance_of(aid(1)).unwrap(),
            &BTreeSet::from([sid(1), sid(2), sid(3)])
        );
        assert_aggregate_consistent(&model);

        model.toggle_subject_appearance(aid(1)).unwrap();
        assert_eq!(model.appearance_of(aid(1)).unwrap(), &BTreeSet::from([sid(1)]));
        assert_aggregate_consistent(&model);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let mut model = model();
        let c = model.add_article("C");
        let d = model.add_article("D");
        model.toggle_subject_appearance(d).unwrap();

        model.sort();

        let order: Vec<ArticleId> = model.articles().iter().map(|a| a.id).collect();
        assert_eq!(order, vec![d, aid(1), aid(2), c]);
        assert_eq!(model.subjects()[0].id, sid(1));
    }

    #[test]
    fn test_accessors_degrade_for_unknown_ids() {
        let model = model();
        assert!(!model.is_article_appeared_at(aid(77), sid(1)));
        assert!(!model.is_article_first_appeared_at(aid(77), sid(1)));
        assert_eq!(model.computed_data_for_article(aid(77)), ComputedData::default());
        assert_eq!(model.rank_of_subject(sid(77)), None);
        assert!(model.article_at(10).is_none());
    }

    #[test]
    fn test_data_snapshot_reflects_edits() {
        let mut model = model();
        model.set_appearance(sid(2), aid(1), true).unwrap();
        let snapshot = model.data();
        assert!(snapshot.data().appearance[&aid(1)].contains(&sid(2)));
    }
}

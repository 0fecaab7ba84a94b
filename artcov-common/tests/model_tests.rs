//! Integration tests for the computed model
//!
//! Exercises the public API end to end: validated construction, scoring,
//! and aggregate consistency across long edit sequences.

use artcov_common::{
    Article, ArticleId, ComputedData, ComputedModel, ModelError, RawData, Subject, SubjectId,
    ValidationError, VerifiedData,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

const EPS: f64 = 1e-9;

fn subjects(count: u32) -> Vec<Subject> {
    (1..=count)
        .map(|i| Subject::new(SubjectId::new(i), format!("S{i}")))
        .collect()
}

fn mean_c(model: &ComputedModel) -> Option<f64> {
    if model.article_count() == 0 {
        return None;
    }
    let sum: f64 = model
        .articles()
        .iter()
        .map(|a| model.computed_data_for_article(a.id).c)
        .sum();
    Some(sum / model.article_count() as f64)
}

fn assert_consistent(model: &ComputedModel) {
    match (model.c_nu(), mean_c(model)) {
        (None, None) => {}
        (Some(tracked), Some(expected)) => assert!(
            (tracked - expected).abs() < EPS,
            "tracked C_nu {tracked} drifted from mean {expected}"
        ),
        (tracked, expected) => panic!("C_nu {tracked:?} but mean {expected:?}"),
    }
}

#[test]
fn test_reference_scenario_through_model() {
    let article = ArticleId::new(1);
    let raw = RawData {
        subjects: subjects(3),
        articles: vec![Article::new(article, "A")],
        appearance: BTreeMap::from([(
            article,
            BTreeSet::from([SubjectId::new(1), SubjectId::new(3)]),
        )]),
        first_appearance: BTreeMap::from([(article, SubjectId::new(1))]),
    };

    let model = ComputedModel::compute(VerifiedData::verify(raw).unwrap());
    let scores = model.computed_data_for_article(article);

    assert!((scores.l - 1.0).abs() < EPS);
    assert!((scores.c - 0.611_111_111_111).abs() < 1e-9);
    assert!((scores.h - scores.l * scores.c).abs() < EPS);
    assert!((model.c_nu().unwrap() - scores.c).abs() < EPS);
}

#[test]
fn test_aggregate_tracks_mean_through_edit_sequence() {
    let articles = (1..=4)
        .map(|i| Article::new(ArticleId::new(i), format!("A{i}")))
        .collect();
    let verified = VerifiedData::with_defaults(subjects(4), articles).unwrap();
    let mut model = ComputedModel::compute(verified);
    assert_consistent(&model);

    let mut rng = StdRng::seed_from_u64(12345);

    for step in 0..300 {
        let article = model.articles()[rng.gen_range(0..model.article_count())].id;
        let subject = model.subjects()[rng.gen_range(0..model.subject_count())].id;

        match rng.gen_range(0..10) {
            0..=3 => {
                let present = rng.gen_bool(0.5);
                match model.set_appearance(subject, article, present) {
                    Ok(()) | Err(ModelError::LastAppearanceViolation { .. }) => {}
                    Err(e) => panic!("step {step}: unexpected error {e}"),
                }
            }
            4..=5 => model.set_first_appearance(subject, article).unwrap(),
            6 => model.toggle_subject_appearance(article).unwrap(),
            7 if model.subject_count() < 8 => {
                model.add_subject(format!("extra {step}"));
            }
            8 if model.article_count() < 10 => {
                model.add_article(format!("new {step}"));
            }
            _ => model.sort(),
        }

        assert_consistent(&model);
    }
}

#[test]
fn test_aggregate_after_structural_changes() {
    let articles = (1..=3)
        .map(|i| Article::new(ArticleId::new(i), format!("A{i}")))
        .collect();
    let verified = VerifiedData::with_defaults(subjects(3), articles).unwrap();
    let mut model = ComputedModel::compute(verified);

    model.toggle_subject_appearance(ArticleId::new(2)).unwrap();
    model.remove_article(ArticleId::new(1)).unwrap();
    assert_consistent(&model);

    let mut reordered = model.subjects().to_vec();
    reordered.reverse();
    reordered.pop();
    model.set_subjects(reordered).unwrap();
    assert_consistent(&model);

    for article in model.articles() {
        let recomputed = artcov_common::algorithm::compute_outer_links(
            model.subjects(),
            &model.data().data().first_appearance,
            &model.data().data().appearance,
            article.id,
        )
        .unwrap();
        assert_eq!(model.computed_data_for_article(article.id), recomputed);
    }
}

#[test]
fn test_last_appearance_is_protected() {
    let verified = VerifiedData::with_defaults(
        subjects(2),
        vec![Article::new(ArticleId::new(1), "only")],
    )
    .unwrap();
    let mut model = ComputedModel::compute(verified);
    let snapshot = model.data();

    let result = model.set_appearance(SubjectId::new(1), ArticleId::new(1), false);

    assert_eq!(
        result,
        Err(ModelError::LastAppearanceViolation {
            article: ArticleId::new(1),
            subject: SubjectId::new(1),
        })
    );
    assert_eq!(model.data(), snapshot);
}

#[test]
fn test_sort_orders_by_h_and_keeps_ties_stable() {
    let articles = (1..=6)
        .map(|i| Article::new(ArticleId::new(i), format!("A{i}")))
        .collect();
    let verified = VerifiedData::with_defaults(subjects(3), articles).unwrap();
    let mut model = ComputedModel::compute(verified);

    model.toggle_subject_appearance(ArticleId::new(4)).unwrap();
    model
        .set_appearance(SubjectId::new(3), ArticleId::new(2), true)
        .unwrap();
    model
        .set_appearance(SubjectId::new(3), ArticleId::new(5), true)
        .unwrap();

    let before: Vec<ArticleId> = model.articles().iter().map(|a| a.id).collect();
    model.sort();
    let after: Vec<ArticleId> = model.articles().iter().map(|a| a.id).collect();

    let hs: Vec<f64> = after
        .iter()
        .map(|id| model.computed_data_for_article(*id).h)
        .collect();
    assert!(hs.windows(2).all(|w| w[0] >= w[1]), "not sorted: {hs:?}");

    // equal-h articles keep their previous relative order
    for pair in after.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if model.computed_data_for_article(a).h == model.computed_data_for_article(b).h {
            let pos = |id| before.iter().position(|x| *x == id).unwrap();
            assert!(pos(a) < pos(b));
        }
    }
    assert_eq!(
        after,
        vec![
            ArticleId::new(4),
            ArticleId::new(2),
            ArticleId::new(5),
            ArticleId::new(1),
            ArticleId::new(3),
            ArticleId::new(6),
        ]
    );
}

#[test]
fn test_untouched_subject_never_raises_scores() {
    let verified = VerifiedData::with_defaults(
        subjects(3),
        vec![Article::new(ArticleId::new(1), "A")],
    )
    .unwrap();
    let mut model = ComputedModel::compute(verified);
    model
        .set_appearance(SubjectId::new(3), ArticleId::new(1), true)
        .unwrap();

    let mut previous = model.computed_data_for_article(ArticleId::new(1));
    for i in 0..5 {
        model.add_subject(format!("later {i}"));
        let current = model.computed_data_for_article(ArticleId::new(1));
        assert!(current.l <= previous.l);
        assert!(current.c <= previous.c);
        previous = current;
    }
}

#[test]
fn test_verify_error_names_duplicate() {
    let mut raw = RawData {
        subjects: subjects(3),
        ..RawData::default()
    };
    raw.subjects.push(Subject::new(SubjectId::new(2), "again"));

    assert_eq!(
        VerifiedData::verify(raw).unwrap_err(),
        ValidationError::DuplicateSubjectId(SubjectId::new(2))
    );
}

#[test]
fn test_unknown_article_reads_default_scores() {
    let verified = VerifiedData::with_defaults(subjects(1), Vec::new()).unwrap();
    let model = ComputedModel::compute(verified);
    assert_eq!(
        model.computed_data_for_article(ArticleId::new(5)),
        ComputedData::default()
    );
    assert_eq!(model.c_nu(), None);
}

//! Outer-links scoring
//!
//! Scores one article against the ordered subject sequence. With `n`
//! subjects ranked `1..=n`:
//!
//! - `i_max`: highest rank the article appears at (0 if none)
//! - `t_m`: rank of the article's first-appearance subject
//! - `t_p`: `min(lowest rank the article appears at, t_m)`
//!
//! Every rank `j` the article appears at gets a weight `a_l` (weights
//! `p1 = 1` before `t_m`, `p2 = 2` from `t_m` on) and a gap-adjusted weight
//! `a_l_t` that subtracts the subjects the article skipped. Then:
//!
//! - `l = (i_max - t_p + 1) / n`
//! - `c = Σ (a_l_t / a_l) / n`
//! - `h = l * c`
//!
//! The divisor of `c` is `n`, not the number of ranks touched, so `c` shrinks
//! as the curriculum grows even when the article's pattern stays the same.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::data::{AppearanceMap, FirstAppearanceMap, Subject};
use crate::ids::{ArticleId, SubjectId};

const P1: i64 = 1;
const P2: i64 = 2;

/// Scores of one article
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComputedData {
    /// Fraction of the curriculum spanned from true start to last touch
    pub l: f64,
    /// Gap-adjusted density of the article within its span
    pub c: f64,
    /// Combined score, `l * c`
    pub h: f64,
}

/// Score `article_id` using the maps of a whole data set
///
/// Returns `None` when the article has no appearance or no first-appearance
/// entry.
pub fn compute_outer_links(
    subjects: &[Subject],
    first_appearance: &FirstAppearanceMap,
    appearance: &AppearanceMap,
    article_id: ArticleId,
) -> Option<ComputedData> {
    let article_appearance = appearance.get(&article_id)?;
    let first = *first_appearance.get(&article_id)?;
    Some(score_article(subjects, article_appearance, first))
}

/// Score one appearance pattern
///
/// `subjects` must not be empty. A first-appearance subject missing from the
/// sequence ranks as `n + 1`. An empty appearance set makes `t_p` collapse
/// to `t_m`.
pub fn score_article(
    subjects: &[Subject],
    appearance: &BTreeSet<SubjectId>,
    first: SubjectId,
) -> ComputedData {
    let n = subjects.len();
    if n == 0 {
        return ComputedData::default();
    }

    let present: Vec<bool> = subjects
        .iter()
        .map(|s| appearance.contains(&s.id))
        .collect();

    let i_max = present.iter().rposition(|&p| p).map_or(0, |i| i as i64 + 1);
    let first_present = present.iter().position(|&p| p).map_or(n as i64 + 1, |i| i as i64 + 1);
    let t_m = subjects
        .iter()
        .position(|s| s.id == first)
        .map_or(n as i64 + 1, |i| i as i64 + 1);
    let t_p = first_present.min(t_m);

    // Absent subjects at sequence indices lo..hi, i.e. ranks lo+1..=hi
    let gaps = |lo: i64, hi: i64| -> i64 {
        let lo = lo.max(0) as usize;
        let hi = (hi.max(0) as usize).min(n);
        if lo >= hi {
            return 0;
        }
        present[lo..hi].iter().filter(|&&p| !p).count() as i64
    };

    let mut ratio_sum = 0.0;
    for (i, &is_present) in present.iter().enumerate() {
        if !is_present {
            continue;
        }
        let j = i as i64 + 1;

        let (a_l, a_l_t) = if t_p == t_m && t_m <= j {
            let a_l = P2 * (j - t_p + 1);
            (a_l, a_l - gaps(t_p, j))
        } else if t_p < t_m && t_m <= j {
            let a_l = P1 * (t_m - t_p) + P2 * (j - t_m + 1);
            (a_l, a_l - gaps(t_p, t_m) - gaps(t_m, j))
        } else if t_p <= j && j < t_m {
            let a_l = P1 * (j - t_p + 1);
            (a_l, a_l - gaps(t_p, j))
        } else {
            (0, 0)
        };

        if a_l != 0 {
            ratio_sum += a_l_t as f64 / a_l as f64;
        }
    }

    let l = (i_max - t_p + 1) as f64 / n as f64;
    let c = ratio_sum / n as f64;

    ComputedData { l, c, h: l * c }
}

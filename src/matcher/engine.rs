//! Rule-based filtering and funding score.
//!
//! A record is eligible when both hard filters pass:
//! - degree: wildcard `any`, or the preferred degree is contained in `degrees`
//! - country: wildcard `any`, or the preferred country is a case-insensitive
//!   substring of `location`
//!
//! Eligible records score 1 when the funding preference is `any` or appears in
//! the record's funds (both lower-cased with `$` and `,` stripped), else 0.
//! Ordering is by score, descending, stable with respect to dataset order.

use tracing::debug;

use super::model::{MatchProfile, RankedScholarship, Scholarship};

const WILDCARD: &str = "any";

fn is_wildcard(value: &str) -> bool {
    value.eq_ignore_ascii_case(WILDCARD)
}

fn normalize_funds(raw: &str) -> String {
    raw.to_lowercase().replace(['$', ','], "")
}

// An absent degree or country only matches a record that has none either.
// A supplied value, even "", goes through plain containment.

fn degree_ok(profile: &MatchProfile, record: &Scholarship) -> bool {
    match profile.degree.as_deref() {
        None => record.degrees.is_empty(),
        Some(wanted) => is_wildcard(wanted) || record.degrees.contains(wanted),
    }
}

fn country_ok(profile: &MatchProfile, record: &Scholarship) -> bool {
    match profile.country.as_deref() {
        None => record.location.is_empty(),
        Some(wanted) => {
            is_wildcard(wanted)
                || record.location.to_lowercase().contains(&wanted.to_lowercase())
        }
    }
}

/// Funding score for an eligible record. A missing preference counts as a match.
fn funding_score(preference: &str, record: &Scholarship) -> u32 {
    if preference == WILDCARD || normalize_funds(&record.funds).contains(preference) {
        1
    } else {
        0
    }
}

/// Filter, score and order `dataset` against `profile`, keeping at most `top_k`.
///
/// The dataset is only read; results are fresh copies.
pub fn rank(profile: &MatchProfile, dataset: &[Scholarship], top_k: usize) -> Vec<RankedScholarship> {
    let preference = normalize_funds(profile.funding.as_deref().unwrap_or_default());

    let mut eligible: Vec<RankedScholarship> = dataset
        .iter()
        .filter(|record| degree_ok(profile, record) && country_ok(profile, record))
        .map(|record| {
            let mut scholarship = record.clone();
            scholarship.extra.remove("score");
            RankedScholarship {
                score: funding_score(&preference, record),
                scholarship,
            }
        })
        .collect();

    debug!(
        candidates = dataset.len(),
        eligible = eligible.len(),
        top_k,
        "Scholarship filter applied"
    );

    // `sort_by` is stable: equal scores keep dataset order.
    eligible.sort_by(|a, b| b.score.cmp(&a.score));
    eligible.truncate(top_k);
    eligible
}

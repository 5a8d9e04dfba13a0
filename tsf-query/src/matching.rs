//! Level-2 trait matching
//!
//! A programme qualifies when at least one of its two strongest traits is
//! among the user's top traits. Programmes sharing more traits come first,
//! ties by ascending id. Programme traits are ranked with the same tie-break
//! as the user's totals.

use tsf_common::api::TraitAnswer;
use tsf_common::riasec::rank;
use tsf_common::{Trait, TraitVector};

/// Number of strongest programme traits compared against the user's
pub const PROGRAMME_TRAITS: usize = 2;

/// Number of user traits a request is matched with
pub const USER_TRAITS: usize = 3;

/// The user's strongest submitted traits, ranked by score.
///
/// Clients normally send exactly their top three; longer lists are cut and a
/// trait sent twice keeps its higher score.
pub fn user_top_traits(answers: &[TraitAnswer]) -> Vec<Trait> {
    let mut scores = [f64::NEG_INFINITY; 6];
    for answer in answers {
        let slot = &mut scores[answer.riasec_type.index()];
        *slot = slot.max(answer.score);
    }

    rank(&scores)
        .into_iter()
        .filter(|t| scores[t.index()] > f64::NEG_INFINITY)
        .take(USER_TRAITS)
        .collect()
}

/// Traits shared between a programme's strongest traits and the user's
pub fn overlap(vector: &TraitVector, user_traits: &[Trait]) -> usize {
    vector
        .strongest(PROGRAMME_TRAITS)
        .iter()
        .filter(|t| user_traits.contains(t))
        .count()
}

/// Order qualifying candidates; `limit == 0` keeps every match
pub fn rank_matches(candidates: &[(i64, TraitVector)], user_traits: &[Trait], limit: usize) -> Vec<i64> {
    if user_traits.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<(usize, i64)> = candidates
        .iter()
        .map(|(id, vector)| (overlap(vector, user_traits), *id))
        .filter(|(shared, _)| *shared > 0)
        .collect();

    matches.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    matches.dedup_by_key(|m| m.1);

    let ids = matches.into_iter().map(|(_, id)| id);
    if limit == 0 {
        ids.collect()
    } else {
        ids.take(limit).collect()
    }
}

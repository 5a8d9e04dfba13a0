//! RIASEC personality traits
//!
//! Both the quiz client (ranking a user's answer totals) and the query service
//! (ranking a programme's aggregate vector) order traits with [`rank`], so the
//! tie-break policy lives in exactly one place: higher score first, equal
//! scores in enumeration order R < I < A < S < E < C.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One of the six Holland-code traits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trait {
    #[serde(rename = "R")]
    Realistic,
    #[serde(rename = "I")]
    Investigative,
    #[serde(rename = "A")]
    Artistic,
    #[serde(rename = "S")]
    Social,
    #[serde(rename = "E")]
    Enterprising,
    #[serde(rename = "C")]
    Conventional,
}

impl Trait {
    /// All traits in enumeration (tie-break) order
    pub const ALL: [Trait; 6] = [
        Trait::Realistic,
        Trait::Investigative,
        Trait::Artistic,
        Trait::Social,
        Trait::Enterprising,
        Trait::Conventional,
    ];

    /// Position in [`Trait::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-letter code used on the wire and in overlay files
    pub fn code(self) -> &'static str {
        match self {
            Trait::Realistic => "R",
            Trait::Investigative => "I",
            Trait::Artistic => "A",
            Trait::Social => "S",
            Trait::Enterprising => "E",
            Trait::Conventional => "C",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Trait {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" => Ok(Trait::Realistic),
            "I" => Ok(Trait::Investigative),
            "A" => Ok(Trait::Artistic),
            "S" => Ok(Trait::Social),
            "E" => Ok(Trait::Enterprising),
            "C" => Ok(Trait::Conventional),
            other => Err(Error::InvalidInput(format!("Unknown RIASEC trait: {:?}", other))),
        }
    }
}

/// Order all six traits by descending score.
///
/// The sort is stable over [`Trait::ALL`], which is what makes equal scores
/// fall back to enumeration order.
pub fn rank(scores: &[f64; 6]) -> [Trait; 6] {
    let mut ranked = Trait::ALL;
    ranked.sort_by(|a, b| {
        scores[b.index()]
            .partial_cmp(&scores[a.index()])
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

/// Running per-trait totals accumulated by quiz answers (may be negative)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitTotals([i32; 6]);

impl TraitTotals {
    pub fn new(values: [i32; 6]) -> Self {
        Self(values)
    }

    pub fn get(&self, t: Trait) -> i32 {
        self.0[t.index()]
    }

    pub fn add(&mut self, t: Trait, delta: i32) {
        self.0[t.index()] += delta;
    }

    pub fn values(&self) -> [i32; 6] {
        self.0
    }

    /// The `n` strongest traits with their totals
    pub fn top(&self, n: usize) -> Vec<(Trait, i32)> {
        rank(&self.0.map(f64::from))
            .into_iter()
            .take(n)
            .map(|t| (t, self.get(t)))
            .collect()
    }
}

/// Six-trait vector as stored in the programme aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitVector([f64; 6]);

impl TraitVector {
    pub fn new(values: [f64; 6]) -> Self {
        Self(values)
    }

    pub fn get(&self, t: Trait) -> f64 {
        self.0[t.index()]
    }

    /// The `n` strongest traits
    pub fn strongest(&self, n: usize) -> Vec<Trait> {
        rank(&self.0).into_iter().take(n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_three_orders_by_score() {
        let totals = TraitTotals::new([1, 2, 3, 4, 5, 1]);
        let top = totals.top(3);
        assert_eq!(
            top,
            vec![
                (Trait::Enterprising, 5),
                (Trait::Social, 4),
                (Trait::Artistic, 3),
            ]
        );
    }

    #[test]
    fn test_ties_fall_back_to_enumeration_order() {
        let totals = TraitTotals::new([2, 0, 2, 0, 2, 2]);
        let codes: Vec<Trait> = totals.top(3).into_iter().map(|(t, _)| t).collect();
        assert_eq!(codes, vec![Trait::Realistic, Trait::Artistic, Trait::Enterprising]);

        let all_zero = TraitTotals::default();
        let codes: Vec<Trait> = all_zero.top(6).into_iter().map(|(t, _)| t).collect();
        assert_eq!(codes, Trait::ALL.to_vec());
    }

    #[test]
    fn test_negative_totals_rank_below_zero() {
        let totals = TraitTotals::new([-2, -1, 0, -3, 0, -1]);
        let codes: Vec<Trait> = totals.top(3).into_iter().map(|(t, _)| t).collect();
        assert_eq!(codes, vec![Trait::Artistic, Trait::Enterprising, Trait::Investigative]);
    }

    #[test]
    fn test_vector_strongest_two() {
        let v = TraitVector::new([3.0, 4.5, 1.0, 4.5, 2.0, 2.0]);
        assert_eq!(v.strongest(2), vec![Trait::Investigative, Trait::Social]);
    }

    #[test]
    fn test_trait_parse_and_serde() {
        assert_eq!("e".parse::<Trait>().unwrap(), Trait::Enterprising);
        assert!("X".parse::<Trait>().is_err());

        let json = serde_json::to_string(&Trait::Conventional).unwrap();
        assert_eq!(json, "\"C\"");
        let back: Trait = serde_json::from_str("\"S\"").unwrap();
        assert_eq!(back, Trait::Social);
    }
}

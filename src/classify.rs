// src/classify.rs
//! Heuristic relevance classifier for phonograph listings.
//!
//! Case-insensitive substring matching against three fixed term sets:
//! - brand terms       : +1.5 each
//! - context terms     : +0.5 each
//! - red-flag terms    : -2.0 each (reproductions, modern players)
//!
//! Base score 1.0, clamped to `[0, 5]` and rounded to one decimal.
//! Pure and deterministic; safe to call from any thread.

use serde::Serialize;

use crate::lead::{clamp_score, Classification};

pub const BASE_SCORE: f32 = 1.0;
pub const BRAND_WEIGHT: f32 = 1.5;
pub const CONTEXT_WEIGHT: f32 = 0.5;
pub const RED_FLAG_PENALTY: f32 = 2.0;

pub const HIGH_VALUE_MIN: f32 = 4.0;
pub const LOW_INTEREST_MAX: f32 = 1.5;

/// Major collector brands.
pub const BRAND_TERMS: &[&str] = &[
    "edison",
    "victor",
    "columbia",
    "victrola",
    "gramophone",
    "graphophone",
];

/// The brands collectors recognize on sight; these alone earn `brand-sighting`.
pub const TOP_TIER_BRANDS: &[&str] = &["edison", "victrola"];

pub const CONTEXT_TERMS: &[&str] = &[
    "antique", "vintage", "old", "early", "cylinder", "crank", "horn", "78rpm",
];

pub const RED_FLAG_TERMS: &[&str] = &[
    "repro",
    "reproduction",
    "crosley",
    "modern",
    "fake",
    "replica",
    "bluetooth",
    "usb",
];

/// Classifier output for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub score: f32,
    pub classification: Classification,
    pub explanation: String,
    pub brands: Vec<&'static str>,
    pub context: Vec<&'static str>,
    pub red_flags: Vec<&'static str>,
}

pub fn score_text(text: &str) -> Analysis {
    let lowered = text.to_lowercase();

    let brands = matches_in(&lowered, BRAND_TERMS);
    let context = matches_in(&lowered, CONTEXT_TERMS);
    let red_flags = matches_in(&lowered, RED_FLAG_TERMS);

    let raw = BASE_SCORE + BRAND_WEIGHT * brands.len() as f32
        + CONTEXT_WEIGHT * context.len() as f32
        - RED_FLAG_PENALTY * red_flags.len() as f32;
    let score = round1(clamp_score(raw));

    let classification = if score >= HIGH_VALUE_MIN {
        Classification::HighValue
    } else if score <= LOW_INTEREST_MAX {
        Classification::LowInterest
    } else if TOP_TIER_BRANDS.iter().any(|b| brands.contains(b)) {
        Classification::BrandSighting
    } else {
        Classification::Potential
    };

    let explanation = format!(
        "Found {} brands and {} context terms. Repro flags: {}.",
        brands.len(),
        context.len(),
        red_flags.len()
    );

    Analysis {
        score,
        classification,
        explanation,
        brands,
        context,
        red_flags,
    }
}

fn matches_in(lowered: &str, terms: &[&'static str]) -> Vec<&'static str> {
    terms.iter().copied().filter(|t| lowered.contains(t)).collect()
}

fn round1(x: f32) -> f32 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matches_is_base_low_interest() {
        let a = score_text("Mid-century teak sideboard");
        assert_eq!(a.score, 1.0);
        // 1.0 is under the low-interest bound, so the label follows the score
        assert_eq!(a.classification, Classification::LowInterest);
    }

    #[test]
    fn case_insensitive() {
        let a = score_text("EDISON AMBEROLA");
        let b = score_text("edison amberola");
        assert_eq!(a, b);
        assert_eq!(a.brands, vec!["edison"]);
    }

    #[test]
    fn brand_substrings_each_count() {
        // "victrola" also contains "victor"
        let a = score_text("Victrola");
        assert_eq!(a.brands, vec!["victor", "victrola"]);
        assert_eq!(a.score, 4.0);
        assert_eq!(a.classification, Classification::HighValue);
    }

    #[test]
    fn explanation_counts_matches() {
        let a = score_text("Replica crank horn");
        assert_eq!(
            a.explanation,
            "Found 0 brands and 2 context terms. Repro flags: 1."
        );
        assert_eq!(a.score, 0.0);
    }
}

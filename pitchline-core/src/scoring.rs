//! Score aggregation and feedback synthesis

use crate::ScoreDimension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Explanation used for every dimension when scorer output cannot be decoded.
pub const UNPARSEABLE_EXPLANATION: &str = "Unable to parse score";

/// Score substituted for every dimension when scorer output cannot be decoded.
pub const UNPARSEABLE_SCORE: f64 = 0.5;

/// Feedback used when no dimension falls below the threshold.
pub const GENERAL_FEEDBACK: &str = "General improvement needed";

const EMPTY_EXPLANATION_FALLBACK: &str = "Score too low";

// Averages are rounded to this many decimal places before comparison.
const AVERAGE_PRECISION: f64 = 1e9;

/// One scored dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
}

impl DimensionScore {
    pub fn new(score: f64, explanation: impl Into<String>) -> Self {
        Self {
            score,
            explanation: explanation.into(),
        }
    }
}

/// Scores for every dimension of one pitch version, keyed by dimension.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreSheet(pub BTreeMap<ScoreDimension, DimensionScore>);

impl ScoreSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The degraded sheet used when scorer output is undecodable.
    pub fn unparseable() -> Self {
        ScoreDimension::ALL
            .iter()
            .map(|d| (*d, DimensionScore::new(UNPARSEABLE_SCORE, UNPARSEABLE_EXPLANATION)))
            .collect()
    }

    pub fn insert(&mut self, dimension: ScoreDimension, score: DimensionScore) {
        self.0.insert(dimension, score);
    }

    pub fn get(&self, dimension: ScoreDimension) -> Option<&DimensionScore> {
        self.0.get(&dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScoreDimension, &DimensionScore)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric score per dimension, as stored on a pitch version.
    pub fn score_map(&self) -> BTreeMap<ScoreDimension, f64> {
        self.0.iter().map(|(d, s)| (*d, s.score)).collect()
    }

    pub fn average(&self) -> Option<f64> {
        average_score(&self.score_map())
    }
}

impl FromIterator<(ScoreDimension, DimensionScore)> for ScoreSheet {
    fn from_iter<I: IntoIterator<Item = (ScoreDimension, DimensionScore)>>(iter: I) -> Self {
        ScoreSheet(iter.into_iter().collect())
    }
}

/// Arithmetic mean of every finite score.
///
/// Non-finite values are excluded; a mapping with nothing to average yields
/// `None`. The result is rounded to nine decimal places so that an average
/// equal to a decimal threshold compares equal to it.
pub fn average_score(scores: &BTreeMap<ScoreDimension, f64>) -> Option<f64> {
    let values: Vec<f64> = scores.values().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean * AVERAGE_PRECISION).round() / AVERAGE_PRECISION)
}

/// Build refinement feedback from the dimensions scoring below `threshold`.
pub fn build_feedback(sheet: &ScoreSheet, threshold: f64) -> String {
    let parts: Vec<String> = sheet
        .iter()
        .filter(|(_, s)| s.score < threshold)
        .map(|(dimension, s)| {
            let explanation = if s.explanation.trim().is_empty() {
                EMPTY_EXPLANATION_FALLBACK
            } else {
                s.explanation.as_str()
            };
            format!("Improve {}: {}", dimension, explanation)
        })
        .collect();

    if parts.is_empty() {
        GENERAL_FEEDBACK.to_string()
    } else {
        parts.join("; ")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(p: f64, c: f64, r: f64) -> ScoreSheet {
        [
            (ScoreDimension::Persuasiveness, DimensionScore::new(p, "")),
            (ScoreDimension::Clarity, DimensionScore::new(c, "")),
            (ScoreDimension::Relevance, DimensionScore::new(r, "")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_average_of_three_dimensions() {
        let avg = sheet(0.9, 0.6, 0.3).average().unwrap();
        assert!((avg - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_average_equal_values_matches_decimal_threshold() {
        assert_eq!(sheet(0.7, 0.7, 0.7).average(), Some(0.7));
        assert_eq!(sheet(0.6, 0.7, 0.8).average(), Some(0.7));
    }

    #[test]
    fn test_average_empty_is_none() {
        assert_eq!(average_score(&BTreeMap::new()), None);
    }

    #[test]
    fn test_average_excludes_non_finite() {
        let mut scores = BTreeMap::new();
        scores.insert(ScoreDimension::Clarity, f64::NAN);
        assert_eq!(average_score(&scores), None);
        scores.insert(ScoreDimension::Relevance, 0.4);
        assert_eq!(average_score(&scores), Some(0.4));
    }

    #[test]
    fn test_unparseable_sheet() {
        let sheet = ScoreSheet::unparseable();
        assert_eq!(sheet.len(), 3);
        for dimension in ScoreDimension::ALL {
            let score = sheet.get(*dimension).unwrap();
            assert_eq!(score.score, 0.5);
            assert_eq!(score.explanation, "Unable to parse score");
        }
        assert_eq!(sheet.average(), Some(0.5));
    }

    #[test]
    fn test_feedback_lists_low_dimensions_in_order() {
        let mut s = sheet(0.4, 0.9, 0.2);
        s.insert(
            ScoreDimension::Persuasiveness,
            DimensionScore::new(0.4, "Needs a stronger hook"),
        );
        let feedback = build_feedback(&s, 0.7);
        assert_eq!(
            feedback,
            "Improve persuasiveness: Needs a stronger hook; Improve relevance: Score too low"
        );
    }

    #[test]
    fn test_feedback_general_when_nothing_below() {
        assert_eq!(build_feedback(&sheet(0.8, 0.8, 0.8), 0.7), GENERAL_FEEDBACK);
    }

    #[test]
    fn test_feedback_threshold_is_strict() {
        assert_eq!(build_feedback(&sheet(0.7, 0.7, 0.7), 0.7), GENERAL_FEEDBACK);
    }

    #[test]
    fn test_sheet_serializes_as_dimension_map() {
        let json = serde_json::to_value(sheet(0.8, 0.75, 0.85)).unwrap();
        assert_eq!(json["clarity"]["score"], 0.75);
        let back: ScoreSheet = serde_json::from_value(json).unwrap();
        assert_eq!(back.len(), 3);
    }
}

//! Score normalization for AI analysis payloads.
//!
//! The scoring backend is loose about key names and scales, so payloads
//! arrive as `{"Jaw Line": 7.5}`, `{"scores": {"jawline": "75"}}` and so on.
//! Everything is mapped onto the canonical metric names with 0–100 values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScoreError;

/// Canonical metric names, in display order.
pub const METRICS: [&str; 8] = [
    "overall",
    "potential",
    "jawline",
    "cheekbones",
    "skin_quality",
    "masculinity",
    "eyes",
    "symmetry",
];

/// Normalized scores, each 0–100.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreCard {
    scores: BTreeMap<String, u8>,
}

impl ScoreCard {
    pub fn get(&self, metric: &str) -> Option<u8> {
        self.scores.get(metric).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Map a raw key onto its canonical metric name.
pub fn canonical_metric(raw: &str) -> Option<&'static str> {
    let squashed: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let metric = match squashed.as_str() {
        "overall" | "overallscore" | "rating" | "score" | "total" => "overall",
        "potential" | "potentialscore" => "potential",
        "jawline" | "jaw" => "jawline",
        "cheekbones" | "cheekbone" | "cheeks" => "cheekbones",
        "skinquality" | "skin" => "skin_quality",
        "masculinity" | "masculine" | "dimorphism" => "masculinity",
        "eyes" | "eye" | "eyearea" => "eyes",
        "symmetry" | "facialsymmetry" => "symmetry",
        _ => return None,
    };
    Some(metric)
}

fn numeric(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Normalize an analysis payload into a [`ScoreCard`].
///
/// A nested `scores` object takes the place of the top level. When several
/// keys map to one metric, the exact metric name wins, otherwise the first
/// alias in key order; the rest are ignored. When every recognized value is
/// at most 10 the payload is read as a 0–10 scale.
pub fn normalize_scores(payload: &serde_json::Value) -> Result<ScoreCard, ScoreError> {
    let top = payload.as_object().ok_or(ScoreError::NotAnObject)?;
    let source = match top.get("scores") {
        Some(serde_json::Value::Object(nested)) => nested,
        _ => top,
    };

    let mut candidates: Vec<(&str, &'static str, f64)> = source
        .iter()
        .filter_map(|(key, value)| Some((key.as_str(), canonical_metric(key)?, numeric(value)?)))
        .collect();
    // Exact metric names first, then aliases in key order.
    candidates.sort_by_key(|(key, metric, _)| key != metric);

    let mut raw: Vec<(&'static str, f64)> = Vec::with_capacity(candidates.len());
    for (key, metric, value) in candidates {
        if let Some((_, kept)) = raw.iter().find(|(m, _)| *m == metric) {
            warn!(metric, key, kept = *kept, ignored = value, "Conflicting score keys, keeping the first");
            continue;
        }
        raw.push((metric, value));
    }

    if raw.is_empty() {
        return Err(ScoreError::NoScores);
    }

    let ten_point = raw.iter().all(|(_, v)| *v <= 10.0);
    let scale = if ten_point { 10.0 } else { 1.0 };

    let scores = raw
        .into_iter()
        .map(|(metric, v)| {
            let scaled = (v * scale).round().clamp(0.0, 100.0) as u8;
            (metric.to_string(), scaled)
        })
        .collect();

    Ok(ScoreCard { scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_map_to_canonical_names() {
        let cases = [
            ("Jaw Line", "jawline"),
            ("jaw_line", "jawline"),
            ("skinQuality", "skin_quality"),
            ("skin", "skin_quality"),
            ("overall_score", "overall"),
            ("Rating", "overall"),
            ("Eye Area", "eyes"),
            ("facial-symmetry", "symmetry"),
        ];
        for (raw, expected) in cases {
            assert_eq!(canonical_metric(raw), Some(expected), "{raw}");
        }
        assert_eq!(canonical_metric("hair_color"), None);
        for metric in METRICS {
            assert_eq!(canonical_metric(metric), Some(metric));
        }
    }

    #[test]
    fn hundred_point_payload_kept() {
        let card = normalize_scores(&json!({
            "overall": 72,
            "jawline": 80.4,
            "Skin Quality": "65",
        }))
        .unwrap();
        assert_eq!(card.get("overall"), Some(72));
        assert_eq!(card.get("jawline"), Some(80));
        assert_eq!(card.get("skin_quality"), Some(65));
        assert_eq!(card.len(), 3);
    }

    #[test]
    fn ten_point_payload_rescaled() {
        let card = normalize_scores(&json!({
            "overall": 7.25,
            "potential": "8.9",
            "eyes": 10,
        }))
        .unwrap();
        assert_eq!(card.get("overall"), Some(73));
        assert_eq!(card.get("potential"), Some(89));
        assert_eq!(card.get("eyes"), Some(100));
    }

    #[test]
    fn out_of_range_values_clamped() {
        let card = normalize_scores(&json!({"overall": 140, "jawline": -5})).unwrap();
        assert_eq!(card.get("overall"), Some(100));
        assert_eq!(card.get("jawline"), Some(0));
    }

    #[test]
    fn nested_scores_unwrapped() {
        let card = normalize_scores(&json!({
            "model": "v2",
            "scores": {"cheekbones": "81%", "symmetry": 77}
        }))
        .unwrap();
        assert_eq!(card.get("cheekbones"), Some(81));
        assert_eq!(card.get("symmetry"), Some(77));
        assert_eq!(card.get("model"), None);
    }

    #[test]
    fn unknown_and_non_numeric_dropped() {
        let card = normalize_scores(&json!({
            "overall": 60,
            "jawline": "sharp",
            "haircut": 90,
            "eyes": null,
        }))
        .unwrap();
        assert_eq!(card.len(), 1);
        assert_eq!(card.get("overall"), Some(60));
    }

    #[test]
    fn no_scores_is_an_error() {
        assert!(matches!(
            normalize_scores(&json!({"comment": "great photo"})),
            Err(ScoreError::NoScores)
        ));
        assert!(matches!(
            normalize_scores(&json!([1, 2, 3])),
            Err(ScoreError::NotAnObject)
        ));
    }

    #[test]
    fn conflicting_aliases_keep_one_value() {
        let card = normalize_scores(&json!({"overall": 90, "rating": 10})).unwrap();
        assert_eq!(card.get("overall"), Some(90));
        assert_eq!(card.len(), 1);

        // The exact name wins even when an alias sorts first.
        let card = normalize_scores(&json!({"jaw": 40, "jawline": 85, "eyes": 70})).unwrap();
        assert_eq!(card.get("jawline"), Some(85));

        // Ignored values do not affect scale detection.
        let card = normalize_scores(&json!({"rating": 95, "score": 8})).unwrap();
        assert_eq!(card.get("overall"), Some(95));
    }

    #[test]
    fn serializes_as_flat_map() {
        let card = normalize_scores(&json!({"overall": 50})).unwrap();
        assert_eq!(serde_json::to_value(&card).unwrap(), json!({"overall": 50}));
    }
}

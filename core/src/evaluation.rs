//! Analysis and driver evaluation results
//!
//! Driver evaluations are decoded strictly against the driver they were
//! requested for. The general analysis is advisory and decoded leniently.

use crate::catalog::Driver;
use crate::error::ContractViolation;
use crate::program::LoyaltyProgram;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 10.0;

/// Assessment of one sub-driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubDriverAnalysis {
    /// Score, 1 to 10
    pub score: f64,
    /// What works
    pub strengths: Vec<String>,
    /// What does not
    pub weaknesses: Vec<String>,
    /// Concrete changes to make
    pub improvements: Vec<String>,
}

/// Evaluation of a program through one driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverEvaluation {
    /// Overall driver score, 1 to 10
    pub driver_score: f64,
    /// Summary judgement
    pub overall_assessment: String,
    /// Per sub-driver results; keys equal the driver's sub-driver keys
    pub sub_driver_analysis: BTreeMap<String, SubDriverAnalysis>,
}

impl DriverEvaluation {
    /// Decode model output for `driver`, enforcing scores and the sub-driver key set.
    ///
    /// Scores may arrive as numbers or numeric strings. Missing lists decode
    /// as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation`] when the output does not match the
    /// driver's contract.
    pub fn decode(value: Value, driver: &Driver) -> Result<Self, ContractViolation> {
        let Value::Object(mut root) = value else {
            return Err(ContractViolation::NotAnObject);
        };

        let driver_score = score(root.get("driverScore"), "driverScore")?;
        let overall_assessment = match root.remove("overallAssessment") {
            Some(Value::String(text)) => text,
            None | Some(Value::Null) => {
                return Err(ContractViolation::MissingField("overallAssessment".to_string()));
            }
            Some(_) => {
                return Err(ContractViolation::WrongType {
                    field: "overallAssessment".to_string(),
                    expected: "text",
                });
            }
        };

        let analysis = match root.remove("subDriverAnalysis") {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => {
                return Err(ContractViolation::MissingField("subDriverAnalysis".to_string()));
            }
            Some(_) => {
                return Err(ContractViolation::WrongType {
                    field: "subDriverAnalysis".to_string(),
                    expected: "object",
                });
            }
        };

        check_keys(&analysis, driver)?;

        let mut sub_driver_analysis = BTreeMap::new();
        for (key, entry) in analysis {
            let path = format!("subDriverAnalysis.{key}");
            let Value::Object(entry) = entry else {
                return Err(ContractViolation::WrongType {
                    field: path,
                    expected: "object",
                });
            };
            let parsed = SubDriverAnalysis {
                score: score(entry.get("score"), &format!("{path}.score"))?,
                strengths: text_list(&entry, "strengths", &path)?,
                weaknesses: text_list(&entry, "weaknesses", &path)?,
                improvements: text_list(&entry, "improvements", &path)?,
            };
            sub_driver_analysis.insert(key, parsed);
        }

        Ok(Self {
            driver_score,
            overall_assessment,
            sub_driver_analysis,
        })
    }
}

fn check_keys(analysis: &Map<String, Value>, driver: &Driver) -> Result<(), ContractViolation> {
    let missing: Vec<String> = driver
        .sub_driver_keys()
        .filter(|key| !analysis.contains_key(*key))
        .map(str::to_string)
        .collect();
    let unexpected: Vec<String> = analysis
        .keys()
        .filter(|key| driver.sub_driver(key).is_none())
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(ContractViolation::SubDriverKeyMismatch {
            missing,
            unexpected,
        })
    }
}

fn score(value: Option<&Value>, field: &str) -> Result<f64, ContractViolation> {
    let number = match value {
        None | Some(Value::Null) => return Err(ContractViolation::MissingField(field.to_string())),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let number = number
        .filter(|n| n.is_finite())
        .ok_or_else(|| ContractViolation::WrongType {
            field: field.to_string(),
            expected: "a number",
        })?;

    if (MIN_SCORE..=MAX_SCORE).contains(&number) {
        Ok(number)
    } else {
        Err(ContractViolation::ScoreOutOfRange {
            field: field.to_string(),
            value: number,
        })
    }
}

fn text_list(
    entry: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Vec<String>, ContractViolation> {
    let wrong = || ContractViolation::WrongType {
        field: format!("{path}.{key}"),
        expected: "a list of text",
    };
    match entry.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong))
            .collect(),
        Some(_) => Err(wrong()),
    }
}

/// Behavioral notes from the general analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BehavioralAnalysis {
    /// Principles the program already uses well
    pub effective_principles: Vec<String>,
    /// Principles it misses
    pub missed_opportunities: Vec<String>,
}

/// General weaknesses and improvement suggestions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Identified weaknesses
    pub weaknesses: Vec<String>,
    /// Suggested improvements
    pub suggested_improvements: Vec<String>,
    /// Optional behavioral notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral_analysis: Option<BehavioralAnalysis>,
}

impl AnalysisResult {
    /// Lenient decode. Absent or mistyped lists become empty; non-text items are dropped.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let behavioral_analysis = value
            .get("behavioralAnalysis")
            .filter(|v| v.is_object())
            .map(|v| BehavioralAnalysis {
                effective_principles: lenient_list(v.get("effectivePrinciples")),
                missed_opportunities: lenient_list(v.get("missedOpportunities")),
            });

        Self {
            weaknesses: lenient_list(value.get("weaknesses")),
            suggested_improvements: lenient_list(value.get("suggestedImprovements")),
            behavioral_analysis,
        }
    }
}

fn lenient_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// General analysis plus every driver evaluation, keyed by catalog key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// General analysis
    #[serde(flatten)]
    pub general: AnalysisResult,
    /// Driver evaluations
    pub drivers: BTreeMap<String, DriverEvaluation>,
}

/// Output of a successful pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// First generated program
    pub initial: LoyaltyProgram,
    /// Analysis of the initial program
    pub analysis: AnalysisReport,
    /// Program rewritten from the analysis
    pub improved: LoyaltyProgram,
}

/// A sub-driver improvement tagged with where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedImprovement {
    /// Catalog key of the driver
    pub driver_key: String,
    /// Sub-driver key
    pub sub_driver_key: String,
    /// Improvement text
    pub text: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::catalog::SubDriver;
    use serde_json::json;

    fn time_driver() -> Driver {
        Driver::new(
            "time",
            "Time",
            "Temporal aspects",
            vec![
                SubDriver::new("rewardTiming", "Reward Timing", "Speed of rewards"),
                SubDriver::new("programDuration", "Program Duration", "Validity"),
            ],
        )
        .unwrap()
    }

    fn entry(score: Value) -> Value {
        json!({
            "score": score,
            "strengths": ["Fast"],
            "weaknesses": ["Expiry unclear"],
            "improvements": ["State expiry up front"]
        })
    }

    #[test]
    fn test_decode_accepts_numeric_strings() {
        let value = json!({
            "driverScore": "7",
            "overallAssessment": "Solid timing",
            "subDriverAnalysis": {
                "rewardTiming": entry(json!(8)),
                "programDuration": entry(json!("6.5"))
            }
        });

        let evaluation = DriverEvaluation::decode(value, &time_driver()).unwrap();

        assert!((evaluation.driver_score - 7.0).abs() < f64::EPSILON);
        let duration = &evaluation.sub_driver_analysis["programDuration"];
        assert!((duration.score - 6.5).abs() < f64::EPSILON);
        assert_eq!(
            evaluation.sub_driver_analysis["rewardTiming"].improvements,
            ["State expiry up front"]
        );
    }

    #[test]
    fn test_decode_rejects_key_mismatch() {
        let value = json!({
            "driverScore": 7,
            "overallAssessment": "ok",
            "subDriverAnalysis": {
                "rewardTiming": entry(json!(8)),
                "seasonalPromotions": entry(json!(5))
            }
        });

        let err = DriverEvaluation::decode(value, &time_driver()).unwrap_err();

        assert_eq!(
            err,
            ContractViolation::SubDriverKeyMismatch {
                missing: vec!["programDuration".to_string()],
                unexpected: vec!["seasonalPromotions".to_string()],
            }
        );
    }

    #[test]
    fn test_decode_rejects_out_of_range_score() {
        let value = json!({
            "driverScore": 11,
            "overallAssessment": "ok",
            "subDriverAnalysis": {
                "rewardTiming": entry(json!(8)),
                "programDuration": entry(json!(8))
            }
        });

        let err = DriverEvaluation::decode(value, &time_driver()).unwrap_err();

        assert!(matches!(
            err,
            ContractViolation::ScoreOutOfRange { ref field, .. } if field == "driverScore"
        ));
    }

    #[test]
    fn test_decode_rejects_placeholder_score() {
        let value = json!({
            "driverScore": "number 1-10",
            "overallAssessment": "ok",
            "subDriverAnalysis": {}
        });

        let err = DriverEvaluation::decode(value, &time_driver()).unwrap_err();

        assert!(matches!(err, ContractViolation::WrongType { .. }));
    }

    #[test]
    fn test_decode_defaults_missing_lists() {
        let value = json!({
            "driverScore": 5,
            "overallAssessment": "ok",
            "subDriverAnalysis": {
                "rewardTiming": {"score": 5},
                "programDuration": {"score": 4, "strengths": null}
            }
        });

        let evaluation = DriverEvaluation::decode(value, &time_driver()).unwrap();

        assert!(evaluation.sub_driver_analysis["rewardTiming"].strengths.is_empty());
    }

    #[test]
    fn test_analysis_is_lenient() {
        let value = json!({
            "weaknesses": ["No mobile app", 3],
            "suggestedImprovements": "not a list",
            "behavioralAnalysis": {"effectivePrinciples": ["Goal gradient"]}
        });

        let analysis = AnalysisResult::from_value(&value);

        assert_eq!(analysis.weaknesses, ["No mobile app"]);
        assert!(analysis.suggested_improvements.is_empty());
        let behavioral = analysis.behavioral_analysis.unwrap();
        assert_eq!(behavioral.effective_principles, ["Goal gradient"]);
        assert!(behavioral.missed_opportunities.is_empty());
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = AnalysisReport {
            general: AnalysisResult {
                weaknesses: vec!["w".to_string()],
                ..AnalysisResult::default()
            },
            drivers: BTreeMap::new(),
        };

        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value, json!({"weaknesses": ["w"], "suggestedImprovements": [], "drivers": {}}));
    }
}

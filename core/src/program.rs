//! Loyalty program document
//!
//! The same schema describes both the initial and the improved program.
//! Values are constructed once by [`crate::validation::parse_program`] and
//! never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A generated loyalty program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProgram {
    /// Program name, never empty
    pub program_name: String,
    /// Short pitch
    pub description: String,
    /// How points are earned and spent
    pub point_system: PointSystem,
    /// Membership tiers, lowest first; at least one
    pub tiers: Vec<Tier>,
    /// Perks outside the tier structure
    pub special_perks: Vec<String>,
    /// How customers join
    pub signup_process: String,

    /// Behavioral design notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral_principles: Option<Value>,
    /// Engagement loops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_mechanics: Option<Value>,
    /// Member-only access features
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_access: Option<Value>,
    /// Rewards granted at signup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate_value: Option<Value>,

    /// Any other top-level keys, preserved verbatim
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Earning and redemption rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSystem {
    /// How points are earned
    pub earning: String,
    /// How points are redeemed
    pub redemption: String,
}

/// One membership tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Tier name
    pub name: String,
    /// What it takes to reach the tier
    pub requirements: String,
    /// Benefits granted by the tier
    pub benefits: Vec<String>,
}

impl LoyaltyProgram {
    /// Serialize to a JSON value for embedding in prompts
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_keys_are_preserved() {
        let value = json!({
            "programName": "Bean Club",
            "description": "Coffee rewards",
            "pointSystem": {"earning": "1 point per $1", "redemption": "100 points = free drink"},
            "tiers": [{"name": "Green", "requirements": "Sign up", "benefits": ["Birthday drink"]}],
            "specialPerks": ["Free refills"],
            "signupProcess": "Download the app",
            "immediateValue": {"welcomeBonus": 50},
            "seasonalTheme": "Autumn roast"
        });

        let program: LoyaltyProgram = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(program.immediate_value, Some(json!({"welcomeBonus": 50})));
        assert_eq!(program.extensions.get("seasonalTheme"), Some(&json!("Autumn roast")));
        assert_eq!(program.to_value(), value);
    }

    #[test]
    fn test_absent_optionals_are_not_serialized() {
        let program = LoyaltyProgram {
            program_name: "Bean Club".to_string(),
            description: String::new(),
            point_system: PointSystem {
                earning: "1/$".to_string(),
                redemption: "100 = drink".to_string(),
            },
            tiers: vec![],
            special_perks: vec![],
            signup_process: "App".to_string(),
            behavioral_principles: None,
            engagement_mechanics: None,
            exclusive_access: None,
            immediate_value: None,
            extensions: Map::new(),
        };

        let value = program.to_value();

        assert!(value.get("behavioralPrinciples").is_none());
        assert_eq!(value["pointSystem"]["earning"], "1/$");
    }
}

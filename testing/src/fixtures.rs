//! Canned model responses.
//!
//! Each fixture is what a well-behaved model would return for the matching
//! prompt. Tests corrupt or wrap them to exercise recovery paths.

use loyalty_core::Driver;
use serde_json::{Value, json};

/// A valid three-tier program for `business_name`.
#[must_use]
pub fn sample_program(business_name: &str) -> Value {
    json!({
        "programName": format!("{business_name} Rewards Club"),
        "description": format!("Earn points every time you visit {business_name}."),
        "pointSystem": {
            "earning": "10 points per $1 spent",
            "redemption": "500 points for a free item"
        },
        "tiers": [
            {
                "name": "Basic",
                "requirements": "Sign up for free",
                "benefits": ["Birthday reward", "Member-only specials"]
            },
            {
                "name": "Silver",
                "requirements": "2,500 points in a calendar year",
                "benefits": ["Free upgrade once a month", "Early access to seasonal menu"]
            },
            {
                "name": "Gold",
                "requirements": "7,500 points in a calendar year",
                "benefits": ["Free item every month", "Invitations to tasting events"]
            }
        ],
        "specialPerks": ["Double points on rainy days"],
        "signupProcess": "Join in store or through the mobile app"
    })
}

/// [`sample_program`] as compact JSON text.
#[must_use]
pub fn sample_program_json(business_name: &str) -> String {
    sample_program(business_name).to_string()
}

/// A valid improved program for `business_name`, with an extension field.
#[must_use]
pub fn improved_program(business_name: &str) -> Value {
    let mut program = sample_program(business_name);
    program["programName"] = json!(format!("{business_name} Rewards Club Plus"));
    program["specialPerks"] = json!([
        "Double points on rainy days",
        "Surprise rewards on membership anniversaries"
    ]);
    program["immediateValue"] = json!({"welcomeBonus": "Free item after first purchase"});
    program
}

/// A general analysis with behavioral notes.
#[must_use]
pub fn sample_analysis() -> Value {
    json!({
        "weaknesses": ["Tier thresholds are hard to reach", "No digital engagement"],
        "suggestedImprovements": ["Lower the Silver threshold", "Add app-based challenges"],
        "behavioralAnalysis": {
            "effectivePrinciples": ["Goal gradient"],
            "missedOpportunities": ["Endowed progress"]
        }
    })
}

/// An evaluation of `driver` covering every sub-driver with `score`.
#[must_use]
pub fn evaluation_for(driver: &Driver, score: f64) -> Value {
    let analysis: serde_json::Map<String, Value> = driver
        .sub_drivers
        .iter()
        .map(|sub| {
            (
                sub.key.clone(),
                json!({
                    "score": score,
                    "strengths": [format!("{} is addressed", sub.name)],
                    "weaknesses": [format!("{} could go further", sub.name)],
                    "improvements": [format!("Strengthen {}", sub.name)]
                }),
            )
        })
        .collect();

    json!({
        "driverScore": score,
        "overallAssessment": format!("{} is reasonably covered", driver.name),
        "subDriverAnalysis": analysis
    })
}

/// Wrap `text` in a ```` ```json ```` markdown fence.
#[must_use]
pub fn fenced(text: &str) -> String {
    format!("```json\n{text}\n```")
}

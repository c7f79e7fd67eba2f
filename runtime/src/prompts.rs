//! Prompt construction for each pipeline stage.
//!
//! Every builder returns the complete message list for one request. Output
//! schemas are spelled out literally so the model has a shape to copy.

use loyalty_core::{AnalysisResult, ChatMessage, Driver, LoyaltyProgram, TaggedImprovement};
use std::fmt::Write as _;

const PLAIN_JSON: &str = "Return only plain JSON without any markdown formatting.";

const PROGRAM_SCHEMA: &str = r#"{
  "programName": "string",
  "description": "string",
  "pointSystem": {
    "earning": "string",
    "redemption": "string"
  },
  "tiers": [
    {
      "name": "string",
      "requirements": "string",
      "benefits": ["string"]
    }
  ],
  "specialPerks": ["string"],
  "signupProcess": "string"
}"#;

/// Messages asking for a first program for `business_name`.
#[must_use]
pub fn initial_program(business_name: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        "Create a detailed loyalty program for {business_name}. \
         Design it around what motivates this business's customers, with at least \
         two tiers and concrete benefits for each.\n\
         {PLAIN_JSON} Use exactly this format:\n{PROGRAM_SCHEMA}"
    );

    vec![
        ChatMessage::system(format!(
            "You are a loyalty program design expert. {PLAIN_JSON}"
        )),
        ChatMessage::user(prompt),
    ]
}

/// Messages asking for weaknesses and improvements of `program`.
#[must_use]
pub fn general_analysis(business_name: &str, program: &LoyaltyProgram) -> Vec<ChatMessage> {
    let prompt = format!(
        "Analyze this loyalty program for {business_name} and identify potential weaknesses \
         or areas for improvement. Consider:\n\
         1. Customer psychology and motivation\n\
         2. Industry competition\n\
         3. Technical feasibility\n\
         4. Cost effectiveness\n\
         5. Customer pain points\n\
         Return only valid JSON without any markdown formatting in this format:\n\
         {{\n  \"weaknesses\": [\"string\"],\n  \"suggestedImprovements\": [\"string\"]\n}}\n\n\
         Program to analyze: {}",
        compact(program)
    );

    vec![
        ChatMessage::system(format!("You are a critical loyalty program analyst. {PLAIN_JSON}")),
        ChatMessage::user(prompt),
    ]
}

/// Messages asking for an evaluation of `program` through `driver`.
#[must_use]
pub fn driver_evaluation(driver: &Driver, program: &LoyaltyProgram) -> Vec<ChatMessage> {
    let mut prompt = format!(
        "Evaluate this loyalty program specifically on the {name} driver and its sub-drivers. \
         Return a detailed analysis in JSON format.\n\n\
         {name} Driver Definition: {description}\n\n\
         Sub-drivers to evaluate:\n",
        name = driver.name,
        description = driver.description,
    );
    for (index, sub) in driver.sub_drivers.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}: {}", index + 1, sub.name, sub.description);
    }

    let _ = write!(
        prompt,
        "\nProgram to evaluate: {}\n\n\
         Return the evaluation in this exact JSON format:\n\
         {{\n  \"driverScore\": \"number 1-10\",\n  \"overallAssessment\": \"string\",\n  \
         \"subDriverAnalysis\": {{\n",
        compact(program)
    );
    let entries: Vec<String> = driver
        .sub_driver_keys()
        .map(|key| {
            format!(
                "    \"{key}\": {{\n      \"score\": \"number 1-10\",\n      \
                 \"strengths\": [\"string\"],\n      \"weaknesses\": [\"string\"],\n      \
                 \"improvements\": [\"string\"]\n    }}"
            )
        })
        .collect();
    prompt.push_str(&entries.join(",\n"));
    prompt.push_str("\n  }\n}");

    vec![
        ChatMessage::system(format!(
            "You are a loyalty program analyst specializing in evaluating {} aspects of \
             loyalty programs. Be specific and practical in your analysis. {PLAIN_JSON}",
            driver.name
        )),
        ChatMessage::user(prompt),
    ]
}

/// Messages asking for a rewritten program that addresses the analysis.
#[must_use]
pub fn improvement(
    program: &LoyaltyProgram,
    analysis: &AnalysisResult,
    improvements: &[TaggedImprovement],
) -> Vec<ChatMessage> {
    let mut prompt = format!(
        "Original program: {}\n\n\
         Create an improved version of this loyalty program addressing these weaknesses: {}\n\n\
         Suggested improvements: {}\n",
        compact(program),
        json_list(&analysis.weaknesses),
        json_list(&analysis.suggested_improvements),
    );

    if !improvements.is_empty() {
        prompt.push_str("\nDriver evaluation improvements to incorporate:\n");
        for item in improvements {
            let _ = writeln!(
                prompt,
                "- [{}.{}] {}",
                item.driver_key, item.sub_driver_key, item.text
            );
        }
    }

    let _ = write!(
        prompt,
        "\n{PLAIN_JSON} Keep every field of the original schema:\n{PROGRAM_SCHEMA}"
    );

    vec![
        ChatMessage::system(format!(
            "You are a loyalty program design expert. {PLAIN_JSON} \
             Use the same schema as the original program."
        )),
        ChatMessage::user(prompt),
    ]
}

fn compact(program: &LoyaltyProgram) -> String {
    program.to_value().to_string()
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use loyalty_core::{DriverCatalog, PointSystem, Role, Tier};

    fn program() -> LoyaltyProgram {
        LoyaltyProgram {
            program_name: "Bean Club".to_string(),
            description: "Coffee rewards".to_string(),
            point_system: PointSystem {
                earning: "1 bean per $1".to_string(),
                redemption: "50 beans = drink".to_string(),
            },
            tiers: vec![Tier {
                name: "Green".to_string(),
                requirements: "Join".to_string(),
                benefits: vec!["Birthday drink".to_string()],
            }],
            special_perks: vec![],
            signup_process: "App".to_string(),
            behavioral_principles: None,
            engagement_mechanics: None,
            exclusive_access: None,
            immediate_value: None,
            extensions: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_initial_prompt_names_business_and_schema() {
        let messages = initial_program("Brew & Bean Coffee");

        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("design expert"));
        assert!(messages[1].content.contains("Brew & Bean Coffee"));
        assert!(messages[1].content.contains("\"signupProcess\""));
    }

    #[test]
    fn test_analysis_prompt_lists_considerations() {
        let messages = general_analysis("Brew & Bean Coffee", &program());

        assert!(messages[0].content.contains("critical loyalty program analyst"));
        assert!(messages[1].content.contains("5. Customer pain points"));
        assert!(messages[1].content.contains("\"programName\":\"Bean Club\""));
    }

    #[test]
    fn test_driver_prompt_enumerates_sub_drivers_in_order() {
        let driver = DriverCatalog::standard().get("time").unwrap();
        let messages = driver_evaluation(driver, &program());
        let prompt = &messages[1].content;

        assert!(messages[0].content.contains("evaluating Time aspects"));
        assert!(prompt.contains("Time Driver Definition:"));
        assert!(prompt.contains("1. Program Duration:"));
        assert!(prompt.contains("5. Membership Cycles:"));
        let first = prompt.find("\"programDuration\": {").unwrap();
        let last = prompt.find("\"membershipCycles\": {").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_improvement_prompt_embeds_tagged_items() {
        let analysis = AnalysisResult {
            weaknesses: vec!["No app".to_string()],
            suggested_improvements: vec!["Build an app".to_string()],
            behavioral_analysis: None,
        };
        let items = [TaggedImprovement {
            driver_key: "access".to_string(),
            sub_driver_key: "vipExperiences".to_string(),
            text: "Host tasting nights".to_string(),
        }];

        let messages = improvement(&program(), &analysis, &items);
        let prompt = &messages[1].content;

        assert!(prompt.starts_with("Original program: {"));
        assert!(prompt.contains("[\"No app\"]"));
        assert!(prompt.contains("- [access.vipExperiences] Host tasting nights"));
    }
}

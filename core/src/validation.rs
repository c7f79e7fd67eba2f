//! Structural validation of generated programs
//!
//! Checks run in a fixed order and stop at the first problem, so the same
//! malformed document always reports the same field.

use crate::error::{Problem, SchemaViolation};
use crate::program::LoyaltyProgram;
use serde_json::{Map, Value};

/// Check that `candidate` has every required program field with the right kind.
///
/// # Errors
///
/// Returns the first [`SchemaViolation`] found.
pub fn validate(candidate: &Value) -> Result<(), SchemaViolation> {
    let root = candidate
        .as_object()
        .ok_or_else(|| SchemaViolation::new("$", wrong_type("object", candidate)))?;

    let name = require_text(root, "programName", "programName")?;
    if name.trim().is_empty() {
        return Err(SchemaViolation::new("programName", Problem::Empty));
    }
    require_text(root, "description", "description")?;

    let points = require(root, "pointSystem", "pointSystem")?;
    let points = points
        .as_object()
        .ok_or_else(|| SchemaViolation::new("pointSystem", wrong_type("object", points)))?;
    require_text(points, "earning", "pointSystem.earning")?;
    require_text(points, "redemption", "pointSystem.redemption")?;

    let tiers = require(root, "tiers", "tiers")?;
    let tiers = tiers
        .as_array()
        .ok_or_else(|| SchemaViolation::new("tiers", wrong_type("list", tiers)))?;
    if tiers.is_empty() {
        return Err(SchemaViolation::new("tiers", Problem::Empty));
    }
    for (index, tier) in tiers.iter().enumerate() {
        validate_tier(tier, index)?;
    }

    require_text_list(root, "specialPerks", "specialPerks")?;
    require_text(root, "signupProcess", "signupProcess")?;

    Ok(())
}

/// Validate `value` and convert it into a typed [`LoyaltyProgram`].
///
/// # Errors
///
/// Returns a [`SchemaViolation`] when validation fails.
pub fn parse_program(value: Value) -> Result<LoyaltyProgram, SchemaViolation> {
    validate(&value)?;
    // Validation covered every field deserialization needs.
    serde_json::from_value(value).map_err(|err| {
        SchemaViolation::new(
            "$",
            Problem::WrongType {
                expected: "loyalty program",
                found: if err.is_data() { "mismatched data" } else { "invalid json" },
            },
        )
    })
}

fn validate_tier(tier: &Value, index: usize) -> Result<(), SchemaViolation> {
    let path = format!("tiers[{index}]");
    let tier = tier
        .as_object()
        .ok_or_else(|| SchemaViolation::new(path.clone(), wrong_type("object", tier)))?;

    require_text(tier, "name", &format!("{path}.name"))?;
    require_text(tier, "requirements", &format!("{path}.requirements"))?;
    require_text_list(tier, "benefits", &format!("{path}.benefits"))?;
    Ok(())
}

fn require<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Value, SchemaViolation> {
    match object.get(key) {
        None | Some(Value::Null) => Err(SchemaViolation::new(path, Problem::Missing)),
        Some(value) => Ok(value),
    }
}

fn require_text<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, SchemaViolation> {
    let value = require(object, key, path)?;
    value
        .as_str()
        .ok_or_else(|| SchemaViolation::new(path, wrong_type("text", value)))
}

fn require_text_list(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<(), SchemaViolation> {
    let value = require(object, key, path)?;
    let items = value
        .as_array()
        .ok_or_else(|| SchemaViolation::new(path, wrong_type("list", value)))?;
    for (index, item) in items.iter().enumerate() {
        if !item.is_string() {
            return Err(SchemaViolation::new(
                format!("{path}[{index}]"),
                wrong_type("text", item),
            ));
        }
    }
    Ok(())
}

const fn wrong_type(expected: &'static str, found: &Value) -> Problem {
    Problem::WrongType {
        expected,
        found: kind(found),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "programName": "Bean Rewards",
            "description": "Earn beans with every cup",
            "pointSystem": {"earning": "10 beans per $1", "redemption": "500 beans = free drink"},
            "tiers": [
                {"name": "Sprout", "requirements": "Join", "benefits": ["Birthday treat"]},
                {
                    "name": "Roaster",
                    "requirements": "2000 beans a year",
                    "benefits": ["Free refills", "Early access"]
                }
            ],
            "specialPerks": ["Double-bean Mondays"],
            "signupProcess": "Sign up in store or online"
        })
    }

    fn remove(mut value: Value, pointer: &str) -> Value {
        let (parent, key) = pointer.rsplit_once('/').unwrap();
        value
            .pointer_mut(parent)
            .and_then(Value::as_object_mut)
            .unwrap()
            .remove(key);
        value
    }

    #[test]
    fn test_valid_program_passes() {
        assert_eq!(validate(&valid()), Ok(()));
        let program = parse_program(valid()).unwrap();
        assert_eq!(program.tiers.len(), 2);
        assert_eq!(program.tiers[1].benefits[1], "Early access");
    }

    #[test]
    fn test_each_missing_required_field_is_named() {
        let cases = [
            ("/programName", "programName"),
            ("/description", "description"),
            ("/pointSystem", "pointSystem"),
            ("/pointSystem/earning", "pointSystem.earning"),
            ("/pointSystem/redemption", "pointSystem.redemption"),
            ("/tiers", "tiers"),
            ("/tiers/1/name", "tiers[1].name"),
            ("/tiers/0/requirements", "tiers[0].requirements"),
            ("/tiers/1/benefits", "tiers[1].benefits"),
            ("/specialPerks", "specialPerks"),
            ("/signupProcess", "signupProcess"),
        ];

        for (pointer, field) in cases {
            let err = validate(&remove(valid(), pointer)).unwrap_err();
            assert_eq!(err.field, field, "removing {pointer}");
            assert_eq!(err.problem, Problem::Missing, "removing {pointer}");
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut value = valid();
        value["signupProcess"] = Value::Null;

        let err = validate(&value).unwrap_err();

        assert_eq!(err, SchemaViolation::new("signupProcess", Problem::Missing));
    }

    #[test]
    fn test_first_problem_wins() {
        let mut value = valid();
        value["description"] = json!(42);
        value["tiers"] = json!([]);

        let err = validate(&value).unwrap_err();

        assert_eq!(err.field, "description");
        assert_eq!(
            err.problem,
            Problem::WrongType {
                expected: "text",
                found: "number"
            }
        );
    }

    #[test]
    fn test_empty_tiers_and_blank_name() {
        let mut value = valid();
        value["tiers"] = json!([]);
        assert_eq!(
            validate(&value).unwrap_err(),
            SchemaViolation::new("tiers", Problem::Empty)
        );

        let mut value = valid();
        value["programName"] = json!("   ");
        assert_eq!(
            validate(&value).unwrap_err(),
            SchemaViolation::new("programName", Problem::Empty)
        );
    }

    #[test]
    fn test_benefit_items_must_be_text() {
        let mut value = valid();
        value["tiers"][0]["benefits"] = json!(["Birthday treat", {"perk": "x"}]);

        let err = validate(&value).unwrap_err();

        assert_eq!(err.field, "tiers[0].benefits[1]");
    }

    #[test]
    fn test_non_object_root() {
        let err = validate(&json!([1, 2])).unwrap_err();
        assert_eq!(err.field, "$");
    }

    #[test]
    fn test_optional_extensions_are_not_checked() {
        let mut value = valid();
        value["behavioralPrinciples"] = json!(17);
        value["engagementMechanics"] = json!(null);

        assert!(parse_program(value).is_ok());
    }
}

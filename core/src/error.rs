//! Error taxonomy for the loyalty program pipeline
//!
//! Every failure the pipeline can hit is one of the types below. The
//! requester decides retries from [`AttemptError::is_retryable`]; everything
//! that survives the retry budget is folded into [`PipelineError`].

use crate::observer::Stage;
use loyalty_openai::CompletionError;
use thiserror::Error;

/// Missing credential or invalid settings. Never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The completion service credential is not set
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// A setting failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Model output from which no JSON object could be extracted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("no JSON object could be recovered: {reason}")]
pub struct UnrecoverableJson {
    /// Text after all cleaning heuristics ran
    pub cleaned: String,
    /// Parser message for the final attempt
    pub reason: String,
}

/// What is wrong with a schema field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Problem {
    /// Field absent or `null`
    Missing,
    /// Field present with the wrong JSON kind
    WrongType {
        /// Expected kind
        expected: &'static str,
        /// Kind actually found
        found: &'static str,
    },
    /// Text or sequence that must not be empty
    Empty,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::WrongType { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::Empty => write!(f, "must not be empty"),
        }
    }
}

/// A generated program is missing or mistypes a required field.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("schema violation at `{field}`: {problem}")]
pub struct SchemaViolation {
    /// Path of the offending field, e.g. `tiers[0].benefits`
    pub field: String,
    /// What is wrong with it
    pub problem: Problem,
}

impl SchemaViolation {
    /// Create a violation for `field`
    #[must_use]
    pub fn new(field: impl Into<String>, problem: Problem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }
}

/// Parsed JSON that does not have the shape a typed request asked for.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ContractViolation {
    /// Top-level value is not an object
    #[error("expected a JSON object")]
    NotAnObject,

    /// Required field absent
    #[error("missing field `{0}`")]
    MissingField(String),

    /// Field has the wrong kind
    #[error("field `{field}` must be {expected}")]
    WrongType {
        /// Field path
        field: String,
        /// Expected kind
        expected: &'static str,
    },

    /// Score outside the 1-10 scale
    #[error("score `{field}` = {value} is outside 1-10")]
    ScoreOutOfRange {
        /// Field path
        field: String,
        /// Offending value
        value: f64,
    },

    /// Sub-driver keys differ from the driver's declared keys
    #[error("sub-driver keys do not match: missing {missing:?}, unexpected {unexpected:?}")]
    SubDriverKeyMismatch {
        /// Declared keys that were not returned
        missing: Vec<String>,
        /// Returned keys that are not declared
        unexpected: Vec<String>,
    },
}

/// Failure of a single request attempt.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AttemptError {
    /// The completion service call failed
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// The response text held no recoverable JSON
    #[error(transparent)]
    Json(#[from] UnrecoverableJson),

    /// The JSON did not match the requested shape
    #[error("response violated the expected shape: {0}")]
    Contract(#[from] ContractViolation),
}

impl AttemptError {
    /// Whether another attempt may succeed.
    ///
    /// Malformed output is always worth another try; client errors only when
    /// the client classifies them as transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Completion(err) => err.is_transient(),
            Self::Json(_) | Self::Contract(_) => true,
        }
    }
}

/// Terminal failure of a resilient request.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("request failed after {attempts} attempt(s): {cause}")]
pub struct RequestFailure {
    /// Number of attempts made
    pub attempts: u32,
    /// Error from the last attempt
    #[source]
    pub cause: AttemptError,
}

impl RequestFailure {
    /// True when the budget ran out; false when a non-retryable error stopped early
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.cause.is_retryable()
    }
}

/// A driver could not be evaluated.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("evaluation of the {driver_name} driver failed: {failure}")]
pub struct DriverEvaluationFailure {
    /// Catalog key of the driver
    pub driver_key: String,
    /// Display name of the driver
    pub driver_name: String,
    /// Underlying request failure
    #[source]
    pub failure: RequestFailure,
}

/// The single top-level error a pipeline run can end with.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PipelineError {
    /// Missing credential or invalid settings
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A non-driver request exhausted its retries or hit a permanent error
    #[error("{stage} request failed: {failure}")]
    Request {
        /// Stage that issued the request
        stage: Stage,
        /// Underlying failure
        #[source]
        failure: RequestFailure,
    },

    /// Initial program failed schema validation
    #[error("initial program is invalid: {0}")]
    InvalidInitialProgram(#[source] SchemaViolation),

    /// Improved program failed schema validation
    #[error("improved program is invalid: {0}")]
    InvalidImprovedProgram(#[source] SchemaViolation),

    /// A driver evaluation failed
    #[error(transparent)]
    DriverEvaluation(#[from] DriverEvaluationFailure),
}

impl PipelineError {
    /// Stage the run was in when it failed
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) | Self::InvalidInitialProgram(_) => Stage::GeneratingInitial,
            Self::Request { stage, .. } => *stage,
            Self::InvalidImprovedProgram(_) => Stage::GeneratingImproved,
            Self::DriverEvaluation(_) => Stage::EvaluatingDrivers,
        }
    }

    /// Display name of the failing driver, if a driver failed
    #[must_use]
    pub fn driver_name(&self) -> Option<&str> {
        match self {
            Self::DriverEvaluation(failure) => Some(&failure.driver_name),
            _ => None,
        }
    }
}

/// Invalid driver catalog definition.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Two drivers share a key
    #[error("duplicate driver key `{0}`")]
    DuplicateDriver(String),

    /// Two sub-drivers of one driver share a key
    #[error("driver `{driver}` declares sub-driver `{sub_driver}` twice")]
    DuplicateSubDriver {
        /// Driver key
        driver: String,
        /// Repeated sub-driver key
        sub_driver: String,
    },

    /// Driver without sub-drivers
    #[error("driver `{0}` has no sub-drivers")]
    NoSubDrivers(String),

    /// Empty key
    #[error("empty key in driver `{0}`")]
    EmptyKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_display() {
        let err = SchemaViolation::new("tiers[0].benefits", Problem::Missing);
        assert_eq!(err.to_string(), "schema violation at `tiers[0].benefits`: missing");

        let err = SchemaViolation::new(
            "programName",
            Problem::WrongType {
                expected: "text",
                found: "number",
            },
        );
        assert_eq!(
            err.to_string(),
            "schema violation at `programName`: expected text, found number"
        );
    }

    #[test]
    fn test_attempt_error_retryability() {
        assert!(AttemptError::from(CompletionError::Timeout).is_retryable());
        assert!(!AttemptError::from(CompletionError::Unauthorized).is_retryable());
        assert!(
            AttemptError::from(UnrecoverableJson {
                cleaned: String::new(),
                reason: "eof".to_string()
            })
            .is_retryable()
        );
        assert!(AttemptError::from(ContractViolation::NotAnObject).is_retryable());
    }

    #[test]
    fn test_request_failure_exhausted() {
        let exhausted = RequestFailure {
            attempts: 3,
            cause: CompletionError::Timeout.into(),
        };
        assert!(exhausted.exhausted());
        assert_eq!(
            exhausted.to_string(),
            "request failed after 3 attempt(s): Request timed out"
        );

        let stopped = RequestFailure {
            attempts: 1,
            cause: CompletionError::Unauthorized.into(),
        };
        assert!(!stopped.exhausted());
    }

    #[test]
    fn test_pipeline_error_names_driver() {
        let err = PipelineError::from(DriverEvaluationFailure {
            driver_key: "security".to_string(),
            driver_name: "Security".to_string(),
            failure: RequestFailure {
                attempts: 1,
                cause: CompletionError::Unauthorized.into(),
            },
        });

        assert_eq!(err.stage(), Stage::EvaluatingDrivers);
        assert_eq!(err.driver_name(), Some("Security"));
        assert!(err.to_string().contains("Security driver"));
    }
}

//! # Loyalty Core
//!
//! Domain types and pure building blocks for the loyalty program pipeline.
//!
//! This crate holds everything that does not need a runtime: the program
//! schema and its validator, JSON recovery for model output, the driver
//! catalog, evaluation result types, the completion client seam and the
//! observer events the pipeline reports through.
//!
//! ## Core Concepts
//!
//! - **`LoyaltyProgram`**: the generated document, validated fail-fast
//! - **`DriverCatalog`**: ordered, read-only set of evaluation drivers
//! - **`recover`**: extracts a JSON object from noisy model text
//! - **`CompletionClient`**: the only way to reach the language model
//! - **`PipelineObserver`**: receives stage-tagged diagnostic events
//!
//! ## Example
//!
//! ```
//! use loyalty_core::{recover, validation::validate, DriverCatalog};
//!
//! let value = recover("```json\n{\"programName\": \"Bean Club\"}\n```").unwrap();
//! assert!(validate(&value).is_err()); // most fields are missing
//!
//! assert_eq!(DriverCatalog::standard().len(), 7);
//! ```

pub mod catalog;
pub mod completion;
pub mod error;
pub mod evaluation;
pub mod observer;
pub mod program;
pub mod recover;
pub mod validation;

pub use catalog::{Driver, DriverCatalog, SubDriver};
pub use completion::{CompletionClient, CompletionOptions};
pub use error::{
    AttemptError, CatalogError, ConfigurationError, ContractViolation, DriverEvaluationFailure,
    PipelineError, Problem, RequestFailure, SchemaViolation, UnrecoverableJson,
};
pub use evaluation::{
    AnalysisReport, AnalysisResult, BehavioralAnalysis, DriverEvaluation, PipelineResult,
    SubDriverAnalysis, TaggedImprovement,
};
pub use loyalty_openai::{ChatMessage, ChatRequest, CompletionError, Role};
pub use observer::{NoopObserver, PipelineEvent, PipelineObserver, RequestScope, Stage};
pub use program::{LoyaltyProgram, PointSystem, Tier};
pub use recover::recover;
pub use validation::{parse_program, validate};

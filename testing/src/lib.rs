//! # Loyalty Testing
//!
//! Test doubles for the loyalty program pipeline.
//!
//! This crate provides:
//! - [`ScriptedCompletion`]: replays a fixed list of model responses
//! - [`StageCompletion`]: answers each pipeline stage with a valid fixture
//! - [`RecordingObserver`]: captures pipeline events for assertions
//! - [`fixtures`]: canned programs, analyses and driver evaluations
//!
//! ## Example
//!
//! ```ignore
//! use loyalty_runtime::{ProgramPipeline, ResilientRequester};
//! use loyalty_testing::{RecordingObserver, StageCompletion};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_full_run() {
//!     let client = Arc::new(StageCompletion::new("Brew & Bean Coffee"));
//!     let observer = Arc::new(RecordingObserver::new());
//!     let pipeline = ProgramPipeline::new(ResilientRequester::new(client), catalog())
//!         .with_observer(observer.clone());
//!
//!     let result = pipeline.run("Brew & Bean Coffee").await.unwrap();
//!     assert_eq!(result.analysis.drivers.len(), 7);
//! }
//! ```

pub mod fixtures;
pub mod mocks;

pub use mocks::{RecordingObserver, ScriptedCompletion, StageCompletion};

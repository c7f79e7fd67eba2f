//! # OpenAI Chat Completions Client
//!
//! Minimal Rust client for the OpenAI Chat Completions API, covering what the
//! loyalty program pipeline needs: role-tagged messages, model/temperature
//! selection, token limits and the JSON-object response format.
//!
//! ## Example
//!
//! ```no_run
//! use loyalty_openai::{ChatMessage, ChatRequest, OpenAiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create client from OPENAI_API_KEY environment variable
//!     let client = OpenAiClient::from_env()?;
//!
//!     let request = ChatRequest::new(vec![
//!         ChatMessage::system("Return only plain JSON."),
//!         ChatMessage::user("Describe a coffee shop loyalty program."),
//!     ])
//!     .with_temperature(0.7)
//!     .with_json_output();
//!
//!     let text = client.complete_text(&request).await?;
//!     println!("Response: {text}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Non-streaming chat completions
//! - Transient/permanent error classification for retry decisions
//! - Truncated replies reported as retryable errors

pub mod chat;
pub mod client;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use chat::{ChatRequest, ChatResponse, Choice, DEFAULT_MODEL};
pub use client::OpenAiClient;
pub use error::CompletionError;
pub use types::{ChatMessage, FinishReason, ResponseFormat, Role};

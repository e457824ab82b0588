//! inboxqa - Retrieval-augmented question answering over a Gmail inbox
//!
//! The pipeline has two operations:
//!
//! - **ingest**: fetch messages from Gmail, embed them with a hosted
//!   embedding model, and upsert them into a Qdrant collection.
//! - **ask**: embed a question, retrieve the nearest emails, re-rank them
//!   with a cross-encoder relevance model, and have a chat model answer
//!   from the retrieved context.

pub mod errors;
pub mod config;

// Provider adapters
pub mod embedding;
pub mod mail;
pub mod index;
pub mod rank;
pub mod generator;

// Orchestration and interface
pub mod pipeline;
pub mod repl;
pub mod cli;

// Re-export commonly used types
pub use errors::{InboxError, Result};

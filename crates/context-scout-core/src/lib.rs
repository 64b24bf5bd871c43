//! # Context Scout Core
//!
//! Pure relevance and relationship logic for Context Scout: the data
//! model, the relationship classifier, reranking and context boosting,
//! ticket validation, and the traits for the external embedder and
//! vector store.
//!
//! This crate contains no tokio, git, filesystem I/O, or network
//! dependencies. The `context-scout` app crate wires it to real
//! collaborators.

pub mod embedding;
pub mod error;
pub mod models;
pub mod rank;
pub mod relation;
pub mod store;
pub mod ticket;

pub use error::{ScoutError, ScoutResult};

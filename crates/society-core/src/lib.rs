//! Core types, workflow rules and trait definitions for Society Connect.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod role;
pub mod service;
pub mod store;
pub mod user;
pub mod visitor;
pub mod workflow;

pub use error::{Error, ErrorKind, Result, WorkflowError};

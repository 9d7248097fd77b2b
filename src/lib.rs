//! # RepoContext - token-budgeted repository query tools
//!
//! Serving layer that exposes a code index to LLM agents as a set of tools:
//! - Generic tool pipeline (preconditions, parameter parsing, error envelopes)
//! - Token-budget optimizer shaping every result to a caller-supplied ceiling
//! - Circuit breaker and retry manager around every query-engine call
//! - Structured error context for failures surfaced to agents
//! - Length-prefixed JSON frame transport
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────────────┐
//!   frame requests → │          RepoContextServer           │
//!                    │  ┌──────────┐  ┌──────────────────┐  │
//!                    │  │   Tool   │─▶│ RecoveryManager  │──┼─▶ QueryEngine
//!                    │  │ Pipeline │  │ breaker + retry  │  │
//!                    │  └────┬─────┘  └──────────────────┘  │
//!                    │       ▼                              │
//!                    │  ┌──────────┐                        │
//!                    │  │  Budget  │ → pretty JSON envelope │
//!                    │  └──────────┘                        │
//!                    └──────────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod budget;
pub mod engine;
pub mod ipc;
pub mod recovery;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};

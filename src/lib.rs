//! Campus Advisor - Multi-Agent Student Advisor Engine
//!
//! Routes a student's natural-language question to one or more domain
//! specialists (program, admissions, financial), executes them in parallel
//! when a query crosses domains, and synthesizes a single answer while
//! maintaining per-session conversational context.
//!
//! # Architecture
//!
//! - **Router**: intent classification with a normalized-query cache and a
//!   deterministic keyword fallback
//! - **Specialist Agents**: retrieval + optional catalog lookup + generation,
//!   one per category
//! - **Orchestrator**: scheduling, synthesis, session updates, trace events

pub mod errors;
pub mod category;
pub mod config;

// External ports
pub mod generation;
pub mod retrieval;
pub mod tools;

// Core engine
pub mod routing;
pub mod agents;
pub mod orchestrator;
pub mod session;
pub mod telemetry;

// Re-export commonly used types
pub use category::Category;
pub use errors::{AdvisorError, Result};
pub use orchestrator::{Orchestrator, SynthesizedResponse};

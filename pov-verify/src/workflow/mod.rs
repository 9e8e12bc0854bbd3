//! Verification workflow
//!
//! `orchestrator` sequences the geo gate, the advisory metadata pass, the
//! visual gate and the final weighted decision.

pub mod orchestrator;

pub use orchestrator::{overall_score, round2, Verifier};

//! Signal fusion
//!
//! `visual` turns three image-similarity signals into one gate decision and
//! one fused score.

pub mod visual;

pub use visual::{decide, SubSignals, VisualFuser};

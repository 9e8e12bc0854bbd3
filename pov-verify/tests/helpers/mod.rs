//! Test Helper Utilities
//!
//! Shared utilities for testing pov-verify

#![allow(dead_code)]

pub mod image_generator;

pub use image_generator::{write_inverted_scene, write_scene, SceneConfig};

//! Rozelle library crate
//!
//! Checks a learner's Python attempt against an exercise: parse, enforce
//! structural constraints, run it inside trusted scaffolding and compare its
//! output. The binary and benchmarks go through the same modules.

pub mod assemble;
pub mod config;
pub mod constraint;
pub mod evaluate;
pub mod exercise;
pub mod outcome;
pub mod render;
pub mod sandbox;
pub mod syntax;
pub mod util;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use evaluate::Evaluator;
pub use exercise::Exercise;
pub use outcome::Outcome;

//! Core engine — the analyze → score → adjust → publish loop.

pub mod adjuster;
pub mod analyzer;
pub mod health;
pub mod orchestrator;
pub mod synthesizer;

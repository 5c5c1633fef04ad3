//! RECAL — Adaptive Ensemble Recalibration Engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod store;
pub mod registry;
pub mod engine;
pub mod dashboard;

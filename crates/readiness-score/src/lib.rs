//! Explainable startup investment-readiness scoring.
//!
//! The [`scoring`] module holds the pure engine that turns KPI responses into a bounded
//! 300–900 score. Everything else (framework loading, response import, the assessment
//! workflow and its HTTP router) sits around it and never leaks state into a scoring run.

pub mod assessments;
pub mod config;
pub mod error;
pub mod import;
pub mod scoring;
pub mod telemetry;

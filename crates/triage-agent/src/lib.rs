//! Triage agent service
//!
//! Hosts the decision engine behind an HTTP intake endpoint alongside
//! health, readiness and Prometheus metrics endpoints.

pub mod api;
pub mod config;

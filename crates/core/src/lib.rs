//! Shared foundations for the ComfyPod worker.
//!
//! Carries the process-wide configuration loaded from environment
//! variables and the bounded polling primitive used by both the
//! startup readiness wait and the per-job result wait.

pub mod config;
pub mod retry;

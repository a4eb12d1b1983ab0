//! ComfyUI supervision and REST client library.
//!
//! Owns the ComfyUI child process, waits for its HTTP API to come up,
//! uploads input images, rewrites image-loader nodes to reference the
//! uploaded assets, submits workflows, retrieves history records, and
//! harvests finished output files from disk.

pub mod api;
pub mod history;
pub mod outputs;
pub mod server;
pub mod workflow;

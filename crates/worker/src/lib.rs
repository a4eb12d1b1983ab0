//! Serverless job worker for a managed ComfyUI instance.
//!
//! Receives queue-style job payloads, binds uploaded input images into
//! the workflow graph, submits it to ComfyUI, waits for completion, and
//! returns the produced media inline as base64.

pub mod handler;
pub mod ingress;

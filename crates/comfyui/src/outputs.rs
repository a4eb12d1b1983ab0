//! Collection of finished output files.
//!
//! Walks a completed job's history record, reads each referenced file
//! from the ComfyUI output directory, and returns the contents inline
//! as base64. Files the record names but the disk does not yet have are
//! skipped, not fatal: partial results beat a failed job when the
//! server is still flushing or has cleaned up behind us.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::history::{FileRef, HistoryEntry};

/// One produced media file, returned inline to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct OutputArtifact {
    /// Filename as recorded by the server (no directory components).
    pub filename: String,
    /// Payload encoding tag; always `base64`.
    #[serde(rename = "type")]
    pub encoding: &'static str,
    /// Media kind: `image/png` for images, `video/mp4` for videos.
    pub format: &'static str,
    /// Base64-encoded file contents.
    pub data: String,
}

/// Read and encode every output file a history record references.
///
/// Nodes are visited in the record's own order; within a node, all
/// image entries precede all video entries, each in list order.
pub fn collect_outputs(history: &HistoryEntry, output_root: &Path) -> Vec<OutputArtifact> {
    let mut artifacts = Vec::new();

    for (node_id, node_output) in &history.outputs {
        append_artifacts(&mut artifacts, node_id, &node_output.images, "image/png", output_root);
        append_artifacts(&mut artifacts, node_id, &node_output.videos, "video/mp4", output_root);
    }

    artifacts
}

/// Append artifacts for one node's file list of a single media kind.
fn append_artifacts(
    artifacts: &mut Vec<OutputArtifact>,
    node_id: &str,
    files: &[FileRef],
    format: &'static str,
    output_root: &Path,
) {
    for file in files {
        let path = output_root.join(&file.subfolder).join(&file.filename);
        if !path.exists() {
            tracing::debug!(
                node_id,
                path = %path.display(),
                "Recorded output not on disk, skipping",
            );
            continue;
        }

        match std::fs::read(&path) {
            Ok(bytes) => artifacts.push(OutputArtifact {
                filename: file.filename.clone(),
                encoding: "base64",
                format,
                data: BASE64.encode(bytes),
            }),
            Err(e) => {
                tracing::warn!(
                    node_id,
                    path = %path.display(),
                    error = %e,
                    "Failed to read recorded output, skipping",
                );
            }
        }
    }
}

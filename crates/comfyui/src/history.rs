//! Typed views over ComfyUI history records.
//!
//! `GET /history/{prompt_id}` returns `{[prompt_id]: {outputs: {...}}}`
//! once a job has finished. Only the output file references are modeled
//! here; node results and timing data are ignored.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

/// Response body of `GET /history/{prompt_id}`, keyed by prompt id.
///
/// The key is absent while the job is still queued or executing.
pub type HistoryResponse = HashMap<String, HistoryEntry>;

/// The server's persisted record of one finished job.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    /// Output file references per producing node, in the record's own
    /// order ([`IndexMap`] keeps the server's JSON key order).
    #[serde(default)]
    pub outputs: IndexMap<String, NodeOutput>,
}

/// Files a single output node produced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<FileRef>,
    #[serde(default)]
    pub videos: Vec<FileRef>,
}

/// Location of one produced file under the ComfyUI output root.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub filename: String,
    /// Subdirectory below the output root; empty when the file sits at
    /// the root itself.
    #[serde(default)]
    pub subfolder: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completed_history_response() {
        let json = r#"{
            "abc-123": {
                "outputs": {
                    "9": {
                        "images": [{"filename": "out_00001_.png", "subfolder": "renders", "type": "output"}]
                    }
                }
            }
        }"#;

        let response: HistoryResponse = serde_json::from_str(json).unwrap();
        let entry = &response["abc-123"];
        let images = &entry.outputs["9"].images;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "out_00001_.png");
        assert_eq!(images[0].subfolder, "renders");
        assert!(entry.outputs["9"].videos.is_empty());
    }

    #[test]
    fn pending_history_response_is_empty() {
        let response: HistoryResponse = serde_json::from_str("{}").unwrap();
        assert!(response.is_empty());
    }

    #[test]
    fn missing_subfolder_defaults_to_empty() {
        let json = r#"{"outputs": {"3": {"videos": [{"filename": "clip.mp4"}]}}}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.outputs["3"].videos[0].subfolder, "");
    }

    #[test]
    fn output_node_order_follows_the_record() {
        let json = r#"{"outputs": {"7": {}, "3": {}, "12": {}}}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        let order: Vec<&str> = entry.outputs.keys().map(String::as_str).collect();
        assert_eq!(order, ["7", "3", "12"]);
    }
}

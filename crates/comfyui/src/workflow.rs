//! In-place workflow-graph rewriting.
//!
//! Workflow templates reference input images generically, either by the
//! filename the caller supplied alongside the job or by a placeholder
//! name. After each upload the graph is patched so matching loader
//! nodes point at the name the server actually stored the file under.

use serde_json::Value;

/// Node kind that reads an image from ComfyUI's input storage.
const LOAD_IMAGE_CLASS: &str = "LoadImage";

/// Placeholder filename generic workflow templates reference.
pub const DEFAULT_IMAGE_NAME: &str = "input_image.jpg";

/// Point every matching `LoadImage` node at an uploaded asset.
///
/// A node matches when its `inputs.image` equals `filename` or
/// [`DEFAULT_IMAGE_NAME`]. Nodes of any other kind are never touched.
/// A graph that references neither name is left unchanged -- not every
/// workflow consumes every uploaded image, so absence of a match is a
/// no-op rather than an error.
pub fn bind_uploaded_image(workflow: &mut Value, filename: &str, uploaded_name: &str) {
    let Some(nodes) = workflow.as_object_mut() else {
        return;
    };

    for node in nodes.values_mut() {
        if node.get("class_type").and_then(Value::as_str) != Some(LOAD_IMAGE_CLASS) {
            continue;
        }
        let Some(inputs) = node.get_mut("inputs").and_then(Value::as_object_mut) else {
            continue;
        };
        let matches = inputs
            .get("image")
            .and_then(Value::as_str)
            .is_some_and(|current| current == filename || current == DEFAULT_IMAGE_NAME);
        if matches {
            inputs.insert("image".into(), Value::String(uploaded_name.to_string()));
        }
    }
}

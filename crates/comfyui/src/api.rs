//! REST API client for the ComfyUI HTTP endpoints.
//!
//! Wraps the ComfyUI HTTP API (readiness probe, image upload, workflow
//! submission, history retrieval) using [`reqwest`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::history::HistoryResponse;

/// HTTP client for a single ComfyUI instance.
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by the ComfyUI `/prompt` endpoint after
/// successfully queuing a workflow.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued prompt. History is
    /// indexed by this value.
    pub prompt_id: String,
    /// Position in the execution queue.
    pub number: i32,
}

/// Response returned by the ComfyUI `/upload/image` endpoint.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    /// Name the server stored the file under. Uploads request
    /// `overwrite=true`, but the server may still rename to dodge a
    /// collision; workflows must reference this name, not the original.
    pub name: String,
    #[serde(default)]
    pub subfolder: String,
}

/// Errors from the ComfyUI REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, body decode, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A caller-supplied image payload was not valid base64.
    #[error("Invalid base64 image data: {0}")]
    InvalidImage(#[from] base64::DecodeError),
}

impl ComfyUIApi {
    /// Create a new API client for a ComfyUI instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://127.0.0.1:8188`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Probe the statistics endpoint.
    ///
    /// Any 2xx response means the server is up and accepting work.
    /// Used as the startup readiness check.
    pub async fn system_stats(&self) -> Result<(), ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/system_stats", self.api_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Upload a base64-encoded image into ComfyUI's input storage.
    ///
    /// `image_b64` may carry a data-URI prefix (`data:image/jpeg;base64,`);
    /// anything up to and including the first comma is stripped before
    /// decoding. The bytes are sent as a multipart file part named
    /// `image` with `overwrite=true`, so repeated uploads of the same
    /// filename replace the stored file. Returns the name the server
    /// assigned.
    pub async fn upload_image(
        &self,
        image_b64: &str,
        filename: &str,
    ) -> Result<String, ComfyUIApiError> {
        let bytes = decode_image_payload(image_b64)?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("overwrite", "true");

        let response = self
            .client
            .post(format!("{}/upload/image", self.api_url))
            .multipart(form)
            .send()
            .await?;

        let uploaded: UploadResponse = Self::parse_response(response).await?;
        Ok(uploaded.name)
    }

    /// Submit a workflow for execution.
    ///
    /// Sends a `POST /prompt` request with the given workflow JSON and
    /// client ID.  Returns the server-assigned `prompt_id` and queue
    /// position.
    pub async fn submit_workflow(
        &self,
        workflow: &serde_json::Value,
        client_id: &str,
    ) -> Result<SubmitResponse, ComfyUIApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve execution history for a specific prompt.
    ///
    /// Sends a `GET /history/{prompt_id}` request. The returned map is
    /// keyed by prompt id; the key is absent while the job is still
    /// queued or executing.
    pub async fn get_history(&self, prompt_id: &str) -> Result<HistoryResponse, ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUIApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUIApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUIApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUIApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ComfyUIApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Decode a caller-supplied image payload, tolerating a data-URI prefix.
fn decode_image_payload(image_b64: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match image_b64.split_once(',') {
        Some((_prefix, rest)) => rest,
        None => image_b64,
    };
    BASE64.decode(payload)
}

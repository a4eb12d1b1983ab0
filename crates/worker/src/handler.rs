//! Per-job orchestration.
//!
//! [`JobHandler::handle`] is the single entrypoint invoked per job:
//! upload input images, rewrite the graph to reference them, submit,
//! poll history until the job completes, collect outputs. It is also
//! the worker's sole error-isolation boundary -- every per-job failure
//! is converted into an in-band error result, so one bad job can never
//! take the worker down.

use std::time::Duration;

use comfypod_comfyui::api::{ComfyUIApi, ComfyUIApiError};
use comfypod_comfyui::history::HistoryEntry;
use comfypod_comfyui::outputs::{collect_outputs, OutputArtifact};
use comfypod_comfyui::workflow;
use comfypod_core::config::WorkerConfig;
use comfypod_core::retry::{poll_until, PollError};
use serde::{Deserialize, Serialize};

/// A queued job as delivered by the external dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub input: JobInput,
}

/// Caller-controlled job payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobInput {
    /// The workflow graph to execute. Required; its absence is the one
    /// failure detected before any network traffic.
    pub workflow: Option<serde_json::Value>,
    /// Input images to upload before submission, applied in order.
    #[serde(default)]
    pub images: Vec<InputImage>,
}

/// One caller-supplied input image.
#[derive(Debug, Clone, Deserialize)]
pub struct InputImage {
    /// Filename loader nodes reference this image by.
    #[serde(default = "default_image_name")]
    pub name: String,
    /// Base64 payload, with or without a data-URI prefix.
    #[serde(default)]
    pub image: String,
}

fn default_image_name() -> String {
    workflow::DEFAULT_IMAGE_NAME.to_string()
}

/// What the dispatcher gets back: outputs on success, a message on
/// failure, never both and never anything else.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JobResult {
    Completed { outputs: Vec<OutputArtifact> },
    Failed { error: String },
}

/// Per-job failure modes surfaced through the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// An input image was rejected or could not be decoded.
    #[error("Image upload failed: {0}")]
    Upload(ComfyUIApiError),

    /// The queue endpoint rejected the workflow graph.
    #[error("Workflow submission failed: {0}")]
    Submit(ComfyUIApiError),

    /// A history poll failed at the transport level.
    #[error("History request failed: {0}")]
    History(ComfyUIApiError),

    /// The job did not complete within the configured window.
    #[error("Job {prompt_id} timed out after {}s", .elapsed.as_secs())]
    Timeout {
        prompt_id: String,
        elapsed: Duration,
    },
}

/// Handles jobs against one managed ComfyUI instance.
pub struct JobHandler {
    api: ComfyUIApi,
    config: WorkerConfig,
}

impl JobHandler {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            api: ComfyUIApi::new(config.api_url()),
            config,
        }
    }

    /// Handle one job end to end.
    ///
    /// Always returns a [`JobResult`]; errors are logged and mapped to
    /// the in-band `{error}` shape at this boundary.
    pub async fn handle(&self, job: JobRequest) -> JobResult {
        let Some(mut workflow_graph) = job.input.workflow else {
            return JobResult::Failed {
                error: "Missing 'workflow' in input".into(),
            };
        };

        match self.run(&mut workflow_graph, &job.input.images).await {
            Ok(outputs) => {
                tracing::info!(count = outputs.len(), "Job completed");
                JobResult::Completed { outputs }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Job failed");
                JobResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// The fallible middle of a job: upload + rewrite, submit, poll,
    /// collect.
    async fn run(
        &self,
        workflow_graph: &mut serde_json::Value,
        images: &[InputImage],
    ) -> Result<Vec<OutputArtifact>, JobError> {
        for image in images {
            let uploaded = self
                .api
                .upload_image(&image.image, &image.name)
                .await
                .map_err(JobError::Upload)?;
            tracing::debug!(original = %image.name, uploaded = %uploaded, "Input image uploaded");
            workflow::bind_uploaded_image(workflow_graph, &image.name, &uploaded);
        }

        let client_id = uuid::Uuid::new_v4().to_string();
        let submitted = self
            .api
            .submit_workflow(workflow_graph, &client_id)
            .await
            .map_err(JobError::Submit)?;
        tracing::info!(prompt_id = %submitted.prompt_id, number = submitted.number, "Workflow queued");

        let history = self.wait_for_result(&submitted.prompt_id).await?;
        Ok(collect_outputs(&history, &self.config.output_dir()))
    }

    /// Poll `/history/{prompt_id}` until the job's record appears.
    ///
    /// A response that lacks the record -- or a non-2xx status -- means
    /// the job is still running: sleep one interval and retry.
    /// Transport-level failures abandon the wait immediately; a dead
    /// backend will not come back within the job window.
    async fn wait_for_result(&self, prompt_id: &str) -> Result<HistoryEntry, JobError> {
        let api = &self.api;
        let result = poll_until(
            self.config.poll_interval(),
            self.config.job_timeout(),
            move || async move {
                match api.get_history(prompt_id).await {
                    Ok(mut history) => Ok(history.remove(prompt_id)),
                    Err(ComfyUIApiError::ApiError { status, .. }) => {
                        tracing::trace!(prompt_id, status, "History not available yet");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            },
        )
        .await;

        match result {
            Ok(entry) => Ok(entry),
            Err(PollError::Timeout { elapsed }) => Err(JobError::Timeout {
                prompt_id: prompt_id.to_string(),
                elapsed,
            }),
            Err(PollError::Probe(e)) => Err(JobError::History(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_handler() -> JobHandler {
        JobHandler::new(WorkerConfig {
            comfyui_path: PathBuf::from("/workspace/ComfyUI"),
            comfyui_host: "127.0.0.1".into(),
            comfyui_port: 8188,
            comfyui_python: "python3".into(),
            extra_model_paths_config: PathBuf::from("/extra_model_paths.yaml"),
            job_timeout_secs: 600,
            startup_timeout_secs: 120,
            poll_interval_ms: 500,
            worker_host: "0.0.0.0".into(),
            worker_port: 8000,
        })
    }

    #[tokio::test]
    async fn missing_workflow_yields_error_result() {
        let handler = test_handler();
        let job: JobRequest = serde_json::from_value(serde_json::json!({
            "input": {"images": []}
        }))
        .unwrap();

        let result = handler.handle(job).await;

        match result {
            JobResult::Failed { error } => assert_eq!(error, "Missing 'workflow' in input"),
            JobResult::Completed { .. } => panic!("Expected failure for missing workflow"),
        }
    }

    #[tokio::test]
    async fn empty_input_yields_error_result() {
        let handler = test_handler();
        let job: JobRequest = serde_json::from_value(serde_json::json!({})).unwrap();

        let result = handler.handle(job).await;
        assert!(matches!(result, JobResult::Failed { .. }));
    }

    #[test]
    fn job_result_serializes_to_exactly_one_key() {
        let failed = JobResult::Failed {
            error: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"error": "boom"}),
        );

        let completed = JobResult::Completed { outputs: vec![] };
        assert_eq!(
            serde_json::to_value(&completed).unwrap(),
            serde_json::json!({"outputs": []}),
        );
    }

    #[test]
    fn input_image_defaults_match_the_dispatcher_contract() {
        let image: InputImage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(image.name, "input_image.jpg");
        assert_eq!(image.image, "");
    }
}

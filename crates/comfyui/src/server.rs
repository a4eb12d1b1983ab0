//! ComfyUI child-process supervision.
//!
//! The worker owns exactly one ComfyUI instance for its whole lifetime.
//! [`ComfyUIServer::start`] spawns it; [`ComfyUIServer::wait_ready`]
//! blocks until its HTTP API answers. There is no restart path: if the
//! child dies, per-job HTTP calls fail and orchestrator-level
//! replacement of the whole worker takes over.

use std::convert::Infallible;
use std::process::Stdio;
use std::time::Duration;

use comfypod_core::config::WorkerConfig;
use comfypod_core::retry::{poll_until, PollError};
use tokio::process::{Child, Command};

use crate::api::ComfyUIApi;

/// Interval between readiness probes during startup.
const READY_PROBE_INTERVAL: Duration = Duration::from_secs(2);

/// Handle to the managed ComfyUI child process.
///
/// Holding this value keeps the child registered with the runtime; it
/// is never killed or restarted by the worker.
pub struct ComfyUIServer {
    child: Child,
}

/// Errors from process startup.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The child process could not be spawned.
    #[error("Failed to spawn ComfyUI: {0}")]
    Spawn(#[from] std::io::Error),

    /// The statistics endpoint never answered within the startup window.
    #[error("ComfyUI failed to start within {}s", .waited.as_secs())]
    StartupTimeout {
        /// Total time spent probing.
        waited: Duration,
    },
}

impl ComfyUIServer {
    /// Launch ComfyUI as a child process.
    ///
    /// Runs `{python} main.py` inside the install directory with the
    /// fixed serverless argument set: bind address, port, model-path
    /// config, no browser auto-launch, no metadata embedding. The
    /// child's stdout/stderr are inherited so its logs interleave with
    /// the worker's own.
    pub fn start(config: &WorkerConfig) -> Result<Self, ServerError> {
        let mut command = launch_command(config);
        let child = command.spawn()?;

        tracing::info!(
            pid = child.id(),
            path = %config.comfyui_path.display(),
            url = %config.api_url(),
            "Starting ComfyUI",
        );

        Ok(Self { child })
    }

    /// OS process id of the child, while it is running.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Block until the server's statistics endpoint answers.
    ///
    /// Probes `GET /system_stats` every 2 seconds; any 2xx response
    /// means ready. Probe failures (connection refused while the server
    /// is still importing models, transient HTTP errors) are swallowed
    /// and retried. Exhausting `timeout` yields
    /// [`ServerError::StartupTimeout`] -- the worker must not accept
    /// jobs against a backend that never came up.
    pub async fn wait_ready(&self, api: &ComfyUIApi, timeout: Duration) -> Result<(), ServerError> {
        let result: Result<(), PollError<Infallible>> =
            poll_until(READY_PROBE_INTERVAL, timeout, move || async move {
                match api.system_stats().await {
                    Ok(()) => Ok(Some(())),
                    Err(e) => {
                        tracing::debug!(error = %e, "ComfyUI not ready yet");
                        Ok(None)
                    }
                }
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(pid = self.pid(), "ComfyUI is ready");
                Ok(())
            }
            Err(PollError::Timeout { elapsed }) => Err(ServerError::StartupTimeout { waited: elapsed }),
            Err(PollError::Probe(never)) => match never {},
        }
    }
}

/// Build the ComfyUI launch command from worker configuration.
fn launch_command(config: &WorkerConfig) -> Command {
    let mut command = Command::new(&config.comfyui_python);
    command
        .arg("main.py")
        .arg("--listen")
        .arg(&config.comfyui_host)
        .arg("--port")
        .arg(config.comfyui_port.to_string())
        .arg("--extra-model-paths-config")
        .arg(&config.extra_model_paths_config)
        .arg("--disable-auto-launch")
        .arg("--disable-metadata")
        .current_dir(&config.comfyui_path)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::path::PathBuf;

    fn test_config() -> WorkerConfig {
        WorkerConfig {
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
        }
    }

    #[test]
    fn launch_command_carries_the_fixed_argument_set() {
        let config = test_config();
        let command = launch_command(&config);
        let std_command = command.as_std();

        let args: Vec<&OsStr> = std_command.get_args().collect();
        assert_eq!(
            args,
            [
                "main.py",
                "--listen",
                "127.0.0.1",
                "--port",
                "8188",
                "--extra-model-paths-config",
                "/extra_model_paths.yaml",
                "--disable-auto-launch",
                "--disable-metadata",
            ]
            .map(OsStr::new)
        );
        assert_eq!(std_command.get_program(), "python3");
        assert_eq!(
            std_command.get_current_dir(),
            Some(PathBuf::from("/workspace/ComfyUI").as_path())
        );
    }
}

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults matching the standard serverless image
/// layout and are fixed for the lifetime of the process. In
/// production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// ComfyUI install directory; the child process runs with this as
    /// its working directory (default: `/workspace/ComfyUI`).
    pub comfyui_path: PathBuf,
    /// Host ComfyUI binds to and the worker connects to (default: `127.0.0.1`).
    pub comfyui_host: String,
    /// Port ComfyUI binds to (default: `8188`).
    pub comfyui_port: u16,
    /// Interpreter used to launch ComfyUI's `main.py` (default: `python3`).
    pub comfyui_python: String,
    /// Model-path configuration file handed to ComfyUI
    /// (default: `/extra_model_paths.yaml`).
    pub extra_model_paths_config: PathBuf,
    /// Per-job result-poll window in seconds (default: `600` -- video
    /// generation can run close to the full window).
    pub job_timeout_secs: u64,
    /// Startup readiness-poll window in seconds (default: `120`).
    pub startup_timeout_secs: u64,
    /// Sleep between result polls, in milliseconds (default: `500`).
    pub poll_interval_ms: u64,
    /// Job-ingress bind host (default: `0.0.0.0`).
    pub worker_host: String,
    /// Job-ingress bind port (default: `8000`).
    pub worker_port: u16,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `COMFYUI_PATH`             | `/workspace/ComfyUI`       |
    /// | `COMFYUI_HOST`             | `127.0.0.1`                |
    /// | `COMFYUI_PORT`             | `8188`                     |
    /// | `COMFYUI_PYTHON`           | `python3`                  |
    /// | `EXTRA_MODEL_PATHS_CONFIG` | `/extra_model_paths.yaml`  |
    /// | `JOB_TIMEOUT_SECS`         | `600`                      |
    /// | `STARTUP_TIMEOUT_SECS`     | `120`                      |
    /// | `POLL_INTERVAL_MS`         | `500`                      |
    /// | `WORKER_HOST`              | `0.0.0.0`                  |
    /// | `WORKER_PORT`              | `8000`                     |
    ///
    /// Panics on malformed numeric values -- misconfiguration should
    /// fail fast at startup, before any job is accepted.
    pub fn from_env() -> Self {
        let comfyui_path =
            PathBuf::from(std::env::var("COMFYUI_PATH").unwrap_or_else(|_| "/workspace/ComfyUI".into()));

        let comfyui_host = std::env::var("COMFYUI_HOST").unwrap_or_else(|_| "127.0.0.1".into());

        let comfyui_port: u16 = std::env::var("COMFYUI_PORT")
            .unwrap_or_else(|_| "8188".into())
            .parse()
            .expect("COMFYUI_PORT must be a valid u16");

        let comfyui_python = std::env::var("COMFYUI_PYTHON").unwrap_or_else(|_| "python3".into());

        let extra_model_paths_config = PathBuf::from(
            std::env::var("EXTRA_MODEL_PATHS_CONFIG")
                .unwrap_or_else(|_| "/extra_model_paths.yaml".into()),
        );

        let job_timeout_secs: u64 = std::env::var("JOB_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("JOB_TIMEOUT_SECS must be a valid u64");

        let startup_timeout_secs: u64 = std::env::var("STARTUP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("STARTUP_TIMEOUT_SECS must be a valid u64");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let worker_host = std::env::var("WORKER_HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let worker_port: u16 = std::env::var("WORKER_PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("WORKER_PORT must be a valid u16");

        Self {
            comfyui_path,
            comfyui_host,
            comfyui_port,
            comfyui_python,
            extra_model_paths_config,
            job_timeout_secs,
            startup_timeout_secs,
            poll_interval_ms,
            worker_host,
            worker_port,
        }
    }

    /// Base HTTP URL of the managed ComfyUI instance,
    /// e.g. `http://127.0.0.1:8188`.
    pub fn api_url(&self) -> String {
        format!("http://{}:{}", self.comfyui_host, self.comfyui_port)
    }

    /// Directory ComfyUI writes finished outputs into.
    pub fn output_dir(&self) -> PathBuf {
        self.comfyui_path.join("output")
    }

    /// Per-job result-poll window.
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Startup readiness-poll window.
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Sleep between result polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

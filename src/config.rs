//! Configuration module

use std::env;
use std::path::PathBuf;

/// Default listen port
pub const DEFAULT_PORT: u16 = 10000;

pub const DEFAULT_MODEL_FILE: &str = "model.onnx";
pub const DEFAULT_TIME_SCALER_FILE: &str = "time_scaler.json";
pub const DEFAULT_AMOUNT_SCALER_FILE: &str = "amount_scaler.json";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Directory holding the model and scaler artifacts
    pub artifact_dir: PathBuf,

    /// Classifier file name inside `artifact_dir`
    pub model_file: String,

    /// Time scaler file name inside `artifact_dir`
    pub time_scaler_file: String,

    /// Amount scaler file name inside `artifact_dir`
    pub amount_scaler_file: String,

    /// Intra-op threads for the ONNX session
    pub onnx_threads: usize,

    pub log_format: LogFormat,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            artifact_dir: default_artifact_dir(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            time_scaler_file: DEFAULT_TIME_SCALER_FILE.to_string(),
            amount_scaler_file: DEFAULT_AMOUNT_SCALER_FILE.to_string(),
            onnx_threads: 1,
            log_format: LogFormat::Pretty,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),

            artifact_dir: lookup("ARTIFACT_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),

            model_file: lookup("MODEL_FILE").unwrap_or(defaults.model_file),

            time_scaler_file: lookup("TIME_SCALER_FILE").unwrap_or(defaults.time_scaler_file),

            amount_scaler_file: lookup("AMOUNT_SCALER_FILE").unwrap_or(defaults.amount_scaler_file),

            onnx_threads: lookup("ONNX_THREADS")
                .and_then(|t| t.trim().parse().ok())
                .filter(|&t: &usize| t > 0)
                .unwrap_or(defaults.onnx_threads),

            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),

            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.model_file)
    }

    pub fn time_scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.time_scaler_file)
    }

    pub fn amount_scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.amount_scaler_file)
    }
}

/// Directory containing the running executable, so artifact lookup does not
/// depend on the working directory. Falls back to `.` if it cannot be resolved.
fn default_artifact_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

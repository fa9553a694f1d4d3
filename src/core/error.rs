use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the installer and the supervisor.
/// Every module returns `Result<T, StarterError>`.
#[derive(Debug, Error)]
pub enum StarterError {
    // ── Config ──────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Metadata lookup failed for project {component_id} file {artifact_id}: {reason}")]
    Lookup {
        component_id: u64,
        artifact_id: u64,
        reason: String,
    },

    // ── Manifest ────────────────────────────────────────
    #[error("Malformed manifest: {0}")]
    Manifest(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Process ─────────────────────────────────────────
    #[error("Process error: {0}")]
    Process(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Server crashed {count} times within {window}")]
    CrashLimit { count: usize, window: String },

    // ── License ─────────────────────────────────────────
    #[error("License not accepted, set it to true in {0:?} to start the server")]
    LicenseNotAccepted(PathBuf),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type StarterResult<T> = Result<T, StarterError>;

impl From<std::io::Error> for StarterError {
    fn from(source: std::io::Error) -> Self {
        StarterError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl StarterError {
    /// Wrap an IO error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StarterError::Io {
            path: path.into(),
            source,
        }
    }
}

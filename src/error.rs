//! Application error type.
//!
//! Every variant maps to a process exit code so `main` can stay tiny:
//!
//! - `2`: configuration, I/O, sheet reading
//! - `3`: data and alignment problems in the measurements
//! - `4`: degenerate calibration, plot rendering

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(String),

    #[error("{context} '{}': {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Sheet(String),

    #[error("{0}")]
    Alignment(String),

    #[error("{0}")]
    Data(String),

    #[error("Degenerate calibration regression: {0}")]
    DegenerateRegression(String),

    #[error("Failed to render plot '{file}': {message}")]
    Plot { file: String, message: String },
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Io { .. } | AppError::Sheet(_) => 2,
            AppError::Alignment(_) | AppError::Data(_) => 3,
            AppError::DegenerateRegression(_) | AppError::Plot { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_family() {
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::Alignment("x".into()).exit_code(), 3);
        assert_eq!(AppError::DegenerateRegression("x".into()).exit_code(), 4);
    }

    #[test]
    fn io_error_names_the_path() {
        let err = AppError::io(
            "Failed to create export CSV",
            Path::new("out/MEFL.csv"),
            std::io::Error::other("disk full"),
        );
        let msg = err.to_string();
        assert!(msg.contains("out/MEFL.csv"), "{msg}");
        assert!(msg.contains("disk full"), "{msg}");
    }
}

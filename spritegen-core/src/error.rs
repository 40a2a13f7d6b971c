//! Error types for sprite generation

use std::path::PathBuf;

use thiserror::Error;

/// Problems with the request file itself.
#[derive(Debug, Error)]
pub enum InputError {
    /// The request file is missing or unreadable
    #[error("failed to read request file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request is not a JSON object with string fields
    #[error("request is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required key is absent or null
    #[error("request is missing required field `{0}`")]
    MissingField(&'static str),

    /// A required key holds only whitespace
    #[error("request field `{0}` is empty")]
    EmptyField(&'static str),
}

/// Every way a generation run can fail.
#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("invalid request")]
    Input(#[from] InputError),

    #[error("failed to load model `{model_id}`")]
    ModelLoad {
        model_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("inference failed")]
    Inference(#[source] anyhow::Error),

    #[error("failed to write image to {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl SpriteError {
    pub(crate) fn output(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::Output {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpriteError>;

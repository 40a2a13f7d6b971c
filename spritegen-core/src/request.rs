use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::InputError;

/// A sprite request as read from disk.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub name: String,
    pub description: String,
    pub game_style: String,
}

// Every field optional so absent keys surface as `MissingField` instead of a
// serde message.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    name: Option<String>,
    description: Option<String>,
    game_style: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, InputError> {
    let value = value.ok_or(InputError::MissingField(field))?;
    if value.trim().is_empty() {
        return Err(InputError::EmptyField(field));
    }
    Ok(value)
}

impl GenerationRequest {
    /// Reads and validates a request file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read {} bytes from {}", contents.len(), path.display());
        Self::from_json_str(&contents)
    }

    /// Parses and validates a request from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, InputError> {
        let raw: RawRequest = serde_json::from_str(json)?;
        Ok(Self {
            name: required(raw.name, "name")?,
            description: required(raw.description, "description")?,
            game_style: required(raw.game_style, "gameStyle")?,
        })
    }
}

use anyhow::anyhow;
use hf_hub::api::tokio::Api;
use tracing::info;

use crate::stable_diffusion::{StableDiffusionLoader, StableDiffusionVersion};
use crate::{InferenceConfig, Loader, ModelLike, SpriteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    StableDiffusion(StableDiffusionVersion),
}

impl ModelVariant {
    /// Detect model variant from model name
    pub fn from_name(model_name: &str) -> Option<Self> {
        let name_upper = model_name.to_uppercase();

        if name_upper.contains("XL") {
            Some(Self::StableDiffusion(StableDiffusionVersion::Xl))
        } else if ["1-5", "1.5", "1_5"]
            .iter()
            .any(|tag| name_upper.contains(tag))
        {
            Some(Self::StableDiffusion(StableDiffusionVersion::V1_5))
        } else {
            None
        }
    }
}

/// Load a model based on its name, automatically detecting the appropriate loader.
///
/// Unrecognised names fail here, before anything is downloaded.
pub async fn load_model(
    config: &InferenceConfig,
    api: Api,
) -> Result<Box<dyn ModelLike>, SpriteError> {
    let model_error = |source: anyhow::Error| SpriteError::ModelLoad {
        model_id: config.model_id.clone(),
        source,
    };

    let variant = ModelVariant::from_name(&config.model_id)
        .ok_or_else(|| model_error(anyhow!("no supported Stable Diffusion family in model name")))?;
    config.validate().map_err(model_error)?;

    info!(
        "Loading model: {} (detected variant: {:?})",
        config.model_id, variant
    );

    match variant {
        ModelVariant::StableDiffusion(_) => {
            let model = StableDiffusionLoader::load(variant, config, api)
                .await
                .map_err(model_error)?;
            Ok(Box::new(model))
        }
    }
}

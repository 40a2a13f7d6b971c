use anyhow::{bail, Result};

use crate::{DeviceMap, PromptTemplate};

/// Hyperparameters and checkpoint for one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    /// Hugging Face repository holding the diffusers-layout checkpoint
    pub model_id: String,
    pub steps: usize,
    pub guidance_scale: f64,
    pub width: usize,
    pub height: usize,
    pub device_map: DeviceMap,
    pub seed: Option<u64>,
}

impl InferenceConfig {
    /// Classifier-free guidance is skipped at scales of 1 or below.
    pub fn uses_guidance(&self) -> bool {
        self.guidance_scale > 1.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            bail!("step count must be at least 1");
        }
        if self.width == 0 || self.height == 0 || self.width % 8 != 0 || self.height % 8 != 0 {
            bail!(
                "image size must be a non-zero multiple of 8, got {}x{}",
                self.width,
                self.height
            );
        }
        if !self.guidance_scale.is_finite() || self.guidance_scale < 0.0 {
            bail!("guidance scale must be a non-negative number, got {}", self.guidance_scale);
        }
        Ok(())
    }
}

/// Compiled-in checkpoint presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Stable Diffusion 1.5, fast enough for CPU
    #[default]
    Sd15,
    /// Stable Diffusion XL base 1.0
    Sdxl,
}

impl Preset {
    pub fn model_id(&self) -> &'static str {
        match self {
            // runwayml/stable-diffusion-v1-5 was taken down; this is a verbatim mirror
            Self::Sd15 => "benjamin-paine/stable-diffusion-v1-5",
            Self::Sdxl => "stabilityai/stable-diffusion-xl-base-1.0",
        }
    }

    pub fn inference_config(&self) -> InferenceConfig {
        let steps = match self {
            Self::Sd15 => 25,
            Self::Sdxl => 20,
        };
        InferenceConfig {
            model_id: self.model_id().to_string(),
            steps,
            guidance_scale: 7.5,
            width: 512,
            height: 512,
            device_map: DeviceMap::default(),
            seed: None,
        }
    }

    pub fn prompt_template(&self) -> PromptTemplate {
        match self {
            Self::Sd15 => PromptTemplate::SD15,
            Self::Sdxl => PromptTemplate::SDXL,
        }
    }
}

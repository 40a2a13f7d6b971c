use std::path::{Path, PathBuf};

use anyhow::anyhow;
use hf_hub::api::tokio::Api;
use tracing::info;

use crate::{
    load_model, GenerationRequest, ImageWriter, InferenceConfig, ModelLike, Preset, PromptPair,
    PromptTemplate, Result, SpriteError,
};

/// Request file in, sprite image out.
#[derive(Debug, Clone)]
pub struct SpritePipeline {
    pub config: InferenceConfig,
    pub template: PromptTemplate,
}

impl SpritePipeline {
    pub fn new(config: InferenceConfig, template: PromptTemplate) -> Self {
        Self { config, template }
    }

    pub fn from_preset(preset: Preset) -> Self {
        Self::new(preset.inference_config(), preset.prompt_template())
    }

    /// Loads the request, builds the prompts and checks the output path.
    /// Cheap: no model is touched.
    pub fn prepare(&self, request_path: &Path, output_path: &Path) -> Result<PreparedJob> {
        let request = GenerationRequest::from_file(request_path)?;
        info!("Generating: {}", request.name);
        info!("  Description: {}", request.description);
        info!("  Style: {}", request.game_style);

        let prompts = self.template.build(&request);
        info!("Prompt: {}...", prompts.preview(100));

        let writer = ImageWriter::new(output_path)?;
        Ok(PreparedJob {
            config: self.config.clone(),
            request,
            prompts,
            writer,
        })
    }

    pub async fn run(&self, request_path: &Path, output_path: &Path, api: Api) -> Result<PathBuf> {
        let job = self.prepare(request_path, output_path)?;
        let model = load_model(&self.config, api).await?;
        job.execute(model)
    }
}

/// A validated request waiting for a model.
#[derive(Debug)]
pub struct PreparedJob {
    config: InferenceConfig,
    request: GenerationRequest,
    prompts: PromptPair,
    writer: ImageWriter,
}

impl PreparedJob {
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn prompts(&self) -> &PromptPair {
        &self.prompts
    }

    /// Runs one inference and writes the result. The model is dropped as
    /// soon as the image exists, before encoding starts.
    pub fn execute(self, model: Box<dyn ModelLike>) -> Result<PathBuf> {
        let image = model
            .generate(&self.prompts, &self.config)
            .map_err(SpriteError::Inference)?;
        drop(model);

        let expected = (self.config.width as u32, self.config.height as u32);
        if (image.width(), image.height()) != expected {
            return Err(SpriteError::Inference(anyhow!(
                "model produced a {}x{} image, expected {}x{}",
                image.width(),
                image.height(),
                expected.0,
                expected.1
            )));
        }

        self.writer.write(&image)?;
        info!("Image saved to: {}", self.writer.path().display());
        Ok(self.writer.path().to_path_buf())
    }
}

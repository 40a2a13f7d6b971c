use std::time::Instant;

use anyhow::{Context, Result};
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_transformers::models::stable_diffusion::{
    unet_2d::UNet2DConditionModel, vae::AutoEncoderKL, StableDiffusionConfig,
};
use hf_hub::api::tokio::Api;
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, info};

mod text_encoder;

use text_encoder::TextEncoder;

use crate::{
    select_best_device, tensor_to_image, InferenceConfig, Loader, ModelLike, ModelVariant,
    PromptPair,
};

/// Stable Diffusion families with a diffusers-layout checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableDiffusionVersion {
    V1_5,
    Xl,
}

impl StableDiffusionVersion {
    pub fn config(&self, width: usize, height: usize) -> StableDiffusionConfig {
        match self {
            Self::V1_5 => StableDiffusionConfig::v1_5(None, Some(height), Some(width)),
            Self::Xl => StableDiffusionConfig::sdxl(None, Some(height), Some(width)),
        }
    }

    /// The checkpoints ship without tokenizer.json, so tokenizers come from
    /// the CLIP repositories they were trained with.
    fn tokenizer_repo(&self) -> &'static str {
        match self {
            Self::V1_5 => "openai/clip-vit-base-patch32",
            Self::Xl => "openai/clip-vit-large-patch14",
        }
    }

    fn tokenizer2_repo(&self) -> Option<&'static str> {
        match self {
            Self::V1_5 => None,
            Self::Xl => Some("laion/CLIP-ViT-bigG-14-laion2B-39B-b160k"),
        }
    }

    /// `scaling_factor` from the checkpoint's VAE config.
    fn vae_scale(&self) -> f64 {
        match self {
            Self::V1_5 => 0.18215,
            Self::Xl => 0.13025,
        }
    }
}

const PROGRESS_EVERY: usize = 5;

fn reports_progress(step: usize, total: usize) -> bool {
    step % PROGRESS_EVERY == 0 || step == total
}

/// Standard-normal noise. A seed draws it from a host RNG so the same seed
/// gives the same latents on every device, CPU included.
fn initial_latents(
    shape: (usize, usize, usize, usize),
    seed: Option<u64>,
    device: &Device,
) -> Result<Tensor> {
    let Some(seed) = seed else {
        return Ok(Tensor::randn(0f32, 1f32, shape, device)?);
    };
    let (b, c, h, w) = shape;
    let mut rng = StdRng::seed_from_u64(seed);
    let noise: Vec<f32> = (0..b * c * h * w)
        .map(|_| rng.sample(StandardNormal))
        .collect();
    Ok(Tensor::from_vec(noise, shape, &Device::Cpu)?.to_device(device)?)
}

pub struct StableDiffusionModel {
    version: StableDiffusionVersion,
    device: Device,
    dtype: DType,
    sd_config: StableDiffusionConfig,
    width: usize,
    height: usize,
    text_encoders: Vec<TextEncoder>,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
}

impl StableDiffusionModel {
    /// Stacks the embeddings of every text encoder along the hidden axis,
    /// with the negative prompt first when guidance is on.
    fn text_embeddings(&self, prompts: &PromptPair, use_guidance: bool) -> Result<Tensor> {
        let mut embeddings = Vec::with_capacity(self.text_encoders.len());
        for encoder in &self.text_encoders {
            let cond = encoder.encode(&prompts.positive, &self.device)?;
            let embedding = if use_guidance {
                let uncond = encoder.encode(&prompts.negative, &self.device)?;
                Tensor::cat(&[uncond, cond], 0)?
            } else {
                cond
            };
            embeddings.push(embedding.to_dtype(self.dtype)?);
        }
        Ok(Tensor::cat(&embeddings, D::Minus1)?)
    }
}

impl ModelLike for StableDiffusionModel {
    fn generate(&self, prompts: &PromptPair, config: &InferenceConfig) -> Result<DynamicImage> {
        let use_guidance = config.uses_guidance();
        let mut scheduler = self
            .sd_config
            .build_scheduler(config.steps)
            .context("failed to build scheduler")?;

        let text_embeddings = self.text_embeddings(prompts, use_guidance)?;
        debug!("Text embeddings: {:?}", text_embeddings.shape());

        let latents = initial_latents(
            (1, 4, self.height / 8, self.width / 8),
            config.seed,
            &self.device,
        )?;
        let mut latents = (latents * scheduler.init_noise_sigma())?.to_dtype(self.dtype)?;

        info!("Generating image ({} steps)...", config.steps);
        let timesteps = scheduler.timesteps().to_vec();
        let total = timesteps.len();
        for (index, &timestep) in timesteps.iter().enumerate() {
            let start = Instant::now();
            let latent_model_input = if use_guidance {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let latent_model_input = scheduler.scale_model_input(latent_model_input, timestep)?;
            let noise_pred = self
                .unet
                .forward(&latent_model_input, timestep as f64, &text_embeddings)?;

            let noise_pred = if use_guidance {
                let noise_pred = noise_pred.chunk(2, 0)?;
                let (noise_pred_uncond, noise_pred_text) = (&noise_pred[0], &noise_pred[1]);
                (noise_pred_uncond + ((noise_pred_text - noise_pred_uncond)? * config.guidance_scale)?)?
            } else {
                noise_pred
            };

            latents = scheduler.step(&noise_pred, timestep, &latents)?;
            let step = index + 1;
            let elapsed = start.elapsed().as_secs_f32();
            if reports_progress(step, total) {
                info!("step {step}/{total} done, {elapsed:.2}s");
            } else {
                debug!("step {step}/{total} done, {elapsed:.2}s");
            }
        }

        let decoded = self.vae.decode(&(&latents / self.version.vae_scale())?)?;
        info!("Decoded image");

        let img = ((decoded / 2.)? + 0.5)?.to_device(&Device::Cpu)?;
        let img = (img.clamp(0f32, 1.)? * 255.)?.to_dtype(DType::U8)?.i(0)?;
        tensor_to_image(&img)
    }
}

pub struct StableDiffusionLoader;

impl Loader for StableDiffusionLoader {
    type Model = StableDiffusionModel;

    async fn load(variant: ModelVariant, config: &InferenceConfig, api: Api) -> Result<Self::Model> {
        let ModelVariant::StableDiffusion(version) = variant;

        let device = select_best_device(config.device_map).context("failed to set up device")?;
        let dtype = DType::F32;
        let sd_config = version.config(config.width, config.height);

        let repo = api.model(config.model_id.clone());

        // --- Text encoders ---
        let tokenizer_file = api
            .model(version.tokenizer_repo().to_string())
            .get("tokenizer.json")
            .await
            .context("failed to get CLIP tokenizer")?;
        let clip_file = repo
            .get("text_encoder/model.safetensors")
            .await
            .context("failed to get CLIP weights")?;
        debug!("CLIP weights at {}", clip_file.display());
        let mut text_encoders = vec![TextEncoder::new(
            tokenizer_file,
            clip_file,
            &sd_config.clip,
            &device,
        )?];

        if let (Some(clip2_config), Some(tokenizer2_repo)) =
            (sd_config.clip2.as_ref(), version.tokenizer2_repo())
        {
            let tokenizer2_file = api
                .model(tokenizer2_repo.to_string())
                .get("tokenizer.json")
                .await
                .context("failed to get second CLIP tokenizer")?;
            let clip2_file = repo
                .get("text_encoder_2/model.safetensors")
                .await
                .context("failed to get second CLIP weights")?;
            text_encoders.push(TextEncoder::new(
                tokenizer2_file,
                clip2_file,
                clip2_config,
                &device,
            )?);
        }
        info!("Loaded {} text encoder(s)", text_encoders.len());

        // --- UNet ---
        let unet_file = repo
            .get("unet/diffusion_pytorch_model.safetensors")
            .await
            .context("failed to get UNet weights")?;
        debug!("UNet weights at {}", unet_file.display());
        let use_flash_attn = cfg!(feature = "flash-attn");
        let unet = sd_config
            .build_unet(&unet_file, &device, 4, use_flash_attn, dtype)
            .context("failed to load UNet")?;
        info!("Loaded UNet");

        // --- VAE ---
        let vae_file = repo
            .get("vae/diffusion_pytorch_model.safetensors")
            .await
            .context("failed to get VAE weights")?;
        let vae = sd_config
            .build_vae(&vae_file, &device, dtype)
            .context("failed to load VAE")?;
        info!("Loaded VAE");

        Ok(StableDiffusionModel {
            version,
            device,
            dtype,
            sd_config,
            width: config.width,
            height: config.height,
            text_encoders,
            unet,
            vae,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StableDiffusionVersion::V1_5, false)]
    #[case(StableDiffusionVersion::Xl, true)]
    fn test_second_text_encoder(#[case] version: StableDiffusionVersion, #[case] dual: bool) {
        let config = version.config(512, 512);
        assert_eq!(config.clip2.is_some(), dual);
        assert_eq!(version.tokenizer2_repo().is_some(), dual);
    }

    #[test]
    fn test_vae_scale_follows_checkpoint() {
        assert_eq!(StableDiffusionVersion::V1_5.vae_scale(), 0.18215);
        assert_eq!(StableDiffusionVersion::Xl.vae_scale(), 0.13025);
    }

    #[test]
    fn test_seeded_latents_repeat_on_cpu() {
        let shape = (1, 4, 8, 8);
        let a = initial_latents(shape, Some(7), &Device::Cpu).unwrap();
        let b = initial_latents(shape, Some(7), &Device::Cpu).unwrap();
        let c = initial_latents(shape, Some(8), &Device::Cpu).unwrap();
        assert_eq!(a.dims4().unwrap(), shape);

        let a = a.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let b = b.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let c = c.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unseeded_latents_shape() {
        let latents = initial_latents((1, 4, 8, 8), None, &Device::Cpu).unwrap();
        assert_eq!(latents.dims4().unwrap(), (1, 4, 8, 8));
    }

    #[rstest]
    #[case(1, 25, false)]
    #[case(5, 25, true)]
    #[case(24, 25, false)]
    #[case(25, 25, true)]
    #[case(3, 3, true)]
    fn test_progress_cadence(#[case] step: usize, #[case] total: usize, #[case] expected: bool) {
        assert_eq!(reports_progress(step, total), expected);
    }

    #[rstest]
    #[case(StableDiffusionVersion::V1_5)]
    #[case(StableDiffusionVersion::Xl)]
    fn test_clip_context_length(#[case] version: StableDiffusionVersion) {
        let config = version.config(512, 512);
        assert_eq!(config.clip.max_position_embeddings, 77);
        assert_eq!((config.width, config.height), (512, 512));
    }
}

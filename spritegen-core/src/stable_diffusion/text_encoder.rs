use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::Module;
use candle_transformers::models::stable_diffusion::{self, clip};
use tokenizers::Tokenizer;
use tracing::warn;

const END_OF_TEXT: &str = "<|endoftext|>";

/// A CLIP tokenizer paired with its text transformer.
pub(super) struct TextEncoder {
    tokenizer: Tokenizer,
    model: clip::ClipTextTransformer,
    max_len: usize,
    pad_id: u32,
    eos_id: u32,
}

impl TextEncoder {
    pub(super) fn new(
        tokenizer_file: impl AsRef<Path>,
        weights_file: impl AsRef<Path>,
        config: &clip::Config,
        device: &Device,
    ) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_file)
            .map_err(anyhow::Error::msg)
            .context("failed to load CLIP tokenizer")?;
        let vocab = tokenizer.get_vocab(true);
        let eos_id = *vocab
            .get(END_OF_TEXT)
            .with_context(|| format!("tokenizer has no {END_OF_TEXT} token"))?;
        let pad_id = match &config.pad_with {
            Some(padding) => *vocab
                .get(padding.as_str())
                .with_context(|| format!("tokenizer has no padding token {padding:?}"))?,
            None => eos_id,
        };
        // CLIP runs in F32 regardless of the UNet dtype.
        let model = stable_diffusion::build_clip_transformer(config, weights_file, device, DType::F32)
            .context("failed to load CLIP text model")?;

        Ok(Self {
            tokenizer,
            model,
            max_len: config.max_position_embeddings,
            pad_id,
            eos_id,
        })
    }

    /// Embeds one prompt as a (1, max_len, hidden) tensor.
    pub(super) fn encode(&self, prompt: &str, device: &Device) -> Result<Tensor> {
        let tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(anyhow::Error::msg)?
            .get_ids()
            .to_vec();
        let tokens = fit_context(tokens, self.max_len, self.pad_id, self.eos_id);
        let tokens = Tensor::new(tokens.as_slice(), device)?.unsqueeze(0)?;
        Ok(self.model.forward(&tokens)?)
    }
}

/// Pads to `max_len`, or truncates keeping a closing end-of-text token.
fn fit_context(mut tokens: Vec<u32>, max_len: usize, pad_id: u32, eos_id: u32) -> Vec<u32> {
    if tokens.len() > max_len {
        warn!(
            "Prompt is {} tokens, truncating to the {max_len} token CLIP context",
            tokens.len()
        );
        tokens.truncate(max_len - 1);
        tokens.push(eos_id);
    }
    tokens.resize(max_len, pad_id);
    tokens
}

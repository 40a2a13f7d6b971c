//! Pixel-art sprite generation on top of candle's Stable Diffusion.
//!
//! A run reads a [`GenerationRequest`], expands it into a [`PromptPair`]
//! with a [`PromptTemplate`], loads a checkpoint through [`load_model`],
//! performs one inference and hands the image to an [`ImageWriter`].
//! [`SpritePipeline`] strings those steps together.

#[cfg(feature = "accelerate")]
extern crate accelerate_src;

#[cfg(feature = "mkl")]
extern crate intel_mkl_src;

pub mod config;
pub mod device_map;
pub mod error;
pub mod loader;
mod loader_factory;
pub mod pipeline;
pub mod prompt;
pub mod request;
mod util;
pub mod writer;

pub mod stable_diffusion;

pub use config::*;
pub use device_map::*;
pub use error::*;
use image::DynamicImage;
pub use loader::*;
pub use loader_factory::*;
pub use pipeline::*;
pub use prompt::*;
pub use request::*;
pub use stable_diffusion::{StableDiffusionLoader, StableDiffusionVersion};
pub(crate) use util::*;
pub use writer::*;

/// A loaded model that can turn prompts into one image.
pub trait ModelLike {
    fn generate(
        &self,
        prompts: &PromptPair,
        config: &InferenceConfig,
    ) -> anyhow::Result<DynamicImage>;
}

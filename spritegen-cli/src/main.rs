use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use hf_hub::api::tokio::Api;
use spritegen_core::{DeviceMap, Preset, SpritePipeline};
use tracing::error;
use tracing_subscriber::EnvFilter;

// Define command line arguments
#[derive(Parser, Debug)]
#[command(name = "spritegen", author, version, about = "Generate pixel-art game sprites with Stable Diffusion")]
struct Args {
    /// JSON request with `name`, `description` and `gameStyle`
    request: PathBuf,

    /// Where to write the image; the extension picks the format
    output: PathBuf,

    /// Checkpoint preset
    #[arg(long, value_enum, default_value_t = PresetArg::Sd15)]
    preset: PresetArg,

    /// Hugging Face model id overriding the preset's checkpoint
    #[arg(long)]
    model_id: Option<String>,

    /// Use CPU instead of GPU
    #[arg(long)]
    cpu: bool,

    /// Seed for the initial noise
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum PresetArg {
    /// Stable Diffusion 1.5 (25 steps)
    Sd15,
    /// Stable Diffusion XL base 1.0 (20 steps)
    Sdxl,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Sd15 => Preset::Sd15,
            PresetArg::Sdxl => Preset::Sdxl,
        }
    }
}

impl Args {
    fn pipeline(&self) -> SpritePipeline {
        let mut pipeline = SpritePipeline::from_preset(self.preset.into());
        if let Some(model_id) = &self.model_id {
            pipeline.config.model_id = model_id.clone();
        }
        if self.cpu {
            pipeline.config.device_map = DeviceMap::ForceCpu;
        }
        pipeline.config.seed = self.seed;
        pipeline
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let pipeline = args.pipeline();
    pipeline
        .run(&args.request, &args.output, Api::new()?)
        .await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            // Usage errors share exit code 1 with every other failure.
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            // RUST_LOG may filter out our own target.
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_sd15() {
        let args = Args::try_parse_from(["spritegen", "req.json", "out.png"]).unwrap();
        let pipeline = args.pipeline();
        assert_eq!(pipeline.config, Preset::Sd15.inference_config());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "spritegen",
            "req.json",
            "out.png",
            "--preset",
            "sdxl",
            "--model-id",
            "someone/pixel-xl",
            "--cpu",
            "--seed",
            "7",
        ])
        .unwrap();
        let config = args.pipeline().config;
        assert_eq!(config.model_id, "someone/pixel-xl");
        assert_eq!(config.device_map, DeviceMap::ForceCpu);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.steps, Preset::Sdxl.inference_config().steps);
    }

    #[test]
    fn test_requires_two_paths() {
        let err = Args::try_parse_from(["spritegen", "req.json"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}

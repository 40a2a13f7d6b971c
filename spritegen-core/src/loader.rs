use std::future::Future;

use anyhow::Result;
use hf_hub::api::tokio::Api;

use crate::{InferenceConfig, ModelLike, ModelVariant};

pub trait Loader {
    type Model: ModelLike;

    fn load(
        variant: ModelVariant,
        config: &InferenceConfig,
        api: Api,
    ) -> impl Future<Output = Result<Self::Model>>
    where
        Self: Sized;
}

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;
pub use config::{Endpoints, RunConfig};

pub use adapters::{HttpPlatform, LocalStorage, LuaScript};
pub use crate::core::{etl::CheckoutEngine, pipeline::CheckoutPipeline};
pub use domain::ports::{PaymentPlatform, Storage};
pub use utils::error::{CheckoutError, Result};

use utils::validation::Validate;

/// Validates the configuration, prepares the pipeline and runs it to
/// completion. Returns the path of the written output file.
pub async fn run<S: Storage, P: PaymentPlatform>(
    config: RunConfig,
    storage: S,
    platform: P,
) -> Result<String> {
    config.validate()?;
    let pipeline = CheckoutPipeline::new(storage, platform, config).await?;
    CheckoutEngine::new(pipeline).run().await
}

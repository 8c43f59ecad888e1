use crate::core::Pipeline;
use crate::utils::error::Result;

/// Drives a pipeline through its phases in order.
pub struct CheckoutEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> CheckoutEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Authenticating...");
        let session = self.pipeline.open_session().await?;

        tracing::info!("Loading input...");
        let sheet = self.pipeline.extract().await?;

        tracing::info!("Generating checkouts for {} rows...", sheet.rows.len());
        let result = self.pipeline.transform(&session, sheet).await?;
        tracing::info!("Generated {} checkouts", result.rows.len());

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}

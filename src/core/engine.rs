use crate::domain::model::NearbyReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

/// Runs a pipeline's extract → transform → load steps in order.
pub struct ScoutEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ScoutEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<(NearbyReport, String)> {
        tracing::info!("🚀 Starting nearby search");

        // Extract
        let input = self.pipeline.extract().await?;
        tracing::info!("📥 Fetched {} facilities", input.facilities.len());

        // Transform
        let report = self.pipeline.transform(input).await?;
        tracing::info!(
            "🔄 Ranked {} facilities, {} related performances, {} failed lookups",
            report.facilities.len(),
            report.related.len(),
            report.failures.len()
        );

        // Load
        let output_path = self.pipeline.load(&report).await?;
        tracing::info!("💾 Report saved to: {}", output_path);

        Ok((report, output_path))
    }
}

use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        let name = self.pipeline.name();
        tracing::info!("🚀 Starting {} job", name);

        // Extract
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} records", raw_data.len());

        // Transform
        let transformed = self.pipeline.transform(raw_data).await?;
        if transformed.skipped > 0 {
            tracing::warn!(
                "⚠️ Skipped {} records that could not be parsed",
                transformed.skipped
            );
        }
        tracing::info!("🔧 Transformed {} rows", transformed.table.len());

        // Load
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!(
            "✅ {} job finished in {:?}, output: {}",
            name,
            started.elapsed(),
            output_path
        );

        Ok(output_path)
    }
}

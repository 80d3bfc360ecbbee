use crate::adapters::http::HttpSession;
use crate::adapters::secrets::{resolve_secret, OER_ACCESS_TOKEN, SMITHSONIAN_API_KEY};
use crate::adapters::storage::LocalStorage;
use crate::app::pipelines::{OerPipeline, SmithsonianPipeline, WikimediaPipeline};
use crate::config::toml_config::JobsConfig;
use crate::core::etl::EtlEngine;
use crate::core::SecretsProvider;
use crate::utils::error::Result;

// 每個 job 各自建立 session 與 storage，彼此不共享狀態

pub async fn run_smithsonian(config: &JobsConfig, secrets: &dyn SecretsProvider) -> Result<String> {
    let api_key = resolve_secret(
        config.smithsonian.api_key.as_deref(),
        secrets,
        SMITHSONIAN_API_KEY,
    )?;
    let session = HttpSession::new(config.http.clone())?;
    let storage = LocalStorage::new(config.output_path.clone());

    let pipeline = SmithsonianPipeline::new(storage, session, config.smithsonian.clone(), api_key);
    EtlEngine::new(pipeline).run().await
}

pub async fn run_oer(
    config: &JobsConfig,
    secrets: &dyn SecretsProvider,
    snapshot_only: bool,
) -> Result<String> {
    let token = resolve_secret(config.oer.access_token.as_deref(), secrets, OER_ACCESS_TOKEN)?;
    let session = HttpSession::new(config.http.clone())?;
    let storage = LocalStorage::new(config.output_path.clone());

    let pipeline = OerPipeline::new(storage, session, config.oer.clone(), token);
    if snapshot_only {
        return pipeline.snapshot().await;
    }
    EtlEngine::new(pipeline).run().await
}

pub async fn run_wikimedia(config: &JobsConfig) -> Result<String> {
    let session = HttpSession::new(config.http.clone())?;
    let storage = LocalStorage::new(config.output_path.clone());

    let pipeline = WikimediaPipeline::new(storage, session, config.wikimedia.clone());
    EtlEngine::new(pipeline).run().await
}

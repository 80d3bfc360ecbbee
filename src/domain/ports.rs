use crate::domain::model::TransformResult;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Human-readable location of `path`, used in logs and job results.
    fn location(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Source of API keys and access tokens.
pub trait SecretsProvider: Send + Sync {
    fn secret(&self, name: &str) -> Option<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Record: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Vec<Self::Record>>;
    async fn transform(&self, data: Vec<Self::Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

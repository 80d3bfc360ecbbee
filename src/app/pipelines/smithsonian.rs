use crate::adapters::delimited;
use crate::adapters::http::HttpSession;
use crate::config::toml_config::SmithsonianConfig;
use crate::core::{Pipeline, Storage, Table, TransformResult};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Flattens a JSON document into `(path, value)` pairs. Object keys are
/// joined with `.`, array items use their index.
pub fn flatten_json(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    flatten_into(value, String::new(), &mut pairs);
    pairs
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn flatten_into(value: &Value, path: String, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(child, child_path(&path, key), pairs);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, child_path(&path, &index.to_string()), pairs);
            }
        }
        Value::Null => pairs.push((path, String::new())),
        Value::String(s) => pairs.push((path, s.clone())),
        other => pairs.push((path, other.to_string())),
    }
}

pub struct SmithsonianPipeline<S: Storage> {
    storage: S,
    session: HttpSession,
    config: SmithsonianConfig,
    api_key: String,
}

impl<S: Storage> SmithsonianPipeline<S> {
    pub fn new(storage: S, session: HttpSession, config: SmithsonianConfig, api_key: String) -> Self {
        Self {
            storage,
            session,
            config,
            api_key,
        }
    }

    pub async fn fetch_stats(&self) -> Result<Value> {
        let query = [("api_key", self.api_key.as_str())];
        self.session
            .get_json(&self.config.endpoint, &query, Some(self.config.timeout()))
            .await
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for SmithsonianPipeline<S> {
    type Record = Value;

    fn name(&self) -> &str {
        "smithsonian"
    }

    async fn extract(&self) -> Result<Vec<Value>> {
        Ok(vec![self.fetch_stats().await?])
    }

    async fn transform(&self, data: Vec<Value>) -> Result<TransformResult> {
        let document = data
            .into_iter()
            .next()
            .ok_or_else(|| EtlError::processing("no statistics document"))?;

        let mut table = Table::with_header(["path", "value"]);
        for (path, value) in flatten_json(&document) {
            table.push(vec![path, value]);
        }

        Ok(TransformResult {
            table,
            skipped: 0,
            document: Some(document),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        if let Some(document) = &result.document {
            println!("{}", serde_json::to_string_pretty(document)?);
        }

        match &self.config.output_file {
            Some(file) => {
                let data = delimited::encode_table(&result.table, b',')?;
                self.storage.write_file(file, &data).await?;
                let location = self.storage.location(file);
                tracing::info!("💾 Wrote {} statistics to {}", result.table.len(), location);
                Ok(location)
            }
            None => Ok("stdout".to_string()),
        }
    }
}

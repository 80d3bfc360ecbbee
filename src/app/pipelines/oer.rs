use crate::adapters::delimited;
use crate::adapters::http::HttpSession;
use crate::adapters::xml::{self, XmlElement};
use crate::config::toml_config::{OerConfig, OER_SUMMARY_FIELDS};
use crate::core::{FieldBag, Pipeline, Storage, Table, TransformResult};
use crate::domain::model::LicenseCount;
use crate::utils::error::{EtlError, Result};

pub const OER_HEADER: &[&str] = &[
    "id",
    "license",
    "modification_date",
    "Education Level",
    "Subject Area",
    "Material Type",
    "Media Format",
    "Languages",
    "Primary User",
    "Educational Use",
];

/// Start offsets of the batches covering `total` items: `ceil(total / batch_size)`
/// strictly increasing, non-overlapping offsets.
pub fn batch_offsets(total: usize, batch_size: usize) -> impl Iterator<Item = usize> {
    (0..total).step_by(batch_size.max(1))
}

/// One `<result>` element of a search response, tagged with the license it
/// was fetched under.
#[derive(Debug, Clone)]
pub struct OerResult {
    pub license: String,
    pub element: XmlElement,
}

/// Builds the output row for one search result. Only a missing `id` attribute
/// is an error; every other absent field stays empty.
pub fn extract_row(license: &str, result: &XmlElement) -> Result<Vec<String>> {
    let id = result.attr("id").ok_or_else(|| {
        EtlError::processing(format!("<{}> without id attribute ({})", result.name, license))
    })?;

    let modification_date = result
        .child("modification_date")
        .map(|element| element.text.clone())
        .unwrap_or_default();

    let mut summary = FieldBag::new(OER_SUMMARY_FIELDS);
    if let Some(oersummary) = result.child("oersummary") {
        for item in &oersummary.children {
            if let (Some(title), Some(value)) = (item.attr("title"), item.attr("value")) {
                summary.set(title, value);
            }
        }
    }

    let mut row = Vec::with_capacity(OER_HEADER.len());
    row.push(id.to_string());
    row.push(license.to_string());
    row.push(modification_date);
    row.extend(summary.into_values());
    Ok(row)
}

pub struct OerPipeline<S: Storage> {
    storage: S,
    session: HttpSession,
    config: OerConfig,
    token: String,
}

impl<S: Storage> OerPipeline<S> {
    pub fn new(storage: S, session: HttpSession, config: OerConfig, token: String) -> Self {
        Self {
            storage,
            session,
            config,
            token,
        }
    }

    /// 發送查詢並解析 XML；任何錯誤都記錄後回傳 None
    async fn fetch_data(&self, params: &[(&str, String)]) -> Option<XmlElement> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("token", self.token.clone()));

        let outcome: Result<XmlElement> = async {
            let body = self
                .session
                .get_text(&self.config.endpoint, &query, Some(self.config.timeout()))
                .await?;
            xml::parse_document(&xml::strip_entities(&body))
        }
        .await;

        match outcome {
            Ok(root) => Some(root),
            Err(e) => {
                tracing::error!("❌ Error with params {:?}: {}", params, e);
                None
            }
        }
    }

    pub async fn fetch_license_total(&self, license: &str) -> Result<usize> {
        let params = [("f.license", license.to_string()), ("batch_size", "0".to_string())];
        let root = self
            .fetch_data(&params)
            .await
            .ok_or_else(|| EtlError::processing(format!("no count response for {}", license)))?;

        let total = root
            .attr("total-items")
            .ok_or_else(|| EtlError::processing("response without total-items attribute"))?;
        total.trim().parse().map_err(|_| {
            EtlError::processing(format!("invalid total-items '{}' for {}", total, license))
        })
    }

    /// Fetches every license total and rewrites the counts cache. The cache
    /// is left untouched when any count failed, so the next run fetches again.
    pub async fn refresh_license_counts(&self) -> Result<Vec<LicenseCount>> {
        let mut counts = Vec::with_capacity(self.config.licenses.len());
        let mut failed = 0;
        for license in &self.config.licenses {
            tracing::debug!("Fetching total for {}", license);
            let total = match self.fetch_license_total(license).await {
                Ok(total) => total,
                Err(e) => {
                    tracing::warn!("⚠️ Could not count {}: {}; recording 0", license, e);
                    failed += 1;
                    0
                }
            };
            tracing::info!("🔢 {}: {} items", license, total);
            counts.push(LicenseCount {
                license: license.clone(),
                total,
            });
        }

        if failed > 0 {
            tracing::warn!("⚠️ {} license counts failed, counts cache not written", failed);
            return Ok(counts);
        }

        let mut table = Table::with_header(counts.iter().map(|c| c.license.clone()));
        table.push(counts.iter().map(|c| c.total.to_string()).collect());
        let data = delimited::encode_table(&table, b',')?;
        self.storage.write_file(&self.config.counts_file, &data).await?;

        Ok(counts)
    }

    /// Reads the counts cache. The cache must list exactly the configured
    /// licenses in order.
    pub async fn cached_license_counts(&self) -> Result<Vec<LicenseCount>> {
        let data = self.storage.read_file(&self.config.counts_file).await?;
        let records = delimited::decode_records(&data, b',')?;

        let (licenses, totals) = match records.as_slice() {
            [licenses, totals, ..] => (licenses, totals),
            _ => return Err(EtlError::processing("counts cache needs two rows")),
        };
        if licenses != &self.config.licenses || totals.len() != licenses.len() {
            return Err(EtlError::processing(
                "counts cache does not match the configured licenses",
            ));
        }

        licenses
            .iter()
            .zip(totals)
            .map(|(license, total)| -> Result<LicenseCount> {
                let total = total.trim().parse().map_err(|_| {
                    EtlError::processing(format!("invalid cached total '{}'", total))
                })?;
                Ok(LicenseCount {
                    license: license.clone(),
                    total,
                })
            })
            .collect()
    }

    pub async fn license_counts(&self) -> Result<Vec<LicenseCount>> {
        if !self.config.refresh_counts {
            match self.cached_license_counts().await {
                Ok(counts) => {
                    tracing::info!("📄 Using cached license counts");
                    return Ok(counts);
                }
                Err(e) => tracing::warn!("⚠️ Counts cache unusable ({}), re-fetching", e),
            }
        }
        self.refresh_license_counts().await
    }

    /// One batch of results, or None if the request or parse failed.
    pub async fn fetch_batch(&self, license: &str, batch_start: usize) -> Option<Vec<XmlElement>> {
        let params = [
            ("f.license", license.to_string()),
            ("batch_size", self.config.batch_size.to_string()),
            ("batch_start", batch_start.to_string()),
        ];
        self.fetch_data(&params).await.map(|root| root.children)
    }

    /// Saves one sanitized batch verbatim for debugging.
    pub async fn snapshot(&self) -> Result<String> {
        let query = [
            ("token", self.token.clone()),
            ("f.license", self.config.snapshot_license.clone()),
            ("batch_size", self.config.batch_size.to_string()),
        ];
        let body = self
            .session
            .get_text(&self.config.endpoint, &query, Some(self.config.timeout()))
            .await?;
        let sanitized = xml::strip_entities(&body);

        self.storage
            .write_file(&self.config.snapshot_file, sanitized.as_bytes())
            .await?;
        let location = self.storage.location(&self.config.snapshot_file);
        tracing::info!("📸 Snapshot written to {}", location);
        Ok(location)
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for OerPipeline<S> {
    type Record = OerResult;

    fn name(&self) -> &str {
        "oer"
    }

    async fn extract(&self) -> Result<Vec<OerResult>> {
        let counts = self.license_counts().await?;
        let mut records = Vec::new();

        for LicenseCount { license, total } in counts {
            tracing::info!("📚 Starting {} ({} items)", license, total);
            for batch_start in batch_offsets(total, self.config.batch_size) {
                if let Some(results) = self.fetch_batch(&license, batch_start).await {
                    records.extend(results.into_iter().map(|element| OerResult {
                        license: license.clone(),
                        element,
                    }));
                }
                tracing::info!("{} batch starting at {} complete.", license, batch_start);
            }
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<OerResult>) -> Result<TransformResult> {
        let mut table = Table::with_header(OER_HEADER.iter().copied());
        let mut skipped = 0;

        for record in data {
            match extract_row(&record.license, &record.element) {
                Ok(row) => table.push(row),
                Err(e) if e.is_record_level() => {
                    tracing::warn!("⚠️ Skipping record: {}", e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(TransformResult {
            table,
            skipped,
            document: None,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let data = delimited::encode_table(&result.table, b'\t')?;
        self.storage.write_file(&self.config.output_file, &data).await?;

        let location = self.storage.location(&self.config.output_file);
        tracing::info!("💾 Wrote {} rows to {}", result.table.len(), location);
        Ok(location)
    }
}

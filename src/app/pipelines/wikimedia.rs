use crate::adapters::delimited;
use crate::adapters::http::HttpSession;
use crate::config::toml_config::WikimediaConfig;
use crate::core::{Pipeline, Storage, Table, TransformResult, YearHistogram};
use crate::domain::model::CategoryMember;
use crate::utils::error::{EtlError, Result};
use chrono::Datelike;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CategoryMembersResponse {
    query: Option<CategoryMembersQuery>,
    #[serde(rename = "continue")]
    continuation: Option<Continuation>,
}

#[derive(Debug, Deserialize)]
struct CategoryMembersQuery {
    categorymembers: Vec<CategoryMember>,
}

#[derive(Debug, Deserialize)]
struct Continuation {
    cmcontinue: Option<String>,
}

/// Upload years of every image in one license category.
#[derive(Debug, Clone)]
pub struct LicenseYears {
    pub license: String,
    pub histogram: YearHistogram,
}

/// Year prefix of `query.pages[<pageid>].imageinfo[0].timestamp`.
pub fn upload_year(image_info: &serde_json::Value, pageid: u64) -> Result<i32> {
    let pointer = format!("/query/pages/{}/imageinfo/0/timestamp", pageid);
    let timestamp = image_info
        .pointer(&pointer)
        .and_then(|v| v.as_str())
        .ok_or_else(|| EtlError::processing(format!("no imageinfo timestamp for page {}", pageid)))?;

    timestamp
        .get(0..4)
        .and_then(|year| year.parse().ok())
        .ok_or_else(|| EtlError::processing(format!("malformed timestamp '{}'", timestamp)))
}

/// License column value; commas would break the CSV row.
pub fn license_label(license: &str) -> String {
    license.replace(',', "|")
}

pub struct WikimediaPipeline<S: Storage> {
    storage: S,
    session: HttpSession,
    config: WikimediaConfig,
}

impl<S: Storage> WikimediaPipeline<S> {
    pub fn new(storage: S, session: HttpSession, config: WikimediaConfig) -> Self {
        Self {
            storage,
            session,
            config,
        }
    }

    /// 授權清單：設定檔優先，否則讀取 license list 檔案
    pub async fn licenses(&self) -> Result<Vec<String>> {
        let mut licenses = if !self.config.licenses.is_empty() {
            self.config.licenses.clone()
        } else {
            let path = self
                .config
                .license_list_file
                .as_deref()
                .ok_or_else(|| EtlError::config("no wikimedia licenses configured"))?;
            let data = self.storage.read_file(path).await?;
            delimited::read_column(&data, &self.config.license_column)?
        };

        licenses.retain(|license| !license.trim().is_empty());
        if let Some(max) = self.config.max_licenses {
            licenses.truncate(max);
        }
        tracing::info!("📋 License list: {}", licenses.join(", "));
        Ok(licenses)
    }

    pub async fn category_members(&self, license: &str) -> Result<Vec<CategoryMember>> {
        let mut members = Vec::new();
        let mut cmcontinue: Option<String> = None;

        for _ in 0..self.config.max_member_pages {
            let mut query = vec![
                ("action", "query".to_string()),
                ("list", "categorymembers".to_string()),
                ("cmlimit", self.config.member_limit.to_string()),
                ("cmtype", "file".to_string()),
                ("cmtitle", format!("Category:{}", license)),
                ("format", "json".to_string()),
            ];
            if let Some(token) = &cmcontinue {
                query.push(("cmcontinue", token.clone()));
            }

            let response: CategoryMembersResponse = self
                .session
                .get_json(&self.config.endpoint, &query, Some(self.config.timeout()))
                .await?;
            let page = response.query.ok_or_else(|| {
                EtlError::processing(format!("no categorymembers for {}", license))
            })?;
            members.extend(page.categorymembers);

            cmcontinue = response.continuation.and_then(|c| c.cmcontinue);
            if cmcontinue.is_none() {
                break;
            }
        }

        tracing::debug!("{} has {} members", license, members.len());
        Ok(members)
    }

    async fn member_year(&self, member: &CategoryMember) -> Result<i32> {
        let query = [
            ("action", "query"),
            ("titles", member.title.as_str()),
            ("prop", "imageinfo"),
            ("format", "json"),
        ];
        let image_info: serde_json::Value = self
            .session
            .get_json(&self.config.endpoint, &query, Some(self.config.timeout()))
            .await?;
        upload_year(&image_info, member.pageid)
    }

    /// Images whose metadata cannot be read are logged and left out.
    pub async fn upload_years(&self, license: &str, members: &[CategoryMember]) -> YearHistogram {
        let mut histogram = YearHistogram::new(self.config.start_year..=self.config.end_year);

        for member in members {
            match self.member_year(member).await {
                Ok(year) => {
                    if !histogram.record(year) {
                        tracing::debug!("{} uploaded in {}, outside tracked years", member.title, year);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Search data for image {} (page {}) of license {} could not be found: {}",
                        member.title,
                        member.pageid,
                        license,
                        e
                    );
                }
            }
        }

        histogram
    }

    pub fn output_file(&self) -> String {
        match &self.config.output_file {
            Some(file) => file.clone(),
            None => {
                let today = chrono::Local::now().date_naive();
                format!(
                    "{}_{}_{}_{}.csv",
                    self.config.output_prefix,
                    today.year(),
                    today.month(),
                    today.day()
                )
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for WikimediaPipeline<S> {
    type Record = LicenseYears;

    fn name(&self) -> &str {
        "wikimedia"
    }

    async fn extract(&self) -> Result<Vec<LicenseYears>> {
        let mut records = Vec::new();

        for license in self.licenses().await? {
            let members = match self.category_members(&license).await {
                Ok(members) => members,
                Err(e) => {
                    tracing::error!("❌ Could not list Category:{}: {}", license, e);
                    continue;
                }
            };

            let histogram = self.upload_years(&license, &members).await;
            tracing::info!(
                "🖼️ {}: {} of {} images counted",
                license,
                histogram.total(),
                members.len()
            );
            records.push(LicenseYears { license, histogram });
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<LicenseYears>) -> Result<TransformResult> {
        let years = self.config.start_year..=self.config.end_year;
        let mut table = Table::with_header(
            std::iter::once("License Type".to_string()).chain(years.map(|y| y.to_string())),
        );

        for record in data {
            let mut row = vec![license_label(&record.license)];
            row.extend(record.histogram.iter().map(|(_, count)| count.to_string()));
            tracing::info!("{}", row.join(","));
            table.push(row);
        }

        Ok(TransformResult {
            table,
            skipped: 0,
            document: None,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let file = self.output_file();
        let data = delimited::encode_table(&result.table, b',')?;
        self.storage.write_file(&file, &data).await?;

        let location = self.storage.location(&file);
        tracing::info!("💾 Wrote {} license rows to {}", result.table.len(), location);
        Ok(location)
    }
}

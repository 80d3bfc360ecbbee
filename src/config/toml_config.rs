use crate::adapters::http::RetryPolicy;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

pub const OER_SUMMARY_FIELDS: &[&str] = &[
    "Education Level",
    "Subject Area",
    "Material Type",
    "Media Format",
    "Languages",
    "Primary User",
    "Educational Use",
];

/// Settings for all three jobs. Every section is optional and falls back to
/// the job's built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub output_path: String,
    pub http: RetryPolicy,
    pub smithsonian: SmithsonianConfig,
    pub oer: OerConfig,
    pub wikimedia: WikimediaConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            output_path: ".".to_string(),
            http: RetryPolicy::default(),
            smithsonian: SmithsonianConfig::default(),
            oer: OerConfig::default(),
            wikimedia: WikimediaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmithsonianConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    /// 設定後會把統計攤平成 path,value 寫入 CSV
    pub output_file: Option<String>,
}

impl Default for SmithsonianConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.si.edu/openaccess/api/v1.0/stats".to_string(),
            api_key: None,
            timeout_seconds: 10,
            output_file: None,
        }
    }
}

impl SmithsonianConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OerConfig {
    pub endpoint: String,
    pub access_token: Option<String>,
    pub licenses: Vec<String>,
    pub batch_size: usize,
    pub timeout_seconds: u64,
    pub output_file: String,
    pub counts_file: String,
    pub refresh_counts: bool,
    pub snapshot_file: String,
    pub snapshot_license: String,
}

impl Default for OerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.oercommons.org/api/search".to_string(),
            access_token: None,
            licenses: [
                "cc-by",
                "cc-by-sa",
                "cc-by-nd",
                "cc-by-nc",
                "cc-by-nc-sa",
                "cc-by-nc-nd",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            batch_size: 50,
            timeout_seconds: 20,
            output_file: "oer.csv".to_string(),
            counts_file: "license_counts.csv".to_string(),
            refresh_counts: false,
            snapshot_file: "data.xml".to_string(),
            snapshot_license: "cc-by".to_string(),
        }
    }
}

impl OerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikimediaConfig {
    pub endpoint: String,
    /// 優先於 license_list_file
    pub licenses: Vec<String>,
    /// Resolved against `output_path`, like every other job file.
    pub license_list_file: Option<String>,
    pub license_column: String,
    pub max_licenses: Option<usize>,
    pub start_year: i32,
    pub end_year: i32,
    pub member_limit: usize,
    pub max_member_pages: usize,
    pub timeout_seconds: u64,
    pub output_prefix: String,
    /// Fixed output name; defaults to `<prefix>_<year>_<month>_<day>.csv`.
    pub output_file: Option<String>,
}

impl Default for WikimediaConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://commons.wikimedia.org/w/api.php".to_string(),
            licenses: Vec::new(),
            license_list_file: Some("license_list.csv".to_string()),
            license_column: "LICENSE TYPE".to_string(),
            max_licenses: None,
            start_year: 2004,
            end_year: 2023,
            member_limit: 500,
            max_member_pages: 1,
            timeout_seconds: 30,
            output_prefix: "data_wikicommons".to_string(),
            output_file: None,
        }
    }
}

impl WikimediaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl JobsConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content)
            .map_err(|e| EtlError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${OER_ACCESS_TOKEN})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }
}

impl Validate for JobsConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("output_path", &self.output_path)?;

        for status in &self.http.status_forcelist {
            validation::validate_range("http.status_forcelist", *status, 100, 599)?;
        }
        if !self.http.backoff_factor.is_finite() || self.http.backoff_factor < 0.0 {
            return Err(EtlError::InvalidConfigValueError {
                field: "http.backoff_factor".to_string(),
                value: self.http.backoff_factor.to_string(),
                reason: "Backoff factor must be a non-negative number".to_string(),
            });
        }

        validation::validate_url("smithsonian.endpoint", &self.smithsonian.endpoint)?;

        validation::validate_url("oer.endpoint", &self.oer.endpoint)?;
        validation::validate_non_empty_list("oer.licenses", &self.oer.licenses)?;
        validation::validate_positive_number("oer.batch_size", self.oer.batch_size, 1)?;
        validation::validate_path("oer.output_file", &self.oer.output_file)?;
        validation::validate_path("oer.counts_file", &self.oer.counts_file)?;
        validation::validate_non_empty_string("oer.snapshot_license", &self.oer.snapshot_license)?;

        let wikimedia = &self.wikimedia;
        validation::validate_url("wikimedia.endpoint", &wikimedia.endpoint)?;
        if wikimedia.licenses.is_empty() && wikimedia.license_list_file.is_none() {
            return Err(EtlError::config(
                "wikimedia needs either `licenses` or `license_list_file`",
            ));
        }
        validation::validate_non_empty_string("wikimedia.license_column", &wikimedia.license_column)?;
        validation::validate_range(
            "wikimedia.end_year",
            wikimedia.end_year,
            wikimedia.start_year,
            9999,
        )?;
        validation::validate_range("wikimedia.member_limit", wikimedia.member_limit, 1, 500)?;
        validation::validate_positive_number(
            "wikimedia.max_member_pages",
            wikimedia.max_member_pages,
            1,
        )?;

        Ok(())
    }
}

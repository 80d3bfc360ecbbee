use crate::config::toml_config::JobsConfig;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "commons-etl")]
#[command(about = "Batch jobs collecting license statistics from open-content APIs")]
pub struct CliConfig {
    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory for output files (overrides config)
    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub job: Job,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Job {
    /// Fetch Smithsonian Open Access statistics
    Smithsonian {
        /// Also write the flattened statistics to this CSV file
        #[arg(long)]
        output_file: Option<String>,
    },
    /// Scrape OER Commons records per license into a TSV report
    Oer {
        /// Re-fetch license totals instead of reading the counts cache
        #[arg(long)]
        refresh_counts: bool,

        /// Only save one sanitized XML batch for debugging
        #[arg(long)]
        snapshot: bool,
    },
    /// Count Wikimedia Commons uploads per year for each license category
    Wikimedia {
        /// Licenses to query (overrides config and license list file)
        #[arg(long, value_delimiter = ',')]
        licenses: Vec<String>,

        /// Only process the first N licenses
        #[arg(long)]
        max_licenses: Option<usize>,
    },
}

impl CliConfig {
    /// 載入設定檔（若有）並套用命令列覆蓋
    pub fn jobs_config(&self) -> Result<JobsConfig> {
        let mut config = match &self.config {
            Some(path) => JobsConfig::from_file(path)?,
            None => JobsConfig::default(),
        };

        if let Some(output_path) = &self.output_path {
            config.output_path = output_path.clone();
        }

        match &self.job {
            Job::Smithsonian { output_file } => {
                if output_file.is_some() {
                    config.smithsonian.output_file = output_file.clone();
                }
            }
            Job::Oer { refresh_counts, .. } => {
                if *refresh_counts {
                    config.oer.refresh_counts = true;
                }
            }
            Job::Wikimedia {
                licenses,
                max_licenses,
            } => {
                if !licenses.is_empty() {
                    config.wikimedia.licenses = licenses.clone();
                }
                if max_licenses.is_some() {
                    config.wikimedia.max_licenses = *max_licenses;
                }
            }
        }

        Ok(config)
    }
}

use anyhow::Context;
use clap::Parser;
use commons_etl::adapters::secrets::EnvSecrets;
use commons_etl::app::jobs;
use commons_etl::utils::{logger, validation::Validate};
use commons_etl::{CliConfig, EtlError, Job};
use std::process::ExitCode;

const INTERRUPTED_EXIT_CODE: u8 = 130;

async fn run(cli: &CliConfig) -> anyhow::Result<String> {
    let config = cli.jobs_config().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    tracing::debug!("Output directory: {}", config.output_path);

    let secrets = EnvSecrets;
    let output = match &cli.job {
        Job::Smithsonian { .. } => jobs::run_smithsonian(&config, &secrets).await,
        Job::Oer { snapshot, .. } => jobs::run_oer(&config, &secrets, *snapshot).await,
        Job::Wikimedia { .. } => jobs::run_wikimedia(&config).await,
    };
    output.context("job failed")
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tokio::select! {
        result = run(&cli) => match result {
            Ok(output_path) => {
                println!("✅ Complete");
                println!("📁 Output: {}", output_path);
                ExitCode::SUCCESS
            }
            Err(e) => {
                let etl_error = e.downcast_ref::<EtlError>();
                tracing::error!("❌ {:#}", e);
                if let Some(etl_error) = etl_error {
                    tracing::error!(
                        "💡 {} (Category: {:?})",
                        etl_error.recovery_suggestion(),
                        etl_error.category()
                    );
                }

                let code = etl_error.map(EtlError::exit_code).unwrap_or(1);
                let message = etl_error
                    .map(EtlError::user_friendly_message)
                    .unwrap_or_else(|| e.to_string());
                eprintln!("ERROR ({}) {}", code, message);
                ExitCode::from(code as u8)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("INFO ({}) Halted via KeyboardInterrupt.", INTERRUPTED_EXIT_CODE);
            ExitCode::from(INTERRUPTED_EXIT_CODE)
        }
    }
}

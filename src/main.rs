use checkout_etl::utils::logger;
use checkout_etl::{CliArgs, HttpPlatform, LocalStorage};
use clap::Parser;

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting checkout-etl");

    let config = match args.into_run_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration failed: {}", e);
            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    tracing::debug!("Run config: {:?}", config);

    let storage = LocalStorage::default();
    let platform = HttpPlatform::new(config.endpoints.clone());

    match checkout_etl::run(config, storage, platform).await {
        Ok(output_path) => {
            println!("{}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "Checkout generation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );

            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            std::process::exit(e.severity().exit_code());
        }
    }
}

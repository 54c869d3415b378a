use std::error::Error;

use candle_importer::{
    cli::{
        commands::{Cli, Commands},
        params::build_config,
    },
    importer::Importer,
    io::FileSink,
    providers::{ProductCatalog, coinbase_rest::CoinbaseProvider},
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so stdout only carries the written path.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let provider = CoinbaseProvider::new()?;

    match &cli.command {
        Commands::Products => {
            for product in provider.list_products().await? {
                println!("{product}");
            }
        }

        Commands::Import(args) => {
            let config = build_config(cli.config.as_deref(), args)?;
            let sink = FileSink::new(&config.output_dir, config.format);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping after the current window");
                    on_interrupt.cancel();
                }
            });

            let summary = Importer::new(&provider, &sink)
                .with_cancellation(cancel)
                .run(&config)
                .await?;

            info!(
                expected = summary.expected,
                requests = summary.requests_planned,
                retrieved = summary.retrieved,
                missing = summary.missing,
                interpolated = summary.interpolated,
                failed_attempts = summary.failed_attempts,
                abandoned_windows = summary.abandoned_windows,
                malformed_rows = summary.malformed_rows,
                "SUMMARY"
            );
            println!("{}", summary.output.display());
        }
    }
    Ok(())
}

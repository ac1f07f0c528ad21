use anyhow::Result;
use clap::Parser;
use spreadping::{run_session_with, RawSocketFactory};
use tracing_subscriber::EnvFilter;
mod args;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = args::Opts::parse();
    let config = opts.session_config()?;
    let factory = RawSocketFactory::new(opts.iface.clone());

    if !opts.json {
        println!(
            "Pinging {} with {} packets across {} workers, interval {} s",
            config.target,
            config.total_count,
            config.workers,
            config.interval_secs
        );
    }

    let report = run_session_with(&config, factory).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in &report.raw_messages {
            println!("{}", line);
        }
        // Print the statistics
        println!("\n--- {} ping statistics ---", config.target);
        println!("{}", report);
    }
    Ok(())
}

//! inboxqa - CLI entry point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use inboxqa::cli::{Args, Verbosity};
use inboxqa::config::{Config, Secrets};
use inboxqa::pipeline::Pipeline;
use inboxqa::repl;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity());

    let mut config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(query) = args.mail_query.clone() {
        config.mail.query = query;
    }

    // Missing secrets fail here, before any remote call
    let secrets = Secrets::from_env()?;
    let pipeline = Pipeline::new(config, secrets)?;

    if args.ingest {
        match pipeline.ingest().await {
            Ok(report) => {
                println!(
                    "\n{}",
                    format!(
                        "Indexed {} of {} emails.",
                        report.indexed.len(),
                        report.fetched
                    )
                    .green()
                );
                if !report.failed.is_empty() {
                    println!(
                        "{}",
                        format!("{} emails failed; see the log for details.", report.failed.len())
                            .yellow()
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "ingestion failed");
                eprintln!("{}", "Sorry, an error occurred while loading emails.".red());
                std::process::exit(1);
            }
        }
    } else {
        repl::run(&pipeline).await?;
    }

    Ok(())
}

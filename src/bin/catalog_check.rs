//! Catalog check
//!
//! Builds the broker catalog exactly as the broker would at startup, prints
//! what was registered, then tears it down. Exits non-zero on any
//! configuration error.
//!
//! ## Usage
//!
//! ```bash
//! SERVICES='[{"id":"crdb","name":"cockroachdb"}]' \
//! CUSTOM_PLANS='{"p1":{"name":"free","service":"crdb","host":"localhost","port":26257,"ssl_mode":"disable"}}' \
//!   ./target/debug/catalog_check
//! ```
//!
//! ## Environment Variables
//!
//! - `SERVICES` (required): JSON list of services
//! - `PRECONFIGURED_PLANS` (optional): JSON list of plans
//! - `CUSTOM_PLANS` (optional): JSON map of custom plans
//! - `CATALOG_CREDENTIAL_DIR` (optional): where TLS files are written

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crdb_catalog::{lifecycle, CatalogConfig, CatalogSources};

#[derive(Parser, Debug)]
#[command(name = "catalog_check", about = "Validate the service broker catalog")]
struct Args {
    /// Directory for per-plan TLS files
    #[arg(long, env = "CATALOG_CREDENTIAL_DIR")]
    credential_dir: Option<PathBuf>,

    /// Print the catalog as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = CatalogConfig::default();
    if let Some(dir) = args.credential_dir {
        config.credential_dir = dir;
    }

    let catalog = lifecycle::initialize(&CatalogSources::from_env(), config)
        .context("failed to initialize services and plans")?;

    if args.json {
        let services: Vec<serde_json::Value> = catalog
            .services()
            .iter()
            .map(|service| {
                let plans: Vec<_> = service.plans().iter().map(|p| p.spec()).collect();
                serde_json::json!({ "service": service.spec(), "plans": plans })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&services)?);
    } else {
        for service in catalog.services() {
            println!("{} ({})", service.name(), service.id());
            for plan in service.plans() {
                println!(
                    "  {} ({}) {}:{} sslmode={} files={}",
                    plan.name(),
                    plan.id(),
                    plan.host(),
                    plan.port(),
                    plan.ssl_mode(),
                    plan.credentials().len()
                );
            }
        }
    }

    lifecycle::shutdown(catalog);
    Ok(())
}

//! Ordered list repair tool
//!
//! Runs the idempotent repair traversal against a libsql database and prints
//! the report as JSON. Safe to run on a healthy list: nothing is written and
//! the report comes back clean.
//!
//! # Usage
//!
//! ```text
//! strand-repair <database-path> <owner-id> [<owner-id> ...]
//! ```
//!
//! The association definition defaults to `ordered_members` over `members`;
//! set `STRAND_ASSOCIATION` to a JSON `OrderedAggregationConfig` to override it.
//! Logging follows `RUST_LOG` (default `info`).
//!
//! Exit status is 0 when every list was already clean, 2 when at least one was
//! repaired.

use std::env;
use std::sync::Arc;

use strand_core::config::{DatabaseConfig, OrderedAggregationConfig};
use strand_core::db::{DatabaseService, TursoStore};
use strand_core::logging::init_tracing;
use strand_core::models::Identity;
use strand_core::orders::repair;

const USAGE: &str = "usage: strand-repair <database-path> <owner-id> [<owner-id> ...]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_tracing("info")?;

    let mut args = env::args().skip(1);
    let db_path = args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
    let owners: Vec<Identity> = args.map(Identity::new).collect();
    if owners.is_empty() {
        anyhow::bail!(USAGE);
    }

    let config = match env::var("STRAND_ASSOCIATION") {
        Ok(raw) => serde_json::from_str::<OrderedAggregationConfig>(&raw)?,
        Err(_) => OrderedAggregationConfig::default(),
    };
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("🔧 Strand repair");
    tracing::info!("📁 Database: {}", db_path);
    tracing::info!("🔗 Association: {} over {}", config.name, config.unordered);

    let db = DatabaseService::new(&DatabaseConfig::at(&db_path)).await?;
    let store = TursoStore::new(Arc::new(db));

    let mut repaired = false;
    for owner in &owners {
        let report = repair(&store, &store, &config, owner).await?;
        if !report.is_clean() {
            repaired = true;
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if repaired {
        tracing::info!("✅ Repairs applied");
        std::process::exit(2);
    }
    tracing::info!("✅ All lists consistent");
    Ok(())
}

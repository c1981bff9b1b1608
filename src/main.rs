// Entry point of the moderation service CLI.
//
// **Architecture Overview:**
// - `core/` = Business logic (storage- and transport-agnostic)
// - `infra/` = Implementations of core traits (SQLite, threat API, cache)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Moderate the text given on the command line (or stdin) and print the
//    outcome as JSON
//
// The HTTP submission layer is an external collaborator; this binary is the
// composition root plus a thin operator tool for exercising the pipeline.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use crate::core::moderation::ModerationService;
use crate::core::url_safety::ThreatIntelClient;
use crate::infra::moderation::SqliteModerationStore;
use crate::infra::url_safety::{MemoryUrlCache, SafeBrowsingClient};

const URL_CACHE_CAPACITY: usize = 10_000;
const URL_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Keep the runtime database in a dedicated folder so the repo root stays tidy.
    let db_path = match std::env::var("MODERATION_DB") {
        Ok(path) => path,
        Err(_) => {
            std::fs::create_dir_all("data")?;
            "data/moderation.db".to_string()
        }
    };

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await?;
    let store = SqliteModerationStore::new(pool);
    store.migrate().await?;

    // Absence of the credential is a supported mode: URL checks fall back to
    // heuristics instead of the authoritative service.
    let threat_client: Option<Arc<dyn ThreatIntelClient>> =
        match std::env::var("SAFE_BROWSING_API_KEY") {
            Ok(key) => Some(Arc::new(SafeBrowsingClient::new(key)?)),
            Err(_) => {
                tracing::info!("SAFE_BROWSING_API_KEY not set, URL checks use heuristics only");
                None
            }
        };

    let url_cache = Arc::new(MemoryUrlCache::new(URL_CACHE_CAPACITY, URL_CACHE_TTL));

    // Provisions the synthetic "system" reporter up front, outside the
    // moderation hot path.
    let service = ModerationService::new(store, threat_client, url_cache).await?;
    service.initialize_default_configs().await?;

    // ========================================================================
    // MODERATE INPUT
    // ========================================================================

    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = if args.is_empty() {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.join(" ")
    };

    let content_type = std::env::var("CONTENT_TYPE").unwrap_or_else(|_| "story".to_string());
    let outcome = service.moderate(&text, &content_type, None).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

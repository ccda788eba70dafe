mod config;
mod data;
mod pipeline;
mod roi;
mod scoring;
mod sources;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use config::{Config, EnvConfig};
use data::cache::ListingCache;
use data::types::ListingQuery;
use pipeline::Orchestrator;
use roi::{estimate, RoiBand, RoiScenario};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("🚗 Auction Watch starting...");

    // Load configuration
    tracing::info!("Loading configuration...");
    let config = Config::load("config.toml")?;
    let env = EnvConfig::load()?;

    tracing::info!("Cache TTL: {}s", config.system.cache_ttl_secs);
    tracing::info!("Attempt timeout: {}s", config.system.attempt_timeout_secs);
    tracing::info!(
        "Copart strategies: api={} scrape={}",
        config.sources.copart.api_enabled,
        config.sources.copart.scrape_enabled
    );
    tracing::info!(
        "IAAI strategies: api={} scrape={}",
        config.sources.iaai.api_enabled,
        config.sources.iaai.scrape_enabled
    );

    let cache = Arc::new(ListingCache::new(Duration::from_secs(
        config.system.cache_ttl_secs,
    )));
    let orchestrator = Orchestrator::new(&config, &env, Arc::clone(&cache));

    if config.watch.queries.is_empty() {
        tracing::warn!("No watch queries configured; nothing to do");
        return Ok(());
    }

    for watch in &config.watch.queries {
        let query = ListingQuery::new(watch.make.clone(), watch.model.clone());
        let result = orchestrator.fetch_aggregate(&query).await;

        let good = result.listings.iter().filter(|l| l.is_good_deal).count();
        tracing::info!(
            "{} {}: {} listings ({:?}), {} flagged as deals",
            watch.make,
            watch.model.as_deref().unwrap_or("(all models)"),
            result.listings.len(),
            result.origin,
            good
        );

        // Demonstrate an ROI estimate seeded from the best-scored listing.
        if let Some(best) = result
            .listings
            .iter()
            .filter(|l| l.is_good_deal)
            .max_by_key(|l| l.deal_score)
        {
            tracing::info!("Best deal: {} — {}", best.id, best.deal_reason);

            let scenario = RoiScenario::from_listing(best);
            let roi = estimate(&scenario);
            tracing::info!(
                "ROI for lot {}: invest ${:.0}, profit ${:.0}, margin {:.1}% ({:?})",
                best.lot,
                roi.total_investment,
                roi.estimated_profit,
                roi.profit_margin,
                RoiBand::from_margin(roi.profit_margin)
            );
        }
    }

    tracing::info!("✅ Watch pass complete ({} cached queries)", cache.len());

    Ok(())
}

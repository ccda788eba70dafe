use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::{Config, EnvConfig, SourceConfig};
use crate::data::cache::{CacheKey, ListingCache};
use crate::data::normalize::normalize;
use crate::data::types::{AggregateResult, Listing, ListingQuery, ResultOrigin, Source};
use crate::scoring::deal;
use crate::sources::api::ApiClient;
use crate::sources::scrape::{self, PageFetcher};
use crate::sources::{synthetic, FetchError, RawListing};

/// One strategy in the per-source fallback chain, tried in declaration
/// order. Synthetic is terminal and infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Api,
    Scrape,
    Synthetic,
}

impl Attempt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attempt::Api => "api",
            Attempt::Scrape => "scrape",
            Attempt::Synthetic => "synthetic",
        }
    }
}

pub const FALLBACK_CHAIN: [Attempt; 3] = [Attempt::Api, Attempt::Scrape, Attempt::Synthetic];

/// Runs the per-source fallback state machine and the aggregate fetch
/// pipeline: cache check, per-source strategy chain, normalize, score,
/// cache write. One per process, alongside the cache it shares.
pub struct Orchestrator {
    api: ApiClient,
    pages: PageFetcher,
    cache: Arc<ListingCache>,
    attempt_timeout: Duration,
    copart: SourceConfig,
    iaai: SourceConfig,
}

impl Orchestrator {
    pub fn new(config: &Config, env: &EnvConfig, cache: Arc<ListingCache>) -> Self {
        Self {
            api: ApiClient::new(env),
            pages: PageFetcher::new(env),
            cache,
            attempt_timeout: Duration::from_secs(config.system.attempt_timeout_secs),
            copart: config.sources.copart.clone(),
            iaai: config.sources.iaai.clone(),
        }
    }

    /// Aggregate fetch for one query. Never fails and never returns an empty
    /// failure response: worst case is a synthetic result carrying an error
    /// description.
    pub async fn fetch_aggregate(&self, query: &ListingQuery) -> AggregateResult {
        let key = CacheKey::for_query("all", query);

        if !query.force_refresh {
            if let Some((listings, updated)) = self.cache.get_fresh(&key) {
                info!("Cache hit for {} {:?}", query.make, query.model);
                return AggregateResult {
                    listings,
                    origin: ResultOrigin::Cache,
                    timestamp: updated,
                    error: None,
                };
            }
        }

        // Single-flight: concurrent misses for the same key wait here and
        // find a fresh entry on the re-check instead of refetching.
        let lock = self.cache.refresh_lock(&key);
        let _guard = lock.lock().await;

        if !query.force_refresh {
            if let Some((listings, updated)) = self.cache.get_fresh(&key) {
                info!("Cache refreshed while waiting for {} {:?}", query.make, query.model);
                return AggregateResult {
                    listings,
                    origin: ResultOrigin::Cache,
                    timestamp: updated,
                    error: None,
                };
            }
        }

        // A refresh can only blow up on a programming error in the pure
        // normalize/score path; catch the unwind so the request still gets
        // the last good data.
        match AssertUnwindSafe(self.refresh(query)).catch_unwind().await {
            Ok((listings, origin)) => {
                self.cache.insert(key, listings.clone());
                AggregateResult {
                    listings,
                    origin,
                    timestamp: Utc::now(),
                    error: None,
                }
            }
            Err(panic) => {
                let detail = panic_message(panic);
                error!("Aggregate refresh failed unexpectedly: {}", detail);
                self.fallback_result(&key, query, detail)
            }
        }
    }

    /// Recovery path for a failed refresh: the last good entry if one exists
    /// (however stale), otherwise a fresh synthetic batch. Either way the
    /// caller sees the failure description in `error`.
    fn fallback_result(&self, key: &CacheKey, query: &ListingQuery, detail: String) -> AggregateResult {
        if let Some((listings, updated)) = self.cache.get_stale(key) {
            warn!("Serving stale cache from {} for {}", updated, query.make);
            AggregateResult {
                listings,
                origin: ResultOrigin::CacheFallback,
                timestamp: updated,
                error: Some(detail),
            }
        } else {
            AggregateResult {
                listings: self.synthetic_only(query),
                origin: ResultOrigin::Simulated,
                timestamp: Utc::now(),
                error: Some(detail),
            }
        }
    }

    async fn refresh(&self, query: &ListingQuery) -> (Vec<Listing>, ResultOrigin) {
        let fetches = Source::ALL.iter().map(|s| self.fetch_source(*s, query));
        let per_source = join_all(fetches).await;

        let all_synthetic = per_source
            .iter()
            .all(|(_, attempt)| *attempt == Attempt::Synthetic);

        let listings = dedup_by_id(
            per_source
                .into_iter()
                .flat_map(|(listings, _)| listings)
                .collect(),
        );

        let origin = if all_synthetic {
            ResultOrigin::Simulated
        } else {
            ResultOrigin::Scraped
        };

        (deal::score(listings), origin)
    }

    /// The per-source state machine. Infallible: the chain terminates at the
    /// synthetic generator.
    async fn fetch_source(&self, source: Source, query: &ListingQuery) -> (Vec<Listing>, Attempt) {
        let (raws, attempt) = run_chain(source.as_str(), self.attempt_timeout, |attempt| {
            self.run_attempt(attempt, source, query)
        })
        .await;

        info!(
            "{}: {} listings via {} strategy",
            source,
            raws.len(),
            attempt.as_str()
        );

        let listings = raws.iter().map(|raw| normalize(raw, source)).collect();
        (listings, attempt)
    }

    async fn run_attempt(
        &self,
        attempt: Attempt,
        source: Source,
        query: &ListingQuery,
    ) -> Result<Vec<RawListing>, FetchError> {
        let source_cfg = match source {
            Source::Copart => &self.copart,
            Source::Iaai => &self.iaai,
        };
        let model = query.model.as_deref();

        match attempt {
            Attempt::Api => {
                if !source_cfg.api_enabled {
                    return Err(FetchError::Disabled);
                }
                self.api.fetch_listings(source, &query.make, model).await
            }
            Attempt::Scrape => {
                if !source_cfg.scrape_enabled {
                    return Err(FetchError::Disabled);
                }
                scrape::fetch_listings(&self.pages, source, &query.make, model).await
            }
            Attempt::Synthetic => Ok(synthetic::generate_listings(source, &query.make, model)),
        }
    }

    fn synthetic_only(&self, query: &ListingQuery) -> Vec<Listing> {
        let listings = Source::ALL
            .into_iter()
            .flat_map(|s| {
                synthetic::generate_listings(s, &query.make, query.model.as_deref())
                    .into_iter()
                    .map(move |raw| normalize(&raw, s))
                    .collect::<Vec<_>>()
            })
            .collect();
        deal::score(listings)
    }
}

/// Interpreter loop over the fallback chain: try each strategy in order,
/// bounded by the per-attempt timeout, stopping at the first success.
/// Failures are logged and advance the chain; nothing propagates out.
pub(crate) async fn run_chain<F, Fut>(
    label: &str,
    attempt_timeout: Duration,
    mut run: F,
) -> (Vec<RawListing>, Attempt)
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<Vec<RawListing>, FetchError>>,
{
    for attempt in FALLBACK_CHAIN {
        let outcome = match timeout(attempt_timeout, run(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(attempt_timeout)),
        };

        match outcome {
            Ok(raws) => return (raws, attempt),
            Err(e) => warn!("{}: {} strategy failed: {}", label, attempt.as_str(), e),
        }
    }

    // Unreachable when the terminal strategy is infallible; an empty
    // synthetic batch is the safe answer if a caller breaks that contract.
    (Vec::new(), Attempt::Synthetic)
}

/// Drop repeated ids, keeping the first occurrence. A source occasionally
/// lists the same lot twice in one response; ids must be unique within an
/// aggregate result.
fn dedup_by_id(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::with_capacity(listings.len());
    listings
        .into_iter()
        .filter(|l| seen.insert(l.id.clone()))
        .collect()
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "refresh panicked".to_string()
    }
}

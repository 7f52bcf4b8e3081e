use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Duration;
use tracing::{debug, instrument, warn};

use crate::alerts;
use crate::cache::{CacheKey, CachedPayload, TtlCache};
use crate::error::ApiError;
use crate::model::{Alert, CityMatch, Forecast, LiveConditions, Operation};
use crate::rate_limit::RateLimiter;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Everything needed to build a [`WeatherClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_key: String,
    /// Provider base, e.g. `https://restapi.amap.com/v3`, without trailing slash.
    pub base_url: String,
    pub cache_ttl: Duration,
    pub min_interval: Duration,
    pub max_cache_entries: Option<usize>,
    pub request_timeout: Option<Duration>,
}

impl ClientOptions {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_cache_entries: None,
            request_timeout: None,
        }
    }
}

/// Per-key slot holding the surfaced error of the last caller to finish, if any.
type Slot = Arc<AsyncMutex<Option<ApiError>>>;
type InFlightMap = Mutex<HashMap<CacheKey, Slot>>;

/// Cached, rate-limited access to the weather and district endpoints.
///
/// Build one per process and clone the handle into every caller; clones share
/// the same cache, throttle and in-flight table.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    api_key: String,
    base_url: String,
    cache: Mutex<TtlCache<CacheKey, CachedPayload>>,
    limiter: RateLimiter,
    in_flight: InFlightMap,
}

impl WeatherClient {
    pub fn new(options: ClientOptions) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let cache = match options.max_cache_entries {
            Some(max) => TtlCache::with_max_entries(options.cache_ttl, max),
            None => TtlCache::new(options.cache_ttl),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                api_key: options.api_key,
                base_url: options.base_url,
                cache: Mutex::new(cache),
                limiter: RateLimiter::new(options.min_interval),
                in_flight: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Multi-day forecast for `city`. `Ok(None)` means no data was found.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_forecast(&self, city: &str) -> Result<Option<Forecast>, ApiError> {
        let key = CacheKey::new(Operation::Forecast, city);
        Ok(self.resolve(&key).await?.and_then(CachedPayload::into_forecast))
    }

    /// Current observation for `city`. `Ok(None)` means no data was found.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_live_conditions(
        &self,
        city: &str,
    ) -> Result<Option<LiveConditions>, ApiError> {
        let key = CacheKey::new(Operation::Live, city);
        Ok(self.resolve(&key).await?.and_then(CachedPayload::into_live))
    }

    /// Districts matching `keyword`, in provider order.
    #[instrument(skip(self), level = "debug")]
    pub async fn search_cities(&self, keyword: &str) -> Result<Vec<CityMatch>, ApiError> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::new(Operation::Search, keyword);
        Ok(self
            .resolve(&key)
            .await?
            .and_then(CachedPayload::into_cities)
            .unwrap_or_default())
    }

    /// Placeholder alerts feed; see [`alerts`](crate::alerts). Never touches the network.
    pub fn fetch_alerts(&self, region_code: &str) -> Vec<Alert> {
        alerts::sample_alerts(region_code)
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Entries currently cached, including expired ones awaiting lazy purge.
    pub fn cached_entries(&self) -> usize {
        self.inner.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.inner.cache.lock().clear();
    }

    async fn resolve(&self, key: &CacheKey) -> Result<Option<CachedPayload>, ApiError> {
        if let Some(hit) = self.cached(key) {
            return Ok(Some(hit));
        }

        let slot = InFlight::join(&self.inner.in_flight, key);
        let mut shared = slot.lock.lock().await;

        // filled by the caller we queued behind
        if let Some(hit) = self.cached(key) {
            return Ok(Some(hit));
        }
        if let Some(err) = shared.as_ref().and_then(ApiError::surfaced_clone) {
            debug!(key = %key, kind = ?err.kind(), "reusing rejection from queued request");
            return Err(err);
        }

        match self.dispatch(key).await {
            Ok(payload) => {
                self.inner.cache.lock().put(key.clone(), payload.clone());
                Ok(Some(payload))
            }
            Err(err) if err.kind().is_surfaced() => {
                warn!(
                    key = %key,
                    kind = ?err.kind(),
                    info = ?err.info(),
                    "provider rejected request"
                );
                *shared = err.surfaced_clone();
                Err(err)
            }
            Err(err) => {
                warn!(key = %key, kind = ?err.kind(), error = %err, "no data returned");
                Ok(None)
            }
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<CachedPayload> {
        let hit = self.inner.cache.lock().get(key);
        if hit.is_some() {
            debug!(key = %key, "cache hit");
        }
        hit
    }

    async fn dispatch(&self, key: &CacheKey) -> Result<CachedPayload, ApiError> {
        self.inner.limiter.acquire().await;

        let operation = key.operation;
        let api_key = self.inner.api_key.as_str();
        let query = key.query.as_str();

        let request = match operation {
            Operation::Forecast | Operation::Live => {
                let extensions = if operation == Operation::Forecast { "all" } else { "base" };
                self.inner
                    .http
                    .get(format!("{}/weather/weatherInfo", self.inner.base_url))
                    .query(&[("key", api_key), ("city", query), ("extensions", extensions)])
            }
            Operation::Search => self
                .inner
                .http
                .get(format!("{}/config/district", self.inner.base_url))
                .query(&[("key", api_key), ("keywords", query), ("subdistrict", "0")]),
        };

        debug!(key = %key, "dispatching request");

        let res = request
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;

        debug!(key = %key, %status, "response received");

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|source| ApiError::Decode { operation, source })?;

        envelope.into_payload(operation)
    }
}

/// Response shape shared by both endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    forecasts: Vec<Forecast>,
    #[serde(default)]
    lives: Vec<LiveConditions>,
    #[serde(default)]
    districts: Vec<CityMatch>,
}

impl Envelope {
    fn into_payload(self, operation: Operation) -> Result<CachedPayload, ApiError> {
        if self.status == "1" {
            let payload = match operation {
                Operation::Forecast => {
                    self.forecasts.into_iter().next().map(CachedPayload::Forecast)
                }
                Operation::Live => self.lives.into_iter().next().map(CachedPayload::Live),
                Operation::Search if !self.districts.is_empty() => {
                    Some(CachedPayload::Cities(self.districts))
                }
                Operation::Search => None,
            };

            if let Some(payload) = payload {
                return Ok(payload);
            }
        }

        Err(ApiError::classify(operation, self.info.as_deref()))
    }
}

/// Membership in the per-key in-flight table. The table entry is removed when
/// the last member for that key goes away, so a later call starts fresh.
struct InFlight<'a> {
    map: &'a InFlightMap,
    key: &'a CacheKey,
    lock: Slot,
}

impl<'a> InFlight<'a> {
    fn join(map: &'a InFlightMap, key: &'a CacheKey) -> Self {
        let lock = Arc::clone(map.lock().entry(key.clone()).or_default());
        Self { map, key, lock }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock();
        let is_current = map
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.lock));

        // one reference held by the map, one by us
        if is_current && Arc::strong_count(&self.lock) <= 2 {
            map.remove(self.key);
        }
    }
}

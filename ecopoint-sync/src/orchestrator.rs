//! Concurrent, cache-aware fetching of named requests.
//!
//! A batch is settled, never short-circuited: each request runs under its own
//! timeout and a failure only removes that request from the outcome. The batch
//! as a whole fails only when nothing at all could be produced.

use crate::envelope::unwrap_envelope;
use dashmap::DashMap;
use ecopoint_cache::TtlCache;
use ecopoint_core::{
    BatchFailure, FetchError, SessionObserver, SyncError, SyncResult, Transport,
};
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cache lifetime for a fetched payload.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// One request of a batch.
///
/// `name` identifies the request in the outcome and must be unique within a
/// batch. `cache_key` is where the payload is read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRequest {
    pub name: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub cache_key: String,
    pub cache_ttl: Duration,
}

impl NamedRequest {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        cache_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            cache_key: cache_key.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Where a settled payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Network,
}

/// A successfully produced payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub value: Value,
    pub origin: Origin,
    /// A newer request for the same cache key was launched before this one
    /// settled, so this payload was not written to the cache.
    pub superseded: bool,
}

/// Result of a batch in which at least one request produced a payload.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    settled: HashMap<String, Settled>,
    failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn get(&self, name: &str) -> Option<&Settled> {
        self.settled.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.settled.get(name).map(|s| &s.value)
    }

    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.settled.get(name).map(|s| s.origin)
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    pub fn failure(&self, name: &str) -> Option<&FetchError> {
        self.failures
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.error)
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn settled_count(&self) -> usize {
        self.settled.len()
    }
}

/// Runs batches of named requests against a transport and a shared cache.
pub struct FetchOrchestrator {
    transport: Arc<dyn Transport>,
    cache: Arc<TtlCache>,
    session: Arc<dyn SessionObserver>,
    /// Latest launched generation per cache key.
    generations: DashMap<String, u64>,
}

impl FetchOrchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<TtlCache>,
        session: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            transport,
            cache,
            session,
            generations: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    /// Settle every request of `requests`.
    ///
    /// Unless `force_refresh` is set, a live cache entry answers a request
    /// without touching the network. All remaining requests are launched
    /// together and awaited together; completion order is irrelevant.
    ///
    /// Returns `SyncError::AggregateFailure` only when no request produced a
    /// payload, neither from cache nor from the network.
    pub async fn run(
        &self,
        requests: &[NamedRequest],
        force_refresh: bool,
    ) -> SyncResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let mut pending = Vec::with_capacity(requests.len());

        for request in requests {
            if !force_refresh {
                if let Some(value) = self.cache.get(&request.cache_key) {
                    tracing::debug!(
                        request = %request.name,
                        cache_key = %request.cache_key,
                        "Served from cache"
                    );
                    outcome.settled.insert(
                        request.name.clone(),
                        Settled {
                            value,
                            origin: Origin::Cache,
                            superseded: false,
                        },
                    );
                    continue;
                }
            }
            pending.push(request);
        }

        if pending.is_empty() {
            return Ok(outcome);
        }

        // Generations are taken at launch, before any request is awaited.
        let launches = pending.into_iter().map(|request| {
            let generation = self.next_generation(&request.cache_key);
            async move { (request, generation, self.fetch_one(request).await) }
        });

        for (request, generation, result) in join_all(launches).await {
            match result {
                Ok(value) => {
                    let written = self.store_if_latest(request, generation, &value);
                    if !written {
                        tracing::debug!(
                            request = %request.name,
                            cache_key = %request.cache_key,
                            generation,
                            "Newer request in flight, cache write skipped"
                        );
                    }
                    outcome.settled.insert(
                        request.name.clone(),
                        Settled {
                            value,
                            origin: Origin::Network,
                            superseded: !written,
                        },
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        request = %request.name,
                        endpoint = %request.endpoint,
                        error = %error,
                        "Request failed"
                    );
                    outcome.failures.push(BatchFailure {
                        name: request.name.clone(),
                        error,
                    });
                }
            }
        }

        if outcome.settled.is_empty() {
            tracing::warn!(failed = outcome.failures.len(), "Every request in batch failed");
            return Err(SyncError::AggregateFailure {
                failures: outcome.failures,
            });
        }

        Ok(outcome)
    }

    async fn fetch_one(&self, request: &NamedRequest) -> Result<Value, FetchError> {
        let started = Instant::now();
        let response =
            match tokio::time::timeout(request.timeout, self.transport.get(&request.endpoint))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(FetchError::Timeout {
                        endpoint: request.endpoint.clone(),
                        timeout: request.timeout,
                    })
                }
            };

        if response.is_unauthorized() {
            self.session.on_unauthorized(&request.endpoint);
            return Err(FetchError::Unauthorized {
                endpoint: request.endpoint.clone(),
            });
        }
        if !response.is_success() {
            return Err(FetchError::Status {
                endpoint: request.endpoint.clone(),
                status: response.status,
            });
        }

        let value = unwrap_envelope(&request.endpoint, &response.body)?;
        tracing::debug!(
            request = %request.name,
            endpoint = %request.endpoint,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request settled"
        );
        Ok(value)
    }

    fn next_generation(&self, cache_key: &str) -> u64 {
        let mut generation = self.generations.entry(cache_key.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Write `value` to the cache if `generation` is still the newest launch
    /// for the request's key. The generation guard is held across the write
    /// so a concurrent launch cannot slip in between check and write.
    fn store_if_latest(&self, request: &NamedRequest, generation: u64, value: &Value) -> bool {
        let Some(latest) = self.generations.get(&request.cache_key) else {
            return false;
        };
        if *latest != generation {
            return false;
        }
        self.cache
            .set(request.cache_key.clone(), value.clone(), request.cache_ttl);
        true
    }
}

//! Paced, retrying, run-cached JSON/text fetch substrate.
//!
//! A correct design passes an explicit rate-limiter handle rather than
//! relying on process-global state; this substrate keeps a process-global
//! pacing clock because the core has no parallel-worker execution model.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde_json::Value;

static LAST_REQUEST: Lazy<Mutex<Option<Instant>>> = Lazy::new(|| Mutex::new(None));

const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Pacing and retry knobs for one `HttpClient`.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub request_delay_s: f64,
    pub max_retries: u32,
    pub backoff_base_s: f64,
    pub timeout_s: u64,
}

impl FetchConfig {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            request_delay_s: 0.3,
            max_retries: 3,
            backoff_base_s: 0.5,
            timeout_s: 30,
        }
    }
}

/// Per-run counters, purely additive and read-only to callers — used by
/// the observability snapshot.
#[derive(Debug, Clone, Default)]
pub struct FetchStats {
    pub requests: u64,
    pub retries: u64,
    pub empties: u64,
}

/// A mutable cache an adapter passes across calls within one invocation,
/// used to memoize e.g. a ticker-to-CIK map fetch.
pub type RunCache = HashMap<String, Value>;

pub struct HttpClient {
    config: FetchConfig,
    client: reqwest::blocking::Client,
    stats: Mutex<FetchStats>,
}

impl HttpClient {
    pub fn new(config: FetchConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .build()
            .expect("reqwest client builder should never fail with these options");
        Self { config, client, stats: Mutex::new(FetchStats::default()) }
    }

    pub fn stats(&self) -> FetchStats {
        self.stats.lock().expect("stats mutex poisoned").clone()
    }

    fn pace(&self) {
        let delay = Duration::from_secs_f64(self.config.request_delay_s.max(0.0));
        let mut last = LAST_REQUEST.lock().expect("pacing mutex poisoned");
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                std::thread::sleep(delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn backoff(&self, attempt: u32) {
        let secs = self.config.backoff_base_s * 2f64.powi(attempt as i32);
        std::thread::sleep(Duration::from_secs_f64(secs));
    }

    /// Fetches JSON, retrying on retryable statuses, transport errors, and
    /// decode failures. Returns an empty JSON object on any non-retryable
    /// or retry-exhausted failure — never an error.
    pub fn fetch_json(&self, url: &str, accept: &str) -> Value {
        for attempt in 0..=self.config.max_retries {
            self.pace();
            {
                let mut stats = self.stats.lock().expect("stats mutex poisoned");
                stats.requests += 1;
            }
            let result = self
                .client
                .get(url)
                .header("User-Agent", &self.config.user_agent)
                .header("Accept", accept)
                .send();

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if RETRYABLE_STATUSES.contains(&status) {
                        if attempt < self.config.max_retries {
                            self.record_retry();
                            self.backoff(attempt);
                            continue;
                        }
                        return self.record_empty_object();
                    }
                    if !response.status().is_success() {
                        return self.record_empty_object();
                    }
                    match response.json::<Value>() {
                        Ok(value) => return value,
                        Err(_) if attempt < self.config.max_retries => {
                            self.record_retry();
                            self.backoff(attempt);
                            continue;
                        }
                        Err(_) => return self.record_empty_object(),
                    }
                }
                Err(_) if attempt < self.config.max_retries => {
                    self.record_retry();
                    self.backoff(attempt);
                    continue;
                }
                Err(_) => return self.record_empty_object(),
            }
        }
        self.record_empty_object()
    }

    /// Like `fetch_json` but memoizes a successful result in `cache` under
    /// `cache_key` and returns the cached value on subsequent calls
    /// without making a request.
    pub fn fetch_json_cached(&self, url: &str, accept: &str, cache: &mut RunCache, cache_key: &str) -> Value {
        if let Some(cached) = cache.get(cache_key) {
            return cached.clone();
        }
        let value = self.fetch_json(url, accept);
        if !value.is_null() && value != Value::Object(Default::default()) {
            cache.insert(cache_key.to_string(), value.clone());
        }
        value
    }

    /// Fetches raw text, with the same retry/empty-on-failure semantics
    /// as `fetch_json`, returning an empty string on failure.
    pub fn fetch_text(&self, url: &str, accept: &str) -> String {
        for attempt in 0..=self.config.max_retries {
            self.pace();
            {
                let mut stats = self.stats.lock().expect("stats mutex poisoned");
                stats.requests += 1;
            }
            let result = self
                .client
                .get(url)
                .header("User-Agent", &self.config.user_agent)
                .header("Accept", accept)
                .send();

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if RETRYABLE_STATUSES.contains(&status) {
                        if attempt < self.config.max_retries {
                            self.record_retry();
                            self.backoff(attempt);
                            continue;
                        }
                        return self.record_empty_string();
                    }
                    if !response.status().is_success() {
                        return self.record_empty_string();
                    }
                    return response.text().unwrap_or_default();
                }
                Err(_) if attempt < self.config.max_retries => {
                    self.record_retry();
                    self.backoff(attempt);
                    continue;
                }
                Err(_) => return self.record_empty_string(),
            }
        }
        self.record_empty_string()
    }

    fn record_retry(&self) {
        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        stats.retries += 1;
    }

    fn record_empty_object(&self) -> Value {
        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        stats.empties += 1;
        Value::Object(Default::default())
    }

    fn record_empty_string(&self) -> String {
        let mut stats = self.stats.lock().expect("stats mutex poisoned");
        stats.empties += 1;
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_config_has_sensible_defaults() {
        let config = FetchConfig::new("ogree-core/1.0 (contact@example.com)");
        assert!(config.request_delay_s > 0.0);
        assert!(config.max_retries >= 1);
    }

    #[test]
    fn fetch_json_cached_reuses_prior_value_without_network() {
        let client = HttpClient::new(FetchConfig::new("ogree-core/1.0"));
        let mut cache: RunCache = HashMap::new();
        cache.insert("tickers".to_string(), serde_json::json!({"0": {"cik_str": 1}}));
        let value = client.fetch_json_cached("http://unused.invalid", "application/json", &mut cache, "tickers");
        assert_eq!(value, serde_json::json!({"0": {"cik_str": 1}}));
        assert_eq!(client.stats().requests, 0);
    }
}

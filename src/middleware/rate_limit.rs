//! Rate limiting
//!
//! Sliding-window limiter keyed by arbitrary strings such as
//! `login:someone@example.org`, used to slow down credential and OTP guessing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use crate::config::RateLimitSettings;
use crate::utils::errors::{PortalError, Result};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window_duration: Duration,
    /// Burst allowance (extra requests allowed in short bursts)
    pub burst_allowance: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_duration: Duration::from_secs(60),
            burst_allowance: 5,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window_duration: Duration::from_secs(settings.window_seconds),
            burst_allowance: settings.burst_allowance,
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    requests: Vec<Instant>,
    burst_used: u32,
    last_reset: Instant,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        Self {
            requests: Vec::new(),
            burst_used: 0,
            last_reset: now,
        }
    }

    /// Drop requests that fell out of the window
    fn cleanup(&mut self, window_duration: Duration, now: Instant) {
        self.requests.retain(|&time| now.duration_since(time) < window_duration);

        if now.duration_since(self.last_reset) > window_duration {
            self.burst_used = 0;
            self.last_reset = now;
        }
    }

    fn is_allowed(&mut self, config: &RateLimitConfig, now: Instant) -> bool {
        self.cleanup(config.window_duration, now);

        if (self.requests.len() as u32) < config.max_requests {
            return true;
        }

        if self.burst_used < config.burst_allowance {
            self.burst_used += 1;
            return true;
        }

        false
    }
}

/// Shared in-memory rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a request for `key`, failing with `RateLimitExceeded` once the
    /// window and burst allowance are used up
    pub fn check(&self, key: &str) -> Result<()> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::new(now));

        if entry.is_allowed(&self.config, now) {
            entry.requests.push(now);
            debug!(key = key, "Rate limit check passed");
            Ok(())
        } else {
            warn!(key = key, "Rate limit exceeded");
            Err(PortalError::RateLimitExceeded)
        }
    }

    /// Forget a key, e.g. after a successful login
    pub fn reset(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).is_some()
    }

    /// Drop keys with no requests in the last two windows
    pub fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let keep_for = self.config.window_duration * 2;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        entries.retain(|_, entry| {
            entry.requests.iter().any(|&time| now.duration_since(time) < keep_for)
        });

        debug!(remaining_entries = entries.len(), "Cleaned up old rate limit entries");
    }

    /// Number of tracked keys
    pub fn tracked_keys(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

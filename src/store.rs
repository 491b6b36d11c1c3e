//! Filter persistence.
//!
//! A view's [`FilterState`] is written one key per filter dimension, each
//! holding JSON, under the view's own prefix so views never read each
//! other's selections. Where the keys live is up to the [`StoreBackend`]:
//! an expiring cookie jar file, the SQLite preferences table, or memory.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::filter::FilterState;
use crate::models::View;

pub const DEFAULT_EXPIRY_DAYS: i64 = 7;
pub const MAX_EXPIRY_DAYS: i64 = 3650;

pub trait StoreBackend {
    /// Value for `key`, or `None` when missing or expired.
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<B: StoreBackend + ?Sized> StoreBackend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        (**self).set(key, value, expires_at)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cookie {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Cookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Expiring key/value jar. With a path, every write is flushed to disk as JSON.
#[derive(Debug, Default)]
pub struct CookieJar {
    path: Option<PathBuf>,
    cookies: BTreeMap<String, Cookie>,
}

impl CookieJar {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the jar at `path`, dropping anything already expired.
    /// A corrupt file starts an empty jar that the next write replaces.
    pub fn open(path: &Path) -> Result<Self> {
        let mut cookies: BTreeMap<String, Cookie> = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable filter cookies");
                    BTreeMap::new()
                })
            }
        } else {
            BTreeMap::new()
        };

        let now = Utc::now();
        let before = cookies.len();
        cookies.retain(|_, c| c.is_live(now));
        if cookies.len() != before {
            debug!(expired = before - cookies.len(), "Dropped expired filter cookies");
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            cookies,
        })
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.cookies)?)?;
        Ok(())
    }
}

impl StoreBackend for CookieJar {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now();
        Ok(self
            .cookies
            .get(key)
            .filter(|c| c.is_live(now))
            .map(|c| c.value.clone()))
    }

    fn set(&mut self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.cookies.insert(
            key.to_string(),
            Cookie {
                value: value.to_string(),
                expires_at,
            },
        );
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.cookies.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Storage key suffix of each filter dimension.
const DIMENSIONS: [&str; 8] = [
    "search",
    "location",
    "jobTypes",
    "shifts",
    "roleCategories",
    "experience",
    "visaStatus",
    "payRate",
];

/// Load/save/clear of a view's filters; the only way view code touches storage.
pub struct FilterStore<B> {
    backend: B,
    ttl: Duration,
}

impl<B: StoreBackend> FilterStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_expiry_days(backend, DEFAULT_EXPIRY_DAYS)
    }

    pub fn with_expiry_days(backend: B, days: i64) -> Self {
        Self {
            backend,
            ttl: Duration::days(days.clamp(1, MAX_EXPIRY_DAYS)),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn key(view: View, dimension: &str) -> String {
        format!("{}_{}", view.store_prefix(), dimension)
    }

    pub fn keys(view: View) -> Vec<String> {
        DIMENSIONS.iter().map(|d| Self::key(view, d)).collect()
    }

    /// Stored filters for `view`. Missing or unreadable keys fall back to defaults.
    pub fn load(&self, view: View) -> Result<FilterState> {
        let mut state = FilterState::default();
        if let Some(v) = self.read(view, "search")? {
            state.search = v;
        }
        if let Some(v) = self.read(view, "location")? {
            state.location = v;
        }
        if let Some(v) = self.read(view, "jobTypes")? {
            state.job_types = v;
        }
        if let Some(v) = self.read(view, "shifts")? {
            state.shifts = v;
        }
        if let Some(v) = self.read(view, "roleCategories")? {
            state.role_categories = v;
        }
        if let Some(v) = self.read(view, "experience")? {
            state.experience_labels = v;
        }
        if let Some(v) = self.read(view, "visaStatus")? {
            state.visa_statuses = v;
        }
        if let Some(v) = self.read(view, "payRate")? {
            state.pay_rate = v;
        }
        Ok(state)
    }

    pub fn save(&mut self, view: View, state: &FilterState) -> Result<()> {
        let expires_at = Utc::now() + self.ttl;
        let values = [
            ("search", serde_json::to_string(&state.search)?),
            ("location", serde_json::to_string(&state.location)?),
            ("jobTypes", serde_json::to_string(&state.job_types)?),
            ("shifts", serde_json::to_string(&state.shifts)?),
            ("roleCategories", serde_json::to_string(&state.role_categories)?),
            ("experience", serde_json::to_string(&state.experience_labels)?),
            ("visaStatus", serde_json::to_string(&state.visa_statuses)?),
            ("payRate", serde_json::to_string(&state.pay_rate)?),
        ];
        for (dimension, value) in values {
            self.backend.set(&Self::key(view, dimension), &value, expires_at)?;
        }
        debug!(view = %view, "Saved filters");
        Ok(())
    }

    /// Remove every key of `view`.
    pub fn clear(&mut self, view: View) -> Result<()> {
        for key in Self::keys(view) {
            self.backend.remove(&key)?;
        }
        debug!(view = %view, "Cleared filters");
        Ok(())
    }

    fn read<T: serde::de::DeserializeOwned>(&self, view: View, dimension: &str) -> Result<Option<T>> {
        let key = Self::key(view, dimension);
        let Some(raw) = self.backend.get(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unreadable stored filter");
                Ok(None)
            }
        }
    }
}

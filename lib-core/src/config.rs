use std::{path::PathBuf, time::Duration};

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5001";

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub fn get_download_dir() -> PathBuf {
    std::env::var("PIXELDIFF_DOWNLOAD_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}
impl ServiceConfig {
    pub fn new() -> Self {
        Self {
            base_url: std::env::var("PIXELDIFF_SERVICE_URL").unwrap_or(DEFAULT_SERVICE_URL.into()),
            request_timeout: Duration::from_secs(env_or("PIXELDIFF_REQUEST_TIMEOUT_SECS", 60)),
            connect_timeout: Duration::from_secs(env_or("PIXELDIFF_CONNECT_TIMEOUT_SECS", 5)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Endpoint under the service's `/api` prefix
    pub fn api_uri(&self, uri: impl AsRef<str>) -> String {
        format!("{}/api{}", self.base_url.trim_end_matches('/'), uri.as_ref())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cadence and bounds of the progress ticker shown while a comparison runs
#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    pub tick: Duration,
    pub max_step: f32,
    pub ceiling: f32,
}
impl ProgressConfig {
    const TICK_MS: u64 = 200;
    const MAX_STEP: f32 = 15.0;
    const CEILING: f32 = 90.0;

    pub fn new() -> Self {
        Self::from_parts(
            env_or("PIXELDIFF_PROGRESS_TICK_MS", Self::TICK_MS),
            env_or("PIXELDIFF_PROGRESS_MAX_STEP", Self::MAX_STEP),
            env_or("PIXELDIFF_PROGRESS_CEILING", Self::CEILING),
        )
    }

    /// Non-finite values fall back to the defaults
    pub fn from_parts(tick_ms: u64, max_step: f32, ceiling: f32) -> Self {
        let finite_or = |v: f32, default: f32| if v.is_finite() { v } else { default };
        Self {
            // a zero period would stall the ticker
            tick: Duration::from_millis(tick_ms.max(1)),
            max_step: finite_or(max_step, Self::MAX_STEP).max(0.0),
            // never allowed to reach completion on its own
            ceiling: finite_or(ceiling, Self::CEILING).clamp(0.0, 99.0),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::Arc;

use lib_core::config::ProgressConfig;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

pub const COMPLETE: f32 = 100.0;

/// Next estimate given a random `fraction` in `[0, 1]`.
///
/// Stalls at the configured ceiling; values already past it are kept.
pub fn advance(current: f32, fraction: f32, config: &ProgressConfig) -> f32 {
    if current >= config.ceiling {
        return current;
    }
    (current + fraction.clamp(0.0, 1.0) * config.max_step).min(config.ceiling)
}

fn random_fraction() -> f32 {
    getrandom::u32().map(|v| v as f32 / u32::MAX as f32).unwrap_or(0.5)
}

/// Ticking progress estimate for an outstanding comparison.
///
/// The ticker task lives exactly as long as this value: dropping it or
/// calling [`ProgressEstimator::complete`] stops the task.
pub struct ProgressEstimator {
    value: Arc<watch::Sender<f32>>,
    ticker: JoinHandle<()>,
}

impl ProgressEstimator {
    /// Start ticking from 0. Must be called inside a tokio runtime.
    pub fn start(config: ProgressConfig) -> Self {
        let (tx, _) = watch::channel(0.0_f32);
        let value = Arc::new(tx);

        let sender = Arc::clone(&value);
        let ticker = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + config.tick;
            let mut interval = tokio::time::interval_at(start, config.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let fraction = random_fraction();
                sender.send_modify(|v| *v = advance(*v, fraction, &config));
            }
        });

        Self {
            value,
            ticker,
        }
    }

    pub fn value(&self) -> f32 {
        *self.value.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.value.subscribe()
    }

    /// Stop ticking and publish completion to subscribers
    pub fn complete(self) {
        self.ticker.abort();
        self.value.send_replace(COMPLETE);
    }

    #[cfg(test)]
    fn is_ticking(&self) -> bool {
        !self.ticker.is_finished()
    }
}

impl Drop for ProgressEstimator {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory counters and latency samples, shared by every worker of a run.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    inner: Mutex<MetricsState>,
}

#[derive(Debug, Default, Clone)]
struct MetricsState {
    counters: HashMap<String, u64>,
    latencies: HashMap<String, Vec<f64>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MetricsState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        *self.state().counters.entry(name.to_string()).or_insert(0) += value;
    }

    pub fn record_latency(&self, name: &str, duration: Duration) {
        self.state()
            .latencies
            .entry(name.to_string())
            .or_default()
            .push(duration.as_secs_f64());
    }

    pub fn get(&self, name: &str) -> u64 {
        self.state().counters.get(name).copied().unwrap_or(0)
    }

    /// Flat view: counters plus `<name>_avg_latency` and `<name>_count` per latency series.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let state = self.state();
        let mut summary: BTreeMap<String, f64> = state
            .counters
            .iter()
            .map(|(name, count)| (name.clone(), *count as f64))
            .collect();
        for (name, samples) in &state.latencies {
            summary.insert(format!("{}_avg_latency", name), mean(samples));
            summary.insert(format!("{}_count", name), samples.len() as f64);
        }
        summary
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

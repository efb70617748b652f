//! Observability (C8): per-step tracing spans and the four required
//! metrics (§4.8). Trace spans are structured `log` records carrying the
//! tag set as key=value pairs rather than a dedicated tracing framework
//! (§9 Design Notes / SPEC_FULL §1 AMBIENT: "the shape of observability is
//! mandatory, the backend is not"); metrics are plain in-process atomics,
//! consistent with the Non-goal of a full evaluation/metrics harness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::InvestigationStatus;

/// Emit one structured span-shaped log line for a completed operation
/// (§4.8: "component, operation, investigation_id, agent, tool, cache_hit,
/// latency_ms, error_kind"). Spans nest only by virtue of call order —
/// there is no span-tree data structure, matching the crate's existing
/// "plain `log` facade" idiom rather than pulling in `tracing`.
pub fn log_span(
    component: &str,
    operation: &str,
    investigation_id: &str,
    agent: Option<&str>,
    tool: Option<&str>,
    cache_hit: Option<bool>,
    latency_ms: u64,
    error_kind: Option<&str>,
) {
    log::info!(
        "component={} operation={} investigation_id={} agent={} tool={} cache_hit={} latency_ms={} error_kind={}",
        component,
        operation,
        investigation_id,
        agent.unwrap_or("-"),
        tool.unwrap_or("-"),
        cache_hit.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string()),
        latency_ms,
        error_kind.unwrap_or("-"),
    );
}

/// A minimal running histogram: count, sum, min, max. Sufficient for the
/// "per-tool latency histogram" / "total duration histogram" requirements
/// of §4.8 without a bucketed-histogram dependency the teacher doesn't
/// already carry.
#[derive(Debug, Default)]
struct RunningStats {
    count: u64,
    sum_ms: u64,
    min_ms: u64,
    max_ms: u64,
}

impl RunningStats {
    fn record(&mut self, value_ms: u64) {
        if self.count == 0 {
            self.min_ms = value_ms;
            self.max_ms = value_ms;
        } else {
            self.min_ms = self.min_ms.min(value_ms);
            self.max_ms = self.max_ms.max(value_ms);
        }
        self.count += 1;
        self.sum_ms += value_ms;
    }

    fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms as f64 / self.count as f64
        }
    }
}

/// Snapshot of one histogram, safe to serialize for `/health` or
/// `/cache/stats` responses.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub mean_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Process-wide metrics accumulator (§4.8). One instance is shared by the
/// Orchestrator, Agent Runtime, and Tool Registry dispatch path — it is
/// plain accumulation, never a suspension point (§5).
pub struct Metrics {
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    investigation_duration: Mutex<RunningStats>,
    tool_latency: Mutex<std::collections::HashMap<String, RunningStats>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            investigation_duration: Mutex::new(RunningStats::default()),
            tool_latency: Mutex::new(std::collections::HashMap::new()),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Counter of investigations by terminal status (§4.8).
    pub fn record_terminal_status(&self, status: InvestigationStatus) {
        match status {
            InvestigationStatus::Completed => {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            InvestigationStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Histogram of total investigation duration (§4.8).
    pub fn record_investigation_duration_ms(&self, ms: u64) {
        if let Ok(mut stats) = self.investigation_duration.lock() {
            stats.record(ms);
        }
    }

    /// Per-tool latency histogram (§4.8).
    pub fn record_tool_latency_ms(&self, tool: &str, ms: u64) {
        if let Ok(mut map) = self.tool_latency.lock() {
            map.entry(tool.to_string()).or_default().record(ms);
        }
    }

    pub fn record_cache_access(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Cache hit ratio across every recorded tool/LLM/retrieval access
    /// (§4.8). Distinct from [`crate::cache::CacheStore::hit_ratio`], which
    /// only reflects the store's own bookkeeping; this is the ratio as
    /// observed at the call sites that report into `Metrics`.
    pub fn cache_hit_ratio(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed) as f64;
        let misses = self.cache_misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    pub fn investigation_duration_snapshot(&self) -> HistogramSnapshot {
        let stats = self.investigation_duration.lock().unwrap();
        HistogramSnapshot {
            count: stats.count,
            mean_ms: stats.mean_ms(),
            min_ms: stats.min_ms,
            max_ms: stats.max_ms,
        }
    }

    pub fn tool_latency_snapshot(&self) -> std::collections::HashMap<String, HistogramSnapshot> {
        let map = self.tool_latency.lock().unwrap();
        map.iter()
            .map(|(name, stats)| {
                (
                    name.clone(),
                    HistogramSnapshot {
                        count: stats.count,
                        mean_ms: stats.mean_ms(),
                        min_ms: stats.min_ms,
                        max_ms: stats.max_ms,
                    },
                )
            })
            .collect()
    }

    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_counters_are_independent() {
        let m = Metrics::new();
        m.record_terminal_status(InvestigationStatus::Completed);
        m.record_terminal_status(InvestigationStatus::Completed);
        m.record_terminal_status(InvestigationStatus::Failed);
        assert_eq!(m.completed_count(), 2);
        assert_eq!(m.failed_count(), 1);
    }

    #[test]
    fn tool_latency_tracks_min_max_mean() {
        let m = Metrics::new();
        m.record_tool_latency_ms("calculate_transaction_risk", 10);
        m.record_tool_latency_ms("calculate_transaction_risk", 30);
        let snapshot = m.tool_latency_snapshot();
        let stats = snapshot.get("calculate_transaction_risk").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min_ms, 10);
        assert_eq!(stats.max_ms, 30);
        assert!((stats.mean_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn cache_hit_ratio_reflects_recorded_accesses() {
        let m = Metrics::new();
        m.record_cache_access(true);
        m.record_cache_access(true);
        m.record_cache_access(false);
        assert!((m.cache_hit_ratio() - (2.0 / 3.0)).abs() < 1e-9);
    }
}

//! Trace event collection for the advisor engine
//!
//! In-process observability sink: every turn emits structured events here.
//! Recording is fire-and-forget and must never block or fail the calling
//! turn, so a poisoned lock drops the event instead of propagating.

use crate::category::Category;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Trace event types emitted over the life of one turn
#[derive(Debug, Clone)]
pub enum TraceEvent {
    QueryReceived {
        session_id: String,
        query: String,
        timestamp: Instant,
    },
    RoutingComputed {
        targets: Vec<Category>,
        parallel: bool,
        cache_hit: bool,
        timestamp: Instant,
    },
    AgentCompleted {
        category: Category,
        success: bool,
        timed_out: bool,
        latency_ms: u64,
        timestamp: Instant,
    },
    TurnSynthesized {
        categories: Vec<Category>,
        partial_failures: usize,
        total_failure: bool,
        total_ms: u64,
        timestamp: Instant,
    },
    GreetingAnswered {
        session_id: String,
        timestamp: Instant,
    },
}

/// Aggregate statistics across all recorded events
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub queries_received: usize,
    pub cache_hits: usize,
    pub classifier_calls: usize,
    pub agents_dispatched: usize,
    pub agents_succeeded: usize,
    pub agents_failed: usize,
    pub agents_timed_out: usize,
    pub fallback_responses: usize,
    pub greetings_answered: usize,
}

/// Telemetry collector
///
/// Cloneable handle over shared buffers; cheap to pass to the orchestrator
/// and the CLI alike.
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TraceEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    ///
    /// Never blocks the turn: if a lock is poisoned the event is dropped.
    pub fn record(&self, event: TraceEvent) {
        if let Ok(mut stats) = self.stats.lock() {
            match &event {
                TraceEvent::QueryReceived { .. } => {
                    stats.queries_received += 1;
                }
                TraceEvent::RoutingComputed { cache_hit, .. } => {
                    if *cache_hit {
                        stats.cache_hits += 1;
                    } else {
                        stats.classifier_calls += 1;
                    }
                }
                TraceEvent::AgentCompleted {
                    success, timed_out, ..
                } => {
                    stats.agents_dispatched += 1;
                    if *timed_out {
                        stats.agents_timed_out += 1;
                    } else if *success {
                        stats.agents_succeeded += 1;
                    } else {
                        stats.agents_failed += 1;
                    }
                }
                TraceEvent::TurnSynthesized { total_failure, .. } => {
                    if *total_failure {
                        stats.fallback_responses += 1;
                    }
                }
                TraceEvent::GreetingAnswered { .. } => {
                    stats.greetings_answered += 1;
                }
            }
        }

        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// Get current statistics
    pub fn stats(&self) -> TelemetryStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events
    pub fn event_count(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Uptime since collector creation
    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Render a short stats summary for terminal display
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "queries: {} | cache hits: {} | classifier calls: {} | agents: {} ok / {} failed / {} timed out | fallbacks: {}",
            stats.queries_received,
            stats.cache_hits,
            stats.classifier_calls,
            stats.agents_succeeded,
            stats.agents_failed,
            stats.agents_timed_out,
            stats.fallback_responses,
        )
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_stats() {
        let collector = TelemetryCollector::new();

        collector.record(TraceEvent::QueryReceived {
            session_id: "s1".to_string(),
            query: "hello".to_string(),
            timestamp: Instant::now(),
        });
        collector.record(TraceEvent::RoutingComputed {
            targets: vec![Category::Program],
            parallel: false,
            cache_hit: false,
            timestamp: Instant::now(),
        });
        collector.record(TraceEvent::AgentCompleted {
            category: Category::Program,
            success: true,
            timed_out: false,
            latency_ms: 120,
            timestamp: Instant::now(),
        });

        let stats = collector.stats();
        assert_eq!(stats.queries_received, 1);
        assert_eq!(stats.classifier_calls, 1);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.agents_succeeded, 1);
        assert_eq!(collector.event_count(), 3);
    }

    #[test]
    fn test_timed_out_not_counted_as_failed() {
        let collector = TelemetryCollector::new();

        collector.record(TraceEvent::AgentCompleted {
            category: Category::Financial,
            success: false,
            timed_out: true,
            latency_ms: 45000,
            timestamp: Instant::now(),
        });

        let stats = collector.stats();
        assert_eq!(stats.agents_timed_out, 1);
        assert_eq!(stats.agents_failed, 0);
    }

    #[test]
    fn test_cache_hit_counted() {
        let collector = TelemetryCollector::new();

        collector.record(TraceEvent::RoutingComputed {
            targets: vec![Category::Financial, Category::Program],
            parallel: true,
            cache_hit: true,
            timestamp: Instant::now(),
        });

        assert_eq!(collector.stats().cache_hits, 1);
        assert_eq!(collector.stats().classifier_calls, 0);
    }

    #[test]
    fn test_summary_renders() {
        let collector = TelemetryCollector::new();
        let summary = collector.summary();
        assert!(summary.contains("queries: 0"));
    }
}

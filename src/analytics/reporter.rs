//! Aggregation over the exchange log for `glucochat stats`.

use std::collections::{BTreeMap, HashSet};

use crate::analytics::logger::{self, ExchangeLogEntry, Outcome};

/// Summary statistics over proxied exchanges.
#[derive(Debug, Default)]
pub struct Stats {
    pub total_requests: usize,
    pub unique_sessions: usize,
    pub outcomes: OutcomeDistribution,
    /// Request count per relayed/returned status code, ascending.
    pub status_counts: BTreeMap<u16, usize>,
    /// Mean backend latency over requests that reached the backend.
    pub avg_latency_ms: Option<f64>,
    pub max_latency_ms: Option<u64>,
}

/// Count of requests per [`Outcome`].
#[derive(Debug, Default)]
pub struct OutcomeDistribution {
    pub relayed: usize,
    pub backend_error: usize,
    pub transport_error: usize,
    pub bad_request: usize,
    pub misconfigured: usize,
}

impl OutcomeDistribution {
    pub fn total(&self) -> usize {
        self.relayed
            + self.backend_error
            + self.transport_error
            + self.bad_request
            + self.misconfigured
    }

    /// Percentage for a given count, 0.0 if there is no data.
    pub fn pct(&self, count: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (count as f64 / total as f64) * 100.0
        }
    }
}

/// Compute stats over the log, optionally limited to the last `days` days.
pub fn compute_stats(days: Option<u32>) -> Stats {
    build_stats(&logger::read_entries_since_days(days))
}

pub(crate) fn build_stats(entries: &[ExchangeLogEntry]) -> Stats {
    let mut stats = Stats {
        total_requests: entries.len(),
        ..Stats::default()
    };

    let mut sessions: HashSet<&str> = HashSet::new();
    let mut latencies: Vec<u64> = Vec::new();

    for entry in entries {
        match entry.outcome {
            Outcome::Relayed => stats.outcomes.relayed += 1,
            Outcome::BackendError => stats.outcomes.backend_error += 1,
            Outcome::TransportError => stats.outcomes.transport_error += 1,
            Outcome::BadRequest => stats.outcomes.bad_request += 1,
            Outcome::Misconfigured => stats.outcomes.misconfigured += 1,
        }
        *stats.status_counts.entry(entry.status).or_default() += 1;

        if let Some(id) = entry.session_id.as_deref() {
            sessions.insert(id);
        }
        if let Some(ms) = entry.latency_ms {
            latencies.push(ms);
        }
    }

    stats.unique_sessions = sessions.len();
    if !latencies.is_empty() {
        let sum: u64 = latencies.iter().sum();
        stats.avg_latency_ms = Some(sum as f64 / latencies.len() as f64);
        stats.max_latency_ms = latencies.iter().copied().max();
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(session: Option<&str>, status: u16, outcome: Outcome, ms: Option<u64>) -> ExchangeLogEntry {
        let mut e = ExchangeLogEntry::new(session, status, outcome);
        e.latency_ms = ms;
        e
    }

    #[test]
    fn empty_log_yields_zeroes() {
        let stats = build_stats(&[]);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.outcomes.pct(0), 0.0);
        assert!(stats.avg_latency_ms.is_none());
    }

    #[test]
    fn aggregates_outcomes_sessions_and_latency() {
        let entries = vec![
            entry(Some("a"), 200, Outcome::Relayed, Some(100)),
            entry(Some("a"), 200, Outcome::Relayed, Some(300)),
            entry(Some("b"), 422, Outcome::BackendError, Some(50)),
            entry(None, 400, Outcome::BadRequest, None),
        ];
        let stats = build_stats(&entries);

        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.unique_sessions, 2);
        assert_eq!(stats.outcomes.relayed, 2);
        assert_eq!(stats.outcomes.backend_error, 1);
        assert_eq!(stats.outcomes.bad_request, 1);
        assert_eq!(stats.status_counts.get(&200), Some(&2));
        assert_eq!(stats.max_latency_ms, Some(300));
        assert!((stats.avg_latency_ms.unwrap() - 150.0).abs() < f64::EPSILON);
        assert!((stats.outcomes.pct(2) - 50.0).abs() < f64::EPSILON);
    }
}
